//! # treekv
//!
//! A hierarchical, transactional key-value tree with:
//! - Path-addressed nodes over nested buckets
//! - ACID transactions, single writer / many snapshot readers
//! - Safe handling of empty and all-null keys
//! - Ordered iteration with early stop
//! - "Keep last N" eviction
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Node                                 │
//! │   set / set_if_none / get / exists / delete                 │
//! │   each / each_key / length / drop / drop_except_last        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  tx_update / tx_view
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Transaction (Txn)                          │
//! │          (reused along one call chain)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Bucket    │          │    Codec    │
//!   │ (NodePath)  │          │ (serde)     │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │    redb     │
//!   │ (one table) │
//!   └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! # fn main() -> treekv::Result<()> {
//! let store = treekv::Store::open_path("./treekv_data/store.redb")?;
//!
//! let room = store.node(["rooms", "!abc:example.org"]);
//! room.set("name", "Lobby")?;
//!
//! let name: String = room.get("name")?;
//! assert_eq!(name, "Lobby");
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod key;
pub mod path;
pub mod codec;
pub mod bucket;
pub mod txn;
pub mod store;
pub mod node;

mod iter;
mod evict;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TreeError};
pub use config::Config;
pub use codec::{BincodeCodec, Codec, JsonCodec};
pub use path::NodePath;
pub use store::Store;
pub use node::Node;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of treekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
