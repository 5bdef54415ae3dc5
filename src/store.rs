//! Store Module
//!
//! The handle that owns the database file and the value codec.
//!
//! ## Responsibilities
//! - Open or create the single database file
//! - Hand out [`Node`]s rooted at the top of the tree
//! - Marshal/unmarshal values through the configured codec
//! - Explicit close; later operations fail with [`TreeError::Closed`]

use std::fs;
use std::path::Path;

use parking_lot::{RwLock, RwLockReadGuard};
use redb::Database;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::bucket::NODES;
use crate::codec::{BincodeCodec, Codec};
use crate::config::Config;
use crate::error::{Result, TreeError};
use crate::node::Node;
use crate::path::NodePath;

/// An open tree store
///
/// ## Concurrency
/// - Any number of threads may share a `&Store` and run operations
///   concurrently; readers work on snapshots, writers queue on the engine's
///   single write lock.
/// - `db` sits behind a RwLock only for the close lifecycle: every
///   transaction holds a read guard for its whole span, `close` takes the
///   write guard and therefore waits for in-flight transactions.
pub struct Store<C: Codec = BincodeCodec> {
    config: Config,
    db: RwLock<Option<Database>>,
    codec: C,
}

impl Store<BincodeCodec> {
    /// Open or create a store with the default binary codec
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_codec(config, BincodeCodec)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified database file
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().db_path(path.as_ref()).build();
        Self::open(config)
    }
}

impl<C: Codec> Store<C> {
    /// Open or create a store with an explicit codec
    ///
    /// On startup:
    /// 1. Create the parent directory if needed
    /// 2. Open (or create) the database file
    /// 3. Make sure the tree table exists so readers never miss it
    pub fn open_with_codec(config: Config, codec: C) -> Result<Self> {
        config.validate()?;

        // Step 1: Create the parent directory
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Step 2: Open the engine
        let mut builder = Database::builder();
        builder.set_cache_size(config.cache_size);
        let db = if config.create_if_missing {
            builder.create(&config.db_path)?
        } else {
            builder.open(&config.db_path)?
        };

        // Step 3: Create the table up front
        let txn = db.begin_write()?;
        {
            txn.open_table(NODES)?;
        }
        txn.commit()?;

        info!(path = %config.db_path.display(), "store opened");

        Ok(Self {
            config,
            db: RwLock::new(Some(db)),
            codec,
        })
    }

    /// The root of the tree
    pub fn root(&self) -> Node<'_, C> {
        Node::new(self, NodePath::root())
    }

    /// Shorthand for `root().node(names)`
    pub fn node<I, S>(&self, names: I) -> Node<'_, C>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.root().node(names)
    }

    /// Close the database file.
    ///
    /// Waits for running transactions to finish. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if let Some(db) = self.db.write().take() {
            drop(db);
            info!(path = %self.config.db_path.display(), "store closed");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.db.read().is_none()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    // =========================================================================
    // Crate Internals
    // =========================================================================

    /// Shared access to the engine for the span of one transaction.
    ///
    /// Recursive so that a caller already holding a guard on this thread
    /// is never queued behind a pending `close`.
    pub(crate) fn engine(&self) -> RwLockReadGuard<'_, Option<Database>> {
        self.db.read_recursive()
    }

    pub(crate) fn marshal<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        self.codec.marshal(value).map_err(TreeError::Encode)
    }

    pub(crate) fn unmarshal<T>(&self, key: &str, bytes: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.codec.unmarshal(bytes).map_err(|source| TreeError::Decode {
            key: key.to_string(),
            source,
        })
    }
}
