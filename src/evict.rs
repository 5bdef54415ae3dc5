//! Eviction
//!
//! Bounded retention over a node's children, by key order. Keys must sort
//! the way retention should work (timestamps, sequence numbers) for "last
//! N keys" to mean "newest N values".

use tracing::{debug, warn};

use crate::bucket::{self, Entry};
use crate::codec::Codec;
use crate::error::{Result, TreeError};
use crate::node::Node;

impl<C: Codec> Node<'_, C> {
    /// Delete this node's bucket and everything nested beneath it. Dropping
    /// a bucket that does not exist succeeds and creates nothing; dropping
    /// the root empties the whole store.
    ///
    /// This is an ordinary method, unrelated to [`Drop`]: the node handle
    /// stays usable afterwards and writing through it recreates the bucket.
    #[doc(alias = "drop_node")]
    pub fn drop(&self) -> Result<()> {
        self.tx_update(|node| {
            let mut table = node.txn()?.table()?;
            let dropped = bucket::drop_path(&mut table, node.path())?;
            debug!(path = %node.path(), dropped, "drop node");
            Ok(())
        })
    }

    /// Delete every direct child except the `keep` with the greatest keys.
    /// A bucket that does not exist is left alone.
    ///
    /// Walks the cursor from the last key backwards; the first `keep`
    /// entries seen survive, leaves and nested buckets alike. Leaves are
    /// removed first, then nested buckets with their contents. Every
    /// deletion is attempted even after one fails, and the last failure is
    /// returned, which rolls the whole transaction back.
    pub fn drop_except_last(&self, keep: usize) -> Result<()> {
        self.tx_update(|mut node| {
            let mut table = node.txn()?.table()?;
            let Some(bucket) = node.existing_bucket(&mut table)?.cloned() else {
                return Ok(());
            };

            let mut leaves = Vec::new();
            let mut buckets = Vec::new();
            let mut kept = 0;

            for entry in bucket.cursor(&table, &[])?.rev() {
                let entry = entry?;
                if kept < keep {
                    kept += 1;
                    continue;
                }

                match entry {
                    Entry::Leaf { key, .. } => leaves.push(key),
                    Entry::Bucket { key } => buckets.push(key),
                }
            }

            let mut last_error: Option<TreeError> = None;

            for key in &leaves {
                if let Err(e) = bucket.delete(&mut table, key) {
                    warn!(path = %node.path(), error = %e, "failed to evict value");
                    last_error = Some(e);
                }
            }

            for key in &buckets {
                if let Err(e) = bucket.delete_bucket(&mut table, key) {
                    warn!(path = %node.path(), error = %e, "failed to evict bucket");
                    last_error = Some(e);
                }
            }

            debug!(
                path = %node.path(),
                kept,
                leaves = leaves.len(),
                buckets = buckets.len(),
                "drop except last"
            );

            match last_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }
}
