//! Iteration
//!
//! Cursor walks over a node's direct children. Each walk reads the matching
//! entries inside the node's transaction and releases the table before the
//! first callback runs, so every callback sees the same total and may call
//! back into the same chain: reads, writes and deletes during a walk all
//! join the walk's transaction. The walk itself visits the children as they
//! were when it started.
//!
//! Callbacks return [`ControlFlow::Break`] to stop early; that ends the
//! walk successfully. An `Err` aborts the walk with that error. A node
//! whose bucket does not exist yields no visits.

use std::ops::ControlFlow;

use serde::de::DeserializeOwned;

use crate::bucket::Entry;
use crate::codec::Codec;
use crate::error::Result;
use crate::key;
use crate::node::Node;

impl<C: Codec> Node<'_, C> {
    /// Visit every leaf value whose stored key starts with `prefix`, in key
    /// order. Nested buckets are skipped and not counted.
    ///
    /// `visit` gets the logical key, the decoded value and the number of
    /// matching leaves. The value is only borrowed for the call; copy out
    /// whatever must outlive it.
    ///
    /// ```no_run
    /// use std::ops::ControlFlow;
    /// # fn main() -> treekv::Result<()> {
    /// let store = treekv::Store::open_path("cache.redb")?;
    /// let mut recent = Vec::new();
    ///
    /// store.node(["events"]).each("", |_key, event: &String, total| {
    ///     recent.reserve(total);
    ///     recent.push(event.clone());
    ///     Ok(ControlFlow::Continue(()))
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn each<T, F>(&self, prefix: &str, mut visit: F) -> Result<()>
    where
        T: DeserializeOwned,
        F: FnMut(&str, &T, usize) -> Result<ControlFlow<()>>,
    {
        self.tx_view(|mut node| {
            let leaves: Vec<Entry> = children(&mut node, prefix)?
                .into_iter()
                .filter(|entry| !entry.is_bucket())
                .collect();
            let total = leaves.len();

            for entry in leaves {
                let Entry::Leaf { key, value } = entry else {
                    continue;
                };

                let key = key::logical(&key);
                let value: T = node.store.unmarshal(&key, &value)?;

                if visit(&key, &value, total)?.is_break() {
                    break;
                }
            }

            Ok(())
        })
    }

    /// Visit every direct child key starting with `prefix`, leaves and
    /// nested buckets alike, in key order. `visit` gets the key and the
    /// number of matching children.
    pub fn each_key<F>(&self, prefix: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(&str, usize) -> Result<ControlFlow<()>>,
    {
        self.tx_view(|mut node| {
            let entries = children(&mut node, prefix)?;
            let total = entries.len();

            for entry in entries {
                let key = match entry {
                    Entry::Leaf { key, .. } => key::logical(&key),
                    Entry::Bucket { key } => String::from_utf8_lossy(&key).into_owned(),
                };

                if visit(&key, total)?.is_break() {
                    break;
                }
            }

            Ok(())
        })
    }

    /// Number of direct children (leaves and nested buckets) whose key
    /// starts with `prefix`. A missing bucket has length zero.
    pub fn length(&self, prefix: &str) -> Result<usize> {
        self.tx_view(|mut node| {
            let mut table = node.txn()?.table()?;
            let Some(bucket) = node.existing_bucket(&mut table)? else {
                return Ok(0);
            };

            let mut length = 0;
            for entry in bucket.cursor(&table, prefix.as_bytes())? {
                entry?;
                length += 1;
            }
            Ok(length)
        })
    }
}

/// Direct children of the node's bucket matching `prefix`, read in one go.
///
/// The table handle is dropped on return: a writable transaction can only
/// have it open once, and callbacks need to open it again.
fn children<C: Codec>(node: &mut Node<'_, C>, prefix: &str) -> Result<Vec<Entry>> {
    let mut table = node.txn()?.table()?;
    let Some(bucket) = node.existing_bucket(&mut table)? else {
        return Ok(Vec::new());
    };

    let entries = bucket
        .cursor(&table, prefix.as_bytes())?
        .collect::<Result<Vec<_>>>()?;
    Ok(entries)
}
