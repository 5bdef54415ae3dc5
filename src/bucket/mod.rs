//! Bucket Module
//!
//! Nested, named namespaces on top of the engine's single ordered table.
//!
//! ## Responsibilities
//! - Resolve a [`NodePath`] to a bucket, creating missing buckets on
//!   writable transactions
//! - Point reads and writes of leaf values inside one bucket
//! - Ordered, double-ended cursors over a bucket's direct children
//! - Recursive bucket deletion
//!
//! ## Key Layout
//! ```text
//! bucket prefix   = seg(s0) seg(s1) ... seg(sn)          (root: empty)
//! seg(s)          = 0x01 | s with 0x00 -> 0x00 0xFF | 0x00 0x01
//! direct child    = prefix | 0x02 | key
//!
//! value           = 0x00                  (nested bucket marker)
//!                 | 0x01 | codec bytes    (leaf)
//! ```
//!
//! Nested content of a bucket (`prefix | 0x01 ...`) always sorts before
//! its direct children (`prefix | 0x02 ...`), so a child scan is one
//! contiguous range and a recursive delete is another.

mod cursor;
mod layout;

pub use cursor::{Cursor, Entry};

use redb::{ReadableTable, TableDefinition};
use tracing::trace;

use crate::error::{Result, TreeError};
use crate::path::NodePath;

use layout::Stored;

/// The one engine table holding every bucket and value
pub(crate) const NODES: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("nodes");

// =============================================================================
// Table Access
// =============================================================================

/// The `nodes` table opened inside a read-only or writable transaction
pub enum BucketTable<'txn> {
    ReadOnly(redb::ReadOnlyTable<&'static [u8], &'static [u8]>),
    Writable(redb::Table<'txn, &'static [u8], &'static [u8]>),
}

impl BucketTable<'_> {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let raw = match self {
            BucketTable::ReadOnly(t) => t.get(key)?.map(|g| g.value().to_vec()),
            BucketTable::Writable(t) => t.get(key)?.map(|g| g.value().to_vec()),
        };
        Ok(raw)
    }

    fn insert_raw(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        match self {
            BucketTable::ReadOnly(_) => Err(TreeError::TransactionNotWritable),
            BucketTable::Writable(t) => {
                t.insert(key, value)?;
                Ok(())
            }
        }
    }

    fn remove_raw(&mut self, key: &[u8]) -> Result<bool> {
        match self {
            BucketTable::ReadOnly(_) => Err(TreeError::TransactionNotWritable),
            BucketTable::Writable(t) => Ok(t.remove(key)?.is_some()),
        }
    }

    /// Remove every key in `[lower, upper)`, returning how many went.
    fn remove_range(&mut self, lower: &[u8], upper: &[u8]) -> Result<usize> {
        let BucketTable::Writable(t) = self else {
            return Err(TreeError::TransactionNotWritable);
        };

        let keys = t
            .range(lower..upper)?
            .map(|item| item.map(|(k, _)| k.value().to_vec()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for key in &keys {
            t.remove(key.as_slice())?;
        }

        Ok(keys.len())
    }

    fn range(
        &self,
        lower: &[u8],
        upper: &[u8],
    ) -> Result<redb::Range<'_, &'static [u8], &'static [u8]>> {
        let range = match self {
            BucketTable::ReadOnly(t) => t.range(lower..upper)?,
            BucketTable::Writable(t) => t.range(lower..upper)?,
        };
        Ok(range)
    }
}

// =============================================================================
// Bucket Handle
// =============================================================================

/// What a direct child key holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Leaf(Vec<u8>),
    Bucket,
}

/// A bucket known to exist in the transaction it was resolved in
///
/// Handles carry no engine state, only the bucket's key prefix. They are
/// cached on a node for the lifetime of one transaction and dropped with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    prefix: Vec<u8>,
}

impl Bucket {
    /// The root bucket, which always exists
    pub fn root() -> Self {
        Self { prefix: Vec::new() }
    }

    /// Walk `path` from the root, one nested bucket per segment.
    ///
    /// Missing buckets are created when `create` is set; otherwise the walk
    /// stops and returns `None`. Descending through a leaf is an error.
    pub fn resolve(table: &mut BucketTable<'_>, path: &NodePath, create: bool) -> Result<Option<Self>> {
        let mut bucket = Self::root();

        for segment in path.segments() {
            let marker = layout::child_key(&bucket.prefix, segment);

            match table.get_raw(&marker)? {
                Some(raw) => {
                    if let Stored::Leaf(_) = Stored::parse(&raw)? {
                        return Err(TreeError::IncompatibleValue(format!(
                            "{} is a value, not a bucket",
                            path
                        )));
                    }
                }
                None if create => {
                    table.insert_raw(&marker, &layout::bucket_marker())?;
                    trace!(path = %path, segment = %String::from_utf8_lossy(segment), "created bucket");
                }
                None => return Ok(None),
            }

            layout::push_segment(&mut bucket.prefix, segment);
        }

        Ok(Some(bucket))
    }

    /// Fetch a direct child
    pub fn get(&self, table: &BucketTable<'_>, key: &[u8]) -> Result<Option<Value>> {
        let Some(raw) = table.get_raw(&layout::child_key(&self.prefix, key))? else {
            return Ok(None);
        };

        let value = match Stored::parse(&raw)? {
            Stored::Bucket => Value::Bucket,
            Stored::Leaf(payload) => Value::Leaf(payload.to_vec()),
        };
        Ok(Some(value))
    }

    /// Store a leaf value, overwriting any previous leaf
    pub fn put(&self, table: &mut BucketTable<'_>, key: &[u8], payload: &[u8]) -> Result<()> {
        if let Some(Value::Bucket) = self.get(table, key)? {
            return Err(incompatible(key, "is a bucket"));
        }

        table.insert_raw(&layout::child_key(&self.prefix, key), &layout::leaf_value(payload))
    }

    /// Remove a leaf value. Absent keys are not an error.
    pub fn delete(&self, table: &mut BucketTable<'_>, key: &[u8]) -> Result<()> {
        match self.get(table, key)? {
            Some(Value::Bucket) => Err(incompatible(key, "is a bucket")),
            Some(Value::Leaf(_)) => {
                table.remove_raw(&layout::child_key(&self.prefix, key))?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Remove the nested bucket `name` and everything below it.
    ///
    /// Returns false when no such bucket exists.
    pub fn delete_bucket(&self, table: &mut BucketTable<'_>, name: &[u8]) -> Result<bool> {
        match self.get(table, name)? {
            Some(Value::Bucket) => {}
            Some(Value::Leaf(_)) => return Err(incompatible(name, "is a value, not a bucket")),
            None => return Ok(false),
        }

        let child = self.child(name);
        let (lower, upper) = layout::subtree_bounds(&child.prefix);
        let removed = table.remove_range(&lower, &upper)?;
        table.remove_raw(&layout::child_key(&self.prefix, name))?;

        trace!(entries = removed, "deleted bucket {:?}", String::from_utf8_lossy(name));
        Ok(true)
    }

    /// Remove every child of this bucket, nested buckets included.
    pub fn clear(&self, table: &mut BucketTable<'_>) -> Result<usize> {
        let (lower, upper) = layout::subtree_bounds(&self.prefix);
        table.remove_range(&lower, &upper)
    }

    /// Ordered cursor over direct children whose key starts with `key_prefix`
    pub fn cursor<'t>(&self, table: &'t BucketTable<'_>, key_prefix: &[u8]) -> Result<Cursor<'t>> {
        let (lower, upper) = layout::children_bounds(&self.prefix, key_prefix);
        let range = table.range(&lower, &upper)?;
        Ok(Cursor::new(range, self.prefix.len() + 1))
    }

    fn child(&self, name: &[u8]) -> Self {
        let mut prefix = self.prefix.clone();
        layout::push_segment(&mut prefix, name);
        Self { prefix }
    }
}

/// Delete the bucket at `path` with everything nested in it.
///
/// Dropping the root clears the whole tree. A missing bucket is left alone
/// and reported as false.
pub fn drop_path(table: &mut BucketTable<'_>, path: &NodePath) -> Result<bool> {
    let Some((parent_path, name)) = path.parent() else {
        Bucket::root().clear(table)?;
        return Ok(true);
    };

    match Bucket::resolve(table, &parent_path, false)? {
        Some(parent) => parent.delete_bucket(table, name),
        None => Ok(false),
    }
}

fn incompatible(key: &[u8], what: &str) -> TreeError {
    TreeError::IncompatibleValue(format!("{:?} {}", String::from_utf8_lossy(key), what))
}
