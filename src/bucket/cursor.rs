//! Bucket cursor
//!
//! Byte-ordered walk over one bucket's direct children, forwards or
//! backwards.

use redb::{AccessGuard, StorageError};

use crate::error::Result;

use super::layout::Stored;

/// One direct child of a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A leaf value (codec bytes)
    Leaf { key: Vec<u8>, value: Vec<u8> },

    /// A nested bucket
    Bucket { key: Vec<u8> },
}

impl Entry {
    /// Key relative to the enclosing bucket
    pub fn key(&self) -> &[u8] {
        match self {
            Entry::Leaf { key, .. } | Entry::Bucket { key } => key,
        }
    }

    pub fn is_bucket(&self) -> bool {
        matches!(self, Entry::Bucket { .. })
    }
}

type RawItem<'t> =
    std::result::Result<(AccessGuard<'t, &'static [u8]>, AccessGuard<'t, &'static [u8]>), StorageError>;

/// Cursor over the direct children of a bucket
///
/// `next` walks from the first key up, `next_back` from the last key down.
/// The cursor borrows the table, so the bucket cannot be modified while it
/// is alive.
pub struct Cursor<'t> {
    range: redb::Range<'t, &'static [u8], &'static [u8]>,
    /// Bytes of bucket prefix plus child marker to strip from each key
    skip: usize,
}

impl<'t> Cursor<'t> {
    pub(super) fn new(range: redb::Range<'t, &'static [u8], &'static [u8]>, skip: usize) -> Self {
        Self { range, skip }
    }

    fn decode(&self, item: RawItem<'_>) -> Result<Entry> {
        let (key, value) = item?;
        let key = key.value()[self.skip..].to_vec();

        let entry = match Stored::parse(value.value())? {
            Stored::Bucket => Entry::Bucket { key },
            Stored::Leaf(payload) => Entry::Leaf {
                key,
                value: payload.to_vec(),
            },
        };
        Ok(entry)
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.range.next()?;
        Some(self.decode(item))
    }
}

impl DoubleEndedIterator for Cursor<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let item = self.range.next_back()?;
        Some(self.decode(item))
    }
}
