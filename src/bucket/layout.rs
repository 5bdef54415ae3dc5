//! On-disk key layout
//!
//! Encodes bucket paths into key prefixes so that the whole tree lives in
//! one ordered table and every bucket's direct children form one
//! contiguous, byte-ordered run.

use crate::error::{Result, TreeError};

/// Introduces one path segment inside a prefix.
pub(crate) const NESTED: u8 = 0x01;

/// Introduces a direct child key of the bucket named by the prefix.
pub(crate) const CHILD: u8 = 0x02;

/// Upper bound (exclusive) of everything under a prefix.
const END: u8 = 0x03;

/// Segment terminator, sorts below an escaped null.
const TERMINATOR: [u8; 2] = [0x00, 0x01];

/// Follows a literal null byte inside a segment.
const ESCAPE: u8 = 0xFF;

/// Value tag for a nested bucket marker.
pub(crate) const TAG_BUCKET: u8 = 0x00;

/// Value tag for a leaf value.
pub(crate) const TAG_LEAF: u8 = 0x01;

/// Append `NESTED ++ escape(segment) ++ TERMINATOR` to a bucket prefix.
///
/// Null bytes are escaped so a segment can never end early, and the
/// terminator sorts below every escaped or plain byte so a shorter name
/// orders before any name it is a prefix of.
pub(crate) fn push_segment(prefix: &mut Vec<u8>, segment: &[u8]) {
    prefix.reserve(segment.len() + 3);
    prefix.push(NESTED);
    for &b in segment {
        prefix.push(b);
        if b == 0x00 {
            prefix.push(ESCAPE);
        }
    }
    prefix.extend_from_slice(&TERMINATOR);
}

/// Key of direct child `key` under the bucket at `prefix`.
pub(crate) fn child_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + 1 + key.len());
    out.extend_from_slice(prefix);
    out.push(CHILD);
    out.extend_from_slice(key);
    out
}

/// Half-open range of direct children of `prefix` whose key starts with
/// `key_prefix`.
pub(crate) fn children_bounds(prefix: &[u8], key_prefix: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let lower = child_key(prefix, key_prefix);
    let upper = successor(&lower, prefix.len() + 1).unwrap_or_else(|| end_of(prefix));
    (lower, upper)
}

/// Half-open range covering every nested bucket and child below `prefix`.
pub(crate) fn subtree_bounds(prefix: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut lower = Vec::with_capacity(prefix.len() + 1);
    lower.extend_from_slice(prefix);
    lower.push(NESTED);
    (lower, end_of(prefix))
}

/// Smallest key greater than every key starting with `bytes`, without
/// cutting into the first `keep` bytes.
fn successor(bytes: &[u8], keep: usize) -> Option<Vec<u8>> {
    let mut out = bytes.to_vec();
    while out.len() > keep {
        let last = out.pop()?;
        if last < 0xFF {
            out.push(last + 1);
            return Some(out);
        }
    }
    None
}

fn end_of(prefix: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + 1);
    out.extend_from_slice(prefix);
    out.push(END);
    out
}

/// A decoded stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stored<'v> {
    Bucket,
    Leaf(&'v [u8]),
}

impl<'v> Stored<'v> {
    pub(crate) fn parse(raw: &'v [u8]) -> Result<Self> {
        match raw.split_first() {
            Some((&TAG_BUCKET, _)) => Ok(Stored::Bucket),
            Some((&TAG_LEAF, payload)) => Ok(Stored::Leaf(payload)),
            Some((tag, _)) => Err(TreeError::Corrupt(format!("unknown value tag {:#04x}", tag))),
            None => Err(TreeError::Corrupt("empty stored value".to_string())),
        }
    }
}

pub(crate) fn leaf_value(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(TAG_LEAF);
    out.extend_from_slice(payload);
    out
}

pub(crate) fn bucket_marker() -> [u8; 1] {
    [TAG_BUCKET]
}
