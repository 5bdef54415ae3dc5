//! Node paths
//!
//! A [`NodePath`] names a bucket by the chain of segments leading to it
//! from the root. Paths are exact-length and never grown in place: every
//! append builds a fresh path, so two nodes derived from one parent can
//! never observe each other's segments.

use std::fmt;

/// Ordered sequence of bucket names; empty means the root bucket
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    segments: Box<[Box<[u8]>]>,
}

impl NodePath {
    /// The root path
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from raw segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let segments: Vec<Box<[u8]>> = segments
            .into_iter()
            .map(|s| Box::from(s.as_ref()))
            .collect();

        Self {
            segments: segments.into_boxed_slice(),
        }
    }

    /// Return a new path with `names` appended. `self` is untouched.
    pub fn join<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let names = names.into_iter();
        let mut segments = Vec::with_capacity(self.segments.len() + names.size_hint().0);
        segments.extend(self.segments.iter().cloned());
        segments.extend(names.map(|s| Box::from(s.as_ref())));

        Self {
            segments: segments.into_boxed_slice(),
        }
    }

    /// Path of the enclosing bucket, `None` for the root
    pub fn parent(&self) -> Option<(NodePath, &[u8])> {
        let (last, rest) = self.segments.split_last()?;
        Some((NodePath::new(rest.iter()), last))
    }

    pub fn segments(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.segments.iter().map(|s| &s[..])
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl<S: AsRef<[u8]>> FromIterator<S> for NodePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        NodePath::new(iter)
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.segments.iter().map(|s| String::from_utf8_lossy(s)))
            .finish()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in self.segments.iter() {
            write!(f, "/{}", String::from_utf8_lossy(segment))?;
        }
        Ok(())
    }
}
