//! Node Module
//!
//! A [`Node`] binds a path in the bucket tree to a store and, while it runs
//! inside [`Node::tx_update`] or [`Node::tx_view`], to one engine
//! transaction.
//!
//! ## Transaction lifecycle
//! ```text
//!   NoTxn ──begin──▶ TxnActive ──f ok, writable──▶ Committed
//!                        │
//!                        └──f err / read-only──▶ RolledBack
//! ```
//!
//! A node that already carries a transaction reuses it: nested calls on the
//! same chain compose into one atomic unit and commit exactly once, at the
//! outermost call. The engine allows only one writer, so opening a second
//! writable transaction from inside the first would block forever.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::bucket::{Bucket, BucketTable, Value};
use crate::codec::{BincodeCodec, Codec};
use crate::error::{Result, TreeError};
use crate::key::sanitize;
use crate::path::NodePath;
use crate::store::Store;
use crate::txn::Txn;

/// Handle on one location in the tree
pub struct Node<'a, C: Codec = BincodeCodec> {
    pub(crate) store: &'a Store<C>,
    txn: Option<&'a Txn>,
    /// Resolved bucket, valid only within `txn`
    bucket: Option<Bucket>,
    path: NodePath,
}

impl<C: Codec> Clone for Node<'_, C> {
    /// Clones share the transaction but never a resolved bucket; nested
    /// calls may drop it.
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            txn: self.txn,
            bucket: None,
            path: self.path.clone(),
        }
    }
}

impl<'a, C: Codec> Node<'a, C> {
    pub(crate) fn new(store: &'a Store<C>, path: NodePath) -> Self {
        Self {
            store,
            txn: None,
            bucket: None,
            path,
        }
    }

    // =========================================================================
    // Path Composition
    // =========================================================================

    /// A node with the given full path. The old path is replaced entirely;
    /// any active transaction is kept.
    pub fn from_path(&self, path: NodePath) -> Node<'a, C> {
        Node {
            store: self.store,
            txn: self.txn,
            bucket: None,
            path,
        }
    }

    /// A child node with `names` appended to this node's path. An active
    /// transaction is inherited.
    ///
    /// # Panics
    ///
    /// Panics if `names` is empty.
    pub fn node<I, S>(&self, names: I) -> Node<'a, C>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        assert!(!names.is_empty(), "Node name can't be empty");

        self.from_path(self.path.join(names.iter().map(|n| n.as_ref().as_bytes())))
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn store(&self) -> &'a Store<C> {
        self.store
    }

    /// True while running inside `tx_update` / `tx_view`
    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Run `f` with a node bound to a writable transaction.
    ///
    /// An active transaction on this node is reused and left for its owner
    /// to finish. Otherwise a new one is begun, committed if `f` succeeds
    /// and rolled back if it fails.
    pub fn tx_update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(Node<'_, C>) -> Result<R>,
    {
        if let Some(txn) = self.txn {
            if !txn.is_writable() {
                return Err(TreeError::TransactionNotWritable);
            }
        }

        self.run(true, f)
    }

    /// Run `f` with a node bound to a read-only transaction, or to the
    /// active one if there is one. Never commits.
    pub fn tx_view<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(Node<'_, C>) -> Result<R>,
    {
        self.run(false, f)
    }

    fn run<R, F>(&self, writable: bool, f: F) -> Result<R>
    where
        F: FnOnce(Node<'_, C>) -> Result<R>,
    {
        if self.txn.is_some() {
            return f(self.clone());
        }

        let engine = self.store.engine();
        let db = engine.as_ref().ok_or(TreeError::Closed)?;
        let txn = Txn::begin(db, writable)?;
        debug!(path = %self.path, writable, "transaction begin");

        let mut node = Node {
            store: self.store,
            txn: Some(&txn),
            bucket: None,
            path: self.path.clone(),
        };

        if writable && !node.path.is_root() {
            // Best effort and never creating: a failure here resurfaces from
            // whatever f does with the bucket.
            if let Err(e) = node.prefetch_bucket() {
                debug!(path = %node.path, error = %e, "failed to fetch bucket for existing path");
            }
        }

        match f(node) {
            Ok(value) => {
                if writable {
                    txn.commit()?;
                    debug!(path = %self.path, "transaction committed");
                } else {
                    txn.rollback();
                }
                Ok(value)
            }
            Err(e) => {
                txn.rollback();
                Err(e)
            }
        }
    }

    pub(crate) fn txn(&self) -> Result<&'a Txn> {
        self.txn.ok_or(TreeError::TransactionClosed)
    }

    fn prefetch_bucket(&mut self) -> Result<()> {
        let txn = self.txn()?;
        let mut table = txn.table()?;
        self.existing_bucket(&mut table).map(|_| ())
    }

    /// This node's bucket in the current transaction.
    ///
    /// Created on writable transactions; a missing bucket on a read-only
    /// transaction is `KeyNotFound`.
    pub(crate) fn bucket(&mut self, table: &mut BucketTable<'_>) -> Result<&Bucket> {
        if self.bucket.is_none() {
            let writable = self.txn()?.is_writable();
            let bucket = Bucket::resolve(table, &self.path, writable)?.ok_or(TreeError::KeyNotFound)?;
            self.bucket = Some(bucket);
        }

        self.bucket.as_ref().ok_or(TreeError::KeyNotFound)
    }

    /// This node's bucket if it already exists. Never creates anything,
    /// even on a writable transaction.
    pub(crate) fn existing_bucket(&mut self, table: &mut BucketTable<'_>) -> Result<Option<&Bucket>> {
        if self.bucket.is_none() {
            self.bucket = Bucket::resolve(table, &self.path, false)?;
        }

        Ok(self.bucket.as_ref())
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// Store `value` under `key`, overwriting any previous value.
    pub fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        // Marshal first: no point opening a write transaction for a value
        // that cannot be stored.
        let bytes = self.store.marshal(value)?;
        let key = sanitize(key);

        self.tx_update(|mut node| {
            let mut table = node.txn()?.table()?;
            let bucket = node.bucket(&mut table)?;
            bucket.put(&mut table, &key, &bytes)
        })
    }

    /// Store `value` under `key` only if nothing is stored there yet.
    ///
    /// The check and the write share one writable transaction, so a value
    /// written concurrently by another writer is never clobbered.
    pub fn set_if_none<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes = self.store.marshal(value)?;
        let key = sanitize(key);

        self.tx_update(|mut node| {
            let mut table = node.txn()?.table()?;
            let bucket = node.bucket(&mut table)?;

            if let Some(Value::Leaf(_)) = bucket.get(&table, &key)? {
                return Ok(());
            }

            bucket.put(&mut table, &key, &bytes)
        })
    }

    /// Fetch and decode the value under `key`.
    ///
    /// Returns [`TreeError::KeyNotFound`] if the key or this node's bucket
    /// is absent.
    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let stored = sanitize(key);

        self.tx_view(|mut node| {
            let mut table = node.txn()?.table()?;
            let raw = node.bucket(&mut table)?.get(&table, &stored)?;

            match raw {
                Some(Value::Leaf(bytes)) => node.store.unmarshal(key, &bytes),
                Some(Value::Bucket) | None => Err(TreeError::KeyNotFound),
            }
        })
    }

    /// Whether a value is stored under `key`. An empty `key` asks whether
    /// this node's bucket itself exists.
    ///
    /// Never fails: any error reads as "does not exist".
    pub fn exists(&self, key: &str) -> bool {
        let stored = sanitize(key);

        let result = self.tx_view(|mut node| {
            let mut table = node.txn()?.table()?;

            let Some(bucket) = node.existing_bucket(&mut table)? else {
                return Ok(false);
            };
            if key.is_empty() {
                return Ok(true);
            }

            let raw = bucket.get(&table, &stored)?;
            Ok(matches!(raw, Some(Value::Leaf(_))))
        });

        matches!(result, Ok(true))
    }

    /// Remove the value under `key`. Deleting an absent key, or a key in a
    /// bucket that does not exist, succeeds and creates nothing.
    pub fn delete(&self, key: &str) -> Result<()> {
        let key = sanitize(key);

        self.tx_update(|mut node| {
            let mut table = node.txn()?.table()?;
            let Some(bucket) = node.existing_bucket(&mut table)?.cloned() else {
                // Already deleted.
                return Ok(());
            };
            bucket.delete(&mut table, &key)
        })
    }
}
