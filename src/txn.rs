//! Transactions
//!
//! One physical engine transaction, read-only or writable. The engine
//! allows a single writer at a time alongside any number of snapshot
//! readers; beginning a writable transaction blocks while another writer
//! is active.

use redb::Database;
use tracing::{error, warn};

use crate::bucket::{BucketTable, NODES};
use crate::error::Result;

/// An open engine transaction
pub enum Txn {
    ReadOnly(redb::ReadTransaction),
    Writable(redb::WriteTransaction),
}

impl Txn {
    pub(crate) fn begin(db: &Database, writable: bool) -> Result<Self> {
        let txn = if writable {
            Txn::Writable(db.begin_write()?)
        } else {
            Txn::ReadOnly(db.begin_read()?)
        };
        Ok(txn)
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Txn::Writable(_))
    }

    /// Open the tree table inside this transaction.
    ///
    /// A writable transaction can have the table open only once at a time,
    /// so callers keep the returned handle for the span of one operation.
    pub(crate) fn table(&self) -> Result<BucketTable<'_>> {
        let table = match self {
            Txn::ReadOnly(txn) => BucketTable::ReadOnly(txn.open_table(NODES)?),
            Txn::Writable(txn) => BucketTable::Writable(txn.open_table(NODES)?),
        };
        Ok(table)
    }

    /// Make a writable transaction durable. Read-only transactions are
    /// simply closed.
    pub(crate) fn commit(self) -> Result<()> {
        match self {
            Txn::ReadOnly(txn) => {
                drop(txn);
                Ok(())
            }
            Txn::Writable(txn) => txn.commit().map_err(|e| {
                error!(error = %e, "commit error");
                e.into()
            }),
        }
    }

    /// Discard everything done in this transaction.
    pub(crate) fn rollback(self) {
        match self {
            Txn::ReadOnly(txn) => drop(txn),
            Txn::Writable(txn) => {
                if let Err(e) = txn.abort() {
                    warn!(error = %e, "rollback failed");
                }
            }
        }
    }
}
