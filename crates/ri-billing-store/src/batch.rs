//! Bounded automatic write batch.

use tracing::error;

use crate::error::StoreError;
use crate::ops::WriteOp;
use crate::Store;

/// Default number of operations per physical commit.
pub const DEFAULT_BATCH_LIMIT: usize = 250;

/// A failed physical commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitFailure {
    /// Descriptions of the operations that were not written.
    pub operations: Vec<String>,
    /// Why the commit failed.
    pub error: StoreError,
}

/// Queues write operations and commits them in chunks of at most `limit`.
///
/// Each chunk is atomic on its own; chunks are independent of each other.
pub struct AutomaticWriteBatch<'a> {
    store: &'a dyn Store,
    limit: usize,
    pending: Vec<WriteOp>,
    failures: Vec<CommitFailure>,
    written: usize,
}

impl<'a> AutomaticWriteBatch<'a> {
    /// Create a batch writing to `store`. A `limit` of 0 is treated as 1.
    #[must_use]
    pub fn new(store: &'a dyn Store, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            store,
            limit,
            pending: Vec::with_capacity(limit),
            failures: Vec::new(),
            written: 0,
        }
    }

    /// Queue an operation, committing the pending chunk once it is full.
    pub fn push(&mut self, op: WriteOp) {
        self.pending.push(op);
        if self.pending.len() >= self.limit {
            self.flush();
        }
    }

    /// Number of operations queued and not yet committed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of operations written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let chunk = std::mem::take(&mut self.pending);
        match self.store.commit(&chunk) {
            Ok(()) => self.written += chunk.len(),
            Err(error) => {
                error!(operations = chunk.len(), error = %error, "Batch commit failed");
                self.failures.push(CommitFailure {
                    operations: chunk.iter().map(ToString::to_string).collect(),
                    error,
                });
            }
        }
    }

    /// Commit the remaining operations and return every failure seen.
    #[must_use]
    pub fn commit(mut self) -> Vec<CommitFailure> {
        self.flush();
        self.failures
    }
}
