//! Replace-all record storage boundary.
//!
//! Both datasets (passenger records and forecasts) are written only as whole
//! sets. The contract every implementation honours:
//!
//! - `replace_all` is atomic from a reader's point of view: a concurrent
//!   `read_all` sees either the previous set or the new one, never an empty or
//!   half-written set;
//! - after a successful `replace_all`, `read_all` returns exactly the new set,
//!   ordered by natural key;
//! - a batch with duplicate natural keys is rejected and the current set is
//!   left untouched.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryRecordStore;
pub use postgres::{PostgresForecastStore, PostgresPassengerStore, ensure_schema};

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use ridership_core::NaturalKey;

/// Number of rows sent per multi-row `INSERT` by durable stores.
pub const INSERT_CHUNK_SIZE: usize = 100;

/// Store operation error.
///
/// These are **infrastructure errors** (storage, availability) as opposed to
/// domain or parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("duplicate natural key in batch: {0}")]
    DuplicateKey(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Whole-set storage for one logical dataset.
pub trait RecordStore<R>: Send + Sync {
    /// Atomically replace the full dataset; returns the number of records stored.
    fn replace_all(&self, records: Vec<R>) -> Result<usize, StorageError>;

    /// Current dataset, ordered by natural key.
    fn read_all(&self) -> Result<Vec<R>, StorageError>;
}

impl<R, S> RecordStore<R> for Arc<S>
where
    S: RecordStore<R> + ?Sized,
{
    fn replace_all(&self, records: Vec<R>) -> Result<usize, StorageError> {
        (**self).replace_all(records)
    }

    fn read_all(&self) -> Result<Vec<R>, StorageError> {
        (**self).read_all()
    }
}

/// Reject batches that repeat a natural key.
pub fn ensure_unique_keys<R: NaturalKey>(records: &[R]) -> Result<(), StorageError> {
    let mut seen = BTreeSet::new();
    for r in records {
        let key = r.natural_key();
        if !seen.insert(key.clone()) {
            return Err(StorageError::DuplicateKey(format!("{key:?}")));
        }
    }
    Ok(())
}
