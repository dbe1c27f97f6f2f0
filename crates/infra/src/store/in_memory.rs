use std::sync::{Arc, RwLock};

use ridership_core::NaturalKey;

use super::{RecordStore, StorageError, ensure_unique_keys};

#[derive(Debug)]
struct Snapshot<R> {
    generation: u64,
    records: Arc<Vec<R>>,
}

/// In-memory store for tests/dev.
///
/// Holds an immutable snapshot behind an `RwLock`; `replace_all` builds the
/// new snapshot outside the lock and swaps it in, so readers only ever see a
/// complete set.
#[derive(Debug)]
pub struct InMemoryRecordStore<R> {
    inner: RwLock<Snapshot<R>>,
}

impl<R> InMemoryRecordStore<R> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Snapshot {
                generation: 0,
                records: Arc::new(Vec::new()),
            }),
        }
    }

    /// Number of successful replacements so far.
    pub fn generation(&self) -> Result<u64, StorageError> {
        let snap = self.inner.read().map_err(|_| StorageError::Poisoned)?;
        Ok(snap.generation)
    }

    /// Shared handle to the current set (no copy).
    pub fn snapshot(&self) -> Result<Arc<Vec<R>>, StorageError> {
        let snap = self.inner.read().map_err(|_| StorageError::Poisoned)?;
        Ok(snap.records.clone())
    }
}

impl<R> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> RecordStore<R> for InMemoryRecordStore<R>
where
    R: NaturalKey + Clone + Send + Sync + 'static,
{
    fn replace_all(&self, mut records: Vec<R>) -> Result<usize, StorageError> {
        ensure_unique_keys(&records)?;
        records.sort_by_key(|r| r.natural_key());
        let count = records.len();
        let records = Arc::new(records);

        let mut snap = self.inner.write().map_err(|_| StorageError::Poisoned)?;
        snap.generation += 1;
        snap.records = records;
        Ok(count)
    }

    fn read_all(&self) -> Result<Vec<R>, StorageError> {
        Ok((*self.snapshot()?).clone())
    }
}
