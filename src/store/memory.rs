use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::debug;

use super::CertificateStore;
use crate::error::{CertTreeError, Result};
use crate::record::CertificateRecord;

/// In-process record store.
///
/// The write lock spans the existence check and the insert, which gives the
/// per-subject atomicity issuance relies on.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, CertificateRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts or replaces a record without the duplicate check.
    ///
    /// Intended for seeding fixtures, including deliberately broken ones.
    pub fn insert_unchecked(&self, record: CertificateRecord) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(record.subject.clone(), record);
        Ok(())
    }
}

fn poisoned<T>(_: T) -> CertTreeError {
    CertTreeError::StorageError("memory store lock poisoned".to_string())
}

impl CertificateStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, subject: &str) -> Result<Option<CertificateRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(subject).cloned())
    }

    fn save(&self, record: &CertificateRecord) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records
            .get(&record.subject)
            .is_some_and(CertificateRecord::is_complete)
        {
            return Err(CertTreeError::DuplicateSubject(record.subject.clone()));
        }
        records.insert(record.subject.clone(), record.clone());
        debug!(subject = %record.subject, "stored certificate record");
        Ok(())
    }
}
