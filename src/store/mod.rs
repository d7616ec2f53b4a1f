//! Durable record store keyed by subject name.
//!
//! Issuance consumes the store through two operations only: [`CertificateStore::load`]
//! and [`CertificateStore::save`]. `save` must be an atomic check-then-write per
//! subject so that two concurrent issuances of the same new subject cannot both
//! succeed.

mod directory;
mod memory;

use std::sync::Arc;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;

use crate::error::{CertTreeError, Result};
use crate::record::CertificateRecord;

/// Trait for certificate record storage.
pub trait CertificateStore: Send + Sync {
    /// Returns the store name, for logging.
    fn name(&self) -> &str;

    /// Loads the record for `subject`, if any.
    fn load(&self, subject: &str) -> Result<Option<CertificateRecord>>;

    /// Persists a new record.
    ///
    /// Fails with [`CertTreeError::DuplicateSubject`] if a complete record for the
    /// same subject already exists. An incomplete record (missing certificate or
    /// key) may be replaced.
    fn save(&self, record: &CertificateRecord) -> Result<()>;
}

impl<S: CertificateStore + ?Sized> CertificateStore for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load(&self, subject: &str) -> Result<Option<CertificateRecord>> {
        (**self).load(subject)
    }

    fn save(&self, record: &CertificateRecord) -> Result<()> {
        (**self).save(record)
    }
}

/// Checks that `subject` can serve as a store key and a file stem.
///
/// Subject names must be non-empty ASCII, must not start with `.`, and must not
/// contain path separators or control characters. The subject doubles as the
/// certificate's dNSName, which is an IA5String.
pub fn validate_subject(subject: &str) -> Result<()> {
    let invalid = subject.is_empty()
        || subject.starts_with('.')
        || subject
            .chars()
            .any(|c| !c.is_ascii() || c == '/' || c == '\\' || c.is_control());
    if invalid {
        return Err(CertTreeError::InvalidSubject(subject.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_subject() {
        assert!(validate_subject("client1").is_ok());
        assert!(validate_subject("small-ubuntu-20-04").is_ok());
        assert!(validate_subject("server.example.org").is_ok());

        for bad in ["", ".hidden", "../etc/passwd", "a/b", "a\\b", "nul\0", "caf\u{e9}"] {
            assert!(
                matches!(validate_subject(bad), Err(CertTreeError::InvalidSubject(_))),
                "{bad:?}"
            );
        }
    }
}
