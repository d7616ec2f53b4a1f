use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{CertificateStore, validate_subject};
use crate::error::{CertTreeError, Result};
use crate::record::CertificateRecord;

/// Filesystem record store.
///
/// Each subject occupies three files in the store directory:
///
/// ```text
/// <subject>.json      the record
/// <subject>.cert.pem  certificate
/// <subject>.key.pem   private key (0600 on unix)
/// ```
///
/// A record is published by hard-linking a fully written temporary file to
/// `<subject>.json`, which fails if the name already exists. Concurrent writers
/// for the same subject therefore see exactly one winner, and readers never
/// observe a partially written record. If the PEM files cannot be written after
/// publishing, the record is withdrawn again so that a retry starts clean.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            CertTreeError::StorageError(format!("cannot create {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, subject: &str) -> PathBuf {
        self.dir.join(format!("{subject}.json"))
    }

    pub fn cert_path(&self, subject: &str) -> PathBuf {
        self.dir.join(format!("{subject}.cert.pem"))
    }

    pub fn key_path(&self, subject: &str) -> PathBuf {
        self.dir.join(format!("{subject}.key.pem"))
    }

    fn write_pem_files(&self, record: &CertificateRecord) -> Result<()> {
        fs::write(self.cert_path(&record.subject), &record.pem_cert)?;
        write_private(&self.key_path(&record.subject), record.pem_key.as_bytes())?;
        Ok(())
    }

    fn withdraw(&self, subject: &str) {
        for path in [
            self.record_path(subject),
            self.cert_path(subject),
            self.key_path(subject),
        ] {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "cannot remove file");
                }
            }
        }
    }
}

/// Removes the wrapped path when dropped, whether or not it was published.
struct TempFile(PathBuf);

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

impl CertificateStore for DirectoryStore {
    fn name(&self) -> &str {
        "directory"
    }

    fn load(&self, subject: &str) -> Result<Option<CertificateRecord>> {
        validate_subject(subject)?;
        let path = self.record_path(subject);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CertTreeError::StorageError(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    fn save(&self, record: &CertificateRecord) -> Result<()> {
        validate_subject(&record.subject)?;
        let final_path = self.record_path(&record.subject);
        let tmp_path = TempFile(self.dir.join(format!(
            ".{}.{:016x}.tmp",
            record.subject,
            rand::random::<u64>()
        )));

        let mut tmp = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path.0)?;
        serde_json::to_writer_pretty(&mut tmp, record)?;
        tmp.sync_all()?;
        drop(tmp);

        let published = match fs::hard_link(&tmp_path.0, &final_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => match self.load(&record.subject)
            {
                Ok(Some(existing)) if existing.is_complete() => {
                    Err(CertTreeError::DuplicateSubject(record.subject.clone()))
                }
                Ok(_) => {
                    warn!(subject = %record.subject, "replacing incomplete certificate record");
                    fs::rename(&tmp_path.0, &final_path).map_err(CertTreeError::from)
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(CertTreeError::StorageError(format!(
                "cannot publish {}: {e}",
                final_path.display()
            ))),
        };
        drop(tmp_path);
        published?;

        if let Err(e) = self.write_pem_files(record) {
            self.withdraw(&record.subject);
            return Err(e);
        }
        debug!(
            subject = %record.subject,
            dir = %self.dir.display(),
            "stored certificate record"
        );
        Ok(())
    }
}
