use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::cert::CertificateWithPrivateKey;
use crate::error::{CertTreeError, Result};
use crate::role::Role;

/// One issued certificate as persisted in the record store.
///
/// Records are written once at issuance and never mutated. `issuer_subject`
/// of a root names the root itself, so a chain walk ends where a record
/// references its own subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub subject: String,
    pub role: Role,
    pub issuer_subject: String,
    /// Lowercase hex of the serial number.
    pub serial_number: String,
    #[serde(with = "time::serde::rfc3339")]
    pub not_before: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub not_after: OffsetDateTime,
    /// Lowercase hex SHA-1 of the DER encoding.
    pub fingerprint: String,
    pub pem_cert: String,
    pub pem_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl CertificateRecord {
    /// Captures a freshly signed certificate and its key as a record.
    pub fn from_issued(
        role: Role,
        issuer_subject: &str,
        issued: &CertificateWithPrivateKey,
    ) -> Result<Self> {
        let cert = &issued.cert;
        Ok(Self {
            subject: cert.subject()?.common_name,
            role,
            issuer_subject: issuer_subject.to_string(),
            serial_number: cert.serial_number_hex(),
            not_before: cert.not_before(),
            not_after: cert.not_after(),
            fingerprint: cert.fingerprint()?.to_hex(),
            pem_cert: issued.cert_pem()?.to_string(),
            pem_key: issued.key_pem()?.to_string(),
            created_at: OffsetDateTime::now_utc(),
        })
    }

    pub fn is_root(&self) -> bool {
        self.issuer_subject == self.subject
    }

    /// Returns `true` when both the certificate and the key are present.
    pub fn is_complete(&self) -> bool {
        !self.pem_cert.trim().is_empty() && !self.pem_key.trim().is_empty()
    }

    /// Reloads the signing material held by this record.
    pub fn to_certificate_with_key(&self) -> Result<CertificateWithPrivateKey> {
        if !self.is_complete() {
            return Err(CertTreeError::integrity(
                &self.subject,
                "record has no certificate or key",
            ));
        }
        CertificateWithPrivateKey::from_pem(&self.pem_cert, &self.pem_key)
            .map_err(|e| CertTreeError::integrity(&self.subject, e.to_string()))
    }
}
