//! use certtree::error::CertTreeError;

use thiserror::Error;

use crate::role::Role;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CertTreeError>;

/// Represents errors that can occur while issuing, storing or chaining certificates.
///
/// The first group of variants is the issuance taxonomy: each names the subject or
/// role involved so an operator can tell a configuration mistake from corrupted
/// state. The second group wraps failures of the underlying encoders and backends.
#[derive(Debug, Error, Clone)]
pub enum CertTreeError {
    /// The role name does not map to an extension profile.
    #[error("Invalid role: {0:?}")]
    InvalidRole(String),

    /// The referenced issuer has never been issued.
    #[error("Unknown issuer: {0}")]
    UnknownIssuer(String),

    /// The requested subject has no stored record.
    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    /// A non-root certificate was requested without an issuer.
    #[error("Role {role} for {subject} requires an issuer")]
    IssuerRequired { subject: String, role: Role },

    /// The issuer's role may not sign certificates of the requested role.
    #[error("Issuer {issuer} ({issuer_role}) may not issue a {role} certificate")]
    RoleNotPermitted {
        issuer: String,
        issuer_role: Role,
        role: Role,
    },

    /// The stored issuer material is inconsistent with what was issued.
    #[error("Issuer integrity error for {subject}: {reason}")]
    IssuerIntegrity { subject: String, reason: String },

    /// A chain walk reached a reference that cannot be resolved.
    #[error("Broken chain at {subject}: {reason}")]
    BrokenChain { subject: String, reason: String },

    /// The store already holds a complete record for this subject.
    #[error("Duplicate subject: {0}")]
    DuplicateSubject(String),

    /// The subject name cannot be used as a store key.
    #[error("Invalid subject name: {0:?}")]
    InvalidSubject(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),

    /// Error from the record store backend.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Error while loading a configuration or provisioning plan.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error while building or parsing a PKCS#12 bundle.
    #[error("PKCS#12 error: {0}")]
    Pkcs12Error(String),
}

/// Broad classification of a [`CertTreeError`] for callers deciding how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The request itself was wrong: fix the input and retry.
    BadInput,
    /// Something the request depends on has not been issued yet.
    MissingDependency,
    /// Stored material is corrupt or inconsistent.
    DataIntegrity,
    /// Encoder, key generation or backend failure.
    Internal,
}

impl CertTreeError {
    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRole(_)
            | Self::IssuerRequired { .. }
            | Self::RoleNotPermitted { .. }
            | Self::DuplicateSubject(_)
            | Self::InvalidSubject(_)
            | Self::ConfigError(_) => ErrorCategory::BadInput,
            Self::UnknownIssuer(_) | Self::UnknownSubject(_) => ErrorCategory::MissingDependency,
            Self::IssuerIntegrity { .. } | Self::BrokenChain { .. } | Self::DecodingError(_) => {
                ErrorCategory::DataIntegrity
            }
            Self::EncodingError(_)
            | Self::KeyGenerationError(_)
            | Self::RsaError(_)
            | Self::StorageError(_)
            | Self::Pkcs12Error(_) => ErrorCategory::Internal,
        }
    }

    pub(crate) fn integrity(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IssuerIntegrity {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn broken_chain(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BrokenChain {
            subject: subject.into(),
            reason: reason.into(),
        }
    }
}

impl From<der::Error> for CertTreeError {
    /// Converts a `der::Error` into a `CertTreeError`.
    fn from(err: der::Error) -> Self {
        CertTreeError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertTreeError {
    fn from(err: rsa::Error) -> Self {
        CertTreeError::RsaError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CertTreeError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CertTreeError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertTreeError {
    fn from(err: pkcs8::Error) -> Self {
        CertTreeError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for CertTreeError {
    fn from(err: pkcs8::spki::Error) -> Self {
        CertTreeError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for CertTreeError {
    fn from(err: pem::PemError) -> Self {
        CertTreeError::DecodingError(err.to_string())
    }
}

impl From<std::io::Error> for CertTreeError {
    fn from(err: std::io::Error) -> Self {
        CertTreeError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for CertTreeError {
    fn from(err: serde_json::Error) -> Self {
        CertTreeError::StorageError(err.to_string())
    }
}

impl From<toml::de::Error> for CertTreeError {
    fn from(err: toml::de::Error) -> Self {
        CertTreeError::ConfigError(err.to_string())
    }
}

#[cfg(feature = "pkcs12")]
impl From<openssl::error::ErrorStack> for CertTreeError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        CertTreeError::Pkcs12Error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_separate_input_dependency_and_integrity() {
        assert_eq!(
            CertTreeError::InvalidRole("intermediate".into()).category(),
            ErrorCategory::BadInput
        );
        assert_eq!(
            CertTreeError::DuplicateSubject("client1".into()).category(),
            ErrorCategory::BadInput
        );
        assert_eq!(
            CertTreeError::UnknownIssuer("ghost".into()).category(),
            ErrorCategory::MissingDependency
        );
        assert_eq!(
            CertTreeError::broken_chain("client1", "issuer subca1 missing").category(),
            ErrorCategory::DataIntegrity
        );
        assert_eq!(
            CertTreeError::StorageError("disk full".into()).category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_role_not_permitted_message_names_both_roles() {
        let err = CertTreeError::RoleNotPermitted {
            issuer: "subca2".into(),
            issuer_role: Role::SubCa,
            role: Role::SubCa,
        };
        assert_eq!(
            err.to_string(),
            "Issuer subca2 (subca) may not issue a subca certificate"
        );
    }
}
