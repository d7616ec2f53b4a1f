use std::fmt;

use tracing::{debug, info, warn};

use crate::cert::params::CertificateRequest;
use crate::cert::{Certificate, CertificateWithPrivateKey};
use crate::chain;
use crate::config::IssuanceConfig;
use crate::error::{CertTreeError, Result};
use crate::issuer::{Issuer, self_signed};
use crate::key::{KeyPair, PublicKey};
use crate::record::CertificateRecord;
use crate::role::Role;
use crate::store::{CertificateStore, validate_subject};

/// Progress of a single issuance request, reported in tracing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceStage {
    ResolvingIssuer,
    GeneratingKeys,
    BuildingCert,
    Serializing,
    Persisting,
    Done,
    Failed,
}

impl IssuanceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuanceStage::ResolvingIssuer => "resolving-issuer",
            IssuanceStage::GeneratingKeys => "generating-keys",
            IssuanceStage::BuildingCert => "building-cert",
            IssuanceStage::Serializing => "serializing",
            IssuanceStage::Persisting => "persisting",
            IssuanceStage::Done => "done",
            IssuanceStage::Failed => "failed",
        }
    }
}

impl fmt::Display for IssuanceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issues certificates into a record store.
///
/// The service keeps no chain in memory: every request reloads the issuer's
/// certificate and key from the store and signs with that. It holds no mutable
/// state, so one instance may serve concurrent requests; the store's atomic
/// `save` decides races on the same subject.
#[derive(Debug, Clone)]
pub struct IssuanceService<S> {
    store: S,
    config: IssuanceConfig,
}

impl<S: CertificateStore> IssuanceService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, IssuanceConfig::default())
    }

    pub fn with_config(store: S, config: IssuanceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &IssuanceConfig {
        &self.config
    }

    /// Issues a certificate for `subject` in `role`, signed by `issuer_subject`.
    ///
    /// Only a root may omit the issuer. Re-issuing a subject that already has a
    /// complete record with the same role and issuer returns the stored record
    /// unchanged. On success exactly one record is written; on failure none.
    pub fn issue(
        &self,
        subject: &str,
        role: Role,
        issuer_subject: Option<&str>,
    ) -> Result<CertificateRecord> {
        let mut stage = IssuanceStage::ResolvingIssuer;
        match self.run_issue(subject, role, issuer_subject, &mut stage) {
            Ok(record) => {
                debug!(subject, stage = %IssuanceStage::Done, "issuance finished");
                Ok(record)
            }
            Err(err) => {
                warn!(
                    subject,
                    %role,
                    issuer = issuer_subject.unwrap_or(subject),
                    stage = %IssuanceStage::Failed,
                    failed_at = %stage,
                    error = %err,
                    "issuance failed"
                );
                Err(err)
            }
        }
    }

    fn run_issue(
        &self,
        subject: &str,
        role: Role,
        issuer_subject: Option<&str>,
        stage: &mut IssuanceStage,
    ) -> Result<CertificateRecord> {
        validate_subject(subject)?;
        debug!(subject, %role, stage = %stage, "resolving issuer");

        let issuer = match issuer_subject {
            None if role == Role::Root => None,
            None => {
                return Err(CertTreeError::IssuerRequired {
                    subject: subject.to_string(),
                    role,
                });
            }
            Some(issuer_subject) => Some(self.resolve_issuer(issuer_subject, role)?),
        };
        let expected_issuer = issuer_subject.unwrap_or(subject);

        if let Some(existing) = self.store.load(subject)? {
            if existing.is_complete() {
                if existing.role == role && existing.issuer_subject == expected_issuer {
                    debug!(subject, fingerprint = %existing.fingerprint, "returning stored certificate");
                    return Ok(existing);
                }
                return Err(CertTreeError::DuplicateSubject(subject.to_string()));
            }
            warn!(subject, "stored record is incomplete; issuing a replacement");
        }

        advance(stage, IssuanceStage::GeneratingKeys, subject);
        let key = KeyPair::generate()?;

        advance(stage, IssuanceStage::BuildingCert, subject);
        let request = CertificateRequest::builder()
            .subject(subject)
            .maybe_organization(self.config.organization.clone())
            .role(role)
            .subject_public_key(PublicKey::from_key_pair(&key))
            .valid_days(self.config.valid_days)
            .build();
        let cert = match &issuer {
            None => self_signed(&request, &key)?,
            Some(issuer) => issuer.issue(&request)?,
        };

        advance(stage, IssuanceStage::Serializing, subject);
        let issued = CertificateWithPrivateKey::new(cert, key);
        let record = CertificateRecord::from_issued(role, expected_issuer, &issued)?;

        advance(stage, IssuanceStage::Persisting, subject);
        self.store.save(&record)?;

        *stage = IssuanceStage::Done;
        info!(
            subject,
            %role,
            issuer = expected_issuer,
            fingerprint = %record.fingerprint,
            store = self.store.name(),
            "issued certificate"
        );
        Ok(record)
    }

    /// Loads the issuer's signing material and checks it may sign `role`.
    fn resolve_issuer(&self, issuer_subject: &str, role: Role) -> Result<CertificateWithPrivateKey> {
        validate_subject(issuer_subject)?;
        let record = self
            .store
            .load(issuer_subject)?
            .ok_or_else(|| CertTreeError::UnknownIssuer(issuer_subject.to_string()))?;

        let issuer = record.to_certificate_with_key()?;

        if !record.role.may_issue(role) {
            return Err(CertTreeError::RoleNotPermitted {
                issuer: issuer_subject.to_string(),
                issuer_role: record.role,
                role,
            });
        }
        if !issuer.cert.is_ca()? {
            return Err(CertTreeError::integrity(
                issuer_subject,
                "issuer certificate is not a CA",
            ));
        }
        Ok(issuer)
    }

    /// Returns the stored certificate of `subject`.
    pub fn load_certificate(&self, subject: &str) -> Result<Certificate> {
        let record = self
            .store
            .load(subject)?
            .ok_or_else(|| CertTreeError::UnknownSubject(subject.to_string()))?;
        Certificate::from_pem(&record.pem_cert)
            .map_err(|e| CertTreeError::integrity(subject, e.to_string()))
    }

    /// Issuer certificates of `leaf_subject`, nearest first.
    pub fn assemble_chain(&self, leaf_subject: &str) -> Result<Vec<String>> {
        chain::assemble_chain(&self.store, leaf_subject)
    }

    /// The chain of `leaf_subject` as one PEM bundle.
    pub fn chain_pem(&self, leaf_subject: &str) -> Result<String> {
        chain::chain_pem(&self.store, leaf_subject)
    }

    /// Exports `subject`'s certificate and key as PKCS#12.
    ///
    /// The friendly name is the subject; the password defaults to the subject
    /// as well.
    #[cfg(feature = "pkcs12")]
    pub fn export_pkcs12(&self, subject: &str, password: Option<&str>) -> Result<Vec<u8>> {
        let record = self
            .store
            .load(subject)?
            .ok_or_else(|| CertTreeError::UnknownSubject(subject.to_string()))?;
        if !record.is_complete() {
            return Err(CertTreeError::integrity(
                subject,
                "record has no certificate or key",
            ));
        }
        let der = crate::pkcs12::to_pkcs12(
            &record.pem_cert,
            &record.pem_key,
            subject,
            password.unwrap_or(subject),
        )?;
        debug!(subject, bytes = der.len(), "exported pkcs12 bundle");
        Ok(der)
    }
}

fn advance(stage: &mut IssuanceStage, next: IssuanceStage, subject: &str) {
    *stage = next;
    debug!(subject, stage = %next, "issuance stage");
}
