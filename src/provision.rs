//! Runs a [`ProvisionPlan`] against a directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{BundleSpec, ProvisionPlan};
use crate::error::{CertTreeError, Result};
use crate::fingerprint::Fingerprint;
use crate::pem_utils::concat_pem;
use crate::service::IssuanceService;
use crate::store::{CertificateStore, DirectoryStore};

/// Outcome of a provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Each planned subject with the fingerprint of its certificate, in plan order.
    pub issued: Vec<(String, Fingerprint)>,
    /// Bundle files written.
    pub chain_files: Vec<PathBuf>,
}

/// Issues every identity of `plan` into a [`DirectoryStore`] at `out_dir`, then
/// writes the plan's bundles as `<name>-chain.cert.pem`.
///
/// Identities already present with the same role and issuer are kept, so a plan
/// can be re-run after adding entries.
pub fn provision(plan: &ProvisionPlan, out_dir: impl AsRef<Path>) -> Result<ProvisionReport> {
    plan.validate()?;
    let store = DirectoryStore::open(out_dir.as_ref())?;
    let service = IssuanceService::with_config(store, plan.issuance.clone());

    let mut report = ProvisionReport::default();
    for identity in &plan.identities {
        let record = service.issue(
            &identity.subject,
            identity.role()?,
            identity.issuer.as_deref(),
        )?;
        report
            .issued
            .push((record.subject, record.fingerprint.parse()?));
    }

    for bundle in &plan.bundles {
        let pem = bundle_pem(&service, bundle)?;
        let path = service
            .store()
            .dir()
            .join(format!("{}-chain.cert.pem", bundle.name));
        fs::write(&path, pem).map_err(|e| {
            CertTreeError::StorageError(format!("cannot write {}: {e}", path.display()))
        })?;
        report.chain_files.push(path);
    }

    info!(
        dir = %service.store().dir().display(),
        identities = report.issued.len(),
        bundles = report.chain_files.len(),
        "provisioning complete"
    );
    Ok(report)
}

fn bundle_pem<S: CertificateStore>(service: &IssuanceService<S>, bundle: &BundleSpec) -> Result<String> {
    if let Some(leaf) = &bundle.leaf {
        return service.chain_pem(leaf);
    }
    let certs = bundle
        .subjects
        .iter()
        .map(|subject| {
            service
                .store()
                .load(subject)?
                .map(|record| record.pem_cert)
                .ok_or_else(|| CertTreeError::UnknownSubject(subject.clone()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(concat_pem(&certs))
}
