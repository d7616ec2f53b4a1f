use std::collections::HashSet;

use tracing::debug;

use crate::cert::Certificate;
use crate::error::{CertTreeError, Result};
use crate::pem_utils::concat_pem;
use crate::record::CertificateRecord;
use crate::store::CertificateStore;

/// Collects the trust chain of `leaf_subject`: its issuers' certificates,
/// nearest first, ending with the root. The leaf itself is not included, so a
/// root yields an empty chain.
///
/// Missing issuers and reference cycles are reported before key identifiers
/// are compared; then each link checks that the child's Authority Key
/// Identifier matches the issuer's Subject Key Identifier.
pub fn assemble_chain<S>(store: &S, leaf_subject: &str) -> Result<Vec<String>>
where
    S: CertificateStore + ?Sized,
{
    let leaf = store
        .load(leaf_subject)?
        .ok_or_else(|| CertTreeError::UnknownSubject(leaf_subject.to_string()))?;

    let mut issuers = Vec::new();
    let mut visited = HashSet::from([leaf.subject.clone()]);
    let mut current = &leaf;

    while !current.is_root() {
        let issuer_subject = &current.issuer_subject;
        if !visited.insert(issuer_subject.clone()) {
            return Err(CertTreeError::broken_chain(
                &current.subject,
                format!("issuer reference cycle through {issuer_subject}"),
            ));
        }

        let issuer = store.load(issuer_subject)?.ok_or_else(|| {
            CertTreeError::broken_chain(
                &current.subject,
                format!("issuer {issuer_subject} is missing from the store"),
            )
        })?;
        issuers.push(issuer);
        current = issuers.last().unwrap_or(&leaf);
    }

    let mut child = &leaf;
    for issuer in &issuers {
        check_link(child, issuer)?;
        child = issuer;
    }

    debug!(leaf = %leaf_subject, length = issuers.len(), "assembled trust chain");
    Ok(issuers.into_iter().map(|issuer| issuer.pem_cert).collect())
}

/// Concatenated PEM bundle of [`assemble_chain`].
pub fn chain_pem<S>(store: &S, leaf_subject: &str) -> Result<String>
where
    S: CertificateStore + ?Sized,
{
    Ok(concat_pem(&assemble_chain(store, leaf_subject)?))
}

fn check_link(child: &CertificateRecord, issuer: &CertificateRecord) -> Result<()> {
    let child_cert = Certificate::from_pem(&child.pem_cert)
        .map_err(|e| CertTreeError::integrity(&child.subject, e.to_string()))?;
    let issuer_cert = Certificate::from_pem(&issuer.pem_cert)
        .map_err(|e| CertTreeError::integrity(&issuer.subject, e.to_string()))?;

    let aki = child_cert.authority_key_identifier()?.ok_or_else(|| {
        CertTreeError::integrity(&child.subject, "certificate has no authority key identifier")
    })?;
    let ski = issuer_cert.subject_key_identifier()?.ok_or_else(|| {
        CertTreeError::integrity(&issuer.subject, "certificate has no subject key identifier")
    })?;

    if aki.key_identifier != ski.0 {
        return Err(CertTreeError::integrity(
            &child.subject,
            format!(
                "authority key identifier does not match {}'s subject key identifier",
                issuer.subject
            ),
        ));
    }
    Ok(())
}
