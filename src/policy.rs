//! Role-based X.509 extension policy.
//!
//! Each [`Role`] maps to one [`RoleProfile`]; [`extensions_for`] turns a profile
//! plus the subject key and issuer certificate into the extension list:
//!
//! | Role   | BasicConstraints          | KeyUsage (critical)                                  | ExtendedKeyUsage             |
//! |--------|---------------------------|------------------------------------------------------|------------------------------|
//! | root   | CA, unlimited (critical)  | keyCertSign, cRLSign, digitalSignature               | -                            |
//! | subca  | CA, pathLen=1 (critical)  | keyCertSign, cRLSign, digitalSignature               | -                            |
//! | server | not CA                    | digitalSignature, keyEncipherment                    | serverAuth                   |
//! | client | not CA                    | digitalSignature, contentCommitment, keyEncipherment | clientAuth, emailProtection  |
//!
//! Every certificate also carries a SAN with the subject as a DNS name, a SKI
//! derived from its own key, and an AKI: its own key id when self-signed,
//! otherwise the issuer's SKI.

use der::flagset::FlagSet;

use crate::cert::Certificate;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage,
    KeyUsages, SubjectAltName, SubjectKeyIdentifier,
};
use crate::cert::params::ExtensionParam;
use crate::error::{CertTreeError, Result};
use crate::key::PublicKey;
use crate::role::Role;

/// The extension profile of one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleProfile {
    pub basic_constraints: BasicConstraints,
    pub basic_constraints_critical: bool,
    pub key_usage: FlagSet<KeyUsages>,
    pub extended_key_usage: &'static [ExtendedKeyUsageOption],
    /// AKI comes from the subject's own key rather than an issuer's SKI.
    pub self_signed: bool,
}

/// Returns the extension profile for `role`.
pub fn profile(role: Role) -> RoleProfile {
    let authority_usage =
        KeyUsages::KeyCertSign | KeyUsages::CRLSign | KeyUsages::DigitalSignature;

    match role {
        Role::Root => RoleProfile {
            basic_constraints: BasicConstraints {
                is_ca: true,
                max_path_length: None,
            },
            basic_constraints_critical: true,
            key_usage: authority_usage,
            extended_key_usage: &[],
            self_signed: true,
        },
        Role::SubCa => RoleProfile {
            basic_constraints: BasicConstraints {
                is_ca: true,
                max_path_length: Some(1),
            },
            basic_constraints_critical: true,
            key_usage: authority_usage,
            extended_key_usage: &[],
            self_signed: false,
        },
        Role::Server => RoleProfile {
            basic_constraints: BasicConstraints::default(),
            basic_constraints_critical: false,
            key_usage: KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment,
            extended_key_usage: &[ExtendedKeyUsageOption::ServerAuth],
            self_signed: false,
        },
        Role::Client => RoleProfile {
            basic_constraints: BasicConstraints::default(),
            basic_constraints_critical: false,
            key_usage: KeyUsages::DigitalSignature
                | KeyUsages::NonRepudiation
                | KeyUsages::KeyEncipherment,
            extended_key_usage: &[
                ExtendedKeyUsageOption::ClientAuth,
                ExtendedKeyUsageOption::EmailProtection,
            ],
            self_signed: false,
        },
    }
}

/// Builds the ordered extension list for a new certificate.
///
/// `subject` is the name placed in the SAN. `issuer` is the issuing
/// certificate and must be present for every role except `root`, whose AKI is
/// taken from its own key.
pub fn extensions_for(
    role: Role,
    subject: &str,
    subject_public_key: &PublicKey,
    issuer: Option<&Certificate>,
) -> Result<Vec<ExtensionParam>> {
    let profile = profile(role);
    let spki = subject_public_key.to_spki()?;

    let authority_key_id = if profile.self_signed {
        AuthorityKeyIdentifier::from_issuer_spki(&spki)
    } else {
        let issuer = issuer.ok_or_else(|| {
            CertTreeError::integrity(
                subject,
                format!("a {role} certificate needs an issuer certificate"),
            )
        })?;
        let issuer_ski = issuer.subject_key_identifier()?.ok_or_else(|| {
            let issuer_name = issuer
                .subject()
                .map(|dn| dn.common_name)
                .unwrap_or_default();
            CertTreeError::integrity(
                issuer_name,
                "issuer certificate has no subject key identifier",
            )
        })?;
        AuthorityKeyIdentifier::from_issuer_ski(&issuer_ski)
    };

    let mut extensions = vec![
        ExtensionParam::from_extension(
            SubjectAltName {
                names: vec![subject.to_string()],
            },
            false,
        )?,
        ExtensionParam::from_extension(SubjectKeyIdentifier::from_spki(&spki), false)?,
        ExtensionParam::from_extension(authority_key_id, false)?,
        ExtensionParam::from_extension(
            profile.basic_constraints,
            profile.basic_constraints_critical,
        )?,
        ExtensionParam::from_extension(KeyUsage(profile.key_usage), true)?,
    ];

    if !profile.extended_key_usage.is_empty() {
        extensions.push(ExtensionParam::from_extension(
            ExtendedKeyUsage {
                usage: profile.extended_key_usage.to_vec(),
            },
            false,
        )?);
    }

    Ok(extensions)
}
