pub mod extensions;
pub mod params;

use std::sync::OnceLock;

use der::{Decode, DecodePem, Encode, EncodePem};
use extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAltName,
    SubjectKeyIdentifier, ToAndFromX509Extension,
};
use params::{DistinguishedName, ExtensionParam};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;

use crate::error::{CertTreeError, Result};
use crate::fingerprint::Fingerprint;
use crate::key::{KeyPair, PublicKey};

/// Represents the supported signature algorithms for certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA signature identifiers carry an explicit NULL parameter (RFC 4055).
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(der::asn1::AnyRef::NULL.into()),
            },
        }
    }
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM formats
/// and to read back the extensions the issuance policy writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertTreeError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertTreeError::EncodingError(e.to_string()))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_der(der)?,
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_pem(pem.as_bytes())?,
        })
    }

    /// SHA-1 fingerprint of the DER encoding.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        Ok(Fingerprint::of(&self.to_der()?))
    }

    pub fn subject(&self) -> Result<DistinguishedName> {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    pub fn issuer(&self) -> Result<DistinguishedName> {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Serial number as lowercase hex.
    pub fn serial_number_hex(&self) -> String {
        hex::encode(self.inner.tbs_certificate.serial_number.as_bytes())
    }

    pub fn not_before(&self) -> OffsetDateTime {
        OffsetDateTime::from(self.inner.tbs_certificate.validity.not_before.to_system_time())
    }

    pub fn not_after(&self) -> OffsetDateTime {
        OffsetDateTime::from(self.inner.tbs_certificate.validity.not_after.to_system_time())
    }

    /// All extensions in the order they were written.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect()
    }

    /// Looks up an extension by type, returning it with its critical flag.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<(E, bool)>> {
        self.extensions()
            .into_iter()
            .find(|ext| ext.oid == E::OID)
            .map(|ext| ext.to_extension::<E>().map(|e| (e, ext.critical)))
            .transpose()
    }

    pub fn subject_key_identifier(&self) -> Result<Option<SubjectKeyIdentifier>> {
        Ok(self.extension::<SubjectKeyIdentifier>()?.map(|(e, _)| e))
    }

    pub fn authority_key_identifier(&self) -> Result<Option<AuthorityKeyIdentifier>> {
        Ok(self.extension::<AuthorityKeyIdentifier>()?.map(|(e, _)| e))
    }

    pub fn basic_constraints(&self) -> Result<Option<BasicConstraints>> {
        Ok(self.extension::<BasicConstraints>()?.map(|(e, _)| e))
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        Ok(self.extension::<KeyUsage>()?.map(|(e, _)| e))
    }

    pub fn extended_key_usage(&self) -> Result<Option<ExtendedKeyUsage>> {
        Ok(self.extension::<ExtendedKeyUsage>()?.map(|(e, _)| e))
    }

    pub fn subject_alt_name(&self) -> Result<Option<SubjectAltName>> {
        Ok(self.extension::<SubjectAltName>()?.map(|(e, _)| e))
    }

    /// Returns `true` if BasicConstraints marks this certificate as an authority.
    pub fn is_ca(&self) -> Result<bool> {
        Ok(self.basic_constraints()?.is_some_and(|bc| bc.is_ca))
    }
}

/// A certificate together with the private key it was issued for.
///
/// PEM renderings are computed on first use and cached; afterwards they are
/// snapshots of the signed object.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
    cert_pem: OnceLock<String>,
    key_pem: OnceLock<String>,
}

impl CertificateWithPrivateKey {
    pub fn new(cert: Certificate, key: KeyPair) -> Self {
        Self {
            cert,
            key,
            cert_pem: OnceLock::new(),
            key_pem: OnceLock::new(),
        }
    }

    /// Rebuilds signing material from stored PEM text.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self> {
        let cert = Certificate::from_pem(cert_pem)?;
        let key = KeyPair::from_pem(key_pem)?;
        if cert.public_key()? != key.public_key() {
            return Err(CertTreeError::DecodingError(
                "Private key does not match certificate public key".to_string(),
            ));
        }
        let bundle = Self::new(cert, key);
        let _ = bundle.cert_pem.set(cert_pem.to_string());
        let _ = bundle.key_pem.set(key_pem.to_string());
        Ok(bundle)
    }

    pub fn cert_pem(&self) -> Result<&str> {
        if let Some(pem) = self.cert_pem.get() {
            return Ok(pem);
        }
        let pem = self.cert.to_pem()?;
        Ok(self.cert_pem.get_or_init(|| pem))
    }

    pub fn key_pem(&self) -> Result<&str> {
        if let Some(pem) = self.key_pem.get() {
            return Ok(pem);
        }
        let pem = self.key.to_pem()?;
        Ok(self.key_pem.get_or_init(|| pem))
    }
}
