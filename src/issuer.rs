use der::Encode;
use der::asn1::BitString;
use x509_cert::certificate::CertificateInner;

use crate::cert::params::{CertificateRequest, DistinguishedName, Validity};
use crate::cert::{Certificate, CertificateWithPrivateKey, SignatureAlgorithm};
use crate::error::{CertTreeError, Result};
use crate::key::KeyPair;
use crate::policy;
use crate::role::Role;
use crate::tbs_certificate::{TbsCertificate, random_serial_number};

/// The signing context of a new certificate.
///
/// An issuer supplies the name written into the issuer field, the key that signs,
/// and, for anything but a self-signed root, its own certificate so that the
/// policy can copy its Subject Key Identifier into the new certificate's AKI.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> Result<DistinguishedName>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Returns the issuer's own certificate; `None` when self-signing.
    fn issuer_certificate(&self) -> Option<&Certificate>;

    /// Issues a certificate based on the provided request.
    ///
    /// Builds the TBS structure with a fresh random serial, a validity window
    /// starting now, and the role's policy extensions, then signs it with
    /// SHA-256 under the issuer key.
    fn issue(&self, request: &CertificateRequest) -> Result<Certificate> {
        let signature_algorithm = SignatureAlgorithm::Sha256WithRSA;

        let extensions = policy::extensions_for(
            request.role,
            &request.subject,
            &request.subject_public_key,
            self.issuer_certificate(),
        )?;

        let tbs_cert = TbsCertificate {
            serial_number: random_serial_number(),
            signature_algorithm,
            issuer: self.issuer_name()?,
            validity: Validity::for_days(request.valid_days)?,
            subject: request.subject_name(),
            subject_public_key: request.subject_public_key.clone(),
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let tbs_der = tbs_cert_inner
            .to_der()
            .map_err(|e| CertTreeError::EncodingError(e.to_string()))?;
        let signature = self.signing_key().sign_data(&tbs_der)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algorithm.into(),
            signature: BitString::from_bytes(&signature)?,
        };

        Ok(Certificate { inner: cert_inner })
    }
}

/// Signing context of a root: its own name and freshly generated key.
pub struct SelfIssuer<'a> {
    pub name: DistinguishedName,
    pub key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<DistinguishedName> {
        Ok(self.name.clone())
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn issuer_certificate(&self) -> Option<&Certificate> {
        None
    }
}

impl Issuer for CertificateWithPrivateKey {
    fn issuer_name(&self) -> Result<DistinguishedName> {
        // The name of the issuer is the subject of the certificate
        self.cert.subject()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn issuer_certificate(&self) -> Option<&Certificate> {
        Some(&self.cert)
    }
}

/// Issues a root certificate signed by its own `key`.
pub fn self_signed(request: &CertificateRequest, key: &KeyPair) -> Result<Certificate> {
    if request.role != Role::Root {
        return Err(CertTreeError::IssuerRequired {
            subject: request.subject.clone(),
            role: request.role,
        });
    }
    let issuer = SelfIssuer {
        name: request.subject_name(),
        key,
    };
    issuer.issue(request)
}
