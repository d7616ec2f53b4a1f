//! PKCS#12 export of an issued certificate and its key.

use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::x509::X509;

use crate::error::Result;

/// Packs a certificate and its private key into a DER PKCS#12 bundle.
///
/// Both inputs are PEM text as stored in a record. The bundle carries no CA
/// certificates; chains are distributed separately.
pub fn to_pkcs12(
    cert_pem: &str,
    key_pem: &str,
    friendly_name: &str,
    password: &str,
) -> Result<Vec<u8>> {
    let cert = X509::from_pem(cert_pem.as_bytes())?;
    let key = PKey::private_key_from_pem(key_pem.as_bytes())?;

    let pkcs12 = Pkcs12::builder()
        .name(friendly_name)
        .pkey(&key)
        .cert(&cert)
        .build2(password)?;
    Ok(pkcs12.to_der()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::CertificateWithPrivateKey;
    use crate::cert::params::CertificateRequest;
    use crate::error::CertTreeError;
    use crate::issuer::self_signed;
    use crate::key::{KeyPair, PublicKey};
    use crate::role::Role;

    #[test]
    fn test_pkcs12_parses_back_with_password() {
        let key = KeyPair::generate().unwrap();
        let request = CertificateRequest::builder()
            .subject("ca")
            .role(Role::Root)
            .subject_public_key(PublicKey::from_key_pair(&key))
            .build();
        let cert = self_signed(&request, &key).unwrap();
        let issued = CertificateWithPrivateKey::new(cert, key);

        let der = to_pkcs12(
            issued.cert_pem().unwrap(),
            issued.key_pem().unwrap(),
            "ca",
            "ca",
        )
        .unwrap();

        let parsed = Pkcs12::from_der(&der).unwrap().parse2("ca").unwrap();
        let cert = parsed.cert.unwrap();
        assert_eq!(
            cert.to_der().unwrap(),
            issued.cert.to_der().unwrap()
        );
        assert!(parsed.pkey.is_some());
        assert!(Pkcs12::from_der(&der).unwrap().parse2("wrong").is_err());
    }

    #[test]
    fn test_garbage_pem_is_pkcs12_error() {
        let err = to_pkcs12("not a cert", "not a key", "x", "x").unwrap_err();
        assert!(matches!(err, CertTreeError::Pkcs12Error(_)));
    }
}
