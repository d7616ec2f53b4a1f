use der::Encode;
use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{DistinguishedName, ExtensionParam, Validity};
use crate::error::{CertTreeError, Result};
use crate::key::PublicKey;

/// Length in bytes of generated serial numbers.
pub const SERIAL_NUMBER_LEN: usize = 20;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - X.509 v3 extensions, in emission order.
pub struct TbsCertificate {
    pub serial_number: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: DistinguishedName,
    pub validity: Validity,
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

/// Draws a fresh positive serial number of up to 159 bits.
pub fn random_serial_number() -> Vec<u8> {
    let mut serial: [u8; SERIAL_NUMBER_LEN] = rand::random();
    // Positive and minimally encoded: no sign bit, no leading zero octet.
    serial[0] &= 0x7f;
    if serial[0] == 0 {
        serial[0] = 1;
    }
    serial.to_vec()
}

/// Encodes a validity bound: UTCTime through 2049, GeneralizedTime from 2050 on.
fn x509_time(t: OffsetDateTime) -> Result<Time> {
    let encoded = if t.year() < 2050 {
        UtcTime::from_system_time(t.into()).map(Time::UtcTime)
    } else {
        GeneralizedTime::from_system_time(t.into()).map(Time::GeneralTime)
    };
    encoded.map_err(|e| CertTreeError::EncodingError(format!("Invalid validity bound {t}: {e}")))
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let algorithm_id: x509_cert::spki::AlgorithmIdentifierOwned =
            self.signature_algorithm.into();

        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: x509_time(self.validity.not_before)?,
            not_after: x509_time(self.validity.not_after)?,
        };

        let serial_number = SerialNumber::new(self.serial_number.as_slice())
            .map_err(|e| CertTreeError::EncodingError(format!("Invalid serial number: {e}")))?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: algorithm_id,
            issuer: self.issuer.as_x509_name()?,
            validity,
            subject: self.subject.as_x509_name()?,
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: if self.extensions.is_empty() {
                None
            } else {
                Some(extensions)
            },
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_tbs_certificate_inner()?
            .to_der()
            .map_err(|e| CertTreeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_numbers_are_positive_and_distinct() {
        let a = random_serial_number();
        let b = random_serial_number();
        assert_eq!(a.len(), SERIAL_NUMBER_LEN);
        assert!(a[0] > 0 && a[0] < 0x80);
        assert_ne!(a, b);
        assert!(SerialNumber::<x509_cert::certificate::Rfc5280>::new(&a).is_ok());
    }

    #[test]
    fn test_validity_bounds_switch_to_generalized_time_in_2050() {
        // 2050-01-01T00:00:00Z
        let y2050 = OffsetDateTime::from_unix_timestamp(2_524_608_000).unwrap();

        let last_utc = x509_time(y2050 - time::Duration::seconds(1)).unwrap();
        assert!(matches!(last_utc, Time::UtcTime(_)));

        let first_generalized = x509_time(y2050).unwrap();
        assert!(matches!(first_generalized, Time::GeneralTime(_)));
        assert_eq!(
            first_generalized.to_system_time(),
            std::time::SystemTime::from(y2050)
        );
    }
}
