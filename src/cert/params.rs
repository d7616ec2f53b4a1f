use bon::Builder;
use const_oid::ObjectIdentifier;
use der::{Tag, Tagged};
use der::asn1::{Any, SetOfVec};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::CertTreeError;
use crate::key::PublicKey;
use crate::role::Role;

/// Default validity period of an issued certificate, in days.
pub const DEFAULT_VALID_DAYS: u32 = 360;

/// Longest accepted validity period, in days.
pub const MAX_VALID_DAYS: u32 = 36_500;

/// Parameters for building an X.509 certificate.
///
/// # Fields
/// * `subject` - The subject name; becomes the CN and the SAN DNS name.
/// * `organization` - Optional organization (O) attribute.
/// * `role` - Selects the extension profile.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `valid_days` - Length of the validity window starting now.
#[derive(Clone, Debug, Builder)]
pub struct CertificateRequest {
    #[builder(into)]
    pub subject: String,
    #[builder(into)]
    pub organization: Option<String>,
    pub role: Role,
    pub subject_public_key: PublicKey,
    #[builder(default = DEFAULT_VALID_DAYS)]
    pub valid_days: u32,
}

impl CertificateRequest {
    /// Distinguished name of the requested subject.
    pub fn subject_name(&self) -> DistinguishedName {
        DistinguishedName {
            common_name: self.subject.clone(),
            organization: self.organization.clone(),
        }
    }
}

/// Distinguished name of a certificate subject or issuer.
///
/// Only the common name is required; the organization is emitted only when
/// explicitly supplied.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: String,
    #[builder(into)]
    pub organization: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 name, one attribute per RDN.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName, CertTreeError> {
        let mut rdns = vec![rdn(const_oid::db::rfc4519::CN, &self.common_name)?];
        if let Some(org) = &self.organization {
            rdns.push(rdn(const_oid::db::rfc4519::O, org)?);
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 name, keeping CN and O.
    pub fn from_x509_name(
        x509dn: &x509_cert::name::DistinguishedName,
    ) -> Result<Self, CertTreeError> {
        let mut name = DistinguishedName::default();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                if attr.oid == const_oid::db::rfc4519::CN {
                    name.common_name = decode_directory_string(&attr.value)?;
                } else if attr.oid == const_oid::db::rfc4519::O {
                    name.organization = Some(decode_directory_string(&attr.value)?);
                }
            }
        }

        Ok(name)
    }
}

fn rdn(oid: ObjectIdentifier, value: &str) -> Result<RelativeDistinguishedName, CertTreeError> {
    let atv = AttributeTypeAndValue {
        oid,
        value: Any::new(Tag::Utf8String, value.as_bytes())?,
    };
    Ok(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?))
}

fn decode_directory_string(value: &Any) -> Result<String, CertTreeError> {
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String => {
            String::from_utf8(value.value().to_vec())
                .map_err(|e| CertTreeError::DecodingError(e.to_string()))
        }
        other => Err(CertTreeError::DecodingError(format!(
            "Unsupported directory string tag {other}"
        ))),
    }
}

/// Certificate validity period.
#[derive(Clone, Debug)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    ///
    /// Both bounds are truncated to whole seconds, the resolution of UTCTime.
    /// Fails with [`CertTreeError::ConfigError`] if the end date is not
    /// representable.
    pub fn for_days(days: u32) -> Result<Self, CertTreeError> {
        let now = OffsetDateTime::now_utc();
        let now = now.replace_nanosecond(0).unwrap_or(now);
        let not_after = now
            .checked_add(Duration::days(i64::from(days)))
            .ok_or_else(|| {
                CertTreeError::ConfigError(format!("validity of {days} days is out of range"))
            })?;
        Ok(Self {
            not_before: now,
            not_after,
        })
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: E,
        critical: bool,
    ) -> Result<Self, CertTreeError> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E, CertTreeError> {
        E::from_x509_extension_value(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_without_organization_has_single_rdn() {
        let dn = DistinguishedName::builder().common_name("subca1").build();
        let x509 = dn.as_x509_name().unwrap();
        assert_eq!(x509.0.len(), 1);
        assert_eq!(x509.to_string(), "CN=subca1");
        assert_eq!(DistinguishedName::from_x509_name(&x509).unwrap(), dn);
    }

    #[test]
    fn test_name_with_organization_round_trips() {
        let dn = DistinguishedName::builder()
            .common_name("server.example.org")
            .organization("Example, Inc.")
            .build();
        let x509 = dn.as_x509_name().unwrap();
        assert_eq!(x509.0.len(), 2);
        assert_eq!(DistinguishedName::from_x509_name(&x509).unwrap(), dn);
    }

    #[test]
    fn test_validity_window_is_whole_days() {
        let validity = Validity::for_days(DEFAULT_VALID_DAYS).unwrap();
        assert_eq!(validity.not_before.nanosecond(), 0);
        assert_eq!(
            validity.not_after - validity.not_before,
            Duration::days(360)
        );
    }

    #[test]
    fn test_validity_past_calendar_end_is_config_error() {
        assert!(matches!(
            Validity::for_days(u32::MAX),
            Err(CertTreeError::ConfigError(_))
        ));
        assert!(Validity::for_days(MAX_VALID_DAYS).is_ok());
    }
}
