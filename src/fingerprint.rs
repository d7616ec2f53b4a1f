use std::fmt;
use std::str::FromStr;

use sha1::{Digest, Sha1};

use crate::error::CertTreeError;

/// SHA-1 digest of a certificate's DER encoding.
///
/// Used as an external identity string (e.g. client identification); chain
/// verification relies on key identifiers, never on fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 20]);

impl Fingerprint {
    pub fn of(der: &[u8]) -> Self {
        Self(Sha1::digest(der).into())
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = CertTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 20];
        hex::decode_to_slice(s.trim(), &mut out)
            .map_err(|e| CertTreeError::DecodingError(format!("Invalid fingerprint: {e}")))?;
        Ok(Self(out))
    }
}
