use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CertTreeError;

/// The position a certificate occupies in the hierarchy.
///
/// The role selects the extension profile at issuance time and never changes
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Self-signed trust anchor.
    Root,
    /// Intermediate authority signed by the root.
    #[serde(rename = "subca")]
    SubCa,
    /// TLS server leaf.
    Server,
    /// TLS client / e-mail leaf.
    Client,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Root, Role::SubCa, Role::Server, Role::Client];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::SubCa => "subca",
            Self::Server => "server",
            Self::Client => "client",
        }
    }

    /// Returns `true` for the authority roles.
    pub fn is_ca(&self) -> bool {
        matches!(self, Self::Root | Self::SubCa)
    }

    /// Returns `true` if a certificate of this role may sign a certificate of `child` role.
    ///
    /// Sub-CAs carry `pathLen=1` but only ever sign leaves; a second tier of
    /// intermediates is rejected here rather than left to path validation.
    pub fn may_issue(&self, child: Role) -> bool {
        match self {
            Self::Root => matches!(child, Self::SubCa | Self::Server | Self::Client),
            Self::SubCa => matches!(child, Self::Server | Self::Client),
            Self::Server | Self::Client => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CertTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Self::Root),
            "subca" => Ok(Self::SubCa),
            "server" => Ok(Self::Server),
            "client" => Ok(Self::Client),
            other => Err(CertTreeError::InvalidRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_display() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_is_invalid() {
        let err = "intermediate".parse::<Role>().unwrap_err();
        assert!(matches!(err, CertTreeError::InvalidRole(ref r) if r == "intermediate"));
        assert!("Root".parse::<Role>().is_err());
    }

    #[test]
    fn test_issuance_matrix() {
        assert!(Role::Root.may_issue(Role::SubCa));
        assert!(Role::Root.may_issue(Role::Server));
        assert!(Role::Root.may_issue(Role::Client));
        assert!(!Role::Root.may_issue(Role::Root));

        assert!(Role::SubCa.may_issue(Role::Server));
        assert!(Role::SubCa.may_issue(Role::Client));
        assert!(!Role::SubCa.may_issue(Role::SubCa));

        for child in Role::ALL {
            assert!(!Role::Server.may_issue(child));
            assert!(!Role::Client.may_issue(child));
        }
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::SubCa).unwrap(), "\"subca\"");
        let role: Role = serde_json::from_str("\"client\"").unwrap();
        assert_eq!(role, Role::Client);
    }
}
