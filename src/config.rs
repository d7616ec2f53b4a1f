//! Issuance settings and provisioning plans.
//!
//! A provisioning plan is a TOML file listing the identities to issue, in
//! order, and the trust-chain bundles to write afterwards:
//!
//! ```toml
//! [issuance]
//! valid_days = 360
//!
//! [[identity]]
//! subject = "ca"
//! role = "root"
//!
//! [[identity]]
//! subject = "subca1"
//! role = "subca"
//! issuer = "ca"
//!
//! [[identity]]
//! subject = "client1"
//! role = "client"
//! issuer = "subca1"
//!
//! [[bundle]]
//! name = "client1"
//! leaf = "client1"
//!
//! [[bundle]]
//! name = "ca"
//! subjects = ["subca1", "ca"]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cert::params::{DEFAULT_VALID_DAYS, MAX_VALID_DAYS};
use crate::error::{CertTreeError, Result};
use crate::role::Role;
use crate::store::validate_subject;

/// Environment variable overriding [`IssuanceConfig::valid_days`].
pub const ENV_VALID_DAYS: &str = "CERTTREE_VALID_DAYS";
/// Environment variable overriding [`IssuanceConfig::organization`].
pub const ENV_ORGANIZATION: &str = "CERTTREE_ORGANIZATION";

/// Settings applied to every certificate an issuance service signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IssuanceConfig {
    /// Validity window length in days, between 1 and [`MAX_VALID_DAYS`].
    pub valid_days: u32,
    /// Organization (O) added to subject names; omitted when `None`.
    pub organization: Option<String>,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            valid_days: DEFAULT_VALID_DAYS,
            organization: None,
        }
    }
}

impl IssuanceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.valid_days == 0 {
            return Err(CertTreeError::ConfigError(
                "valid_days must be at least 1".to_string(),
            ));
        }
        if self.valid_days > MAX_VALID_DAYS {
            return Err(CertTreeError::ConfigError(format!(
                "valid_days must be at most {MAX_VALID_DAYS}, got {}",
                self.valid_days
            )));
        }
        Ok(())
    }

    /// Applies `CERTTREE_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(days) = lookup(ENV_VALID_DAYS) {
            self.valid_days = days.trim().parse().map_err(|e| {
                CertTreeError::ConfigError(format!("{ENV_VALID_DAYS}={days:?}: {e}"))
            })?;
            debug!(valid_days = self.valid_days, "validity overridden from environment");
        }
        if let Some(org) = lookup(ENV_ORGANIZATION) {
            self.organization = Some(org).filter(|o| !o.is_empty());
        }
        self.validate()?;
        Ok(self)
    }
}

/// One identity to issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentitySpec {
    pub subject: String,
    /// Role name; parsed when the plan is validated.
    pub role: String,
    /// Issuer subject; absent for the root.
    #[serde(default)]
    pub issuer: Option<String>,
}

impl IdentitySpec {
    pub fn role(&self) -> Result<Role> {
        self.role.parse()
    }
}

/// A PEM bundle to write as `<name>-chain.cert.pem`.
///
/// With `leaf` set the bundle is that subject's trust chain, nearest issuer
/// first. Otherwise it concatenates the certificates of `subjects` in the
/// listed order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleSpec {
    pub name: String,
    #[serde(default)]
    pub leaf: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl BundleSpec {
    pub fn validate(&self) -> Result<()> {
        validate_subject(&self.name)?;
        match (&self.leaf, self.subjects.is_empty()) {
            (Some(leaf), true) => validate_subject(leaf),
            (None, false) => self.subjects.iter().try_for_each(|s| validate_subject(s)),
            _ => Err(CertTreeError::ConfigError(format!(
                "bundle {} needs exactly one of `leaf` or `subjects`",
                self.name
            ))),
        }
    }
}

/// An ordered provisioning plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionPlan {
    #[serde(default)]
    pub issuance: IssuanceConfig,
    #[serde(default, rename = "identity")]
    pub identities: Vec<IdentitySpec>,
    #[serde(default, rename = "bundle")]
    pub bundles: Vec<BundleSpec>,
}

impl ProvisionPlan {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let plan: ProvisionPlan = toml::from_str(s)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            CertTreeError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks roles, subject names and plan-internal duplicates.
    ///
    /// Issuers are not required to appear earlier in the plan: they may already
    /// exist in the target store from a previous run.
    pub fn validate(&self) -> Result<()> {
        self.issuance.validate()?;

        let mut seen = HashSet::new();
        for identity in &self.identities {
            validate_subject(&identity.subject)?;
            let role = identity.role()?;
            if !seen.insert(identity.subject.as_str()) {
                return Err(CertTreeError::ConfigError(format!(
                    "identity {} is listed twice",
                    identity.subject
                )));
            }
            match (&identity.issuer, role) {
                (None, Role::Root) => {}
                (None, role) => {
                    return Err(CertTreeError::IssuerRequired {
                        subject: identity.subject.clone(),
                        role,
                    });
                }
                (Some(issuer), _) => validate_subject(issuer)?,
            }
        }

        self.bundles.iter().try_for_each(BundleSpec::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
[[identity]]
subject = "ca"
role = "root"

[[identity]]
subject = "subca1"
role = "subca"
issuer = "ca"

[[identity]]
subject = "client1"
role = "client"
issuer = "subca1"

[[bundle]]
name = "ca"
leaf = "client1"
"#;

    #[test]
    fn test_plan_parses_with_default_issuance() {
        let plan = ProvisionPlan::from_toml_str(PLAN).unwrap();
        assert_eq!(plan.issuance, IssuanceConfig::default());
        assert_eq!(plan.issuance.valid_days, 360);
        assert_eq!(plan.identities.len(), 3);
        assert_eq!(plan.identities[2].role().unwrap(), Role::Client);
        assert_eq!(plan.identities[2].issuer.as_deref(), Some("subca1"));
        assert_eq!(
            plan.bundles,
            vec![BundleSpec {
                name: "ca".into(),
                leaf: Some("client1".into()),
                subjects: vec![],
            }]
        );
    }

    #[test]
    fn test_bundle_needs_leaf_or_subjects() {
        let both = "[[bundle]]\nname = \"b\"\nleaf = \"x\"\nsubjects = [\"y\"]\n";
        let neither = "[[bundle]]\nname = \"b\"\n";
        for text in [both, neither] {
            assert!(matches!(
                ProvisionPlan::from_toml_str(text),
                Err(CertTreeError::ConfigError(_))
            ));
        }
        let listed = "[[bundle]]\nname = \"ca\"\nsubjects = [\"subca1\", \"ca\"]\n";
        let plan = ProvisionPlan::from_toml_str(listed).unwrap();
        assert_eq!(plan.bundles[0].subjects, vec!["subca1", "ca"]);
    }

    #[test]
    fn test_plan_with_unknown_role_is_invalid_role() {
        let err = ProvisionPlan::from_toml_str(
            "[[identity]]\nsubject = \"x\"\nrole = \"intermediate\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, CertTreeError::InvalidRole(_)));
    }

    #[test]
    fn test_plan_rejects_leaf_without_issuer() {
        let err =
            ProvisionPlan::from_toml_str("[[identity]]\nsubject = \"x\"\nrole = \"server\"\n")
                .unwrap_err();
        assert!(matches!(err, CertTreeError::IssuerRequired { .. }));
    }

    #[test]
    fn test_plan_rejects_duplicate_identities() {
        let text = "[[identity]]\nsubject = \"ca\"\nrole = \"root\"\n\
                    [[identity]]\nsubject = \"ca\"\nrole = \"root\"\n";
        assert!(matches!(
            ProvisionPlan::from_toml_str(text),
            Err(CertTreeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_unknown_keys_are_config_errors() {
        assert!(matches!(
            ProvisionPlan::from_toml_str("[issuance]\nvalid_dayz = 10\n"),
            Err(CertTreeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = IssuanceConfig::default()
            .with_overrides(|key| match key {
                ENV_VALID_DAYS => Some("30".to_string()),
                ENV_ORGANIZATION => Some("Example Corp".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.valid_days, 30);
        assert_eq!(config.organization.as_deref(), Some("Example Corp"));

        let err = IssuanceConfig::default()
            .with_overrides(|key| (key == ENV_VALID_DAYS).then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, CertTreeError::ConfigError(_)));
    }

    #[test]
    fn test_validity_upper_bound() {
        let err = IssuanceConfig::default()
            .with_overrides(|key| (key == ENV_VALID_DAYS).then(|| "4000000".to_string()))
            .unwrap_err();
        assert!(matches!(err, CertTreeError::ConfigError(_)));

        let at_limit = IssuanceConfig {
            valid_days: MAX_VALID_DAYS,
            organization: None,
        };
        assert!(at_limit.validate().is_ok());

        assert!(matches!(
            ProvisionPlan::from_toml_str("[issuance]\nvalid_days = 36501\n"),
            Err(CertTreeError::ConfigError(_))
        ));
    }
}
