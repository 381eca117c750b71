//! Policy capabilities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ProviderError, Result};

/// A capability a policy rule may grant on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Create,
    Read,
    Update,
    Delete,
    List,
    Sudo,
    Deny,
}

impl Capability {
    /// The complete allow-set, in documentation order.
    pub const ALL: [Capability; 7] = [
        Capability::Create,
        Capability::Read,
        Capability::Update,
        Capability::Delete,
        Capability::List,
        Capability::Sudo,
        Capability::Deny,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::Read => "read",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::List => "list",
            Capability::Sudo => "sudo",
            Capability::Deny => "deny",
        }
    }

    fn allowed_values() -> String {
        Self::ALL.iter().map(Capability::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ProviderError;

    /// Exact, case-sensitive match against the allow-set.
    fn from_str(value: &str) -> Result<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == value).ok_or_else(|| {
            ProviderError::validation(format!(
                "invalid capability {:?}, expected one of: {}",
                value,
                Self::allowed_values()
            ))
        })
    }
}

/// Validate a single capability value, naming `field` in the error.
pub fn validate_capability(value: &str, field: &str) -> Result<Capability> {
    value.parse::<Capability>().map_err(|_| {
        ProviderError::validation_field(
            format!(
                "invalid capability {:?}, expected one of: {}",
                value,
                Capability::allowed_values()
            ),
            field,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_capabilities_parse() {
        for capability in Capability::ALL {
            assert_eq!(capability.as_str().parse::<Capability>().unwrap(), capability);
        }
    }

    #[test]
    fn test_parse_is_exact() {
        assert!("Read".parse::<Capability>().is_err());
        assert!(" read".parse::<Capability>().is_err());
        assert!("write".parse::<Capability>().is_err());
        assert!("".parse::<Capability>().is_err());
    }

    #[test]
    fn test_validate_capability_names_value_and_field() {
        let err = validate_capability("write", "rule.2.capabilities").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("invalid capability \"write\""));
        assert!(message.contains("rule.2.capabilities"));
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Capability::Sudo).unwrap();
        assert_eq!(json, "\"sudo\"");
        let parsed: Capability = serde_json::from_str("\"deny\"").unwrap();
        assert_eq!(parsed, Capability::Deny);
    }
}
