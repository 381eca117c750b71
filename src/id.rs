//! Composite resource identifiers.
//!
//! Many resources persist a parent/child pair as one path-shaped id, for
//! example `aws/roles/admin` for role `admin` on the backend mounted at `aws`.
//! [`CompositeId`] is the one codec for all of them, parameterized by the
//! separator literal each resource type uses.
//!
//! Decoding matches `^(.+)<separator>([^/]+)$`. The parent group is greedy, so
//! a parent that itself contains the separator still decodes to the last
//! occurrence; a child containing `/` cannot be recovered and is rejected at
//! encode time.

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::{ProviderError, Result};

/// Encode/decode `(parent, child)` pairs joined by a fixed separator.
#[derive(Debug, Clone)]
pub struct CompositeId {
    separator: &'static str,
    pattern: Regex,
}

lazy_static! {
    pub static ref ROLES: CompositeId =
        CompositeId::new("/roles/").expect("roles separator should compile");
    pub static ref ROLE: CompositeId =
        CompositeId::new("/role/").expect("role separator should compile");
    pub static ref CONFIG: CompositeId =
        CompositeId::new("/config/").expect("config separator should compile");
    pub static ref ROLESET: CompositeId =
        CompositeId::new("/roleset/").expect("roleset separator should compile");
    pub static ref STATIC_ACCOUNT: CompositeId =
        CompositeId::new("/static-account/").expect("static-account separator should compile");
    pub static ref IMPERSONATED_ACCOUNT: CompositeId = CompositeId::new("/impersonated-account/")
        .expect("impersonated-account separator should compile");
    pub static ref STATIC_ROLE: CompositeId =
        CompositeId::new("/static-role/").expect("static-role separator should compile");
    pub static ref ALLOWED_CLIENT_ID: CompositeId = CompositeId::new("/allowed-client-id/")
        .expect("allowed-client-id separator should compile");
}

impl CompositeId {
    /// Build a codec for `separator`, which must be non-empty.
    pub fn new(separator: &'static str) -> Result<Self> {
        if separator.is_empty() {
            return Err(ProviderError::internal("composite ID separator cannot be empty"));
        }
        let pattern = Regex::new(&format!("^(.+){}([^/]+)$", regex::escape(separator)))
            .map_err(|e| ProviderError::internal(format!("invalid separator pattern: {}", e)))?;
        Ok(Self { separator, pattern })
    }

    pub fn separator(&self) -> &'static str {
        self.separator
    }

    /// Whether `(parent, child)` survives a round trip through this codec.
    pub fn is_unambiguous(&self, parent: &str, child: &str) -> bool {
        !parent.is_empty() && !child.is_empty() && !child.contains('/')
    }

    /// Join parent and child with the separator.
    ///
    /// Pairs that would not decode back to themselves are rejected rather
    /// than escaped.
    pub fn encode(&self, parent: &str, child: &str) -> Result<String> {
        if !self.is_unambiguous(parent, child) {
            return Err(ProviderError::validation(format!(
                "ambiguous identifier: cannot join {:?} and {:?} with {:?}; \
                 names must be non-empty and the child name cannot contain '/'",
                parent, child, self.separator
            )));
        }
        Ok(format!("{}{}{}", parent, self.separator, child))
    }

    /// Split an id back into `(parent, child)`.
    pub fn decode(&self, id: &str) -> Result<(String, String)> {
        let captures = self.pattern.captures(id).ok_or_else(|| {
            ProviderError::invalid_id(
                id,
                format!(
                    "no backend/name found (expected \"<backend>{}<name>\")",
                    self.separator
                ),
            )
        })?;

        if captures.len() != 3 {
            return Err(ProviderError::invalid_id(
                id,
                format!("unexpected number of matches ({}) for backend/name", captures.len()),
            ));
        }

        Ok((captures[1].to_string(), captures[2].to_string()))
    }

    /// Parent half of an id
    pub fn parent(&self, id: &str) -> Result<String> {
        self.decode(id).map(|(parent, _)| parent)
    }

    /// Child half of an id
    pub fn child(&self, id: &str) -> Result<String> {
        self.decode(id).map(|(_, child)| child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_round_trip() {
        let id = ROLES.encode("aws", "admin").unwrap();
        assert_eq!(id, "aws/roles/admin");
        assert_eq!(ROLES.decode(&id).unwrap(), ("aws".to_string(), "admin".to_string()));
    }

    #[test]
    fn test_nested_backend_path() {
        let id = ROLESET.encode("gcp/prod", "ci").unwrap();
        assert_eq!(id, "gcp/prod/roleset/ci");
        assert_eq!(ROLESET.parent(&id).unwrap(), "gcp/prod");
        assert_eq!(ROLESET.child(&id).unwrap(), "ci");
    }

    #[test]
    fn test_parent_containing_separator_decodes_greedily() {
        let id = ROLES.encode("team/roles/aws", "admin").unwrap();
        assert_eq!(ROLES.decode(&id).unwrap(), ("team/roles/aws".to_string(), "admin".to_string()));
    }

    #[test]
    fn test_no_match() {
        let err = ROLES.decode("aws/admin").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidId { .. }));
        assert!(err.to_string().contains("no backend/name found"));

        assert!(ROLES.decode("/roles/admin").is_err());
        assert!(ROLES.decode("aws/roles/").is_err());
        assert!(ROLES.decode("aws/roles/team/admin").is_err());
    }

    #[test]
    fn test_ambiguous_pairs_rejected() {
        assert!(!ROLES.is_unambiguous("aws", "team/admin"));
        assert!(ROLES.encode("aws", "team/admin").unwrap_err().to_string().contains("ambiguous"));
        assert!(ROLES.encode("", "admin").is_err());
        assert!(ROLES.encode("aws", "").is_err());
    }

    #[test]
    fn test_separator_is_escaped() {
        let dotted = CompositeId::new(".cfg.").unwrap();
        assert_eq!(dotted.decode("a.cfg.b").unwrap(), ("a".to_string(), "b".to_string()));
        assert!(dotted.decode("aXcfgXb").is_err());
    }

    #[test]
    fn test_empty_separator_rejected() {
        assert!(CompositeId::new("").is_err());
    }

    #[test]
    fn test_static_account_separator() {
        let id = STATIC_ACCOUNT.encode("gcp", "deployer").unwrap();
        assert_eq!(id, "gcp/static-account/deployer");
        assert_eq!(STATIC_ACCOUNT.separator(), "/static-account/");
    }
}
