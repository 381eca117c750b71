//! Policy documents.
//!
//! A [`Policy`] is an ordered list of [`PolicyRule`]s that only exists to be
//! rendered into the server's HCL policy language; it is never stored as a
//! structure. Rules arrive from configuration as [`RuleConfig`] blocks, where
//! parameter constraints are lists of `{key, value}` entries, and are decoded
//! into rules with maps keyed by parameter name.

pub mod capability;
pub mod parameters;
pub mod render;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub use capability::{validate_capability, Capability};
pub use parameters::{decode_parameters, ParameterEntry, ParameterMap};
pub use render::{render_policy, render_rule};

/// One `path` block of a policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_parameters: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_parameters: Option<ParameterMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied_parameters: Option<ParameterMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_wrapping_ttl: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wrapping_ttl: Option<String>,
}

impl PolicyRule {
    /// Check every capability against the allow-set.
    ///
    /// `field` is the path of this rule's capability list in configuration,
    /// e.g. `rule.0.capabilities`.
    pub fn validate(&self, field: &str) -> Result<()> {
        for capability in &self.capabilities {
            validate_capability(capability, field)?;
        }
        Ok(())
    }
}

/// An ordered set of rules. Order is preserved when rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default, alias = "rule")]
    pub rules: Vec<PolicyRule>,
}

impl Policy {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    pub fn validate(&self) -> Result<()> {
        for (index, rule) in self.rules.iter().enumerate() {
            rule.validate(&format!("rule.{}.capabilities", index))?;
        }
        Ok(())
    }

    /// Render the HCL document. Callers validate first.
    pub fn render(&self) -> String {
        render_policy(self)
    }

    /// Decode configuration blocks into a validated policy.
    pub fn from_config(rules: &[RuleConfig]) -> Result<Self> {
        let rules = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| rule.decode(index))
            .collect::<Result<Vec<_>>>()?;
        let policy = Self::new(rules);
        policy.validate()?;
        Ok(policy)
    }
}

/// A `rule` block as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub path: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub required_parameters: Option<Vec<String>>,

    #[serde(default)]
    pub allowed_parameter: Option<Vec<ParameterEntry>>,

    #[serde(default)]
    pub denied_parameter: Option<Vec<ParameterEntry>>,

    #[serde(default)]
    pub min_wrapping_ttl: Option<String>,

    #[serde(default)]
    pub max_wrapping_ttl: Option<String>,
}

impl RuleConfig {
    fn decode(&self, index: usize) -> Result<PolicyRule> {
        let allowed_parameters = self
            .allowed_parameter
            .as_deref()
            .map(|entries| decode_parameters(entries, &format!("rule.{}.allowed_parameter", index)))
            .transpose()?;
        let denied_parameters = self
            .denied_parameter
            .as_deref()
            .map(|entries| decode_parameters(entries, &format!("rule.{}.denied_parameter", index)))
            .transpose()?;

        Ok(PolicyRule {
            path: self.path.clone(),
            description: self.description.clone(),
            capabilities: self.capabilities.clone(),
            required_parameters: self.required_parameters.clone(),
            allowed_parameters,
            denied_parameters,
            min_wrapping_ttl: self.min_wrapping_ttl.clone().filter(|ttl| !ttl.is_empty()),
            max_wrapping_ttl: self.max_wrapping_ttl.clone().filter(|ttl| !ttl.is_empty()),
        })
    }
}
