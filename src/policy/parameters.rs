//! Parameter-constraint maps (`allowed_parameters`, `denied_parameters`).
//!
//! Configuration supplies these as a list of `{key, value}` blocks; the policy
//! language wants a map. A key may appear only once per list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{ProviderError, Result};

/// Parameter name to the list of allowed (or denied) values.
///
/// A `BTreeMap` so that rendering iterates keys in lexicographic order.
pub type ParameterMap = BTreeMap<String, Vec<String>>;

/// One `{key, value}` block from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub key: String,
    #[serde(default)]
    pub value: Vec<String>,
}

impl ParameterEntry {
    pub fn new(key: impl Into<String>, value: Vec<String>) -> Self {
        Self { key: key.into(), value }
    }
}

/// Fold a list of entries into a map, rejecting repeated keys.
pub fn decode_parameters(entries: &[ParameterEntry], field: &str) -> Result<ParameterMap> {
    let mut parameters = ParameterMap::new();
    for entry in entries {
        if parameters.contains_key(&entry.key) {
            return Err(ProviderError::validation_field(
                format!("duplicate key {:?}", entry.key),
                field,
            ));
        }
        parameters.insert(entry.key.clone(), entry.value.clone());
    }
    Ok(parameters)
}
