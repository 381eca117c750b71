//! Configuration documents and state files.
//!
//! Both are JSON or YAML, picked by file extension (`.yaml`/`.yml` is YAML,
//! anything else JSON). A configuration document names one resource or data
//! source type and its attributes:
//!
//! ```yaml
//! type: vault_policy
//! config:
//!   name: dev
//!   policy: |
//!     path "secret/*" { capabilities = ["read"] }
//! ```
//!
//! A state file records the type next to the instance's id and attributes.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::resources::ResourceData;

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigDocument {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(flatten)]
    pub data: ResourceData,
}

fn is_yaml(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"))
}

/// Read and parse a JSON or YAML file.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if is_yaml(path) {
        serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
    }
}

/// State from `path`, or `None` if the file does not exist yet.
pub fn load_state(path: &Path) -> Result<Option<StateFile>> {
    if !path.exists() {
        return Ok(None);
    }
    load(path).map(Some)
}

/// Write state in the format implied by the extension.
pub fn save_state(path: &Path, state: &StateFile) -> Result<()> {
    let content = if is_yaml(path) {
        serde_yaml::to_string(state).context("Failed to serialize state to YAML")?
    } else {
        serde_json::to_string_pretty(state).context("Failed to serialize state to JSON")?
    };
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn remove_state(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}
