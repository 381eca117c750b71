//! Stable hashes for unordered set attributes.
//!
//! Set members have no defined iteration order, so state tracks each member by
//! a digest of its canonical form. The digest is CRC-32 (IEEE); collisions are
//! tolerable because the value is only used for stable indexing.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{ProviderError, Result};
use crate::policy::render::{quote, render_list};

lazy_static! {
    static ref BINDING_BLOCK: Regex =
        Regex::new(r#"resource\s+"((?:[^"\\]|\\.)*)"\s*\{\s*roles\s*=\s*\[([^\]]*)\]\s*\}"#)
            .expect("binding block pattern should compile");
    static ref QUOTED: Regex =
        Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("quoted string pattern should compile");
}

/// CRC-32 (IEEE) of a string. Always non-negative.
pub fn hash_string(value: &str) -> u32 {
    crc32fast::hash(value.as_bytes())
}

/// A cloud resource and the IAM roles granted on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub resource: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Binding {
    pub fn new<I, S>(resource: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { resource: resource.into(), roles: roles.into_iter().map(Into::into).collect() }
    }

    /// `"<resource>-"` followed by each sorted role and a trailing `-`.
    pub fn canonical(&self) -> String {
        let mut out = format!("{}-", self.resource);
        for role in &self.roles {
            out.push_str(role);
            out.push('-');
        }
        out
    }

    /// Order-independent set key for this binding.
    pub fn hash(&self) -> u32 {
        hash_string(&self.canonical())
    }

    fn render_hcl(&self) -> String {
        let roles: Vec<&str> = self.roles.iter().map(String::as_str).collect();
        format!("resource {} {{\n  roles = {}\n}}\n", quote(&self.resource), render_list(&roles))
    }
}

/// Set of bindings keyed by [`Binding::hash`].
///
/// Iteration is in hash order, which is what state stores so that two reads
/// of the same remote configuration produce identical attribute lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingSet {
    members: BTreeMap<u32, Binding>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding; an identical binding already present is kept.
    pub fn insert(&mut self, binding: Binding) -> bool {
        let key = binding.hash();
        if self.members.contains_key(&key) {
            return false;
        }
        self.members.insert(key, binding);
        true
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.members.values()
    }

    /// Hash keys of the members, in iteration order
    pub fn hashes(&self) -> Vec<u32> {
        self.members.keys().copied().collect()
    }

    /// Render the `resource "<r>" { roles = [...] }` blocks the GCP secrets
    /// engine accepts as its `bindings` parameter.
    pub fn render_hcl(&self) -> String {
        self.iter().map(Binding::render_hcl).collect::<Vec<_>>().join("\n")
    }

    /// Parse the `bindings` object Vault returns: `{"<resource>": ["<role>", ...]}`.
    pub fn from_response(value: &Value) -> Result<Self> {
        let object = match value {
            Value::Null => return Ok(Self::new()),
            Value::String(hcl) => return Self::parse_hcl(hcl),
            Value::Object(object) => object,
            other => {
                return Err(ProviderError::serialization(
                    "bindings",
                    format!("expected an object of resource to roles, got {}", other),
                ))
            }
        };

        let mut set = Self::new();
        for (resource, roles) in object {
            let roles = roles.as_array().ok_or_else(|| {
                ProviderError::serialization(
                    "bindings",
                    format!("roles for {:?} must be a list", resource),
                )
            })?;
            let roles = roles.iter().filter_map(Value::as_str).map(str::to_string);
            set.insert(Binding::new(resource.clone(), roles));
        }
        Ok(set)
    }

    /// Parse the HCL form produced by [`BindingSet::render_hcl`].
    pub fn parse_hcl(hcl: &str) -> Result<Self> {
        let mut set = Self::new();
        let mut matched = 0;
        for block in BINDING_BLOCK.captures_iter(hcl) {
            matched += 1;
            let roles = QUOTED.captures_iter(&block[2]).map(|role| unquote(&role[1]));
            set.insert(Binding::new(unquote(&block[1]), roles));
        }
        if matched == 0 && !hcl.trim().is_empty() {
            return Err(ProviderError::serialization("bindings", "no resource blocks found"));
        }
        Ok(set)
    }

    /// JSON list for state, in hash order
    pub fn to_state(&self) -> Value {
        Value::Array(
            self.iter()
                .map(|b| serde_json::json!({"resource": b.resource, "roles": b.roles}))
                .collect(),
        )
    }
}

fn unquote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            },
            '$' | '%' if chars.peek() == Some(&c) => {
                chars.next();
                if chars.peek() != Some(&'{') {
                    out.push(c);
                }
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}

impl FromIterator<Binding> for BindingSet {
    fn from_iter<T: IntoIterator<Item = Binding>>(iter: T) -> Self {
        let mut set = Self::new();
        for binding in iter {
            set.insert(binding);
        }
        set
    }
}
