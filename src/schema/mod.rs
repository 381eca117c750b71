//! # Resource Schemas
//!
//! Each resource and data source declares its attributes up front. The
//! provider checks a configuration against the schema before any request is
//! made: required attributes must be present, unknown attributes and computed
//! attributes are rejected, and values must match the declared type. Optional
//! attributes with a default are filled in afterwards.
//!
//! ```rust,ignore
//! Schema::new()
//!     .with_attribute(Attribute::required("name", AttrType::String).force_new())
//!     .with_attribute(Attribute::optional("policy", AttrType::String))
//!     .with_attribute(Attribute::computed("accessor", AttrType::String))
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::errors::{ProviderError, Result};

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "element")]
pub enum AttrType {
    String,
    Bool,
    Number,
    List(Box<AttrType>),
    Set(Box<AttrType>),
    Map(Box<AttrType>),
    /// Nested block with its own attributes
    Object(Vec<Attribute>),
}

impl AttrType {
    pub fn list(element: AttrType) -> Self {
        AttrType::List(Box::new(element))
    }

    pub fn set(element: AttrType) -> Self {
        AttrType::Set(Box::new(element))
    }

    pub fn map(element: AttrType) -> Self {
        AttrType::Map(Box::new(element))
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::String => write!(f, "string"),
            AttrType::Bool => write!(f, "bool"),
            AttrType::Number => write!(f, "number"),
            AttrType::List(inner) => write!(f, "list({})", inner),
            AttrType::Set(inner) => write!(f, "set({})", inner),
            AttrType::Map(inner) => write!(f, "map({})", inner),
            AttrType::Object(_) => write!(f, "object"),
        }
    }
}

/// One attribute declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: AttrType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub force_new: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<&'static [&'static str]>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
}

impl Attribute {
    fn base(name: &'static str, ty: AttrType) -> Self {
        Self {
            name,
            ty,
            required: false,
            optional: false,
            computed: false,
            default: None,
            force_new: false,
            sensitive: false,
            one_of: None,
            description: "",
        }
    }

    pub fn required(name: &'static str, ty: AttrType) -> Self {
        Self { required: true, ..Self::base(name, ty) }
    }

    pub fn optional(name: &'static str, ty: AttrType) -> Self {
        Self { optional: true, ..Self::base(name, ty) }
    }

    /// Set by the server only; configuration may not supply it.
    pub fn computed(name: &'static str, ty: AttrType) -> Self {
        Self { computed: true, ..Self::base(name, ty) }
    }

    /// Configurable, but read back from the server when unset.
    pub fn optional_computed(name: &'static str, ty: AttrType) -> Self {
        Self { optional: true, computed: true, ..Self::base(name, ty) }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.one_of = Some(allowed);
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    fn is_configurable(&self) -> bool {
        self.required || self.optional
    }
}

/// Attribute set of a resource or data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check a configuration. The first violation found is returned.
    pub fn validate(&self, config: &Map<String, Value>) -> Result<()> {
        validate_object(&self.attributes, config, "")
    }

    /// Fill unset optional attributes from their declared defaults.
    pub fn apply_defaults(&self, config: &mut Map<String, Value>) {
        for attribute in &self.attributes {
            let Some(ref default) = attribute.default else { continue };
            let unset = config.get(attribute.name).map_or(true, Value::is_null);
            if unset {
                config.insert(attribute.name.to_string(), default.clone());
            }
        }
    }

    /// First `force_new` attribute whose configured value differs between
    /// `prior` and `planned`.
    pub fn replacement_trigger(
        &self,
        prior: &Map<String, Value>,
        planned: &Map<String, Value>,
    ) -> Option<&'static str> {
        self.attributes
            .iter()
            .filter(|a| a.force_new && a.is_configurable())
            .find(|a| {
                let before = prior.get(a.name).filter(|v| !v.is_null());
                let after = planned.get(a.name).filter(|v| !v.is_null());
                // unset optional+computed values keep whatever the server chose
                !(a.computed && after.is_none()) && before != after
            })
            .map(|a| a.name)
    }

    /// Names of sensitive attributes, for redacting output
    pub fn sensitive_attributes(&self) -> Vec<&'static str> {
        self.attributes.iter().filter(|a| a.sensitive).map(|a| a.name).collect()
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn validate_object(attributes: &[Attribute], config: &Map<String, Value>, prefix: &str) -> Result<()> {
    for key in config.keys() {
        match attributes.iter().find(|a| a.name == key) {
            None => {
                return Err(ProviderError::validation_field(
                    "unsupported argument",
                    join(prefix, key),
                ))
            }
            Some(attribute) if !attribute.is_configurable() && !config[key].is_null() => {
                return Err(ProviderError::validation_field(
                    "cannot set a computed attribute",
                    join(prefix, key),
                ))
            }
            Some(_) => {}
        }
    }

    for attribute in attributes {
        let field = join(prefix, attribute.name);
        match config.get(attribute.name).filter(|v| !v.is_null()) {
            None if attribute.required => {
                return Err(ProviderError::validation_field("required attribute is missing", field))
            }
            None => {}
            Some(value) => {
                validate_value(&attribute.ty, value, &field)?;
                if let Some(allowed) = attribute.one_of {
                    check_one_of(allowed, value, &field)?;
                }
            }
        }
    }
    Ok(())
}

fn validate_value(ty: &AttrType, value: &Value, field: &str) -> Result<()> {
    let mismatch = || {
        ProviderError::validation_field(
            format!("expected {}, got {}", ty, json_type(value)),
            field,
        )
    };

    match (ty, value) {
        (AttrType::String, Value::String(_))
        | (AttrType::Bool, Value::Bool(_))
        | (AttrType::Number, Value::Number(_)) => Ok(()),
        (AttrType::List(inner), Value::Array(items)) | (AttrType::Set(inner), Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                validate_value(inner, item, &format!("{}.{}", field, index))?;
            }
            Ok(())
        }
        (AttrType::Map(inner), Value::Object(entries)) => {
            for (key, item) in entries {
                validate_value(inner, item, &format!("{}.{}", field, key))?;
            }
            Ok(())
        }
        (AttrType::Object(attributes), Value::Object(entries)) => {
            validate_object(attributes, entries, field)
        }
        _ => Err(mismatch()),
    }
}

fn check_one_of(allowed: &[&str], value: &Value, field: &str) -> Result<()> {
    let values: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    for value in values {
        let Some(s) = value.as_str() else { continue };
        if !allowed.contains(&s) {
            return Err(ProviderError::validation_field(
                format!("expected one of [{}], got {:?}", allowed.join(", "), s),
                field,
            ));
        }
    }
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
