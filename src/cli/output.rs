//! Output formatting for CLI commands
//!
//! State and schemas print as JSON or YAML; the resource listing also has a
//! table form. Sensitive attributes are masked unless explicitly requested.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::Schema;

const REDACTED: &str = "(sensitive value)";

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

/// Print data in the specified format
pub fn print_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(data),
        OutputFormat::Yaml => print_yaml(data),
        OutputFormat::Table => {
            anyhow::bail!("Table format is only available for the resource listing")
        }
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Print data as YAML
pub fn print_yaml<T: Serialize>(data: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(data).context("Failed to serialize to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// Copy of `attributes` with every sensitive value replaced.
pub fn redact(attributes: &Map<String, Value>, schema: &Schema) -> Map<String, Value> {
    let sensitive = schema.sensitive_attributes();
    attributes
        .iter()
        .map(|(key, value)| {
            if sensitive.contains(&key.as_str()) && !value.is_null() {
                (key.clone(), Value::from(REDACTED))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

/// Truncate string to maximum length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a table header
pub fn print_table_header(columns: &[(&str, usize)]) {
    let mut header = String::new();
    for (name, width) in columns {
        header.push_str(&format!("{:<width$} ", name, width = width));
    }
    println!("{}", header.trim());

    let total_width: usize = columns.iter().map(|(_, w)| w + 1).sum();
    println!("{}", "-".repeat(total_width.saturating_sub(1)));
}

/// One line per registered type: kind, name and attribute summary.
pub fn print_type_table(rows: &[(&str, &str, &Schema)]) {
    print_table_header(&[("Kind", 12), ("Type", 45), ("Attributes", 60)]);
    for (kind, name, schema) in rows {
        let attributes: Vec<String> = schema
            .attributes
            .iter()
            .map(|a| if a.required { format!("{}*", a.name) } else { a.name.to_string() })
            .collect();
        println!("{:<12} {:<45} {}", kind, name, truncate(&attributes.join(", "), 60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttrType, Attribute};
    use serde_json::json;

    #[test]
    fn test_print_json_and_yaml() {
        let data = json!({"name": "test", "value": 42});
        assert!(print_json(&data).is_ok());
        assert!(print_yaml(&data).is_ok());
        assert!(print_output(&data, OutputFormat::Table).is_err());
    }

    #[test]
    fn test_redact() {
        let schema = Schema::new()
            .with_attribute(Attribute::required("path", AttrType::String))
            .with_attribute(Attribute::required("data_json", AttrType::String).sensitive());
        let attributes = json!({"path": "secret/a", "data_json": "{\"k\":\"v\"}"});

        let redacted = redact(attributes.as_object().unwrap(), &schema);
        assert_eq!(Value::Object(redacted), json!({"path": "secret/a", "data_json": REDACTED}));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("hello", 3), "...");
    }
}
