//! HCL rendering of policy documents.
//!
//! Output shape for one rule:
//!
//! ```text
//! # optional description
//! path "secret/*" {
//!   capabilities = ["read", "list"]
//!   required_parameters = ["name"]
//!   allowed_parameters = {
//!     "ttl" = ["1h"]
//!   }
//!   denied_parameters = {}
//!   min_wrapping_ttl = "1m"
//!   max_wrapping_ttl = "1h"
//! }
//! ```
//!
//! Rules keep caller order and are separated by one blank line. `None`
//! fields produce no line at all; present-but-empty lists and maps render as
//! `[]` and `{}`.

use super::{ParameterMap, Policy, PolicyRule};

/// Render a whole policy document.
pub fn render_policy(policy: &Policy) -> String {
    policy.rules.iter().map(render_rule).collect::<Vec<_>>().join("\n")
}

/// Render a single `path "<path>" { ... }` block, including its trailing newline.
pub fn render_rule(rule: &PolicyRule) -> String {
    let mut out = String::new();

    if let Some(description) = rule.description.as_deref().filter(|d| !d.is_empty()) {
        for line in description.lines() {
            out.push_str(&format!("# {}\n", line));
        }
    }

    out.push_str(&format!("path {} {{\n", quote(&rule.path)));
    out.push_str(&format!("  capabilities = {}\n", render_list(&rule.capabilities)));

    if let Some(ref required) = rule.required_parameters {
        out.push_str(&format!("  required_parameters = {}\n", render_list(required)));
    }
    if let Some(ref allowed) = rule.allowed_parameters {
        render_parameters(&mut out, "allowed_parameters", allowed);
    }
    if let Some(ref denied) = rule.denied_parameters {
        render_parameters(&mut out, "denied_parameters", denied);
    }
    if let Some(ref ttl) = rule.min_wrapping_ttl {
        out.push_str(&format!("  min_wrapping_ttl = {}\n", quote(ttl)));
    }
    if let Some(ref ttl) = rule.max_wrapping_ttl {
        out.push_str(&format!("  max_wrapping_ttl = {}\n", quote(ttl)));
    }

    out.push_str("}\n");
    out
}

fn render_parameters(out: &mut String, name: &str, parameters: &ParameterMap) {
    if parameters.is_empty() {
        out.push_str(&format!("  {} = {{}}\n", name));
        return;
    }

    out.push_str(&format!("  {} = {{\n", name));
    for (key, values) in parameters {
        out.push_str(&format!("    {} = {}\n", quote(key), render_list(values)));
    }
    out.push_str("  }\n");
}

/// `["a", "b"]`, or `[]` when empty.
pub fn render_list<S: AsRef<str>>(values: &[S]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}

/// Double-quote a string as an HCL literal.
///
/// Backslashes, quotes and line breaks are escaped, and template sequences
/// (`${`, `%{`) are doubled so they stay literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(path: &str, capabilities: &[&str]) -> PolicyRule {
        PolicyRule {
            path: path.to_string(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_rule() {
        let policy = Policy::new(vec![rule("secret/*", &["read"])]);
        assert_eq!(render_policy(&policy), "path \"secret/*\" {\n  capabilities = [\"read\"]\n}\n");
    }

    #[test]
    fn test_rules_keep_order_and_blank_line_separator() {
        let policy = Policy::new(vec![rule("z/*", &["deny"]), rule("a/*", &["read", "list"])]);
        assert_eq!(
            render_policy(&policy),
            "path \"z/*\" {\n  capabilities = [\"deny\"]\n}\n\
             \n\
             path \"a/*\" {\n  capabilities = [\"read\", \"list\"]\n}\n"
        );
    }

    #[test]
    fn test_full_rule() {
        let mut allowed = ParameterMap::new();
        allowed.insert("ttl".to_string(), vec!["1h".to_string(), "2h".to_string()]);
        allowed.insert("format".to_string(), vec![]);

        let full = PolicyRule {
            path: "pki/issue/web".to_string(),
            description: Some("issue web certs".to_string()),
            capabilities: vec!["create".to_string(), "update".to_string()],
            required_parameters: Some(vec!["common_name".to_string()]),
            allowed_parameters: Some(allowed),
            denied_parameters: Some(ParameterMap::new()),
            min_wrapping_ttl: Some("1m".to_string()),
            max_wrapping_ttl: Some("1h".to_string()),
        };

        let expected = "# issue web certs\n\
            path \"pki/issue/web\" {\n\
            \x20 capabilities = [\"create\", \"update\"]\n\
            \x20 required_parameters = [\"common_name\"]\n\
            \x20 allowed_parameters = {\n\
            \x20   \"format\" = []\n\
            \x20   \"ttl\" = [\"1h\", \"2h\"]\n\
            \x20 }\n\
            \x20 denied_parameters = {}\n\
            \x20 min_wrapping_ttl = \"1m\"\n\
            \x20 max_wrapping_ttl = \"1h\"\n\
            }\n";
        assert_eq!(render_rule(&full), expected);
    }

    #[test]
    fn test_absent_versus_empty() {
        let mut r = rule("secret/*", &[]);
        assert_eq!(render_rule(&r), "path \"secret/*\" {\n  capabilities = []\n}\n");

        r.required_parameters = Some(vec![]);
        r.allowed_parameters = Some(ParameterMap::new());
        assert_eq!(
            render_rule(&r),
            "path \"secret/*\" {\n  capabilities = []\n  required_parameters = []\n  allowed_parameters = {}\n}\n"
        );
    }

    #[test]
    fn test_empty_description_omitted() {
        let mut r = rule("secret/*", &["read"]);
        r.description = Some(String::new());
        assert!(!render_rule(&r).contains('#'));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote("a\nb\r"), "\"a\\nb\\r\"");
        assert_eq!(quote("${var}/%{if}"), "\"$${var}/%%{if}\"");
        assert_eq!(quote("$5 {x}"), "\"$5 {x}\"");
    }

    #[test]
    fn test_empty_policy_renders_empty_document() {
        assert_eq!(render_policy(&Policy::default()), "");
    }
}
