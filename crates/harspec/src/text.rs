//! Small string helpers shared by the derivers.

use crate::openapi::ParamSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("valid regex"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}|\d{4}[/.]\d{1,2}[/.]\d{1,2}|\d{1,2}[/.]\d{1,2}[/.]\d{2,4})$")
        .expect("valid regex")
});

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Strip non-alphanumerics and upper-camel-case the remaining words:
/// `session_id` becomes `SessionId`.
pub(crate) fn camelize(s: &str) -> String {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect()
}

/// Best-effort English pluralization for summary phrasing. Words that
/// already end in `s` are assumed plural and left alone.
pub(crate) fn pluralize(word: &str) -> String {
    if word.is_empty() || word.ends_with('s') {
        return word.to_string();
    }
    if word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.is_empty() && !stem.ends_with(|c: char| "aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

pub(crate) fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["xes", "zes", "ches", "shes", "sses"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Schema for an observed parameter value: string by default, narrowed to
/// integer/boolean/date when the literal matches a recognized pattern. The
/// observed value is carried as both `default` and `example`.
pub(crate) fn schema_for_value(value: &str) -> ParamSchema {
    if value == "true" || value == "false" {
        return ParamSchema {
            schema_type: "boolean".to_string(),
            default: Some(Value::Bool(value == "true")),
            example: Some(Value::Bool(value == "true")),
            ..ParamSchema::default()
        };
    }
    if INTEGER_RE.is_match(value) {
        if let Ok(parsed) = value.parse::<i64>() {
            return ParamSchema {
                schema_type: "integer".to_string(),
                default: Some(Value::from(parsed)),
                example: Some(Value::from(parsed)),
                ..ParamSchema::default()
            };
        }
    }
    let mut schema = ParamSchema::string();
    if DATE_RE.is_match(value) {
        schema.format = Some("date".to_string());
    }
    schema.default = Some(Value::String(value.to_string()));
    schema.example = Some(Value::String(value.to_string()));
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_first_letter_only() {
        assert_eq!(capitalize("login"), "Login");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("x-api-key"), "X-api-key");
    }

    #[test]
    fn camelizes_across_separators() {
        assert_eq!(camelize("session_id"), "SessionId");
        assert_eq!(camelize("csrf-token"), "CsrfToken");
        assert_eq!(camelize("plain"), "Plain");
    }

    #[test]
    fn pluralize_basic_rules() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("users"), "users");
        assert_eq!(pluralize("query"), "queries");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize(""), "");
    }

    #[test]
    fn singularize_basic_rules() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("queries"), "query");
        assert_eq!(singularize("status"), "statu");
        assert_eq!(singularize("class"), "class");
        assert_eq!(singularize("user"), "user");
    }

    #[test]
    fn value_schemas_are_narrowed_by_literal() {
        assert_eq!(schema_for_value("true").schema_type, "boolean");
        assert_eq!(schema_for_value("42").schema_type, "integer");
        assert_eq!(schema_for_value("42").example, Some(Value::from(42)));
        let date = schema_for_value("2023-01-15");
        assert_eq!(date.schema_type, "string");
        assert_eq!(date.format.as_deref(), Some("date"));
        assert_eq!(schema_for_value("hello").schema_type, "string");
        // too large for i64 falls back to string
        assert_eq!(
            schema_for_value("99999999999999999999999").schema_type,
            "string"
        );
    }
}
