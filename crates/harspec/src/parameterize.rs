//! URL parameterization: rewrite concrete path segments that look like
//! identifiers (UUIDs, numeric ids, dates, booleans) into named `{param}`
//! placeholders with matching path parameters.

use crate::openapi::{ParamSchema, Parameter, ParameterLocation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

const UUID_PATTERN: &str =
    "^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$";

static UUID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(UUID_PATTERN).expect("valid regex"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}|\d{4}[/.]\d{1,2}[/.]\d{1,2}|\d{1,2}[/.]\d{1,2}[/.]\d{2,4})$")
        .expect("valid regex")
});

/// Result of parameterizing one raw path.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParameterizedPath {
    pub path: String,
    pub parameters: Vec<Parameter>,
}

enum SegmentKind {
    Uuid,
    Date,
    Id,
    Bool,
    /// Pre-templated `{name}` segment; re-emitted unchanged.
    Existing(String),
    Literal,
}

fn classify(segment: &str, min_numeric_len: usize) -> SegmentKind {
    if segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}') {
        return SegmentKind::Existing(segment[1..segment.len() - 1].to_string());
    }
    if UUID_RE.is_match(segment) {
        return SegmentKind::Uuid;
    }
    if DATE_RE.is_match(segment) {
        return SegmentKind::Date;
    }
    if !segment.is_empty()
        && segment.len() >= min_numeric_len
        && segment.bytes().all(|b| b.is_ascii_digit())
    {
        return SegmentKind::Id;
    }
    if segment == "true" || segment == "false" {
        return SegmentKind::Bool;
    }
    SegmentKind::Literal
}

/// Deterministic collision suffixing: the first occurrence of a base name
/// is unsuffixed, later ones get a 1-based counter (`id`, `id1`, `id2`).
fn assign_name(base: &str, counts: &mut HashMap<String, usize>) -> String {
    let seen = counts.entry(base.to_string()).or_insert(0);
    let name = if *seen == 0 {
        base.to_string()
    } else {
        format!("{base}{seen}")
    };
    *seen += 1;
    name
}

fn path_parameter(name: String, schema: ParamSchema) -> Parameter {
    let description = if name.contains("_id") {
        Some(format!(
            "Unique ID of the {} you are working with",
            name.replace("_id", "")
        ))
    } else {
        None
    };
    Parameter {
        name,
        location: ParameterLocation::Path,
        description,
        required: true,
        schema: Some(schema),
    }
}

/// Rewrite identifier-like segments of `path` into `{name}` placeholders.
///
/// Idempotent: running the parameterizer over an already-templated path
/// returns the same template, with existing placeholders re-emitting their
/// parameter unchanged (their names also participate in collision
/// counting, so mixed templated/concrete paths stay deterministic).
pub(crate) fn parameterize_path(path: &str, min_numeric_len: usize) -> ParameterizedPath {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut parameters = Vec::new();
    let mut segments = Vec::new();

    for segment in path.split('/') {
        match classify(segment, min_numeric_len) {
            SegmentKind::Existing(name) => {
                *counts.entry(name.clone()).or_insert(0) += 1;
                parameters.push(path_parameter(name.clone(), ParamSchema::string()));
                segments.push(format!("{{{name}}}"));
            }
            SegmentKind::Uuid => {
                let name = assign_name("uuid", &mut counts);
                let schema = ParamSchema {
                    schema_type: "string".to_string(),
                    pattern: Some(UUID_PATTERN.to_string()),
                    min_length: Some(36),
                    max_length: Some(36),
                    example: Some(Value::String(segment.to_string())),
                    ..ParamSchema::default()
                };
                parameters.push(path_parameter(name.clone(), schema));
                segments.push(format!("{{{name}}}"));
            }
            SegmentKind::Date => {
                let name = assign_name("date", &mut counts);
                let schema = ParamSchema {
                    schema_type: "string".to_string(),
                    format: Some("date".to_string()),
                    example: Some(Value::String(segment.to_string())),
                    ..ParamSchema::default()
                };
                parameters.push(path_parameter(name.clone(), schema));
                segments.push(format!("{{{name}}}"));
            }
            SegmentKind::Id => {
                let name = assign_name("id", &mut counts);
                let schema = ParamSchema {
                    schema_type: "integer".to_string(),
                    example: segment.parse::<i64>().ok().map(Value::from),
                    ..ParamSchema::default()
                };
                parameters.push(path_parameter(name.clone(), schema));
                segments.push(format!("{{{name}}}"));
            }
            SegmentKind::Bool => {
                let name = assign_name("bool", &mut counts);
                let schema = ParamSchema {
                    schema_type: "boolean".to_string(),
                    example: Some(Value::Bool(segment == "true")),
                    ..ParamSchema::default()
                };
                parameters.push(path_parameter(name.clone(), schema));
                segments.push(format!("{{{name}}}"));
            }
            SegmentKind::Literal => segments.push(segment.to_string()),
        }
    }

    ParameterizedPath {
        path: segments.join("/"),
        parameters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn uuid_segments_become_uuid_parameters() {
        let result =
            parameterize_path("/users/5f0188e2-41a1-4dbf-b8c7-9b2c5ffe9a61/posts", 3);
        assert_eq!(result.path, "/users/{uuid}/posts");
        assert_eq!(result.parameters.len(), 1);
        let param = &result.parameters[0];
        assert_eq!(param.name, "uuid");
        assert!(param.required);
        let schema = param.schema.as_ref().unwrap();
        assert_eq!(schema.schema_type, "string");
        assert_eq!(schema.min_length, Some(36));
        assert!(schema.pattern.is_some());
    }

    #[test]
    fn numeric_segments_respect_the_minimum_length() {
        let result = parameterize_path("/v2/users/123456", 3);
        assert_eq!(result.path, "/v2/users/{id}");
        assert_eq!(
            result.parameters[0].schema.as_ref().unwrap().schema_type,
            "integer"
        );
        // below the minimum digit count the segment stays literal
        let result = parameterize_path("/v2/users/12", 3);
        assert_eq!(result.path, "/v2/users/12");
        assert!(result.parameters.is_empty());
    }

    #[test]
    fn date_and_bool_segments_are_classified() {
        let result = parameterize_path("/reports/2023-01-15/true", 3);
        assert_eq!(result.path, "/reports/{date}/{bool}");
        assert_eq!(
            result.parameters[0].schema.as_ref().unwrap().format.as_deref(),
            Some("date")
        );
        assert_eq!(
            result.parameters[1].schema.as_ref().unwrap().schema_type,
            "boolean"
        );
    }

    #[test]
    fn colliding_base_names_get_one_based_suffixes() {
        let result = parameterize_path("/a/111/b/222/c/333", 3);
        assert_eq!(result.path, "/a/{id}/b/{id1}/c/{id2}");
        let names: Vec<&str> = result.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "id1", "id2"]);
    }

    #[test]
    fn existing_placeholders_count_toward_collisions() {
        let result = parameterize_path("/a/{id}/b/999", 3);
        assert_eq!(result.path, "/a/{id}/b/{id1}");
    }

    #[test]
    fn parameterization_is_idempotent() {
        let first = parameterize_path("/users/5f0188e2-41a1-4dbf-b8c7-9b2c5ffe9a61/posts/1234", 3);
        let second = parameterize_path(&first.path, 3);
        assert_eq!(first.path, second.path);
        let first_names: Vec<&str> = first.parameters.iter().map(|p| p.name.as_str()).collect();
        let second_names: Vec<&str> = second.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(first_names, second_names);
    }

    proptest! {
        #[test]
        fn idempotent_for_arbitrary_paths(segments in prop::collection::vec("[a-z0-9{}-]{0,12}", 0..6)) {
            let path = format!("/{}", segments.join("/"));
            let first = parameterize_path(&path, 3);
            let second = parameterize_path(&first.path, 3);
            prop_assert_eq!(first.path, second.path);
        }
    }
}
