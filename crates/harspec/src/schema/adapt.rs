//! Built-in JSON-Schema to OpenAPI schema adaptation.
//!
//! Resolves local `#/definitions/…` references (including a root-level
//! `$ref`), applies the configured circular-reference policy, strips
//! JSON-Schema bookkeeping keys, and rewrites null typing into OpenAPI's
//! `nullable` flag.

use super::{AdapterOptions, CircularRefPolicy, SchemaAdapter};
use crate::error::SchemaError;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// The default adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerefAdapter;

#[async_trait]
impl SchemaAdapter for DerefAdapter {
    async fn adapt(&self, schema: Value, options: &AdapterOptions) -> Result<Value, SchemaError> {
        let definitions = schema
            .get("definitions")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut resolved = if options.dereference {
            resolve(&schema, &definitions, &mut Vec::new(), options.circular)?
        } else {
            schema
        };

        if let Some(object) = resolved.as_object_mut() {
            object.remove("$schema");
            object.remove("definitions");
        }
        Ok(rewrite_nullable(resolved))
    }
}

fn resolve(
    value: &Value,
    definitions: &Map<String, Value>,
    stack: &mut Vec<String>,
    policy: CircularRefPolicy,
) -> Result<Value, SchemaError> {
    match value {
        Value::Object(object) => {
            if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
                let name = reference
                    .strip_prefix(DEFINITIONS_PREFIX)
                    .ok_or_else(|| SchemaError::UnresolvedRef(reference.to_string()))?;
                if stack.iter().any(|seen| seen == name) {
                    return match policy {
                        CircularRefPolicy::Ignore => Ok(json!({})),
                        CircularRefPolicy::Error => {
                            Err(SchemaError::CircularRef(name.to_string()))
                        }
                    };
                }
                let definition = definitions
                    .get(name)
                    .ok_or_else(|| SchemaError::UnresolvedRef(reference.to_string()))?;
                stack.push(name.to_string());
                let resolved = resolve(definition, definitions, stack, policy)?;
                stack.pop();

                // siblings of $ref override the resolved definition
                let mut merged = match resolved {
                    Value::Object(fields) => fields,
                    other => {
                        let mut fields = Map::new();
                        fields.insert("allOf".to_string(), json!([other]));
                        fields
                    }
                };
                for (key, sibling) in object {
                    if key != "$ref" {
                        merged.insert(
                            key.clone(),
                            resolve(sibling, definitions, stack, policy)?,
                        );
                    }
                }
                return Ok(Value::Object(merged));
            }
            let mut resolved = Map::new();
            for (key, field) in object {
                if key == "definitions" {
                    continue;
                }
                resolved.insert(key.clone(), resolve(field, definitions, stack, policy)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(elements) => {
            let resolved: Result<Vec<Value>, SchemaError> = elements
                .iter()
                .map(|element| resolve(element, definitions, stack, policy))
                .collect();
            Ok(Value::Array(resolved?))
        }
        other => Ok(other.clone()),
    }
}

/// Rewrite JSON-Schema null typing (`type: "null"`, `["T", "null"]` arrays,
/// `anyOf` null variants) into OpenAPI's `nullable: true`.
fn rewrite_nullable(value: Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut rewritten: Map<String, Value> = object
                .into_iter()
                .map(|(key, field)| (key, rewrite_nullable(field)))
                .collect();

            if let Some(types) = rewritten.get("type").and_then(Value::as_array).cloned() {
                let non_null: Vec<Value> = types
                    .iter()
                    .filter(|t| t.as_str() != Some("null"))
                    .cloned()
                    .collect();
                if non_null.len() < types.len() {
                    rewritten.insert("nullable".to_string(), json!(true));
                }
                match non_null.len() {
                    0 => {
                        rewritten.remove("type");
                    }
                    1 => {
                        rewritten.insert("type".to_string(), non_null[0].clone());
                    }
                    _ => {
                        rewritten.remove("type");
                        let variants: Vec<Value> =
                            non_null.iter().map(|t| json!({ "type": t })).collect();
                        rewritten.insert("anyOf".to_string(), json!(variants));
                    }
                }
            }

            if rewritten.get("type").and_then(Value::as_str) == Some("null") {
                rewritten.remove("type");
                rewritten.insert("nullable".to_string(), json!(true));
            }

            if let Some(variants) = rewritten.get("anyOf").and_then(Value::as_array).cloned() {
                let (null_variants, mut rest): (Vec<Value>, Vec<Value>) = variants
                    .into_iter()
                    .partition(|v| v == &json!({ "type": "null" }) || v == &json!({ "nullable": true }));
                if !null_variants.is_empty() {
                    rewritten.insert("nullable".to_string(), json!(true));
                }
                if rest.len() == 1 {
                    rewritten.remove("anyOf");
                    if let Value::Object(fields) = rest.remove(0) {
                        for (key, field) in fields {
                            rewritten.entry(key).or_insert(field);
                        }
                    }
                } else if rest.is_empty() {
                    rewritten.remove("anyOf");
                } else {
                    rewritten.insert("anyOf".to_string(), Value::Array(rest));
                }
            }

            Value::Object(rewritten)
        }
        Value::Array(elements) => {
            Value::Array(elements.into_iter().map(rewrite_nullable).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn adapt(schema: Value) -> Value {
        DerefAdapter
            .adapt(schema, &AdapterOptions::default())
            .await
            .expect("adaptation succeeds")
    }

    #[tokio::test]
    async fn strips_bookkeeping_keys() {
        let schema = adapt(json!({
            "$schema": "http://json-schema.org/draft-06/schema#",
            "type": "object",
            "properties": { "a": { "type": "integer" } }
        }))
        .await;
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["properties"]["a"]["type"], "integer");
    }

    #[tokio::test]
    async fn resolves_local_references() {
        let schema = adapt(json!({
            "type": "object",
            "properties": { "user": { "$ref": "#/definitions/User" } },
            "definitions": {
                "User": { "type": "object", "properties": { "name": { "type": "string" } } }
            }
        }))
        .await;
        assert!(schema.get("definitions").is_none());
        assert_eq!(
            schema["properties"]["user"]["properties"]["name"]["type"],
            "string"
        );
    }

    #[tokio::test]
    async fn resolves_a_root_reference() {
        let schema = adapt(json!({
            "$ref": "#/definitions/Root",
            "definitions": {
                "Root": { "type": "object", "properties": { "id": { "type": "integer" } } }
            }
        }))
        .await;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["id"]["type"], "integer");
        assert!(schema.get("definitions").is_none());
    }

    #[tokio::test]
    async fn circular_references_collapse_to_empty_schema() {
        let schema = adapt(json!({
            "$ref": "#/definitions/Node",
            "definitions": {
                "Node": {
                    "type": "object",
                    "properties": { "next": { "$ref": "#/definitions/Node" } }
                }
            }
        }))
        .await;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["next"], json!({}));
    }

    #[tokio::test]
    async fn circular_references_can_error_instead() {
        let options = AdapterOptions {
            dereference: true,
            circular: CircularRefPolicy::Error,
        };
        let result = DerefAdapter
            .adapt(
                json!({
                    "$ref": "#/definitions/Node",
                    "definitions": {
                        "Node": { "properties": { "next": { "$ref": "#/definitions/Node" } } }
                    }
                }),
                &options,
            )
            .await;
        assert!(matches!(result, Err(SchemaError::CircularRef(_))));
    }

    #[tokio::test]
    async fn unknown_references_are_errors() {
        let result = DerefAdapter
            .adapt(
                json!({ "$ref": "#/definitions/Missing" }),
                &AdapterOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(SchemaError::UnresolvedRef(_))));
    }

    #[tokio::test]
    async fn null_any_of_variants_become_nullable() {
        let schema = adapt(json!({
            "anyOf": [ { "type": "integer" }, { "type": "null" } ]
        }))
        .await;
        assert_eq!(schema["type"], "integer");
        assert_eq!(schema["nullable"], true);
        assert!(schema.get("anyOf").is_none());
    }

    #[tokio::test]
    async fn type_arrays_with_null_become_nullable() {
        let schema = adapt(json!({ "type": ["string", "null"] })).await;
        assert_eq!(schema["type"], "string");
        assert_eq!(schema["nullable"], true);
    }

    #[tokio::test]
    async fn multi_variant_any_of_is_preserved() {
        let schema = adapt(json!({
            "anyOf": [ { "type": "integer" }, { "type": "string" } ]
        }))
        .await;
        assert_eq!(schema["anyOf"].as_array().unwrap().len(), 2);
    }
}
