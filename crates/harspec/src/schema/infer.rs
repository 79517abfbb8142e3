//! Built-in structural schema inference.
//!
//! Folds every accumulated sample into one shape: object properties are
//! unioned (and alphabetized by the map keying), every property is
//! optional, conflicting scalar kinds union into `anyOf`, and string
//! literals that consistently match a recognized pattern carry a `format`.

use super::SchemaInferencer;
use crate::error::SchemaError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("valid regex"));
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));
static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[Tt ]\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:?\d{2})?$")
        .expect("valid regex")
});
static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid regex")
});

fn string_format(value: &str) -> Option<&'static str> {
    if value == "true" || value == "false" {
        Some("boolean")
    } else if INTEGER_RE.is_match(value) {
        Some("integer")
    } else if DATE_RE.is_match(value) {
        Some("date")
    } else if DATE_TIME_RE.is_match(value) {
        Some("date-time")
    } else if UUID_RE.is_match(value) {
        Some("uuid")
    } else {
        None
    }
}

/// Accumulated observations for one position in the sample documents.
#[derive(Debug, Default)]
struct Shape {
    saw_null: bool,
    saw_bool: bool,
    saw_int: bool,
    saw_float: bool,
    /// `None` until a string is seen; then the format every observed
    /// string agreed on, or `Some(None)` once they disagree.
    strings: Option<Option<&'static str>>,
    items: Option<Box<Shape>>,
    properties: Option<BTreeMap<String, Shape>>,
}

impl Shape {
    fn observe(&mut self, value: &Value) {
        match value {
            Value::Null => self.saw_null = true,
            Value::Bool(_) => self.saw_bool = true,
            Value::Number(number) => {
                if number.is_i64() || number.is_u64() {
                    self.saw_int = true;
                } else {
                    self.saw_float = true;
                }
            }
            Value::String(text) => {
                let format = string_format(text);
                self.strings = match self.strings.take() {
                    None => Some(format),
                    Some(existing) if existing == format => Some(existing),
                    Some(_) => Some(None),
                };
            }
            Value::Array(elements) => {
                let items = self.items.get_or_insert_with(Box::default);
                for element in elements {
                    items.observe(element);
                }
            }
            Value::Object(fields) => {
                let properties = self.properties.get_or_insert_with(BTreeMap::new);
                for (key, field) in fields {
                    properties.entry(key.clone()).or_default().observe(field);
                }
            }
        }
    }

    /// Schemas for each value kind observed at this position, nulls
    /// excluded (the caller folds `saw_null` in).
    fn variants(&self) -> Vec<Value> {
        let mut variants = Vec::new();
        if self.saw_bool {
            variants.push(json!({ "type": "boolean" }));
        }
        if self.saw_float {
            variants.push(json!({ "type": "number" }));
        } else if self.saw_int {
            variants.push(json!({ "type": "integer" }));
        }
        if let Some(format) = &self.strings {
            let mut schema = Map::new();
            schema.insert("type".to_string(), json!("string"));
            if let Some(format) = format {
                schema.insert("format".to_string(), json!(format));
            }
            variants.push(Value::Object(schema));
        }
        if let Some(items) = &self.items {
            variants.push(json!({ "type": "array", "items": items.to_schema() }));
        }
        if let Some(properties) = &self.properties {
            let fields: Map<String, Value> = properties
                .iter()
                .map(|(key, shape)| (key.clone(), shape.to_schema()))
                .collect();
            variants.push(json!({ "type": "object", "properties": fields }));
        }
        variants
    }

    fn to_schema(&self) -> Value {
        let mut variants = self.variants();
        match (variants.len(), self.saw_null) {
            (0, true) => json!({ "type": "null" }),
            (0, false) => json!({}),
            (1, false) => variants.remove(0),
            (1, true) => {
                variants.push(json!({ "type": "null" }));
                json!({ "anyOf": variants })
            }
            (_, saw_null) => {
                if saw_null {
                    variants.push(json!({ "type": "null" }));
                }
                json!({ "anyOf": variants })
            }
        }
    }
}

/// The default inferencer: a pure structural union over all samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralInferencer;

#[async_trait]
impl SchemaInferencer for StructuralInferencer {
    async fn infer(&self, type_name: &str, samples: &[String]) -> Result<Value, SchemaError> {
        let mut shape = Shape::default();
        for sample in samples {
            let value: Value = serde_json::from_str(sample)?;
            shape.observe(&value);
        }
        let mut schema = shape.to_schema();
        if let Some(object) = schema.as_object_mut() {
            object.insert(
                "$schema".to_string(),
                json!("http://json-schema.org/draft-06/schema#"),
            );
            object.insert("title".to_string(), json!(type_name));
        }
        Ok(schema)
    }
}
