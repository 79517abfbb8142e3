//! Schema collaborators.
//!
//! Body shape synthesis is delegated to two seams: a [`SchemaInferencer`]
//! that folds concrete JSON samples into a structural JSON-Schema document,
//! and a [`SchemaAdapter`] that turns that document into an OpenAPI-
//! compatible schema object. Built-in implementations are provided
//! ([`StructuralInferencer`], [`DerefAdapter`]); the generator accepts
//! alternatives for callers with their own inference stack.

mod adapt;
mod infer;

pub use adapt::DerefAdapter;
pub use infer::StructuralInferencer;

use crate::error::SchemaError;
use async_trait::async_trait;
use serde_json::Value;

/// Policy for circular `$ref` chains encountered during dereferencing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CircularRefPolicy {
    /// Break the cycle: the edge that closes it resolves to the empty
    /// schema.
    #[default]
    Ignore,
    /// Fail adaptation with [`SchemaError::CircularRef`].
    Error,
}

#[derive(Debug, Clone, Copy)]
pub struct AdapterOptions {
    pub dereference: bool,
    pub circular: CircularRefPolicy,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        AdapterOptions {
            dereference: true,
            circular: CircularRefPolicy::Ignore,
        }
    }
}

/// Folds one or more JSON sample documents into a structural schema.
///
/// Implementations must tolerate heterogeneous samples and must not fail on
/// ordinary JSON input; the per-sample strings are expected to be valid
/// JSON (the accumulator only stores re-serialized parsed values).
#[async_trait]
pub trait SchemaInferencer: Send + Sync {
    async fn infer(&self, type_name: &str, samples: &[String]) -> Result<Value, SchemaError>;
}

/// Converts a JSON-Schema-like document into an OpenAPI-compatible schema
/// object.
#[async_trait]
pub trait SchemaAdapter: Send + Sync {
    async fn adapt(&self, schema: Value, options: &AdapterOptions) -> Result<Value, SchemaError>;
}
