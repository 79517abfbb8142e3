//! Harspec: synthesize OpenAPI 3 specifications from recorded HAR traffic.
//!
//! The engine groups capture entries by domain, folds every observation of
//! one (path, method) pair into a single operation, infers body schemas
//! from accumulated example payloads, detects authentication signals from
//! headers and cookies, and emits one deterministic, schema-valid document
//! per domain.
//!
//! # Example
//!
//! ```no_run
//! use harspec::{generate_spec, Har, HarSpecConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), anyhow::Error> {
//! let capture: Har = serde_json::from_str(&std::fs::read_to_string("traffic.har")?)?;
//! let result = generate_spec(capture, HarSpecConfig::default()).await;
//! println!("{}", result.yaml);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod har;
pub mod openapi;
pub mod schema;

mod body;
mod generator;
mod headers;
mod operation;
mod parameterize;
mod response;
mod security;
mod text;

pub use config::{HarSpecConfig, TagRule, TagRules, UrlFilter};
pub use error::{EntryError, SchemaError};
pub use generator::{generate_spec, generate_specs, HarSpec, SpecGenerator};
pub use har::Har;
pub use openapi::OpenApiSpec;
