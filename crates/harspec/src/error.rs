//! Error taxonomy.
//!
//! Nothing in this crate is fatal to a whole run: entry-level errors are
//! collected and logged by the orchestrator, schema errors degrade to
//! permissive fallback schemas. The types exist so the partial-failure
//! contract is explicit rather than implicit.

use thiserror::Error;

/// A recoverable failure while processing one capture entry. The
/// orchestrator collects these and moves on to the next entry.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("failed to parse url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// A failure inside the schema inference/adaptation collaborators.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid sample json: {0}")]
    InvalidSample(#[from] serde_json::Error),

    #[error("unresolved schema reference `{0}`")]
    UnresolvedRef(String),

    #[error("circular schema reference at `{0}`")]
    CircularRef(String),
}
