//! # openlrs - Lightweight Learning Record Store
//!
//! A small xAPI-style Learning Record Store backed by SQLite.
//!
//! openlrs provides:
//! - Statement ingestion (single and transactional bulk) with actor/verb/object
//!   deduplication by natural key (mbox, IRI)
//! - Bidirectional mapping between the nested external statement format and the
//!   flat relational rows
//! - Predicate-based statement queries (entity-name substrings, timestamp range)
//! - A token-gated HTTP API and a CLI for serving, seeding, and inspecting a store

pub mod actor;
pub mod verb;
pub mod object;
pub mod statement;
pub mod storage;
pub mod ingest;
pub mod query;
pub mod generate;
pub mod server;
pub mod config;

// Re-exports for convenient access
pub use actor::{Actor, NewActor};
pub use verb::{NewVerb, Verb};
pub use object::{LearningObject, NewObject};
pub use statement::{Statement, XapiStatement};
pub use storage::SqliteStore;

/// Result type alias for openlrs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for openlrs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing natural key: {0}")]
    MissingNaturalKey(&'static str),

    #[error("Unparseable timestamp: {0}")]
    UnparseableTimestamp(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Statement {index} rejected: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error was caused by bad caller input (as opposed to a
    /// storage or programming fault).
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Validation(_)
            | Error::MissingNaturalKey(_)
            | Error::UnparseableTimestamp(_)
            | Error::NotFound { .. } => true,
            Error::Batch { source, .. } => source.is_client_error(),
            _ => false,
        }
    }
}
