//! Verb - the action vocabulary term of a statement

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored verb row. `iri` is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verb {
    pub id: i64,
    pub name: String,
    pub iri: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a verb. `iri` is required; `name` is a creation-time
/// default that later resolutions never overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewVerb {
    pub iri: String,
    pub name: Option<String>,
}

impl NewVerb {
    pub fn new(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
