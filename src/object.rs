//! LearningObject - the activity a statement acts upon

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default xAPI object type for activities
pub const DEFAULT_OBJECT_TYPE: &str = "Activity";

/// A stored learning object (activity) row. `iri` is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningObject {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub iri: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a learning object. `iri` is required; the rest are
/// creation-time defaults that later resolutions never overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewObject {
    pub iri: String,
    pub name: Option<String>,
    pub activity_type: Option<String>,
    pub description: Option<String>,
}

impl NewObject {
    pub fn new(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
