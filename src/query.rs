//! Query/Filter Service - predicate-based statement retrieval
//!
//! Criteria: actor/verb/object display-name substrings (case-insensitive
//! contains) and an inclusive timestamp range. The range applies only when
//! both bounds are supplied; a single bound is ignored. All supplied criteria
//! are ANDed, and an empty filter lists everything. Results are rendered back
//! to the external shape.

use serde::Deserialize;

use crate::statement::{self, XapiStatement};
use crate::storage::{SqliteStore, StatementRecord};
use crate::Result;

/// Optional filter criteria for statement retrieval
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementFilter {
    pub actor_name: Option<String>,
    pub verb_name: Option<String>,
    pub object_name: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

fn render_record(record: &StatementRecord) -> XapiStatement {
    statement::render(
        &record.statement,
        &record.actor,
        &record.verb,
        &record.object,
    )
}

/// List all statements in external shape
pub fn list_statements(store: &SqliteStore) -> Result<Vec<XapiStatement>> {
    Ok(store
        .list_statements()?
        .iter()
        .map(render_record)
        .collect())
}

/// Filter statements by the supplied criteria, external shape out
pub fn filter_statements(
    store: &SqliteStore,
    filter: &StatementFilter,
) -> Result<Vec<XapiStatement>> {
    Ok(store
        .filter_statements(filter)?
        .iter()
        .map(render_record)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest;
    use serde_json::json;

    fn seed(store: &mut SqliteStore, name: &str, mbox: &str, timestamp: &str) {
        let external: XapiStatement = serde_json::from_value(json!({
            "actor": {"mbox": mbox, "name": name},
            "verb": {"id": "urn:v", "display": {"en-US": "completed"}},
            "object": {"id": "urn:o", "definition": {"name": {"en-US": "Mod1"}}},
            "timestamp": timestamp
        }))
        .unwrap();
        ingest::ingest_one(store, external).unwrap();
    }

    #[test]
    fn test_empty_filter_lists_all() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed(&mut store, "John Doe", "mailto:john@x.com", "2024-01-10T09:00:00Z");
        seed(&mut store, "Jane Roe", "mailto:jane@x.com", "2024-02-10T09:00:00Z");

        let all = filter_statements(&store, &StatementFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all, list_statements(&store).unwrap());
    }

    #[test]
    fn test_actor_name_contains_case_insensitive() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed(&mut store, "John Doe", "mailto:john@x.com", "2024-01-10T09:00:00Z");
        seed(&mut store, "Jane Roe", "mailto:jane@x.com", "2024-02-10T09:00:00Z");

        let filter = StatementFilter {
            actor_name: Some("john".to_string()),
            ..Default::default()
        };
        let hits = filter_statements(&store, &filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].actor.name.as_deref(), Some("John Doe"));
    }

    #[test]
    fn test_criteria_are_anded() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed(&mut store, "John Doe", "mailto:john@x.com", "2024-01-10T09:00:00Z");
        seed(&mut store, "John Doe", "mailto:john@x.com", "2024-03-10T09:00:00Z");

        // Name matches both, range excludes the later one
        let filter = StatementFilter {
            actor_name: Some("John".to_string()),
            from_date: Some("2024-01-01T00:00:00Z".to_string()),
            to_date: Some("2024-01-31T23:59:59Z".to_string()),
            ..Default::default()
        };
        let hits = filter_statements(&store, &filter).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_range_requires_both_bounds() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed(&mut store, "John Doe", "mailto:john@x.com", "2024-01-10T09:00:00Z");
        seed(&mut store, "Jane Roe", "mailto:jane@x.com", "2024-02-10T09:00:00Z");

        let filter = StatementFilter {
            from_date: Some("2024-02-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        // A lone bound is ignored, not an error
        let hits = filter_statements(&store, &filter).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed(&mut store, "John Doe", "mailto:john@x.com", "2024-01-10T09:00:00Z");

        let filter = StatementFilter {
            from_date: Some("2024-01-10T09:00:00Z".to_string()),
            to_date: Some("2024-01-10T09:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_statements(&store, &filter).unwrap().len(), 1);
    }

    #[test]
    fn test_verb_and_object_name_filters() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed(&mut store, "John Doe", "mailto:john@x.com", "2024-01-10T09:00:00Z");

        let filter = StatementFilter {
            verb_name: Some("complet".to_string()),
            object_name: Some("mod".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_statements(&store, &filter).unwrap().len(), 1);

        let miss = StatementFilter {
            verb_name: Some("attempted".to_string()),
            ..Default::default()
        };
        assert!(filter_statements(&store, &miss).unwrap().is_empty());
    }
}
