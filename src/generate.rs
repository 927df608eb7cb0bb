//! Synthetic xAPI data generation for seeding and load-testing a store

use chrono::{Duration, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;

use crate::ingest;
use crate::statement::XapiStatement;
use crate::storage::SqliteStore;
use crate::Result;

const ACTIVITIES: &[(&str, &str, &str)] = &[
    (
        "http://example.com/activities/h5p-multiple-choice",
        "H5P Multiple Choice",
        "A multiple-choice activity.",
    ),
    (
        "http://example.com/activities/h5p-interactive-video",
        "H5P Interactive Video",
        "An interactive video activity.",
    ),
    (
        "http://example.com/activities/h5p-drag-and-drop",
        "H5P Drag and Drop",
        "A drag-and-drop activity.",
    ),
    (
        "http://example.com/activities/h5p-quiz",
        "H5P Quiz",
        "A quiz activity.",
    ),
    (
        "http://example.com/activities/h5p-summary",
        "H5P Summary",
        "A summary activity.",
    ),
];

const USERS: &[(&str, &str)] = &[
    ("Alice Johnson", "alice.johnson@example.com"),
    ("Bob Smith", "bob.smith@example.com"),
    ("Charlie Brown", "charlie.brown@example.com"),
    ("Diana Prince", "diana.prince@example.com"),
    ("Ethan Hunt", "ethan.hunt@example.com"),
];

const VERBS: &[(&str, &str)] = &[
    ("http://adlnet.gov/expapi/verbs/completed", "completed"),
    ("http://adlnet.gov/expapi/verbs/attempted", "attempted"),
    ("http://adlnet.gov/expapi/verbs/answered", "answered"),
    ("http://adlnet.gov/expapi/verbs/experienced", "experienced"),
];

/// Build one random statement from the sample pools
pub fn sample_statement(rng: &mut impl Rng) -> XapiStatement {
    let (activity_iri, activity_name, activity_description) =
        ACTIVITIES.choose(rng).copied().unwrap_or(ACTIVITIES[0]);
    let (user_name, user_email) = USERS.choose(rng).copied().unwrap_or(USERS[0]);
    let (verb_iri, verb_name) = VERBS.choose(rng).copied().unwrap_or(VERBS[0]);

    let scaled: f64 = rng.gen_range(0.0..=1.0);
    let timestamp = Utc::now() - Duration::minutes(rng.gen_range(0..60 * 24 * 30));

    serde_json::from_value(json!({
        "actor": {
            "objectType": "Agent",
            "name": user_name,
            "mbox": format!("mailto:{user_email}"),
        },
        "verb": {
            "id": verb_iri,
            "display": {"en-US": verb_name},
        },
        "object": {
            "objectType": "Activity",
            "id": activity_iri,
            "definition": {
                "name": {"en-US": activity_name},
                "description": {"en-US": activity_description},
            },
        },
        "result": {
            "success": scaled >= 0.5,
            "completion": rng.gen_bool(0.8),
            "score": {"scaled": (scaled * 100.0).round() / 100.0},
        },
        "context": {
            "platform": "openlrs-generator",
        },
        "timestamp": timestamp.to_rfc3339(),
    }))
    .expect("generated statement matches the external shape")
}

/// Generate `count` statements and bulk-ingest them in batches of `bulk_size`
pub fn generate(store: &mut SqliteStore, count: usize, bulk_size: usize) -> Result<usize> {
    let bulk_size = bulk_size.max(1);
    let mut rng = rand::thread_rng();

    let bar = ProgressBar::new(count as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} statements")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut batch = Vec::with_capacity(bulk_size);
    for i in 0..count {
        batch.push(sample_statement(&mut rng));
        if batch.len() == bulk_size || i == count - 1 {
            let size = batch.len();
            ingest::ingest_bulk(store, std::mem::take(&mut batch))?;
            bar.inc(size as u64);
            tracing::debug!("Ingested batch of {} statements", size);
        }
    }
    bar.finish();

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement;

    #[test]
    fn test_sample_statement_is_ingestable() {
        let mut rng = rand::thread_rng();
        let external = sample_statement(&mut rng);
        let parts = statement::extract(&external).unwrap();
        assert!(parts.actor.mbox.starts_with("mailto:"));
        assert!(!parts.verb.iri.is_empty());
        assert!(parts.result.is_some());
    }

    #[test]
    fn test_generate_persists_count() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let created = generate(&mut store, 25, 10).unwrap();
        assert_eq!(created, 25);
        assert_eq!(store.count_statements().unwrap(), 25);
        // Sample pools are small, entities dedup hard
        assert!(store.count_actors().unwrap() <= USERS.len());
        assert!(store.count_verbs().unwrap() <= VERBS.len());
        assert!(store.count_objects().unwrap() <= ACTIVITIES.len());
    }
}
