//! Ingestion Service - single and bulk statement entry points
//!
//! `ingest_one` persists one statement: extract, resolve the three entities,
//! insert the row, render the stored result. `ingest_bulk` does the same for a
//! whole batch inside one transaction: items are processed in order, entities
//! created by an earlier item are reused by later ones through a batch-local
//! cache, and any failure rolls the entire batch back.

use std::collections::HashMap;

use crate::statement::{self, XapiStatement};
use crate::storage::SqliteStore;
use crate::{Error, Result};

/// Batch-local natural-key -> id cache, so entities created earlier in the
/// same batch are reused without re-querying storage
#[derive(Debug, Default)]
struct EntityCache {
    actors: HashMap<String, i64>,
    verbs: HashMap<String, i64>,
    objects: HashMap<String, i64>,
}

/// Ingest a single external statement, returning its stored external shape
pub fn ingest_one(store: &mut SqliteStore, external: XapiStatement) -> Result<XapiStatement> {
    let mut cache = EntityCache::default();
    ingest_item(store, &mut cache, external)
}

/// Ingest a batch of external statements all-or-nothing.
///
/// On failure no statement or entity from the batch is persisted, and the
/// returned `Error::Batch` names the failing index and reason.
pub fn ingest_bulk(
    store: &mut SqliteStore,
    batch: Vec<XapiStatement>,
) -> Result<Vec<XapiStatement>> {
    store.begin_transaction()?;
    match ingest_batch(store, batch) {
        Ok(created) => {
            store.commit()?;
            Ok(created)
        }
        Err(e) => {
            if let Err(rollback_err) = store.rollback() {
                tracing::error!("Failed to roll back batch: {}", rollback_err);
            }
            Err(e)
        }
    }
}

fn ingest_batch(
    store: &mut SqliteStore,
    batch: Vec<XapiStatement>,
) -> Result<Vec<XapiStatement>> {
    let mut cache = EntityCache::default();
    let mut created = Vec::with_capacity(batch.len());
    for (index, external) in batch.into_iter().enumerate() {
        match ingest_item(store, &mut cache, external) {
            Ok(stored) => created.push(stored),
            Err(source) => {
                return Err(Error::Batch {
                    index,
                    source: Box::new(source),
                })
            }
        }
    }
    Ok(created)
}

fn ingest_item(
    store: &mut SqliteStore,
    cache: &mut EntityCache,
    external: XapiStatement,
) -> Result<XapiStatement> {
    let parts = statement::extract(&external)?;

    let actor_id = match cache.actors.get(&parts.actor.mbox) {
        Some(&id) => id,
        None => {
            let id = store.resolve_actor(&parts.actor)?;
            cache.actors.insert(parts.actor.mbox.clone(), id);
            id
        }
    };
    let verb_id = match cache.verbs.get(&parts.verb.iri) {
        Some(&id) => id,
        None => {
            let id = store.resolve_verb(&parts.verb)?;
            cache.verbs.insert(parts.verb.iri.clone(), id);
            id
        }
    };
    let object_id = match cache.objects.get(&parts.object.iri) {
        Some(&id) => id,
        None => {
            let id = store.resolve_object(&parts.object)?;
            cache.objects.insert(parts.object.iri.clone(), id);
            id
        }
    };

    let stored = store.insert_statement(actor_id, verb_id, object_id, &parts)?;
    tracing::debug!(
        statement_id = stored.id,
        actor_id,
        verb_id,
        object_id,
        "Stored statement"
    );

    let actor = store
        .get_actor(actor_id)?
        .ok_or(Error::NotFound { entity: "Actor", id: actor_id })?;
    let verb = store
        .get_verb(verb_id)?
        .ok_or(Error::NotFound { entity: "Verb", id: verb_id })?;
    let object = store
        .get_object(object_id)?
        .ok_or(Error::NotFound { entity: "LearningObject", id: object_id })?;

    Ok(statement::render(&stored, &actor, &verb, &object))
}
