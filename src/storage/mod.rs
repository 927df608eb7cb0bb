//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - actors(name, mbox UNIQUE, mbox_sha1sum, object_type, account_homepage, account_name)
//! - verbs(name, iri UNIQUE)
//! - learning_objects(name, activity_type, iri UNIQUE, description)
//! - statements(actor_id, verb_id, object_id, result, context, timestamp, stored_at)
//! - auth_tokens(token UNIQUE)

pub mod schema;
pub mod sqlite;

pub use sqlite::{ActorUpdate, DbStats, ObjectUpdate, SqliteStore, StatementRecord, VerbUpdate};
