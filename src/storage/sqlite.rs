//! SQLite storage implementation

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::schema;
use crate::actor::{self, Actor, NewActor};
use crate::object::{LearningObject, NewObject};
use crate::query::StatementFilter;
use crate::statement::{self, Statement, StatementParts};
use crate::verb::{NewVerb, Verb};
use crate::{Error, Result};

/// SQLite-backed store for actors, verbs, learning objects, and statements
pub struct SqliteStore {
    conn: Connection,
}

/// A statement joined with its three resolved entities
#[derive(Debug, Clone)]
pub struct StatementRecord {
    pub statement: Statement,
    pub actor: Actor,
    pub verb: Verb,
    pub object: LearningObject,
}

/// Partial update for an actor; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct ActorUpdate {
    pub name: Option<String>,
    pub mbox: Option<String>,
    pub account_homepage: Option<String>,
    pub account_name: Option<String>,
}

/// Partial update for a verb
#[derive(Debug, Clone, Default)]
pub struct VerbUpdate {
    pub name: Option<String>,
    pub iri: Option<String>,
}

/// Partial update for a learning object
#[derive(Debug, Clone, Default)]
pub struct ObjectUpdate {
    pub name: Option<String>,
    pub activity_type: Option<String>,
    pub iri: Option<String>,
    pub description: Option<String>,
}

const RECORD_SELECT: &str = "SELECT \
     s.id, s.actor_id, s.verb_id, s.object_id, s.result, s.context, s.timestamp, s.stored_at, \
     a.id, a.name, a.mbox, a.mbox_sha1sum, a.object_type, a.account_homepage, a.account_name, a.created_at, \
     v.id, v.name, v.iri, v.created_at, \
     o.id, o.name, o.activity_type, o.iri, o.description, o.created_at \
     FROM statements s \
     JOIN actors a ON a.id = s.actor_id \
     JOIN verbs v ON v.id = s.verb_id \
     JOIN learning_objects o ON o.id = s.object_id";

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn ts_column(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn json_column(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<Value>> {
    match raw {
        None => Ok(None),
        Some(text) => serde_json::from_str(&text).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        }),
    }
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON")?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Entity resolution (find-or-create) ==========
    //
    // A resolution hit returns the stored id without touching any field: the
    // first-seen values win permanently. Concurrent creations racing on the
    // same natural key are settled by the unique constraint, after which the
    // loser re-reads the winning row once.

    /// Resolve an actor by exact `mbox`, creating it with the supplied
    /// defaults on first sight
    pub fn resolve_actor(&self, new: &NewActor) -> Result<i64> {
        if new.mbox.is_empty() {
            return Err(Error::MissingNaturalKey("actor.mbox"));
        }
        if let Some(id) = self.actor_id_by_mbox(&new.mbox)? {
            return Ok(id);
        }
        match self.try_insert_actor(new) {
            Ok(id) => Ok(id),
            Err(e) if is_unique_violation(&e) => self
                .actor_id_by_mbox(&new.mbox)?
                .ok_or(Error::Storage(e)),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a verb by exact `iri`, creating it on first sight
    pub fn resolve_verb(&self, new: &NewVerb) -> Result<i64> {
        if new.iri.is_empty() {
            return Err(Error::MissingNaturalKey("verb.id"));
        }
        if let Some(id) = self.verb_id_by_iri(&new.iri)? {
            return Ok(id);
        }
        match self.try_insert_verb(new) {
            Ok(id) => Ok(id),
            Err(e) if is_unique_violation(&e) => {
                self.verb_id_by_iri(&new.iri)?.ok_or(Error::Storage(e))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a learning object by exact `iri`, creating it on first sight
    pub fn resolve_object(&self, new: &NewObject) -> Result<i64> {
        if new.iri.is_empty() {
            return Err(Error::MissingNaturalKey("object.id"));
        }
        if let Some(id) = self.object_id_by_iri(&new.iri)? {
            return Ok(id);
        }
        match self.try_insert_object(new) {
            Ok(id) => Ok(id),
            Err(e) if is_unique_violation(&e) => {
                self.object_id_by_iri(&new.iri)?.ok_or(Error::Storage(e))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn actor_id_by_mbox(&self, mbox: &str) -> Result<Option<i64>> {
        self.conn
            .query_row("SELECT id FROM actors WHERE mbox = ?1", [mbox], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
    }

    fn verb_id_by_iri(&self, iri: &str) -> Result<Option<i64>> {
        self.conn
            .query_row("SELECT id FROM verbs WHERE iri = ?1", [iri], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
    }

    fn object_id_by_iri(&self, iri: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM learning_objects WHERE iri = ?1",
                [iri],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn try_insert_actor(&self, new: &NewActor) -> rusqlite::Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO actors (name, mbox, mbox_sha1sum, object_type, account_homepage, account_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                new.name.as_deref().unwrap_or(""),
                new.mbox,
                actor::mbox_sha1sum(&new.mbox),
                new.object_type.as_deref().unwrap_or(actor::DEFAULT_OBJECT_TYPE),
                new.account_homepage,
                new.account_name,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn try_insert_verb(&self, new: &NewVerb) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO verbs (name, iri, created_at) VALUES (?1, ?2, ?3)",
            params![
                new.name.as_deref().unwrap_or(""),
                new.iri,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn try_insert_object(&self, new: &NewObject) -> rusqlite::Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO learning_objects (name, activity_type, iri, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                new.name.as_deref().unwrap_or(""),
                new.activity_type.as_deref().unwrap_or(""),
                new.iri,
                new.description,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ========== Actor Operations ==========

    /// Create an actor directly (explicit creation, not statement-driven)
    pub fn insert_actor(&self, new: &NewActor) -> Result<Actor> {
        if new.mbox.is_empty() {
            return Err(Error::MissingNaturalKey("actor.mbox"));
        }
        let id = self.try_insert_actor(new)?;
        self.get_actor(id)?
            .ok_or(Error::NotFound { entity: "Actor", id })
    }

    /// Get an actor by id
    pub fn get_actor(&self, id: i64) -> Result<Option<Actor>> {
        self.conn
            .query_row(
                "SELECT id, name, mbox, mbox_sha1sum, object_type, account_homepage, account_name, created_at FROM actors WHERE id = ?1",
                [id],
                |row| Self::row_to_actor(row, 0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all actors
    pub fn list_actors(&self) -> Result<Vec<Actor>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, mbox, mbox_sha1sum, object_type, account_homepage, account_name, created_at FROM actors ORDER BY id",
        )?;
        let actors = stmt
            .query_map([], |row| Self::row_to_actor(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(actors)
    }

    /// Apply a partial update to an actor.
    ///
    /// Statements referencing the actor keep their already-resolved id; a
    /// changed mbox also refreshes the stored digest.
    pub fn update_actor(&self, id: i64, update: &ActorUpdate) -> Result<Actor> {
        let mut current = self
            .get_actor(id)?
            .ok_or(Error::NotFound { entity: "Actor", id })?;

        if let Some(name) = &update.name {
            current.name = name.clone();
        }
        if let Some(mbox) = &update.mbox {
            current.mbox = mbox.clone();
            current.mbox_sha1sum = Some(actor::mbox_sha1sum(mbox));
        }
        if let Some(homepage) = &update.account_homepage {
            current.account_homepage = Some(homepage.clone());
        }
        if let Some(account) = &update.account_name {
            current.account_name = Some(account.clone());
        }

        self.conn.execute(
            r#"
            UPDATE actors SET name = ?1, mbox = ?2, mbox_sha1sum = ?3, account_homepage = ?4, account_name = ?5
            WHERE id = ?6
            "#,
            params![
                current.name,
                current.mbox,
                current.mbox_sha1sum,
                current.account_homepage,
                current.account_name,
                id,
            ],
        )?;
        Ok(current)
    }

    /// Delete an actor; dependent statements cascade
    pub fn delete_actor(&self, id: i64) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM actors WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(Error::NotFound { entity: "Actor", id });
        }
        Ok(())
    }

    fn row_to_actor(row: &rusqlite::Row, base: usize) -> rusqlite::Result<Actor> {
        Ok(Actor {
            id: row.get(base)?,
            name: row.get(base + 1)?,
            mbox: row.get(base + 2)?,
            mbox_sha1sum: row.get(base + 3)?,
            object_type: row.get(base + 4)?,
            account_homepage: row.get(base + 5)?,
            account_name: row.get(base + 6)?,
            created_at: ts_column(base + 7, row.get(base + 7)?)?,
        })
    }

    // ========== Verb Operations ==========

    /// Create a verb directly
    pub fn insert_verb(&self, new: &NewVerb) -> Result<Verb> {
        if new.iri.is_empty() {
            return Err(Error::MissingNaturalKey("verb.id"));
        }
        let id = self.try_insert_verb(new)?;
        self.get_verb(id)?
            .ok_or(Error::NotFound { entity: "Verb", id })
    }

    /// Get a verb by id
    pub fn get_verb(&self, id: i64) -> Result<Option<Verb>> {
        self.conn
            .query_row(
                "SELECT id, name, iri, created_at FROM verbs WHERE id = ?1",
                [id],
                |row| Self::row_to_verb(row, 0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all verbs
    pub fn list_verbs(&self) -> Result<Vec<Verb>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, iri, created_at FROM verbs ORDER BY id")?;
        let verbs = stmt
            .query_map([], |row| Self::row_to_verb(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(verbs)
    }

    /// Apply a partial update to a verb
    pub fn update_verb(&self, id: i64, update: &VerbUpdate) -> Result<Verb> {
        let mut current = self
            .get_verb(id)?
            .ok_or(Error::NotFound { entity: "Verb", id })?;

        if let Some(name) = &update.name {
            current.name = name.clone();
        }
        if let Some(iri) = &update.iri {
            current.iri = iri.clone();
        }

        self.conn.execute(
            "UPDATE verbs SET name = ?1, iri = ?2 WHERE id = ?3",
            params![current.name, current.iri, id],
        )?;
        Ok(current)
    }

    /// Delete a verb; dependent statements cascade
    pub fn delete_verb(&self, id: i64) -> Result<()> {
        let affected = self.conn.execute("DELETE FROM verbs WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(Error::NotFound { entity: "Verb", id });
        }
        Ok(())
    }

    fn row_to_verb(row: &rusqlite::Row, base: usize) -> rusqlite::Result<Verb> {
        Ok(Verb {
            id: row.get(base)?,
            name: row.get(base + 1)?,
            iri: row.get(base + 2)?,
            created_at: ts_column(base + 3, row.get(base + 3)?)?,
        })
    }

    // ========== Learning Object Operations ==========

    /// Create a learning object directly
    pub fn insert_object(&self, new: &NewObject) -> Result<LearningObject> {
        if new.iri.is_empty() {
            return Err(Error::MissingNaturalKey("object.id"));
        }
        let id = self.try_insert_object(new)?;
        self.get_object(id)?
            .ok_or(Error::NotFound { entity: "LearningObject", id })
    }

    /// Get a learning object by id
    pub fn get_object(&self, id: i64) -> Result<Option<LearningObject>> {
        self.conn
            .query_row(
                "SELECT id, name, activity_type, iri, description, created_at FROM learning_objects WHERE id = ?1",
                [id],
                |row| Self::row_to_object(row, 0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all learning objects
    pub fn list_objects(&self) -> Result<Vec<LearningObject>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, activity_type, iri, description, created_at FROM learning_objects ORDER BY id",
        )?;
        let objects = stmt
            .query_map([], |row| Self::row_to_object(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(objects)
    }

    /// Apply a partial update to a learning object
    pub fn update_object(&self, id: i64, update: &ObjectUpdate) -> Result<LearningObject> {
        let mut current = self
            .get_object(id)?
            .ok_or(Error::NotFound { entity: "LearningObject", id })?;

        if let Some(name) = &update.name {
            current.name = name.clone();
        }
        if let Some(activity_type) = &update.activity_type {
            current.activity_type = activity_type.clone();
        }
        if let Some(iri) = &update.iri {
            current.iri = iri.clone();
        }
        if let Some(description) = &update.description {
            current.description = Some(description.clone());
        }

        self.conn.execute(
            r#"
            UPDATE learning_objects SET name = ?1, activity_type = ?2, iri = ?3, description = ?4
            WHERE id = ?5
            "#,
            params![
                current.name,
                current.activity_type,
                current.iri,
                current.description,
                id,
            ],
        )?;
        Ok(current)
    }

    /// Delete a learning object; dependent statements cascade
    pub fn delete_object(&self, id: i64) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM learning_objects WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(Error::NotFound { entity: "LearningObject", id });
        }
        Ok(())
    }

    fn row_to_object(row: &rusqlite::Row, base: usize) -> rusqlite::Result<LearningObject> {
        Ok(LearningObject {
            id: row.get(base)?,
            name: row.get(base + 1)?,
            activity_type: row.get(base + 2)?,
            iri: row.get(base + 3)?,
            description: row.get(base + 4)?,
            created_at: ts_column(base + 5, row.get(base + 5)?)?,
        })
    }

    // ========== Statement Operations ==========

    /// Insert a statement row referencing three resolved entity ids
    pub fn insert_statement(
        &self,
        actor_id: i64,
        verb_id: i64,
        object_id: i64,
        parts: &StatementParts,
    ) -> Result<Statement> {
        let result = parts
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let context = parts
            .context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let stored_at = Utc::now();

        self.conn.execute(
            r#"
            INSERT INTO statements (actor_id, verb_id, object_id, result, context, timestamp, stored_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                actor_id,
                verb_id,
                object_id,
                result,
                context,
                parts.timestamp.to_rfc3339(),
                stored_at.to_rfc3339(),
            ],
        )?;

        Ok(Statement {
            id: self.conn.last_insert_rowid(),
            actor_id,
            verb_id,
            object_id,
            result: parts.result.clone(),
            context: parts.context.clone(),
            timestamp: parts.timestamp,
            stored_at,
        })
    }

    /// Get a statement with its resolved entities
    pub fn get_statement(&self, id: i64) -> Result<Option<StatementRecord>> {
        let sql = format!("{RECORD_SELECT} WHERE s.id = ?1");
        self.conn
            .query_row(&sql, [id], Self::row_to_record)
            .optional()
            .map_err(Into::into)
    }

    /// List all statements with their resolved entities
    pub fn list_statements(&self) -> Result<Vec<StatementRecord>> {
        self.filter_statements(&StatementFilter::default())
    }

    /// Filter statements by entity-name substrings and timestamp range.
    ///
    /// Substring matches are case-insensitive contains; the range applies
    /// only when both bounds are present; all supplied criteria are ANDed.
    pub fn filter_statements(&self, filter: &StatementFilter) -> Result<Vec<StatementRecord>> {
        let mut sql = format!("{RECORD_SELECT} WHERE 1=1");
        let mut args: Vec<String> = Vec::new();

        if let Some(name) = filter.actor_name.as_deref() {
            sql.push_str(&format!(" AND a.name LIKE ?{}", args.len() + 1));
            args.push(format!("%{name}%"));
        }
        if let Some(name) = filter.verb_name.as_deref() {
            sql.push_str(&format!(" AND v.name LIKE ?{}", args.len() + 1));
            args.push(format!("%{name}%"));
        }
        if let Some(name) = filter.object_name.as_deref() {
            sql.push_str(&format!(" AND o.name LIKE ?{}", args.len() + 1));
            args.push(format!("%{name}%"));
        }
        if let (Some(from), Some(to)) = (filter.from_date.as_deref(), filter.to_date.as_deref()) {
            let from = statement::parse_timestamp(from)?;
            let to = statement::parse_timestamp(to)?;
            sql.push_str(&format!(
                " AND s.timestamp BETWEEN ?{} AND ?{}",
                args.len() + 1,
                args.len() + 2
            ));
            args.push(from.to_rfc3339());
            args.push(to.to_rfc3339());
        }
        sql.push_str(" ORDER BY s.id");

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(rusqlite::params_from_iter(args), Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<StatementRecord> {
        let statement = Statement {
            id: row.get(0)?,
            actor_id: row.get(1)?,
            verb_id: row.get(2)?,
            object_id: row.get(3)?,
            result: json_column(4, row.get(4)?)?,
            context: json_column(5, row.get(5)?)?,
            timestamp: ts_column(6, row.get(6)?)?,
            stored_at: ts_column(7, row.get(7)?)?,
        };
        Ok(StatementRecord {
            statement,
            actor: Self::row_to_actor(row, 8)?,
            verb: Self::row_to_verb(row, 16)?,
            object: Self::row_to_object(row, 20)?,
        })
    }

    // ========== Auth Tokens ==========

    /// Register an auth token for the HTTP gate
    pub fn insert_token(&self, token: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO auth_tokens (token, created_at) VALUES (?1, ?2)",
            params![token, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Check whether a token is known
    pub fn token_exists(&self, token: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM auth_tokens WHERE token = ?1",
                [token],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk ingestion
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    // ========== Statistics ==========

    fn count(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn count_actors(&self) -> Result<usize> {
        self.count("actors")
    }

    pub fn count_verbs(&self) -> Result<usize> {
        self.count("verbs")
    }

    pub fn count_objects(&self) -> Result<usize> {
        self.count("learning_objects")
    }

    pub fn count_statements(&self) -> Result<usize> {
        self.count("statements")
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            actors: self.count_actors()?,
            verbs: self.count_verbs()?,
            objects: self.count_objects()?,
            statements: self.count_statements()?,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub actors: usize,
    pub verbs: usize,
    pub objects: usize,
    pub statements: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Actors: {}", self.actors)?;
        writeln!(f, "  Verbs: {}", self.verbs)?;
        writeln!(f, "  Objects: {}", self.objects)?;
        writeln!(f, "  Statements: {}", self.statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_actor(mbox: &str, name: &str) -> NewActor {
        NewActor::new(mbox).with_name(name)
    }

    #[test]
    fn test_resolve_actor_creates_then_reuses() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = store
            .resolve_actor(&sample_actor("mailto:a@x.com", "Alice"))
            .unwrap();
        let second = store
            .resolve_actor(&sample_actor("mailto:a@x.com", "Alice"))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.count_actors().unwrap(), 1);
    }

    #[test]
    fn test_resolve_actor_first_write_wins() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = store
            .resolve_actor(&sample_actor("mailto:a@x.com", "Alice"))
            .unwrap();
        let second = store
            .resolve_actor(&sample_actor("mailto:a@x.com", "Completely Different"))
            .unwrap();
        assert_eq!(first, second);

        let stored = store.get_actor(first).unwrap().unwrap();
        assert_eq!(stored.name, "Alice");
    }

    #[test]
    fn test_resolve_actor_rejects_empty_mbox() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.resolve_actor(&NewActor::default()),
            Err(Error::MissingNaturalKey("actor.mbox"))
        ));
    }

    #[test]
    fn test_resolve_actor_fills_defaults() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .resolve_actor(&NewActor::new("mailto:a@x.com"))
            .unwrap();
        let stored = store.get_actor(id).unwrap().unwrap();
        assert_eq!(stored.object_type, "Agent");
        assert_eq!(stored.name, "");
        assert_eq!(
            stored.mbox_sha1sum.as_deref(),
            Some(crate::actor::mbox_sha1sum("mailto:a@x.com").as_str())
        );
    }

    #[test]
    fn test_resolve_verb_and_object_by_iri() {
        let store = SqliteStore::open_in_memory().unwrap();

        let v1 = store
            .resolve_verb(&NewVerb::new("urn:v").with_name("completed"))
            .unwrap();
        let v2 = store.resolve_verb(&NewVerb::new("urn:v")).unwrap();
        assert_eq!(v1, v2);
        assert_eq!(store.get_verb(v1).unwrap().unwrap().name, "completed");

        let o1 = store
            .resolve_object(&NewObject::new("urn:o").with_name("Mod1"))
            .unwrap();
        let o2 = store.resolve_object(&NewObject::new("urn:o")).unwrap();
        assert_eq!(o1, o2);
    }

    #[test]
    fn test_actor_crud() {
        let store = SqliteStore::open_in_memory().unwrap();
        let created = store
            .insert_actor(&sample_actor("mailto:a@x.com", "Alice"))
            .unwrap();
        assert_eq!(created.name, "Alice");

        let updated = store
            .update_actor(
                created.id,
                &ActorUpdate {
                    name: Some("Alicia".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Alicia");
        assert_eq!(updated.mbox, "mailto:a@x.com");

        store.delete_actor(created.id).unwrap();
        assert!(store.get_actor(created.id).unwrap().is_none());
        assert!(matches!(
            store.delete_actor(created.id),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_mbox_refreshes_digest() {
        let store = SqliteStore::open_in_memory().unwrap();
        let created = store
            .insert_actor(&sample_actor("mailto:a@x.com", "Alice"))
            .unwrap();
        let updated = store
            .update_actor(
                created.id,
                &ActorUpdate {
                    mbox: Some("mailto:b@x.com".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(
            updated.mbox_sha1sum.as_deref(),
            Some(crate::actor::mbox_sha1sum("mailto:b@x.com").as_str())
        );
    }

    #[test]
    fn test_duplicate_direct_insert_is_constraint_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_actor(&sample_actor("mailto:a@x.com", "Alice"))
            .unwrap();
        let err = store
            .insert_actor(&sample_actor("mailto:a@x.com", "Alice"))
            .unwrap_err();
        assert!(matches!(err, Error::Storage(ref e) if is_unique_violation(e)));
    }

    #[test]
    fn test_statement_insert_and_join() {
        let store = SqliteStore::open_in_memory().unwrap();
        let actor_id = store
            .resolve_actor(&sample_actor("mailto:a@x.com", "Alice"))
            .unwrap();
        let verb_id = store
            .resolve_verb(&NewVerb::new("urn:v").with_name("completed"))
            .unwrap();
        let object_id = store
            .resolve_object(&NewObject::new("urn:o").with_name("Mod1"))
            .unwrap();

        let parts = StatementParts {
            actor: sample_actor("mailto:a@x.com", "Alice"),
            verb: NewVerb::new("urn:v"),
            object: NewObject::new("urn:o"),
            result: Some(serde_json::json!({"success": true})),
            context: None,
            timestamp: Utc::now(),
        };
        let stored = store
            .insert_statement(actor_id, verb_id, object_id, &parts)
            .unwrap();

        let record = store.get_statement(stored.id).unwrap().unwrap();
        assert_eq!(record.actor.name, "Alice");
        assert_eq!(record.verb.iri, "urn:v");
        assert_eq!(record.object.name, "Mod1");
        assert_eq!(
            record.statement.result,
            Some(serde_json::json!({"success": true}))
        );
    }

    #[test]
    fn test_delete_actor_cascades_to_statements() {
        let store = SqliteStore::open_in_memory().unwrap();
        let actor_id = store
            .resolve_actor(&sample_actor("mailto:a@x.com", "Alice"))
            .unwrap();
        let verb_id = store.resolve_verb(&NewVerb::new("urn:v")).unwrap();
        let object_id = store.resolve_object(&NewObject::new("urn:o")).unwrap();

        let parts = StatementParts {
            actor: sample_actor("mailto:a@x.com", "Alice"),
            verb: NewVerb::new("urn:v"),
            object: NewObject::new("urn:o"),
            result: None,
            context: None,
            timestamp: Utc::now(),
        };
        store
            .insert_statement(actor_id, verb_id, object_id, &parts)
            .unwrap();
        assert_eq!(store.count_statements().unwrap(), 1);

        store.delete_actor(actor_id).unwrap();
        assert_eq!(store.count_statements().unwrap(), 0);
    }

    #[test]
    fn test_tokens() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(!store.token_exists("secret").unwrap());
        store.insert_token("secret").unwrap();
        assert!(store.token_exists("secret").unwrap());
        // Idempotent
        store.insert_token("secret").unwrap();
    }
}
