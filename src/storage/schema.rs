//! Database schema definitions

/// SQL to create the actors table
pub const CREATE_ACTORS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS actors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL DEFAULT '',
    mbox TEXT NOT NULL UNIQUE,
    mbox_sha1sum TEXT,
    object_type TEXT NOT NULL DEFAULT 'Agent',
    account_homepage TEXT,
    account_name TEXT,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create the verbs table
pub const CREATE_VERBS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS verbs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL DEFAULT '',
    iri TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create the learning_objects table
pub const CREATE_LEARNING_OBJECTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS learning_objects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL DEFAULT '',
    activity_type TEXT NOT NULL DEFAULT '',
    iri TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create the statements table.
/// Entities are referenced, not owned: deleting a referenced entity cascades
/// to its dependent statements.
pub const CREATE_STATEMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS statements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor_id INTEGER NOT NULL REFERENCES actors(id) ON DELETE CASCADE,
    verb_id INTEGER NOT NULL REFERENCES verbs(id) ON DELETE CASCADE,
    object_id INTEGER NOT NULL REFERENCES learning_objects(id) ON DELETE CASCADE,
    result TEXT,
    context TEXT,
    timestamp TEXT NOT NULL,
    stored_at TEXT NOT NULL
)
"#;

/// SQL to create the auth_tokens table (consumed by the HTTP auth gate)
pub const CREATE_AUTH_TOKENS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS auth_tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    token TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_actors_name ON actors(name)",
    "CREATE INDEX IF NOT EXISTS idx_verbs_name ON verbs(name)",
    "CREATE INDEX IF NOT EXISTS idx_learning_objects_name ON learning_objects(name)",
    "CREATE INDEX IF NOT EXISTS idx_statements_actor ON statements(actor_id)",
    "CREATE INDEX IF NOT EXISTS idx_statements_verb ON statements(verb_id)",
    "CREATE INDEX IF NOT EXISTS idx_statements_object ON statements(object_id)",
    "CREATE INDEX IF NOT EXISTS idx_statements_timestamp ON statements(timestamp)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_ACTORS_TABLE,
        CREATE_VERBS_TABLE,
        CREATE_LEARNING_OBJECTS_TABLE,
        CREATE_STATEMENTS_TABLE,
        CREATE_AUTH_TOKENS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
