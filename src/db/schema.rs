//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::error::IntakeError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), IntakeError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, IntakeError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to create schema_version table: {}", e)))?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), IntakeError> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| IntakeError::Storage(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .map_err(|e| IntakeError::Storage(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<(), IntakeError> {
    conn.execute_batch(USERS_SCHEMA)
        .map_err(|e| IntakeError::Storage(format!("Failed to create users table: {}", e)))?;

    conn.execute_batch(PROFILES_SCHEMA)
        .map_err(|e| IntakeError::Storage(format!("Failed to create profile table: {}", e)))?;

    conn.execute_batch(REQUESTS_SCHEMA)
        .map_err(|e| IntakeError::Storage(format!("Failed to create request table: {}", e)))?;

    conn.execute_batch(INDEXES_SCHEMA)
        .map_err(|e| IntakeError::Storage(format!("Failed to create indexes: {}", e)))?;

    Ok(())
}

/// Identity directory mirrored from the identity provider
const USERS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    email TEXT,
    role TEXT NOT NULL DEFAULT 'client',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// One advocacy profile per client
const PROFILES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS client_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    -- Identity provider id; the directory row is optional
    user_id TEXT NOT NULL UNIQUE,

    first_name TEXT,
    last_name TEXT,
    phone TEXT,
    address TEXT,
    date_of_birth TEXT,
    emergency_contact_name TEXT,
    emergency_contact_phone TEXT,
    advocacy_needs TEXT,

    -- Free text, managed by staff. Presentation shows 'Active' when NULL.
    case_status TEXT,

    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Client requests and their review workflow
const REQUESTS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS client_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,

    request_type TEXT NOT NULL CHECK (request_type IN ('new', 'update')),
    title TEXT NOT NULL,
    scope_of_enquiry TEXT NOT NULL,
    timeframe TEXT,
    priority TEXT NOT NULL DEFAULT 'medium'
        CHECK (priority IN ('low', 'medium', 'high', 'urgent')),
    notes TEXT,

    -- JSON array of attachment descriptors
    documents TEXT NOT NULL DEFAULT '[]',

    -- Weak reference, never validated for existence
    related_request_id INTEGER,

    admin_notes TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'under_review', 'accepted', 'denied', 'completed')),

    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    reviewed_at TEXT,
    completed_at TEXT
);
"#;

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_client_requests_user ON client_requests(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_client_requests_created ON client_requests(created_at);
CREATE INDEX IF NOT EXISTS idx_client_requests_status ON client_requests(status);
"#;
