//! SQLite storage for the intake portal
//!
//! ## Tables
//!
//! - `users` - Identity directory mirrored from caller claims
//! - `client_profiles` - One advocacy profile per client (`user_id` unique)
//! - `client_requests` - Advocacy requests and their review workflow
//!
//! Repository functions take a `&Connection` and never check who is calling;
//! authorization happens in the service layer before they are reached.

pub mod schema;
pub mod models;
pub mod partial_update;
pub mod users;
pub mod profiles;
pub mod requests;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::IntakeError;

/// Database file name inside the storage directory
pub const DB_FILE_NAME: &str = "intake.db";

/// SQLite database for profiles and requests
pub struct IntakeDb {
    conn: Mutex<Connection>,
}

impl IntakeDb {
    /// Open or create the intake database
    pub fn open(storage_dir: &Path) -> Result<Self, IntakeError> {
        let db_path = storage_dir.join(DB_FILE_NAME);
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(&db_path)
            .map_err(|e| IntakeError::Storage(format!("Failed to open SQLite: {}", e)))?;

        // WAL for concurrent readers
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| IntakeError::Storage(format!("Failed to set PRAGMA: {}", e)))?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, IntakeError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| IntakeError::Storage(format!("Failed to open in-memory SQLite: {}", e)))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, IntakeError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    fn init_schema(&self) -> Result<(), IntakeError> {
        self.with_conn(schema::init_schema)
    }

    /// Run a read with the shared connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, IntakeError>
    where
        F: FnOnce(&Connection) -> Result<T, IntakeError>,
    {
        let conn = self.conn.lock()
            .map_err(|e| IntakeError::Storage(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, IntakeError>
    where
        F: FnOnce(&mut Connection) -> Result<T, IntakeError>,
    {
        let mut conn = self.conn.lock()
            .map_err(|e| IntakeError::Storage(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Run `f` inside a transaction, committing only if it succeeds
    pub fn transaction<F, T>(&self, f: F) -> Result<T, IntakeError>
    where
        F: FnOnce(&Connection) -> Result<T, IntakeError>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()
                .map_err(|e| IntakeError::Storage(format!("Failed to start transaction: {}", e)))?;
            let value = f(&*tx)?;
            tx.commit()
                .map_err(|e| IntakeError::Storage(format!("Failed to commit transaction: {}", e)))?;
            Ok(value)
        })
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, IntakeError> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<u64, IntakeError> {
                let sql = format!("SELECT COUNT(*) FROM {}", table);
                conn.query_row(&sql, [], |row| row.get::<_, i64>(0))
                    .map(|n| n as u64)
                    .map_err(|e| IntakeError::Storage(format!("Query failed: {}", e)))
            };

            Ok(DbStats {
                user_count: count("users")?,
                profile_count: count("client_profiles")?,
                request_count: count("client_requests")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub user_count: u64,
    pub profile_count: u64,
    pub request_count: u64,
}

// Re-exports
pub use models::{
    AdminRequestView, ClientProfileRow, ClientRequestRow, Priority, RequestStats, RequestStatus,
    RequestType, UserRecord,
};
pub use partial_update::{PartialUpdate, Scope, UpdateStatement};
pub use profiles::ProfilePatch;
pub use requests::NewRequest;
