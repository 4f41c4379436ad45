//! Identity directory
//!
//! Local mirror of the identity provider's user records. Rows are written
//! from verified caller claims and read by the admin request listing.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::models::{current_timestamp, UserRecord};
use crate::error::IntakeError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CLIENT: &str = "client";

/// Get a directory entry by user ID
pub fn get_user(conn: &Connection, id: &str) -> Result<Option<UserRecord>, IntakeError> {
    conn.query_row(
        "SELECT id, name, email, role FROM users WHERE id = ?",
        params![id],
        |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                role: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(|e| IntakeError::Storage(format!("Failed to get user: {}", e)))
}

/// Whether a stored entry already reflects the claims.
///
/// Absent name/email in the claims never count as a change.
pub fn matches_claims(stored: &UserRecord, claims: &UserRecord) -> bool {
    stored.role == claims.role
        && (claims.name.is_none() || claims.name == stored.name)
        && (claims.email.is_none() || claims.email == stored.email)
}

/// Write a directory entry only if it differs from what is on file.
///
/// Returns the stored entry and whether a write happened.
pub fn sync_user(
    conn: &Connection,
    claims: &UserRecord,
) -> Result<(UserRecord, bool), IntakeError> {
    if let Some(stored) = get_user(conn, &claims.id)? {
        if matches_claims(&stored, claims) {
            return Ok((stored, false));
        }
    }

    let stored = upsert_user(conn, claims)?;
    debug!(user_id = %stored.id, role = %stored.role, "Directory entry written");
    Ok((stored, true))
}

/// Insert or refresh a directory entry from verified claims.
///
/// Absent name/email never overwrite values already on file.
pub fn upsert_user(conn: &Connection, user: &UserRecord) -> Result<UserRecord, IntakeError> {
    let now = current_timestamp();
    conn.execute(
        "INSERT INTO users (id, name, email, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(id) DO UPDATE SET
         name = COALESCE(excluded.name, users.name),
         email = COALESCE(excluded.email, users.email),
         role = excluded.role,
         updated_at = excluded.updated_at",
        params![user.id, user.name, user.email, user.role, now],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to upsert user: {}", e)))?;

    get_user(conn, &user.id)?
        .ok_or_else(|| IntakeError::Storage("Failed to retrieve upserted user".into()))
}
