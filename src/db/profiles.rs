//! Client profile storage
//!
//! At most one row per `user_id`. A missing row is a valid state, distinct
//! from a row whose fields are all empty.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Deserialize;
use tracing::debug;

use super::models::{current_timestamp, deserialize_present, ClientProfileRow};
use super::partial_update::{PartialUpdate, Scope};
use crate::error::IntakeError;

const PROFILE_COLUMNS: &str = "id, user_id, first_name, last_name, phone, address, date_of_birth,
     emergency_contact_name, emergency_contact_phone, advocacy_needs, case_status,
     created_at, updated_at";

impl ClientProfileRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            phone: row.get("phone")?,
            address: row.get("address")?,
            date_of_birth: row.get("date_of_birth")?,
            emergency_contact_name: row.get("emergency_contact_name")?,
            emergency_contact_phone: row.get("emergency_contact_phone")?,
            advocacy_needs: row.get("advocacy_needs")?,
            case_status: row.get("case_status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Client-writable profile fields.
///
/// Each field is `None` when the key was absent, `Some(None)` for an explicit
/// `null`, and `Some(Some(_))` for a value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, deserialize_with = "deserialize_present")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub date_of_birth: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub emergency_contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub emergency_contact_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub advocacy_needs: Option<Option<String>>,
}

impl ProfilePatch {
    /// Candidate fields in declaration order
    pub fn fields(&self) -> [(&'static str, &Option<Option<String>>); 8] {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("date_of_birth", &self.date_of_birth),
            ("emergency_contact_name", &self.emergency_contact_name),
            ("emergency_contact_phone", &self.emergency_contact_phone),
            ("advocacy_needs", &self.advocacy_needs),
        ]
    }

    /// Number of keys present in the input
    pub fn present_count(&self) -> usize {
        self.fields().iter().filter(|(_, f)| f.is_some()).count()
    }

    /// Value for a fresh row: absent, null and empty all store NULL
    fn insert_value(field: &Option<Option<String>>) -> Option<&str> {
        field
            .as_ref()
            .and_then(|v| v.as_deref())
            .filter(|v| !v.is_empty())
    }
}

/// Get the profile owned by a user
pub fn get_profile(
    conn: &Connection,
    user_id: &str,
) -> Result<Option<ClientProfileRow>, IntakeError> {
    let sql = format!("SELECT {} FROM client_profiles WHERE user_id = ?", PROFILE_COLUMNS);

    conn.query_row(&sql, params![user_id], ClientProfileRow::from_row)
        .optional()
        .map_err(|e| IntakeError::Storage(format!("Failed to get profile: {}", e)))
}

/// Insert the first profile row for a user
pub fn insert_profile(
    conn: &Connection,
    user_id: &str,
    patch: &ProfilePatch,
) -> Result<ClientProfileRow, IntakeError> {
    let now = current_timestamp();

    conn.execute(
        "INSERT INTO client_profiles (
            user_id, first_name, last_name, phone, address, date_of_birth,
            emergency_contact_name, emergency_contact_phone, advocacy_needs,
            created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            user_id,
            ProfilePatch::insert_value(&patch.first_name),
            ProfilePatch::insert_value(&patch.last_name),
            ProfilePatch::insert_value(&patch.phone),
            ProfilePatch::insert_value(&patch.address),
            ProfilePatch::insert_value(&patch.date_of_birth),
            ProfilePatch::insert_value(&patch.emergency_contact_name),
            ProfilePatch::insert_value(&patch.emergency_contact_phone),
            ProfilePatch::insert_value(&patch.advocacy_needs),
            now,
            now,
        ],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to insert profile: {}", e)))?;

    debug!(user_id = %user_id, "Inserted client profile");

    get_profile(conn, user_id)?
        .ok_or_else(|| IntakeError::Storage("Failed to retrieve created profile".into()))
}

/// Apply the present fields of a patch to an existing profile.
///
/// Fails with `NoOp` if the patch has no present field.
pub fn update_profile(
    conn: &Connection,
    user_id: &str,
    patch: &ProfilePatch,
) -> Result<ClientProfileRow, IntakeError> {
    let update = patch
        .fields()
        .into_iter()
        .fold(PartialUpdate::new("client_profiles"), |update, (column, field)| {
            update.set_present(column, field)
        })
        .build(&current_timestamp(), Scope::UserId(user_id.to_string()))?;

    let rows = conn
        .execute(&update.sql, params_from_iter(update.params.iter()))
        .map_err(|e| IntakeError::Storage(format!("Failed to update profile: {}", e)))?;

    if rows == 0 {
        return Err(IntakeError::NotFound(format!("Profile for {} not found", user_id)));
    }

    debug!(user_id = %user_id, fields = patch.present_count(), "Updated client profile");

    get_profile(conn, user_id)?
        .ok_or_else(|| IntakeError::Storage("Failed to retrieve updated profile".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::IntakeDb;

    fn db() -> IntakeDb {
        IntakeDb::open_in_memory().unwrap()
    }

    #[test]
    fn test_patch_distinguishes_absent_from_null() {
        let patch: ProfilePatch =
            serde_json::from_str(r#"{"first_name": "Ada", "phone": null}"#).unwrap();
        assert_eq!(patch.first_name, Some(Some("Ada".into())));
        assert_eq!(patch.phone, Some(None));
        assert_eq!(patch.last_name, None);
        assert_eq!(patch.present_count(), 2);
    }

    #[test]
    fn test_insert_stores_empty_as_null() {
        let db = db();
        let patch: ProfilePatch =
            serde_json::from_str(r#"{"first_name": "", "last_name": "Lovelace"}"#).unwrap();

        let row = db.with_conn(|conn| insert_profile(conn, "u1", &patch)).unwrap();
        assert_eq!(row.first_name, None);
        assert_eq!(row.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(row.created_at, row.updated_at);
    }

    #[test]
    fn test_update_touches_only_present_fields() {
        let db = db();
        db.with_conn(|conn| {
            let first: ProfilePatch =
                serde_json::from_str(r#"{"first_name": "Ada", "phone": "555-0100"}"#).unwrap();
            insert_profile(conn, "u1", &first)?;

            let second: ProfilePatch =
                serde_json::from_str(r#"{"phone": null, "address": "1 Analytical Way"}"#).unwrap();
            let row = update_profile(conn, "u1", &second)?;

            assert_eq!(row.first_name.as_deref(), Some("Ada"));
            assert_eq!(row.phone, None);
            assert_eq!(row.address.as_deref(), Some("1 Analytical Way"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_without_fields_is_noop() {
        let db = db();
        let err = db
            .with_conn(|conn| {
                insert_profile(conn, "u1", &ProfilePatch::default())?;
                update_profile(conn, "u1", &ProfilePatch::default())
            })
            .unwrap_err();
        assert!(matches!(err, IntakeError::NoOp(_)));
    }

    #[test]
    fn test_get_missing_profile() {
        let db = db();
        assert!(db.with_conn(|conn| get_profile(conn, "u1")).unwrap().is_none());
    }
}
