//! Client request storage
//!
//! Rows are created by their owning client and only ever updated through
//! [`apply_update`] with a statement from the partial update builder.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;

use super::models::{
    current_timestamp, AdminRequestView, ClientRequestRow, JoinedProfile, Priority,
    RequestOwner, RequestStats, RequestStatus, RequestType,
};
use super::partial_update::UpdateStatement;
use crate::error::IntakeError;

const REQUEST_COLUMNS: [&str; 16] = [
    "id",
    "user_id",
    "request_type",
    "title",
    "scope_of_enquiry",
    "timeframe",
    "priority",
    "notes",
    "documents",
    "related_request_id",
    "admin_notes",
    "status",
    "created_at",
    "updated_at",
    "reviewed_at",
    "completed_at",
];

/// Newest first; rows created in the same instant keep insertion order
const LISTING_ORDER: &str = "ORDER BY cr.created_at DESC, cr.id ASC";

fn request_columns() -> String {
    REQUEST_COLUMNS
        .iter()
        .map(|column| format!("cr.{0} AS {0}", column))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ClientRequestRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let documents = match row.get::<_, serde_json::Value>("documents")? {
            serde_json::Value::Array(items) => items,
            _ => Vec::new(),
        };

        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            request_type: row.get("request_type")?,
            title: row.get("title")?,
            scope_of_enquiry: row.get("scope_of_enquiry")?,
            timeframe: row.get("timeframe")?,
            priority: row.get("priority")?,
            notes: row.get("notes")?,
            documents,
            related_request_id: row.get("related_request_id")?,
            admin_notes: row.get("admin_notes")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            reviewed_at: row.get("reviewed_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Validated fields for a new request
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequest {
    pub request_type: RequestType,
    pub title: String,
    pub scope_of_enquiry: String,
    pub timeframe: Option<String>,
    pub priority: Priority,
    pub notes: Option<String>,
    pub documents: Vec<serde_json::Value>,
    pub related_request_id: Option<i64>,
}

/// Get a request by ID
pub fn get_request(conn: &Connection, id: i64) -> Result<Option<ClientRequestRow>, IntakeError> {
    let sql = format!("SELECT {} FROM client_requests cr WHERE cr.id = ?", request_columns());

    conn.query_row(&sql, params![id], ClientRequestRow::from_row)
        .optional()
        .map_err(|e| IntakeError::Storage(format!("Failed to get request: {}", e)))
}

/// Insert a request owned by `user_id`.
///
/// Status is always `pending` and both timestamps are the insert time.
pub fn insert_request(
    conn: &Connection,
    user_id: &str,
    input: &NewRequest,
) -> Result<ClientRequestRow, IntakeError> {
    let now = current_timestamp();
    let documents = serde_json::to_string(&input.documents)?;

    conn.execute(
        "INSERT INTO client_requests (
            user_id, request_type, title, scope_of_enquiry, timeframe, priority,
            notes, documents, related_request_id, status, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            user_id,
            input.request_type,
            input.title,
            input.scope_of_enquiry,
            input.timeframe,
            input.priority,
            input.notes,
            documents,
            input.related_request_id,
            RequestStatus::Pending,
            now,
            now,
        ],
    )
    .map_err(|e| IntakeError::Storage(format!("Failed to insert request: {}", e)))?;

    let id = conn.last_insert_rowid();
    debug!(id, user_id = %user_id, "Inserted client request");

    get_request(conn, id)?
        .ok_or_else(|| IntakeError::Storage("Failed to retrieve created request".into()))
}

/// List requests owned by a user, newest first
pub fn list_requests_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<ClientRequestRow>, IntakeError> {
    let sql = format!(
        "SELECT {} FROM client_requests cr WHERE cr.user_id = ? {}",
        request_columns(),
        LISTING_ORDER
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| IntakeError::Storage(format!("Failed to prepare statement: {}", e)))?;

    let rows = stmt
        .query_map(params![user_id], ClientRequestRow::from_row)
        .map_err(|e| IntakeError::Storage(format!("Failed to query requests: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| IntakeError::Storage(format!("Failed to read row: {}", e)))?);
    }

    Ok(results)
}

/// List every request with its owner and the owner's profile, newest first
pub fn list_all_requests(conn: &Connection) -> Result<Vec<AdminRequestView>, IntakeError> {
    let sql = format!(
        "SELECT {},
            u.name AS owner_name, u.email AS owner_email,
            cp.first_name AS p_first_name, cp.last_name AS p_last_name,
            cp.phone AS p_phone, cp.address AS p_address,
            cp.date_of_birth AS p_date_of_birth,
            cp.emergency_contact_name AS p_emergency_contact_name,
            cp.emergency_contact_phone AS p_emergency_contact_phone,
            cp.advocacy_needs AS p_advocacy_needs,
            cp.case_status AS p_case_status
         FROM client_requests cr
         LEFT JOIN users u ON cr.user_id = u.id
         LEFT JOIN client_profiles cp ON cr.user_id = cp.user_id
         {}",
        request_columns(),
        LISTING_ORDER
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| IntakeError::Storage(format!("Failed to prepare statement: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let request = ClientRequestRow::from_row(row)?;
            let user = RequestOwner {
                id: request.user_id.clone(),
                name: row.get("owner_name")?,
                email: row.get("owner_email")?,
                profile: JoinedProfile {
                    first_name: row.get("p_first_name")?,
                    last_name: row.get("p_last_name")?,
                    phone: row.get("p_phone")?,
                    address: row.get("p_address")?,
                    date_of_birth: row.get("p_date_of_birth")?,
                    emergency_contact_name: row.get("p_emergency_contact_name")?,
                    emergency_contact_phone: row.get("p_emergency_contact_phone")?,
                    advocacy_needs: row.get("p_advocacy_needs")?,
                    case_status: row.get("p_case_status")?,
                },
            };
            Ok(AdminRequestView { request, user })
        })
        .map_err(|e| IntakeError::Storage(format!("Failed to query requests: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| IntakeError::Storage(format!("Failed to read row: {}", e)))?);
    }

    Ok(results)
}

/// Execute a built update against `client_requests`, returning affected rows
pub fn apply_update(conn: &Connection, update: &UpdateStatement) -> Result<usize, IntakeError> {
    conn.execute(&update.sql, params_from_iter(update.params.iter()))
        .map_err(|e| IntakeError::Storage(format!("Failed to update request: {}", e)))
}

/// Request counts per status
pub fn count_by_status(conn: &Connection) -> Result<RequestStats, IntakeError> {
    let mut stmt = conn
        .prepare("SELECT status, COUNT(*) FROM client_requests GROUP BY status")
        .map_err(|e| IntakeError::Storage(format!("Failed to prepare statement: {}", e)))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, RequestStatus>(0)?, row.get::<_, i64>(1)?)))
        .map_err(|e| IntakeError::Storage(format!("Stats query failed: {}", e)))?;

    let mut stats = RequestStats::default();
    for row in rows {
        let (status, count) =
            row.map_err(|e| IntakeError::Storage(format!("Failed to read row: {}", e)))?;
        stats.add(status, count as u64);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::partial_update::{PartialUpdate, Scope};
    use crate::db::{profiles, users, IntakeDb};

    fn sample(title: &str) -> NewRequest {
        NewRequest {
            request_type: RequestType::New,
            title: title.into(),
            scope_of_enquiry: "Need help".into(),
            timeframe: None,
            priority: Priority::High,
            notes: None,
            documents: vec![serde_json::json!({"name": "notice.pdf"})],
            related_request_id: Some(999),
        }
    }

    fn db_with_users(ids: &[&str]) -> IntakeDb {
        let db = IntakeDb::open_in_memory().unwrap();
        db.with_conn(|conn| {
            for id in ids {
                users::upsert_user(conn, &crate::db::models::UserRecord {
                    id: id.to_string(),
                    name: None,
                    email: None,
                    role: users::ROLE_CLIENT.into(),
                })?;
            }
            Ok(())
        })
        .unwrap();
        db
    }

    fn set_created_at(db: &IntakeDb, id: i64, ts: &str) {
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE client_requests SET created_at = ? WHERE id = ?",
                params![ts, id],
            )
            .map_err(|e| IntakeError::Storage(e.to_string()))?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_insert_forces_pending_and_keeps_related_id() {
        let db = db_with_users(&["u1"]);
        let row = db
            .with_conn(|conn| insert_request(conn, "u1", &sample("Housing appeal")))
            .unwrap();

        assert_eq!(row.status, RequestStatus::Pending);
        assert_eq!(row.priority, Priority::High);
        assert_eq!(row.related_request_id, Some(999));
        assert_eq!(row.documents, vec![serde_json::json!({"name": "notice.pdf"})]);
        assert_eq!(row.created_at, row.updated_at);
        assert!(row.reviewed_at.is_none());
        assert!(row.completed_at.is_none());
    }

    #[test]
    fn test_list_for_user_is_scoped_and_ordered() {
        let db = db_with_users(&["u1", "u2"]);
        let (a, b, c) = db
            .with_conn(|conn| {
                let a = insert_request(conn, "u1", &sample("first"))?;
                let b = insert_request(conn, "u1", &sample("second"))?;
                let c = insert_request(conn, "u2", &sample("other"))?;
                Ok((a.id, b.id, c.id))
            })
            .unwrap();
        set_created_at(&db, a, "2024-01-01T00:00:00.000Z");
        set_created_at(&db, b, "2024-02-01T00:00:00.000Z");
        set_created_at(&db, c, "2024-03-01T00:00:00.000Z");

        let rows = db.with_conn(|conn| list_requests_for_user(conn, "u1")).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_same_instant_falls_back_to_id_order() {
        let db = db_with_users(&["u1"]);
        let (a, b) = db
            .with_conn(|conn| {
                Ok((
                    insert_request(conn, "u1", &sample("a"))?.id,
                    insert_request(conn, "u1", &sample("b"))?.id,
                ))
            })
            .unwrap();
        set_created_at(&db, a, "2024-01-01T00:00:00.000Z");
        set_created_at(&db, b, "2024-01-01T00:00:00.000Z");

        let rows = db.with_conn(|conn| list_requests_for_user(conn, "u1")).unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_admin_listing_left_joins_profile() {
        let db = db_with_users(&["u1", "u2"]);
        db.with_conn(|conn| {
            users::upsert_user(conn, &crate::db::models::UserRecord {
                id: "u1".into(),
                name: Some("Client One".into()),
                email: Some("one@example.org".into()),
                role: users::ROLE_CLIENT.into(),
            })?;
            let patch: profiles::ProfilePatch =
                serde_json::from_str(r#"{"first_name": "Uno"}"#)?;
            profiles::insert_profile(conn, "u1", &patch)?;
            insert_request(conn, "u1", &sample("with profile"))?;
            insert_request(conn, "u2", &sample("without profile"))?;
            Ok(())
        })
        .unwrap();

        let views = db.with_conn(list_all_requests).unwrap();
        assert_eq!(views.len(), 2);

        let with = views.iter().find(|v| v.user.id == "u1").unwrap();
        assert_eq!(with.user.name.as_deref(), Some("Client One"));
        assert_eq!(with.user.profile.first_name.as_deref(), Some("Uno"));

        let without = views.iter().find(|v| v.user.id == "u2").unwrap();
        assert_eq!(without.user.profile, JoinedProfile::default());
    }

    #[test]
    fn test_apply_update_and_stats() {
        let db = db_with_users(&["u1"]);
        db.with_conn(|conn| {
            let row = insert_request(conn, "u1", &sample("a"))?;
            insert_request(conn, "u1", &sample("b"))?;

            let update = PartialUpdate::new("client_requests")
                .set("status", RequestStatus::Denied.as_str().to_string())
                .build(&current_timestamp(), Scope::RequestId(row.id))?;
            assert_eq!(apply_update(conn, &update)?, 1);

            let stats = count_by_status(conn)?;
            assert_eq!(stats.total, 2);
            assert_eq!(stats.pending, 1);
            assert_eq!(stats.denied, 1);
            Ok(())
        })
        .unwrap();
    }
}
