//! Transition engine for request status
//!
//! Any valid status may follow any other; the engine checks the target value,
//! not adjacency. Side-effect timestamps come from [`STATUS_RULES`], so adding
//! a status means adding a variant and a table row.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{require_admin, CallerContext, Operation};
use crate::db::models::{current_timestamp, deserialize_present};
use crate::db::{requests, ClientRequestRow, IntakeDb, PartialUpdate, RequestStatus, Scope};
use crate::error::IntakeError;

/// Timestamps stamped when a request enters a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRule {
    pub status: RequestStatus,
    pub sets_reviewed_at: bool,
    pub sets_completed_at: bool,
}

pub const STATUS_RULES: [StatusRule; 5] = [
    StatusRule {
        status: RequestStatus::Pending,
        sets_reviewed_at: false,
        sets_completed_at: false,
    },
    StatusRule {
        status: RequestStatus::UnderReview,
        sets_reviewed_at: true,
        sets_completed_at: false,
    },
    StatusRule {
        status: RequestStatus::Accepted,
        sets_reviewed_at: true,
        sets_completed_at: false,
    },
    StatusRule {
        status: RequestStatus::Denied,
        sets_reviewed_at: true,
        sets_completed_at: false,
    },
    StatusRule {
        status: RequestStatus::Completed,
        sets_reviewed_at: false,
        sets_completed_at: true,
    },
];

/// Look up the rule for a raw status value
pub fn rule_for(raw: &str) -> Result<&'static StatusRule, IntakeError> {
    STATUS_RULES
        .iter()
        .find(|rule| rule.status.as_str() == raw)
        .ok_or_else(|| {
            let valid: Vec<&str> = STATUS_RULES.iter().map(|r| r.status.as_str()).collect();
            IntakeError::validation(
                "status",
                format!("Invalid status. Must be one of: {}", valid.join(", ")),
            )
        })
}

/// Assignments for moving a request into `rule.status` at `now`
pub fn plan_update(
    rule: &StatusRule,
    admin_notes: &Option<Option<String>>,
    now: &str,
) -> PartialUpdate {
    let mut update = PartialUpdate::new("client_requests")
        .set("status", rule.status.as_str().to_string())
        .set_present("admin_notes", admin_notes);

    if rule.sets_reviewed_at {
        update = update.set("reviewed_at", now.to_string());
    }
    if rule.sets_completed_at {
        update = update.set("completed_at", now.to_string());
    }
    update
}

/// Admin request to move a request to a new status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransitionRequest {
    #[serde(default)]
    pub request_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    /// Absent leaves notes untouched; `null` clears them
    #[serde(default, deserialize_with = "deserialize_present")]
    pub admin_notes: Option<Option<String>>,
}

impl TransitionRequest {
    pub fn new(request_id: i64, status: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id),
            status: Some(status.into()),
            admin_notes: None,
        }
    }

    pub fn with_admin_notes(mut self, notes: Option<&str>) -> Self {
        self.admin_notes = Some(notes.map(str::to_string));
        self
    }
}

/// Updated row plus a confirmation naming the new status
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub request: ClientRequestRow,
    pub message: String,
}

pub struct TransitionEngine {
    db: Arc<IntakeDb>,
}

impl TransitionEngine {
    pub fn new(db: Arc<IntakeDb>) -> Self {
        Self { db }
    }

    /// Move a request to a new status.
    ///
    /// Checks, in order: admin caller, request exists, status is valid.
    /// Nothing is written unless all three pass.
    pub fn transition_status(
        &self,
        caller: &CallerContext,
        input: &TransitionRequest,
    ) -> Result<TransitionOutcome, IntakeError> {
        let identity = require_admin(caller, Operation::TransitionStatus)?;

        let request_id = input
            .request_id
            .ok_or_else(|| IntakeError::validation("request_id", "request_id is required"))?;

        let (previous, request) = self.db.transaction(|conn| {
            let previous = requests::get_request(conn, request_id)?
                .ok_or_else(|| IntakeError::NotFound("Request not found".into()))?;

            let raw_status = input
                .status
                .as_deref()
                .ok_or_else(|| IntakeError::validation("status", "status is required"))?;
            let rule = rule_for(raw_status)?;

            let now = current_timestamp();
            let update = plan_update(rule, &input.admin_notes, &now)
                .build(&now, Scope::RequestId(request_id))?;
            requests::apply_update(conn, &update)?;

            let request = requests::get_request(conn, request_id)?
                .ok_or_else(|| IntakeError::Storage("Failed to retrieve updated request".into()))?;
            Ok((previous.status, request))
        })?;

        info!(
            request_id,
            from = %previous,
            to = %request.status,
            admin = %identity.user_id,
            "Request status transitioned"
        );

        Ok(TransitionOutcome {
            message: format!("Request status updated to {}", request.status),
            request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_status_once() {
        for status in RequestStatus::ALL {
            let matches = STATUS_RULES.iter().filter(|r| r.status == *status).count();
            assert_eq!(matches, 1, "{} must have exactly one rule", status);
        }
    }

    #[test]
    fn test_review_statuses_stamp_reviewed_at() {
        for raw in ["under_review", "accepted", "denied"] {
            let rule = rule_for(raw).unwrap();
            assert!(rule.sets_reviewed_at);
            assert!(!rule.sets_completed_at);
        }
        let completed = rule_for("completed").unwrap();
        assert!(completed.sets_completed_at);
        assert!(!completed.sets_reviewed_at);
        assert!(!rule_for("pending").unwrap().sets_reviewed_at);
    }

    #[test]
    fn test_unknown_status_is_validation_error() {
        let err = rule_for("archived").unwrap_err();
        assert_eq!(err.field(), Some("status"));
        assert!(err.to_string().contains("pending, under_review, accepted, denied, completed"));
    }

    #[test]
    fn test_plan_update_assignments() {
        let now = "2024-05-01T10:00:00.000Z";
        let update = plan_update(rule_for("accepted").unwrap(), &Some(Some("ok".into())), now)
            .build(now, Scope::RequestId(7))
            .unwrap();
        assert_eq!(
            update.sql,
            "UPDATE client_requests SET status = ?1, admin_notes = ?2, reviewed_at = ?3, \
             updated_at = ?4 WHERE id = ?5"
        );

        let update = plan_update(rule_for("pending").unwrap(), &None, now)
            .build(now, Scope::RequestId(7))
            .unwrap();
        assert_eq!(
            update.sql,
            "UPDATE client_requests SET status = ?1, updated_at = ?2 WHERE id = ?3"
        );
    }

    #[test]
    fn test_admin_notes_presence_from_json() {
        let absent: TransitionRequest =
            serde_json::from_str(r#"{"request_id": 1, "status": "denied"}"#).unwrap();
        assert_eq!(absent.admin_notes, None);

        let cleared: TransitionRequest = serde_json::from_str(
            r#"{"request_id": 1, "status": "denied", "admin_notes": null}"#,
        )
        .unwrap();
        assert_eq!(cleared.admin_notes, Some(None));
    }
}
