//! Request service - intake and listing of advocacy requests
//!
//! Clients create and list their own requests. Admins list every request
//! with its owner attached and read per-status counts. Status changes go
//! through the transition engine.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::auth::{require_admin, require_identity, CallerContext, Operation};
use crate::db::{
    requests, AdminRequestView, ClientRequestRow, IntakeDb, NewRequest, Priority, RequestStats,
    RequestType,
};
use crate::error::IntakeError;

/// Raw create input as sent by a client. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateRequestInput {
    pub request_type: Option<String>,
    pub title: Option<String>,
    pub scope_of_enquiry: Option<String>,
    pub timeframe: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub documents: Option<Vec<serde_json::Value>>,
    pub related_request_id: Option<i64>,
}

impl CreateRequestInput {
    /// Check the input and produce the row to insert.
    ///
    /// Fields are checked in order: request_type, title, scope_of_enquiry,
    /// priority. The first failure is returned.
    pub fn validate(self) -> Result<NewRequest, IntakeError> {
        let request_type: RequestType = required(self.request_type, "request_type")?
            .parse()
            .map_err(|_| {
                IntakeError::validation(
                    "request_type",
                    "Invalid request_type. Must be 'new' or 'update'",
                )
            })?;

        let title = required(self.title, "title")?;
        let scope_of_enquiry = required(self.scope_of_enquiry, "scope_of_enquiry")?;

        let priority = match self.priority {
            None => Priority::default(),
            Some(raw) => raw.parse().map_err(|_| {
                IntakeError::validation(
                    "priority",
                    "Invalid priority. Must be 'low', 'medium', 'high', or 'urgent'",
                )
            })?,
        };

        Ok(NewRequest {
            request_type,
            title,
            scope_of_enquiry,
            timeframe: self.timeframe.filter(|v| !v.is_empty()),
            priority,
            notes: self.notes.filter(|v| !v.is_empty()),
            documents: self.documents.unwrap_or_default(),
            related_request_id: self.related_request_id,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, IntakeError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| IntakeError::validation(field, format!("{} is required", field)))
}

/// Request service for intake and review listings
pub struct RequestService {
    db: Arc<IntakeDb>,
}

impl RequestService {
    pub fn new(db: Arc<IntakeDb>) -> Self {
        Self { db }
    }

    /// Create a request owned by the caller. New requests are always pending.
    pub fn create_request(
        &self,
        caller: &CallerContext,
        input: CreateRequestInput,
    ) -> Result<ClientRequestRow, IntakeError> {
        let identity = require_identity(caller, Operation::CreateRequest)?;
        let new_request = input.validate()?;

        let row = self
            .db
            .with_conn(|conn| requests::insert_request(conn, &identity.user_id, &new_request))?;

        info!(
            id = row.id,
            user_id = %identity.user_id,
            request_type = %row.request_type,
            priority = %row.priority,
            "Client request created"
        );
        Ok(row)
    }

    /// List the caller's own requests, newest first
    pub fn list_own_requests(
        &self,
        caller: &CallerContext,
    ) -> Result<Vec<ClientRequestRow>, IntakeError> {
        let identity = require_identity(caller, Operation::ListOwnRequests)?;
        self.db
            .with_conn(|conn| requests::list_requests_for_user(conn, &identity.user_id))
    }

    /// List every request with owner details, newest first (admin only)
    pub fn list_all_requests(
        &self,
        caller: &CallerContext,
    ) -> Result<Vec<AdminRequestView>, IntakeError> {
        require_admin(caller, Operation::ListAllRequests)?;
        self.db.with_conn(requests::list_all_requests)
    }

    /// Request counts by status (admin only)
    pub fn request_stats(&self, caller: &CallerContext) -> Result<RequestStats, IntakeError> {
        require_admin(caller, Operation::RequestStats)?;
        self.db.with_conn(requests::count_by_status)
    }
}
