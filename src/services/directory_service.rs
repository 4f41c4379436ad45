//! Directory service - caller role lookup and the local identity mirror

use std::sync::Arc;

use tracing::debug;

use crate::auth::{authorize, is_operation_allowed, CallerContext, Operation, PermissionLevel};
use crate::db::{users, IntakeDb, UserRecord};
use crate::error::IntakeError;

pub struct DirectoryService {
    db: Arc<IntakeDb>,
}

impl DirectoryService {
    pub fn new(db: Arc<IntakeDb>) -> Self {
        Self { db }
    }

    /// Whether the caller holds the admin role. Anonymous callers get `false`.
    pub fn check_admin(&self, caller: &CallerContext) -> bool {
        authorize(caller, Operation::CheckAdmin).is_ok() && caller.is_admin()
    }

    /// Refresh the directory entry asserted by a verified credential.
    ///
    /// Nothing is written unless the caller may run `operation`, and an entry
    /// that already matches the claims is left as is. Returns whether a write
    /// happened.
    pub fn sync_for(
        &self,
        caller: &CallerContext,
        operation: Operation,
        record: &UserRecord,
    ) -> Result<bool, IntakeError> {
        if !is_operation_allowed(operation, PermissionLevel::of(caller)) {
            debug!(user_id = %record.id, "Directory sync skipped for denied call");
            return Ok(false);
        }
        let (_, written) = self.db.with_conn(|conn| users::sync_user(conn, record))?;
        Ok(written)
    }
}
