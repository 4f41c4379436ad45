//! Profile service - a client's own advocacy profile
//!
//! The first write creates the row; later writes apply only the fields the
//! caller sent. Callers never name a user id, so a client can only ever
//! reach their own profile.

use std::sync::Arc;

use tracing::info;

use crate::auth::{require_identity, require_self, CallerContext, Operation};
use crate::db::{profiles, ClientProfileRow, IntakeDb, ProfilePatch};
use crate::error::IntakeError;

/// Profile service for client self-service
pub struct ProfileService {
    db: Arc<IntakeDb>,
}

impl ProfileService {
    pub fn new(db: Arc<IntakeDb>) -> Self {
        Self { db }
    }

    /// Get the caller's profile, if one has been created
    pub fn get_own_profile(
        &self,
        caller: &CallerContext,
    ) -> Result<Option<ClientProfileRow>, IntakeError> {
        let identity = require_identity(caller, Operation::GetOwnProfile)?;
        self.db.with_conn(|conn| profiles::get_profile(conn, &identity.user_id))
    }

    /// Create the caller's profile or merge a partial update into it.
    ///
    /// A patch with no present field is a `NoOp` once the profile exists.
    pub fn upsert_profile(
        &self,
        caller: &CallerContext,
        patch: &ProfilePatch,
    ) -> Result<ClientProfileRow, IntakeError> {
        let identity = require_identity(caller, Operation::UpsertProfile)?;

        let (profile, created) = self.db.transaction(|conn| {
            match profiles::get_profile(conn, &identity.user_id)? {
                None => Ok((profiles::insert_profile(conn, &identity.user_id, patch)?, true)),
                Some(existing) => {
                    require_self(identity, &existing.user_id)?;
                    Ok((profiles::update_profile(conn, &identity.user_id, patch)?, false))
                }
            }
        })?;

        info!(
            user_id = %identity.user_id,
            created,
            fields = patch.present_count(),
            "Client profile saved"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ProfileService {
        ProfileService::new(Arc::new(IntakeDb::open_in_memory().unwrap()))
    }

    fn service_with_db() -> (ProfileService, Arc<IntakeDb>) {
        let db = Arc::new(IntakeDb::open_in_memory().unwrap());
        (ProfileService::new(db.clone()), db)
    }

    fn patch(json: &str) -> ProfilePatch {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_anonymous_is_rejected() {
        let svc = service();
        assert!(matches!(
            svc.get_own_profile(&CallerContext::Anonymous),
            Err(IntakeError::Unauthenticated)
        ));
        assert!(matches!(
            svc.upsert_profile(&CallerContext::Anonymous, &patch(r#"{"phone": "1"}"#)),
            Err(IntakeError::Unauthenticated)
        ));
    }

    #[test]
    fn test_first_upsert_creates_then_merges() {
        let svc = service();
        let caller = CallerContext::client("u1");
        assert!(svc.get_own_profile(&caller).unwrap().is_none());

        let created = svc
            .upsert_profile(&caller, &patch(r#"{"first_name": "Ana", "phone": ""}"#))
            .unwrap();
        assert_eq!(created.first_name.as_deref(), Some("Ana"));
        assert_eq!(created.phone, None);

        let merged = svc
            .upsert_profile(&caller, &patch(r#"{"last_name": "Lopez"}"#))
            .unwrap();
        assert_eq!(merged.first_name.as_deref(), Some("Ana"));
        assert_eq!(merged.last_name.as_deref(), Some("Lopez"));
        assert_eq!(merged.id, created.id);
    }

    #[test]
    fn test_empty_patch_on_existing_profile_is_noop() {
        let svc = service();
        let caller = CallerContext::client("u1");
        svc.upsert_profile(&caller, &ProfilePatch::default()).unwrap();

        assert!(matches!(
            svc.upsert_profile(&caller, &ProfilePatch::default()),
            Err(IntakeError::NoOp(_))
        ));
    }

    #[test]
    fn test_profiles_are_isolated_per_caller() {
        let svc = service();
        svc.upsert_profile(&CallerContext::client("u1"), &patch(r#"{"first_name": "One"}"#))
            .unwrap();

        assert!(svc.get_own_profile(&CallerContext::client("u2")).unwrap().is_none());
    }

    #[test]
    fn test_first_upsert_writes_only_the_profile() {
        let (svc, db) = service_with_db();
        svc.upsert_profile(&CallerContext::client("u1"), &patch(r#"{"first_name": "Ana"}"#))
            .unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.profile_count, 1);
        assert_eq!(stats.user_count, 0);
    }
}
