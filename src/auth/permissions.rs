//! Permission levels and the operation policy
//!
//! Every service method calls [`authorize`] with its [`Operation`] before it
//! touches storage. Owner-scoped operations then use [`require_self`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::caller::{CallerContext, Identity};
use crate::error::IntakeError;

/// Permission levels for intake operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum PermissionLevel {
    /// No authentication
    #[default]
    Public = 0,
    /// Any signed-in client
    Authenticated = 1,
    /// Staff reviewing requests
    Admin = 2,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Public => write!(f, "PUBLIC"),
            PermissionLevel::Authenticated => write!(f, "AUTHENTICATED"),
            PermissionLevel::Admin => write!(f, "ADMIN"),
        }
    }
}

impl PermissionLevel {
    /// Level held by a caller
    pub fn of(caller: &CallerContext) -> Self {
        match caller.identity() {
            None => PermissionLevel::Public,
            Some(identity) if identity.is_admin => PermissionLevel::Admin,
            Some(_) => PermissionLevel::Authenticated,
        }
    }
}

/// Core operations exposed by the service layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CheckAdmin,
    GetOwnProfile,
    UpsertProfile,
    CreateRequest,
    ListOwnRequests,
    ListAllRequests,
    TransitionStatus,
    RequestStats,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::CheckAdmin,
        Operation::GetOwnProfile,
        Operation::UpsertProfile,
        Operation::CreateRequest,
        Operation::ListOwnRequests,
        Operation::ListAllRequests,
        Operation::TransitionStatus,
        Operation::RequestStats,
    ];

    /// Permission level required to run the operation
    pub fn required_permission(&self) -> PermissionLevel {
        match self {
            Operation::CheckAdmin => PermissionLevel::Public,

            Operation::GetOwnProfile
            | Operation::UpsertProfile
            | Operation::CreateRequest
            | Operation::ListOwnRequests => PermissionLevel::Authenticated,

            Operation::ListAllRequests
            | Operation::TransitionStatus
            | Operation::RequestStats => PermissionLevel::Admin,
        }
    }

    /// Human-readable description for logging
    pub fn description(&self) -> &'static str {
        match self {
            Operation::CheckAdmin => "Check admin role",
            Operation::GetOwnProfile => "Get own profile",
            Operation::UpsertProfile => "Create or update own profile",
            Operation::CreateRequest => "Create request",
            Operation::ListOwnRequests => "List own requests",
            Operation::ListAllRequests => "List all requests",
            Operation::TransitionStatus => "Transition request status",
            Operation::RequestStats => "Request statistics",
        }
    }
}

/// Check if an operation is allowed for the given permission level
pub fn is_operation_allowed(operation: Operation, level: PermissionLevel) -> bool {
    level >= operation.required_permission()
}

/// Gate an operation on the caller's permission level.
///
/// Returns the caller's identity for operations that need one. Anonymous
/// callers get `Unauthenticated`; signed-in callers below the required level
/// get `Forbidden`.
pub fn authorize(
    caller: &CallerContext,
    operation: Operation,
) -> Result<Option<&Identity>, IntakeError> {
    let level = PermissionLevel::of(caller);
    if is_operation_allowed(operation, level) {
        return Ok(caller.identity());
    }

    match caller.identity() {
        None => Err(IntakeError::Unauthenticated),
        Some(identity) => {
            tracing::warn!(
                user_id = %identity.user_id,
                operation = operation.description(),
                required = %operation.required_permission(),
                "Operation denied"
            );
            Err(IntakeError::Forbidden(format!(
                "{} requires {} access",
                operation.description(),
                operation.required_permission()
            )))
        }
    }
}

/// Authorize an operation that needs a signed-in caller
pub fn require_identity(
    caller: &CallerContext,
    operation: Operation,
) -> Result<&Identity, IntakeError> {
    authorize(caller, operation)?.ok_or(IntakeError::Unauthenticated)
}

/// Authorize an admin-only operation
pub fn require_admin(
    caller: &CallerContext,
    operation: Operation,
) -> Result<&Identity, IntakeError> {
    debug_assert_eq!(operation.required_permission(), PermissionLevel::Admin);
    require_identity(caller, operation)
}

/// Check that an identity owns the row it is acting on
pub fn require_self(identity: &Identity, owner_id: &str) -> Result<(), IntakeError> {
    if identity.user_id == owner_id {
        Ok(())
    } else {
        Err(IntakeError::Forbidden(
            "Cannot act on another client's records".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_ordering() {
        assert!(PermissionLevel::Admin > PermissionLevel::Authenticated);
        assert!(PermissionLevel::Authenticated > PermissionLevel::Public);
    }

    #[test]
    fn test_level_of_caller() {
        assert_eq!(PermissionLevel::of(&CallerContext::Anonymous), PermissionLevel::Public);
        assert_eq!(
            PermissionLevel::of(&CallerContext::client("u")),
            PermissionLevel::Authenticated
        );
        assert_eq!(PermissionLevel::of(&CallerContext::admin("a")), PermissionLevel::Admin);
    }

    #[test]
    fn test_admin_operations_forbidden_for_clients() {
        let client = CallerContext::client("u1");
        let admin_ops = [
            Operation::ListAllRequests,
            Operation::TransitionStatus,
            Operation::RequestStats,
        ];
        for op in admin_ops {
            assert!(matches!(authorize(&client, op), Err(IntakeError::Forbidden(_))));
            assert!(matches!(
                authorize(&CallerContext::Anonymous, op),
                Err(IntakeError::Unauthenticated)
            ));
            assert!(authorize(&CallerContext::admin("a1"), op).is_ok());
        }
    }

    #[test]
    fn test_client_operations_need_identity() {
        for op in Operation::ALL {
            if op.required_permission() == PermissionLevel::Authenticated {
                assert!(matches!(
                    require_identity(&CallerContext::Anonymous, op),
                    Err(IntakeError::Unauthenticated)
                ));
                assert_eq!(
                    require_identity(&CallerContext::client("u1"), op).unwrap().user_id,
                    "u1"
                );
            }
        }
    }

    #[test]
    fn test_public_operation_allows_anonymous() {
        assert_eq!(authorize(&CallerContext::Anonymous, Operation::CheckAdmin).unwrap(), None);
    }

    #[test]
    fn test_require_self() {
        let identity = Identity::client("u1");
        assert!(require_self(&identity, "u1").is_ok());
        assert!(matches!(require_self(&identity, "u2"), Err(IntakeError::Forbidden(_))));
    }
}
