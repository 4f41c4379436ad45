//! Identity gate: turns transport credentials into a caller context
//!
//! Resolution never fails. A missing or unverifiable credential resolves to
//! an anonymous caller and the policy check decides what that caller may do.

use tracing::debug;

use super::caller::CallerContext;
use super::jwt::{extract_token_from_header, JwtValidator};
use crate::db::users::{ROLE_ADMIN, ROLE_CLIENT};
use crate::db::UserRecord;

/// Caller context plus the directory record asserted by the credential
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedCaller {
    pub context: CallerContext,
    pub directory: Option<UserRecord>,
}

impl ResolvedCaller {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Source of caller identity for the HTTP boundary
pub trait IdentityGate: Send + Sync {
    /// Resolve the `Authorization` header value, if any
    fn resolve(&self, authorization: Option<&str>) -> ResolvedCaller;
}

/// Identity gate backed by HS256 bearer tokens
pub struct JwtGate {
    validator: JwtValidator,
}

impl JwtGate {
    pub fn new(validator: JwtValidator) -> Self {
        Self { validator }
    }
}

impl IdentityGate for JwtGate {
    fn resolve(&self, authorization: Option<&str>) -> ResolvedCaller {
        let Some(token) = extract_token_from_header(authorization) else {
            return ResolvedCaller::anonymous();
        };

        let result = self.validator.verify_token(token);
        match result.claims {
            Some(claims) => {
                let identity = claims.identity();
                let directory = UserRecord {
                    id: claims.sub.clone(),
                    name: claims.name.clone(),
                    email: claims.email.clone(),
                    role: if identity.is_admin { ROLE_ADMIN } else { ROLE_CLIENT }.to_string(),
                };
                ResolvedCaller {
                    context: CallerContext::Authenticated(identity),
                    directory: Some(directory),
                }
            }
            None => {
                debug!(reason = ?result.error, "Bearer token rejected");
                ResolvedCaller::anonymous()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenInput;

    #[test]
    fn test_missing_header_is_anonymous() {
        let gate = JwtGate::new(JwtValidator::new_dev());
        assert_eq!(gate.resolve(None), ResolvedCaller::anonymous());
    }

    #[test]
    fn test_bad_token_is_anonymous() {
        let gate = JwtGate::new(JwtValidator::new_dev());
        let resolved = gate.resolve(Some("Bearer not-a-jwt"));
        assert_eq!(resolved.context, CallerContext::Anonymous);
        assert!(resolved.directory.is_none());
    }

    #[test]
    fn test_valid_token_resolves_identity_and_directory() {
        let validator = JwtValidator::new_dev();
        let token = validator
            .generate_token(TokenInput {
                user_id: "admin-1".into(),
                name: Some("Case Worker".into()),
                email: None,
                is_admin: true,
            })
            .unwrap();

        let gate = JwtGate::new(validator);
        let resolved = gate.resolve(Some(&format!("Bearer {}", token)));
        assert_eq!(resolved.context, CallerContext::admin("admin-1"));

        let directory = resolved.directory.unwrap();
        assert_eq!(directory.role, ROLE_ADMIN);
        assert_eq!(directory.name.as_deref(), Some("Case Worker"));
    }
}
