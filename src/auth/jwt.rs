//! JWT bearer tokens carrying the caller's identity
//!
//! Tokens are issued by the identity provider and only verified here.
//! Signed with HS256; `role` is `"admin"` for staff and `"client"` otherwise.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::caller::Identity;
use crate::db::users::{ROLE_ADMIN, ROLE_CLIENT};
use crate::error::IntakeError;

/// Minimum accepted secret length outside dev mode
pub const MIN_SECRET_LEN: usize = 32;

/// Payload stored in JWT token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User identifier
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `admin` or `client`
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub.clone(),
            is_admin: self.is_admin(),
        }
    }
}

/// Input for creating a new token
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
}

/// Outcome of verifying a bearer token. Exactly one side is set.
#[derive(Debug)]
pub struct TokenValidationResult {
    pub claims: Option<Claims>,
    /// Rejection reason, for logs only
    pub error: Option<&'static str>,
}

impl TokenValidationResult {
    fn accepted(claims: Claims) -> Self {
        Self {
            claims: Some(claims),
            error: None,
        }
    }

    fn rejected(reason: &'static str) -> Self {
        Self {
            claims: None,
            error: Some(reason),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.claims.is_some()
    }
}

/// JWT validator and generator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a new JWT validator
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, IntakeError> {
        if secret.is_empty() {
            return Err(IntakeError::Config(
                "JWT secret is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(IntakeError::Config(format!(
                "JWT secret must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Create a validator for dev mode
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            expiry_seconds: 3600,
        }
    }

    fn now() -> Result<u64, IntakeError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|e| IntakeError::Auth(format!("System time error: {}", e)))
    }

    /// Generate a token for a user (dev tooling and tests)
    pub fn generate_token(&self, input: TokenInput) -> Result<String, IntakeError> {
        let now = Self::now()?;

        let claims = Claims {
            sub: input.user_id,
            name: input.name,
            email: input.email,
            role: if input.is_admin { ROLE_ADMIN } else { ROLE_CLIENT }.to_string(),
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| IntakeError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verify a bearer token and check that it names a known role
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        let key = DecodingKey::from_secret(self.secret.as_bytes());
        let claims = match decode::<Claims>(token, &key, &validation) {
            Ok(data) => data.claims,
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let reason = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    ErrorKind::InvalidAlgorithm => "Unexpected signing algorithm",
                    ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => "Malformed claims",
                    _ => "Invalid token",
                };
                return TokenValidationResult::rejected(reason);
            }
        };

        if claims.sub.is_empty() {
            return TokenValidationResult::rejected("Empty subject");
        }
        // Only the two directory roles grant anything
        if claims.role != ROLE_ADMIN && claims.role != ROLE_CLIENT {
            return TokenValidationResult::rejected("Unknown role");
        }
        TokenValidationResult::accepted(claims)
    }
}

/// Pull the token out of an `Authorization` value.
///
/// The scheme is matched case-insensitively. A value with no scheme at all is
/// taken as the token itself.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    let token = match header.split_once(' ') {
        // "Bearer <token>", any casing
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        // Basic, Digest and friends carry no token for us
        Some(_) => return None,
        // Raw token without prefix
        None => header.trim(),
    };

    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> JwtValidator {
        JwtValidator::new(
            "test-secret-that-is-at-least-32-characters-long".into(),
            3600,
        )
        .unwrap()
    }

    fn input(is_admin: bool) -> TokenInput {
        TokenInput {
            user_id: "user-123".into(),
            name: Some("Test Client".into()),
            email: Some("client@example.org".into()),
            is_admin,
        }
    }

    #[test]
    fn test_generate_and_verify_token() {
        let validator = test_validator();

        let token = validator.generate_token(input(false)).unwrap();
        let result = validator.verify_token(&token);
        assert!(result.is_valid());

        let claims = result.claims.unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.email.as_deref(), Some("client@example.org"));
        assert_eq!(claims.identity(), Identity::client("user-123"));
    }

    #[test]
    fn test_admin_role_round_trips() {
        let validator = test_validator();
        let token = validator.generate_token(input(true)).unwrap();
        let claims = validator.verify_token(&token).claims.unwrap();
        assert!(claims.is_admin());
        assert_eq!(claims.role, ROLE_ADMIN);
    }

    #[test]
    fn test_invalid_token() {
        let result = test_validator().verify_token("invalid-token");
        assert!(!result.is_valid());
        assert_eq!(result.error, Some("Invalid token"));
    }

    #[test]
    fn test_wrong_secret() {
        let other = JwtValidator::new(
            "different-secret-that-is-at-least-32-characters".into(),
            3600,
        )
        .unwrap();

        let token = test_validator().generate_token(input(true)).unwrap();
        let result = other.verify_token(&token);
        assert!(!result.is_valid());
        assert_eq!(result.error, Some("Invalid signature"));
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("bearer  abc123 ")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }

    fn signed(validator_secret: &str, role: &str, exp_offset: i64) -> String {
        let now = JwtValidator::now().unwrap() as i64;
        let claims = Claims {
            sub: "user-123".into(),
            name: None,
            email: None,
            role: role.into(),
            iat: now as u64,
            exp: (now + exp_offset) as u64,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(validator_secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let secret = "test-secret-that-is-at-least-32-characters-long";
        let result = test_validator().verify_token(&signed(secret, "superuser", 600));
        assert!(!result.is_valid());
        assert_eq!(result.error, Some("Unknown role"));

        assert!(test_validator().verify_token(&signed(secret, ROLE_CLIENT, 600)).is_valid());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let secret = "test-secret-that-is-at-least-32-characters-long";
        let result = test_validator().verify_token(&signed(secret, ROLE_CLIENT, -3600));
        assert_eq!(result.error, Some("Token expired"));
    }

    #[test]
    fn test_secret_validation() {
        assert!(JwtValidator::new("short".into(), 3600).is_err());
        assert!(JwtValidator::new("".into(), 3600).is_err());
        assert!(JwtValidator::new("this-secret-is-at-least-32-chars-long".into(), 3600).is_ok());
    }
}
