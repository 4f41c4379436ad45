//! Authentication and authorization
//!
//! Provides:
//! - Caller context passed explicitly into every core operation
//! - Permission levels and the per-operation policy check
//! - JWT verification for the HTTP boundary
//! - The identity gate that resolves a caller from request credentials

pub mod caller;
pub mod gate;
pub mod jwt;
pub mod permissions;

pub use caller::{CallerContext, Identity};
pub use gate::{IdentityGate, JwtGate, ResolvedCaller};
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use permissions::{
    authorize, is_operation_allowed, require_admin, require_identity, require_self, Operation,
    PermissionLevel,
};
