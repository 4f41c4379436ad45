//! HTTP API for the intake portal
//!
//! Every API route is `POST` with a JSON body (an empty body reads as `{}`).
//! The caller comes from the `Authorization: Bearer <jwt>` header.
//!
//! ## Client routes
//! - `POST /api/create-client-request` - Submit a new request
//! - `POST /api/get-client-requests` - List own requests
//! - `POST /api/update-client-profile` - Create or patch own profile
//! - `POST /api/get-client-profile` - Own profile, or `null`
//! - `POST /api/check-admin` - `{"isAdmin": bool}`
//!
//! ## Admin routes
//! - `POST /api/admin/get-all-requests` - Every request with owner and profile
//! - `POST /api/admin/update-request-status` - Move a request to a new status
//! - `POST /api/admin/request-stats` - Counts by status
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST -H "Authorization: Bearer $TOKEN" \
//!      -d '{"request_type": "new", "title": "Tenancy", "scope_of_enquiry": "Bond"}' \
//!      http://localhost:8095/api/create-client-request
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::auth::{CallerContext, IdentityGate, Operation};
use crate::db::ProfilePatch;
use crate::error::IntakeError;
use crate::services::response::{self, error_response};
use crate::services::{CreateRequestInput, Services, TransitionRequest};

/// Body for routes that take no input. Any fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct EmptyBody {}

/// HTTP server state
pub struct HttpServer {
    services: Arc<Services>,
    gate: Arc<dyn IdentityGate>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(
        services: Arc<Services>,
        gate: Arc<dyn IdentityGate>,
        bind_addr: SocketAddr,
    ) -> Self {
        Self {
            services,
            gate,
            bind_addr,
        }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), IntakeError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = req.into_body().collect().await?.to_bytes();
        Ok(self.dispatch(&method, &path, authorization.as_deref(), body).await)
    }

    /// Route a request to its handler
    pub async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        authorization: Option<&str>,
        body: Bytes,
    ) -> Response<Full<Bytes>> {
        debug!(method = %method, path = %path, "Incoming request");

        if path == "/health" {
            return if *method == Method::GET {
                self.handle_health()
            } else {
                response::method_not_allowed()
            };
        }

        if !path.starts_with("/api/") {
            return response::not_found("Not found");
        }
        if *method != Method::POST {
            return response::method_not_allowed();
        }

        let Some(operation) = route_operation(path) else {
            return response::not_found("Not found");
        };
        let caller = self.resolve_caller(authorization, operation);

        match path {
            "/api/create-client-request" => self.handle_create_request(&caller, &body),
            "/api/get-client-requests" => self.handle_list_own_requests(&caller, &body),
            "/api/update-client-profile" => self.handle_update_profile(&caller, &body),
            "/api/get-client-profile" => self.handle_get_profile(&caller, &body),
            "/api/check-admin" => self.handle_check_admin(&caller),
            "/api/admin/get-all-requests" => self.handle_list_all_requests(&caller, &body),
            "/api/admin/update-request-status" => self.handle_update_status(&caller, &body),
            "/api/admin/request-stats" => self.handle_request_stats(&caller, &body),
            _ => response::not_found("Not found"),
        }
    }

    /// Resolve the caller and mirror their claims into the directory once
    /// the call is known to be permitted
    fn resolve_caller(&self, authorization: Option<&str>, operation: Operation) -> CallerContext {
        let resolved = self.gate.resolve(authorization);

        if let Some(record) = &resolved.directory {
            let synced = self
                .services
                .directory
                .sync_for(&resolved.context, operation, record);
            if let Err(e) = synced {
                warn!(user_id = %record.id, error = %e, "Failed to sync directory entry");
            }
        }
        debug!(caller = %resolved.context, "Caller resolved");
        resolved.context
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    fn handle_health(&self) -> Response<Full<Bytes>> {
        match self.services.db().stats() {
            Ok(stats) => response::ok(&serde_json::json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "database": stats,
            })),
            Err(e) => error_response(e, "Database unavailable"),
        }
    }

    fn handle_create_request(&self, caller: &CallerContext, body: &Bytes) -> Response<Full<Bytes>> {
        let result = parse_body::<CreateRequestInput>(body)
            .and_then(|input| self.services.requests.create_request(caller, input));

        match result {
            Ok(request) => response::created(&serde_json::json!({
                "success": true,
                "request": request,
                "message": "Client request created successfully",
            })),
            Err(e) => error_response(e, "Failed to create client request"),
        }
    }

    fn handle_list_own_requests(
        &self,
        caller: &CallerContext,
        body: &Bytes,
    ) -> Response<Full<Bytes>> {
        let result = parse_body::<EmptyBody>(body)
            .and_then(|_| self.services.requests.list_own_requests(caller));

        match result {
            Ok(requests) => response::ok(&serde_json::json!({ "requests": requests })),
            Err(e) => error_response(e, "Failed to fetch requests"),
        }
    }

    fn handle_update_profile(&self, caller: &CallerContext, body: &Bytes) -> Response<Full<Bytes>> {
        let result = parse_body::<ProfilePatch>(body)
            .and_then(|patch| self.services.profiles.upsert_profile(caller, &patch));

        match result {
            Ok(profile) => response::ok(&serde_json::json!({
                "success": true,
                "profile": profile,
            })),
            Err(e) => error_response(e, "Failed to update profile"),
        }
    }

    fn handle_get_profile(&self, caller: &CallerContext, body: &Bytes) -> Response<Full<Bytes>> {
        let result = parse_body::<EmptyBody>(body)
            .and_then(|_| self.services.profiles.get_own_profile(caller));

        match result {
            Ok(profile) => response::ok(&profile),
            Err(e) => error_response(e, "Failed to fetch profile"),
        }
    }

    fn handle_check_admin(&self, caller: &CallerContext) -> Response<Full<Bytes>> {
        let is_admin = self.services.directory.check_admin(caller);
        response::ok(&serde_json::json!({ "isAdmin": is_admin }))
    }

    fn handle_list_all_requests(
        &self,
        caller: &CallerContext,
        body: &Bytes,
    ) -> Response<Full<Bytes>> {
        let result = parse_body::<EmptyBody>(body)
            .and_then(|_| self.services.requests.list_all_requests(caller));

        match result {
            Ok(requests) => response::ok(&serde_json::json!({
                "success": true,
                "requests": requests,
            })),
            Err(e) => error_response(e, "Failed to fetch requests"),
        }
    }

    fn handle_update_status(&self, caller: &CallerContext, body: &Bytes) -> Response<Full<Bytes>> {
        let result = parse_body::<TransitionRequest>(body)
            .and_then(|input| self.services.transitions.transition_status(caller, &input));

        match result {
            Ok(outcome) => response::ok(&serde_json::json!({
                "success": true,
                "request": outcome.request,
                "message": outcome.message,
            })),
            Err(e) => error_response(e, "Failed to update request status"),
        }
    }

    fn handle_request_stats(&self, caller: &CallerContext, body: &Bytes) -> Response<Full<Bytes>> {
        let result = parse_body::<EmptyBody>(body)
            .and_then(|_| self.services.requests.request_stats(caller));

        match result {
            Ok(stats) => response::ok(&serde_json::json!({
                "success": true,
                "stats": stats,
            })),
            Err(e) => error_response(e, "Failed to fetch request statistics"),
        }
    }
}

/// Operation served by an API route
fn route_operation(path: &str) -> Option<Operation> {
    let operation = match path {
        "/api/create-client-request" => Operation::CreateRequest,
        "/api/get-client-requests" => Operation::ListOwnRequests,
        "/api/update-client-profile" => Operation::UpsertProfile,
        "/api/get-client-profile" => Operation::GetOwnProfile,
        "/api/check-admin" => Operation::CheckAdmin,
        "/api/admin/get-all-requests" => Operation::ListAllRequests,
        "/api/admin/update-request-status" => Operation::TransitionStatus,
        "/api/admin/request-stats" => Operation::RequestStats,
        _ => return None,
    };
    Some(operation)
}

/// Decode a JSON body, reading an empty body as `{}`
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, IntakeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"{}")?);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_empty_is_object() {
        let input: CreateRequestInput = parse_body(&Bytes::new()).unwrap();
        assert!(input.title.is_none());

        let _: EmptyBody = parse_body(&Bytes::from_static(b"  \n")).unwrap();
    }

    #[test]
    fn test_parse_body_rejects_malformed_json() {
        let err = parse_body::<EmptyBody>(&Bytes::from_static(b"{not json")).unwrap_err();
        assert!(matches!(err, IntakeError::Json(_)));
    }

    #[test]
    fn test_route_operations() {
        assert_eq!(route_operation("/api/check-admin"), Some(Operation::CheckAdmin));
        assert_eq!(
            route_operation("/api/admin/update-request-status"),
            Some(Operation::TransitionStatus)
        );
        assert_eq!(route_operation("/api/admin"), None);
    }

    #[test]
    fn test_empty_body_accepts_any_object() {
        let _: EmptyBody = parse_body(&Bytes::from_static(br#"{"page": 2}"#)).unwrap();
    }
}
