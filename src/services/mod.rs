//! Service layer for advocacy-intake
//!
//! Services sit between the HTTP handlers and the repositories. Every
//! operation takes the caller context explicitly and checks it before any
//! storage access.
//!
//! ## Architecture
//!
//! ```text
//! HTTP Handlers (thin)
//!     ↓
//! Service Layer (authorization, validation, transactions)
//!     ↓
//! Repository Layer (db/*.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod response;
pub mod directory_service;
pub mod profile_service;
pub mod request_service;
pub mod transition;

pub use directory_service::DirectoryService;
pub use profile_service::ProfileService;
pub use request_service::{CreateRequestInput, RequestService};
pub use transition::{TransitionEngine, TransitionOutcome, TransitionRequest, STATUS_RULES};

use crate::db::IntakeDb;
use std::sync::Arc;

/// Service container shared by the HTTP server
pub struct Services {
    pub directory: Arc<DirectoryService>,
    pub profiles: Arc<ProfileService>,
    pub requests: Arc<RequestService>,
    pub transitions: Arc<TransitionEngine>,
    db: Arc<IntakeDb>,
}

impl Services {
    /// Create all services over one shared database
    pub fn new(db: Arc<IntakeDb>) -> Self {
        Self {
            directory: Arc::new(DirectoryService::new(db.clone())),
            profiles: Arc::new(ProfileService::new(db.clone())),
            requests: Arc::new(RequestService::new(db.clone())),
            transitions: Arc::new(TransitionEngine::new(db.clone())),
            db,
        }
    }

    pub fn db(&self) -> &Arc<IntakeDb> {
        &self.db
    }
}
