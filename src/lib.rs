//! Advocacy Intake - client request portal for an advocacy service
//!
//! Clients keep a profile and submit advocacy requests. Admins review every
//! request and move it through its status workflow.
//!
//! ## Architecture
//!
//! - **auth**: caller context, operation policy, JWT identity gate
//! - **db**: SQLite repositories for users, profiles and requests
//! - **services**: authorization, validation and the status transition engine
//! - **http**: JSON routes over hyper
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/advocacy-intake/
//! ├── intake.db      # SQLite database (WAL)
//! └── config.toml    # Configuration (never holds the JWT secret)
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod services;

pub use auth::{CallerContext, Identity, IdentityGate, JwtGate, JwtValidator};
pub use config::Config;
pub use db::IntakeDb;
pub use error::{IntakeError, Result};
pub use http::HttpServer;
pub use services::Services;
