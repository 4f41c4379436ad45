//! Advocacy Intake Server
//!
//! ## Usage
//!
//! ```bash
//! # Production: secret from the environment
//! INTAKE_JWT_SECRET=... advocacy-intake
//!
//! # Development with the built-in secret
//! advocacy-intake --dev
//!
//! # Custom config, port and storage directory
//! advocacy-intake --config /etc/intake.toml --http-port 9000 --storage-dir /data/intake
//! ```

use advocacy_intake::{Config, HttpServer, IntakeDb, JwtGate, JwtValidator, Services};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "advocacy-intake")]
#[command(about = "Client request intake portal for advocacy services")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long)]
    http_port: Option<u16>,

    /// HS256 secret for bearer tokens
    #[arg(long, env = "INTAKE_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Development mode (built-in token secret)
    #[arg(long, env = "INTAKE_DEV_MODE")]
    dev: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("advocacy_intake={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if args.dev {
        config.dev_mode = true;
    }
    config.jwt_secret = args.jwt_secret;

    config.validate()?;
    let http_addr = config.http_addr()?;

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        dev_mode = config.dev_mode,
        "Starting advocacy-intake"
    );

    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .context("Failed to create storage directory")?;

    // Save default config if it doesn't exist
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let db = Arc::new(IntakeDb::open(&config.storage_dir)?);
    let services = Arc::new(Services::new(db.clone()));

    let validator = match config.jwt_secret.clone() {
        Some(secret) if !secret.is_empty() => JwtValidator::new(secret, config.jwt_expiry_seconds)?,
        _ => {
            warn!("Development mode: accepting tokens signed with the built-in secret");
            JwtValidator::new_dev()
        }
    };
    let gate = Arc::new(JwtGate::new(validator));

    let http_server = Arc::new(HttpServer::new(services, gate, http_addr));

    info!("HTTP API available at http://{}", http_addr);
    info!("Endpoints:");
    info!("  GET  /health                          - Health check");
    info!("  POST /api/create-client-request       - Submit a request");
    info!("  POST /api/get-client-requests         - List own requests");
    info!("  POST /api/update-client-profile       - Save own profile");
    info!("  POST /api/get-client-profile          - Get own profile");
    info!("  POST /api/check-admin                 - Check admin role");
    info!("  POST /api/admin/get-all-requests      - List all requests (admin)");
    info!("  POST /api/admin/update-request-status - Change request status (admin)");
    info!("  POST /api/admin/request-stats         - Request counts (admin)");
    info!("Press Ctrl+C to stop.");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {}
    }

    if let Ok(stats) = db.stats() {
        info!(
            users = stats.user_count,
            profiles = stats.profile_count,
            requests = stats.request_count,
            "Final database stats"
        );
    }

    Ok(())
}
