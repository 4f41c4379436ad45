//! Configuration for advocacy-intake

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::auth::jwt::MIN_SECRET_LEN;
use crate::db::DB_FILE_NAME;
use crate::error::IntakeError;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("advocacy-intake")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the database and config file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Lifetime of tokens minted by dev tooling
    #[serde(default = "default_jwt_expiry")]
    pub jwt_expiry_seconds: u64,

    /// Accept tokens signed with the built-in dev secret
    #[serde(default)]
    pub dev_mode: bool,

    /// HS256 secret. Only ever set from the CLI or environment.
    #[serde(skip)]
    pub jwt_secret: Option<String>,
}

fn default_http_port() -> u16 {
    8095
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_jwt_expiry() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            http_port: default_http_port(),
            bind_address: default_bind_address(),
            jwt_expiry_seconds: default_jwt_expiry(),
            dev_mode: false,
            jwt_secret: None,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get SQLite database path
    pub fn database_path(&self) -> PathBuf {
        self.storage_dir.join(DB_FILE_NAME)
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }

    /// Socket address for the HTTP server
    pub fn http_addr(&self) -> Result<SocketAddr, IntakeError> {
        let ip: IpAddr = self.bind_address.parse().map_err(|e| {
            IntakeError::Config(format!("Invalid bind address '{}': {}", self.bind_address, e))
        })?;
        Ok(SocketAddr::new(ip, self.http_port))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), IntakeError> {
        if !self.dev_mode {
            match self.jwt_secret.as_deref() {
                None | Some("") => {
                    return Err(IntakeError::Config(
                        "INTAKE_JWT_SECRET is required in production mode".into(),
                    ))
                }
                Some(secret) if secret.len() < MIN_SECRET_LEN => {
                    return Err(IntakeError::Config(format!(
                        "INTAKE_JWT_SECRET must be at least {} characters",
                        MIN_SECRET_LEN
                    )))
                }
                Some(_) => {}
            }
        }

        if self.jwt_expiry_seconds == 0 {
            return Err(IntakeError::Config("jwt_expiry_seconds must be positive".into()));
        }

        self.http_addr().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.http_port, 8095);
        assert_eq!(config.http_addr().unwrap().to_string(), "0.0.0.0:8095");
        assert!(config.database_path().ends_with("advocacy-intake/intake.db"));
    }

    #[test]
    fn test_production_requires_secret() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.jwt_secret = Some("too-short".into());
        assert!(config.validate().is_err());

        config.jwt_secret = Some("a-production-secret-of-at-least-32-chars".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dev_mode_skips_secret() {
        let config = Config {
            dev_mode: true,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_bind_address() {
        let config = Config {
            dev_mode: true,
            bind_address: "not-an-ip".into(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(IntakeError::Config(_))));
    }

    #[test]
    fn test_save_never_writes_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            storage_dir: dir.path().to_path_buf(),
            http_port: 9000,
            jwt_secret: Some("a-production-secret-of-at-least-32-chars".into()),
            ..Config::default()
        };
        config.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("production-secret"));

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.http_port, 9000);
        assert!(loaded.jwt_secret.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("http_port = 7000\n").unwrap();
        assert_eq!(config.http_port, 7000);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.jwt_expiry_seconds, 3600);
    }
}
