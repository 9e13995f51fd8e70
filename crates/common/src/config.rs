//! Application configuration

use std::env;
use std::fs;

use tracing::debug;

use crate::error::{Error, Result};

/// Main application configuration
///
/// Loaded once at startup and passed explicitly to the components that need
/// it; nothing reads the environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    /// GitHub App ID (the numeric ID as issued by GitHub)
    pub github_app_id: String,
    /// Shared secret used to verify webhook signatures
    pub github_webhook_secret: String,
    /// Path to the App's RSA private key in PEM format
    pub github_private_key_path: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            github_app_id: require("GITHUB_APP_ID")?,
            github_webhook_secret: require("GITHUB_WEBHOOK_SECRET")?,
            github_private_key_path: require("GITHUB_PRIVATE_KEY_PATH")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        };
        debug!(app_id = %config.github_app_id, "configuration loaded");
        Ok(config)
    }

    /// Read the App private key PEM from disk
    pub fn read_private_key(&self) -> Result<String> {
        fs::read_to_string(&self.github_private_key_path).map_err(|e| {
            Error::Config(format!(
                "failed to read private key {}: {}",
                self.github_private_key_path, e
            ))
        })
    }
}

fn require(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{} is not set", name)))
}
