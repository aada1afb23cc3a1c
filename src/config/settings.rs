//! Application settings and configuration
//!
//! This module provides configuration management for the resolver,
//! loading settings from environment variables with sensible defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Shortest session STS will issue
pub const MIN_SESSION_DURATION_SECS: i32 = 900;

/// Longest session STS will issue (role maximum permitting)
pub const MAX_SESSION_DURATION_SECS: i32 = 43_200;

/// Session name passed to STS unless overridden
pub const DEFAULT_ROLE_SESSION_NAME: &str = "Lambda";

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub log_level: String,

    // AWS settings
    /// Region used when a delivery target does not name one
    pub aws_region: String,
    pub sts_endpoint_url: Option<String>,

    // Role assumption
    pub role_session_name: String,
    pub session_duration_seconds: i32,

    // Debug options
    #[serde(default)]
    pub debug: bool,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let settings = Self {
            app_name: env_or_default("APP_NAME", "destination-resolver"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            aws_region: env_or_default("AWS_REGION", "us-east-1"),
            sts_endpoint_url: env::var("STS_ENDPOINT_URL").ok().filter(|s| !s.is_empty()),

            role_session_name: env_or_default("ROLE_SESSION_NAME", DEFAULT_ROLE_SESSION_NAME),
            session_duration_seconds: env_or_default("ROLE_SESSION_DURATION", "900")
                .parse()
                .context("Invalid ROLE_SESSION_DURATION value")?,

            debug: env_or_default("DEBUG", "false").parse().unwrap_or(false),
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SESSION_DURATION_SECS..=MAX_SESSION_DURATION_SECS)
            .contains(&self.session_duration_seconds)
        {
            anyhow::bail!(
                "Session duration must be between {} and {} seconds, got {}",
                MIN_SESSION_DURATION_SECS,
                MAX_SESSION_DURATION_SECS,
                self.session_duration_seconds
            );
        }

        // STS rejects names outside [\w+=,.@-]{2,64}
        let name_len = self.role_session_name.chars().count();
        if !(2..=64).contains(&name_len) {
            anyhow::bail!("Role session name must be 2 to 64 characters long");
        }

        if self.aws_region.is_empty() {
            anyhow::bail!("AWS region cannot be empty");
        }

        Ok(())
    }

    /// Effective log level, forced to debug when the debug flag is set
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }

    /// Derive the resolver configuration from these settings
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            default_region: self.aws_region.clone(),
            role_session_name: self.role_session_name.clone(),
            session_duration_seconds: self.session_duration_seconds,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "destination-resolver".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            aws_region: "us-east-1".to_string(),
            sts_endpoint_url: None,
            role_session_name: DEFAULT_ROLE_SESSION_NAME.to_string(),
            session_duration_seconds: MIN_SESSION_DURATION_SECS,
            debug: false,
        }
    }
}

/// The subset of settings the service resolver needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub default_region: String,
    pub role_session_name: String,
    pub session_duration_seconds: i32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Settings::default().resolver_config()
    }
}

impl ResolverConfig {
    /// How long a cached session is trusted.
    ///
    /// Five seconds shorter than what STS grants so the refresh always lands
    /// before the provider expires the credentials.
    pub fn session_lifetime(&self) -> Duration {
        let secs = u64::try_from(self.session_duration_seconds).unwrap_or(0);
        Duration::from_secs(secs.saturating_sub(5))
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
