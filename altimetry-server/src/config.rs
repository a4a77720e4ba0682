//! Configuration loading for the HTTP API process (spec §6, Environment).
//!
//! Loaded once at process start from environment variables, with an
//! optional config-file source layered underneath, the way this stack's
//! services have always loaded configuration.

use anyhow::{Context, Result};
use config::{Environment, File};

/// Fully resolved server configuration.
#[derive(Clone, Debug)]
pub struct Config {
    host: String,
    port: u16,
    database_url: Option<String>,
    registry_url: Option<String>,
    http_client_timeout_seconds: u64,
    provider_roster_file: Option<String>,
}

impl Config {
    /// Loads configuration from the environment (`.env` included), with an
    /// optional file source via `ALTIMETRY_CONFIG_FILE` layered underneath.
    pub fn from_env() -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(Environment::default().separator("__").try_parsing(true));

        if let Ok(config_path) = std::env::var("ALTIMETRY_CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_path));
        }

        let settings = builder.build().context("failed to build configuration")?;

        let host = settings
            .get_string("HOST")
            .unwrap_or_else(|_| default_host().to_string());

        let port = settings
            .get_int("PORT")
            .map(|value| value as u16)
            .unwrap_or_else(|_| default_port());

        let database_url = settings.get_string("DATABASE_URL").ok();
        let registry_url = settings.get_string("REGISTRY_URL").ok();

        let http_client_timeout_seconds = settings
            .get_int("HTTP_CLIENT_TIMEOUT_SECONDS")
            .map(|value| value.max(1) as u64)
            .unwrap_or(default_http_client_timeout_seconds());

        let provider_roster_file = settings.get_string("PROVIDER_ROSTER_FILE").ok();

        Ok(Self {
            host,
            port,
            database_url,
            registry_url,
            http_client_timeout_seconds,
            provider_roster_file,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Connection string for the Item Store backend. `None` means the
    /// in-memory store.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    /// Connection string shared by the Progress Registry and Work Queue
    /// Redis backends. `None` means in-memory implementations of both.
    pub fn registry_url(&self) -> Option<&str> {
        self.registry_url.as_deref()
    }

    pub fn http_client_timeout_seconds(&self) -> u64 {
        self.http_client_timeout_seconds
    }

    /// Path to a declarative provider roster file. `None` means the
    /// built-in default roster (every provider in `altimetry-providers`).
    pub fn provider_roster_file(&self) -> Option<&str> {
        self.provider_roster_file.as_deref()
    }
}

const fn default_port() -> u16 {
    9110
}

fn default_host() -> &'static str {
    "0.0.0.0"
}

const fn default_http_client_timeout_seconds() -> u64 {
    20
}
