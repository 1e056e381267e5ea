//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use ri_billing_engine::EngineConfig;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/ri-billing").
    pub data_dir: String,

    /// Service API key required by the task endpoints.
    pub service_api_key: Option<String>,

    /// Analytics API URL (optional).
    pub analytics_api_url: Option<String>,

    /// Analytics API key (optional).
    pub analytics_api_key: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Attribution engine configuration.
    pub engine: EngineConfig,
}

/// Analytics secrets file structure.
#[derive(Debug, Deserialize)]
struct AnalyticsSecrets {
    api_url: String,
    api_key: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        // Try to load analytics secrets from file first, then fall back to env vars
        let (analytics_api_url, analytics_api_key) = load_analytics_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/ri-billing".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            analytics_api_url,
            analytics_api_key,
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            engine: load_engine_config(),
        }
    }
}

/// Load analytics secrets from file or environment.
fn load_analytics_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/analytics.json",
        "ri-billing/.secrets/analytics.json",
        "../.secrets/analytics.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<AnalyticsSecrets>(path) {
            tracing::info!(path = %path, "Loaded analytics secrets from file");
            return (Some(secrets.api_url), Some(secrets.api_key));
        }
    }

    // Fall back to environment variables
    tracing::debug!("Analytics secrets file not found, using environment variables");
    (
        std::env::var("ANALYTICS_API_URL").ok(),
        std::env::var("ANALYTICS_API_KEY").ok(),
    )
}

/// Load the engine configuration named by `ENGINE_CONFIG_PATH`, if any.
fn load_engine_config() -> EngineConfig {
    let Ok(path) = std::env::var("ENGINE_CONFIG_PATH") else {
        return EngineConfig::default();
    };

    match EngineConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path, "Loaded engine configuration");
            config
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Invalid engine configuration, using defaults");
            EngineConfig::default()
        }
    }
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/ri-billing".into(),
            service_api_key: None,
            analytics_api_url: None,
            analytics_api_key: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 300,
            engine: EngineConfig::default(),
        }
    }
}
