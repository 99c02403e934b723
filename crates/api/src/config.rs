use std::time::Duration;

use slidecraft_core::retry::RetryPolicy;
use slidecraft_genai::ProviderConfig;
use slidecraft_pipeline::orchestrator::{OrchestratorConfig, DEFAULT_WORKER_POOL_SIZE};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300`; synchronous page
    /// edits wait on the provider).
    pub request_timeout_secs: u64,
    /// Root directory for stored artifacts (default: `./data/artifacts`).
    pub artifact_root: String,
    /// Maximum accepted upload size in bytes (default: 10 MiB).
    pub max_upload_bytes: usize,
    /// Number of concurrent provider calls across all projects.
    pub worker_pool_size: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `300`                      |
    /// | `ARTIFACT_ROOT`        | `./data/artifacts`         |
    /// | `MAX_UPLOAD_BYTES`     | `10485760`                 |
    /// | `WORKER_POOL_SIZE`     | `4`                        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let artifact_root =
            std::env::var("ARTIFACT_ROOT").unwrap_or_else(|_| "./data/artifacts".into());

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let worker_pool_size: usize = std::env::var("WORKER_POOL_SIZE")
            .unwrap_or_else(|_| DEFAULT_WORKER_POOL_SIZE.to_string())
            .parse()
            .expect("WORKER_POOL_SIZE must be a valid usize");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            artifact_root,
            max_upload_bytes,
            worker_pool_size,
        }
    }

    /// Orchestrator tunables derived from this configuration.
    pub fn orchestrator(&self) -> OrchestratorConfig {
        let retry = match std::env::var("TASK_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            Some(max_attempts) => RetryPolicy {
                max_attempts,
                ..RetryPolicy::default()
            },
            None => RetryPolicy::default(),
        };
        OrchestratorConfig {
            worker_pool_size: self.worker_pool_size,
            retry,
        }
    }
}

/// Load the AI provider configuration from environment variables.
///
/// `GENAI_API_KEY` is required; everything else defaults.
pub fn provider_from_env() -> ProviderConfig {
    let base_url =
        std::env::var("GENAI_BASE_URL").unwrap_or_else(|_| "https://api.genai.example".into());
    let api_key = std::env::var("GENAI_API_KEY").expect("GENAI_API_KEY must be set");
    let text_model = std::env::var("GENAI_TEXT_MODEL").unwrap_or_else(|_| "text-large".into());
    let image_model = std::env::var("GENAI_IMAGE_MODEL").unwrap_or_else(|_| "image-large".into());
    let timeout_secs: u64 = std::env::var("GENAI_TIMEOUT_SECS")
        .unwrap_or_else(|_| slidecraft_genai::http::DEFAULT_TIMEOUT_SECS.to_string())
        .parse()
        .expect("GENAI_TIMEOUT_SECS must be a valid u64");

    ProviderConfig {
        base_url,
        api_key,
        text_model,
        image_model,
        timeout: Duration::from_secs(timeout_secs),
    }
}
