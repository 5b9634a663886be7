use std::env;

use anyhow::{anyhow, Result};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Runtime configuration, read once from the process environment at startup.
///
/// Required keys fail fast here instead of deep inside a request handler.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub cors_origin: Option<String>,
    pub max_upload_bytes: usize,
    pub suggester: Option<SuggesterConfig>,
}

/// Credentials for the advisory column-name suggestion provider.
/// Present only when both URL and API key are configured.
#[derive(Debug, Clone)]
pub struct SuggesterConfig {
    pub api_url: String,
    pub api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();

        let database_url = match env::var("DATALENS_DATABASE_URL") {
            Ok(v) if !v.is_empty() => v,
            _ => {
                missing.push("DATALENS_DATABASE_URL");
                String::new()
            }
        };

        if !missing.is_empty() {
            return Err(anyhow!(
                "Missing required environment variables: {}",
                missing.join(", ")
            ));
        }

        let bind_addr =
            env::var("DATALENS_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let cors_origin = env::var("DATALENS_CORS_ORIGIN").ok().filter(|v| !v.is_empty());

        let max_upload_bytes = match env::var("DATALENS_MAX_UPLOAD_BYTES") {
            Ok(v) => v
                .parse::<usize>()
                .map_err(|_| anyhow!("DATALENS_MAX_UPLOAD_BYTES must be an integer, got {v:?}"))?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let suggester = match (
            env::var("DATALENS_SUGGEST_URL").ok().filter(|v| !v.is_empty()),
            env::var("DATALENS_SUGGEST_API_KEY").ok().filter(|v| !v.is_empty()),
        ) {
            (Some(api_url), Some(api_key)) => Some(SuggesterConfig { api_url, api_key }),
            _ => None,
        };

        Ok(Self {
            database_url,
            bind_addr,
            cors_origin,
            max_upload_bytes,
            suggester,
        })
    }
}
