use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_DATA_API_URL: &str = "https://api.seranking.com/v1";
pub const DEFAULT_PROJECT_API_URL: &str = "https://api4.seranking.com";

/// Which SE Ranking API family the credential was issued for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    #[default]
    Data,
    Project,
}

impl ApiType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "data" => Some(Self::Data),
            "project" => Some(Self::Project),
            _ => None,
        }
    }
}

/// Resolved credential. Owned by the host; the node only reads it.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_type: ApiType,
}

/// Runtime configuration for the SE Ranking request helper.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub data_api_url: String,
    pub project_api_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub min_interval_ms: u64,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - SERANKING_API_KEY (or SERANKING_TOKEN) [required]
    /// - SERANKING_API_TYPE (data | project, default: data)
    /// - SERANKING_DATA_API_URL (default: https://api.seranking.com/v1)
    /// - SERANKING_PROJECT_API_URL (default: https://api4.seranking.com)
    /// - SERANKING_HTTP_TIMEOUT_SECS (default: 60)
    /// - SERANKING_MIN_INTERVAL_MS (default: 300)
    /// - SERANKING_USER_AGENT (default: seranking-node/<version>)
    pub fn from_env() -> Result<Self, String> {
        let api_key = env::var("SERANKING_API_KEY")
            .or_else(|_| env::var("SERANKING_TOKEN"))
            .map_err(|_| "Missing SERANKING_API_KEY or SERANKING_TOKEN".to_string())?;

        let api_type = match env::var("SERANKING_API_TYPE") {
            Ok(raw) => ApiType::parse(&raw)
                .ok_or_else(|| format!("Invalid SERANKING_API_TYPE '{}' (data|project)", raw))?,
            Err(_) => ApiType::Data,
        };
        let data_api_url = env::var("SERANKING_DATA_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_DATA_API_URL.to_string());
        let project_api_url = env::var("SERANKING_PROJECT_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_PROJECT_API_URL.to_string());
        let timeout_secs = env::var("SERANKING_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        let min_interval_ms = env::var("SERANKING_MIN_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(300);
        let default_ua = format!("seranking-node/{}", env!("CARGO_PKG_VERSION"));
        let user_agent = env::var("SERANKING_USER_AGENT").unwrap_or(default_ua);

        Ok(Self {
            credentials: Credentials { api_key, api_type },
            data_api_url,
            project_api_url,
            user_agent,
            timeout_secs,
            min_interval_ms,
        })
    }

    /// Defaults for a given key; used by tests and embedders that resolve
    /// credentials themselves.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            data_api_url: DEFAULT_DATA_API_URL.to_string(),
            project_api_url: DEFAULT_PROJECT_API_URL.to_string(),
            user_agent: format!("seranking-node/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 60,
            min_interval_ms: 300,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_type_parsing() {
        assert_eq!(ApiType::parse("Project"), Some(ApiType::Project));
        assert_eq!(ApiType::parse(" data "), Some(ApiType::Data));
        assert_eq!(ApiType::parse("legacy"), None);
    }

    #[test]
    fn defaults_for_explicit_credentials() {
        let cfg = Config::with_credentials(Credentials {
            api_key: "k".into(),
            api_type: ApiType::Data,
        });
        assert_eq!(cfg.data_api_url, DEFAULT_DATA_API_URL);
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
        assert_eq!(cfg.min_interval(), Duration::from_millis(300));
    }
}
