use serde::{Deserialize, Serialize};

/// Client settings, loadable from a JSON file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Base URL of the service; the versioned API root is derived from it
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Per request timeout, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub insecure_skip_verify: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Directory for rotated JSON log files (CLI only, none means console only)
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("indexden-rs/{}", env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            timeout_ms: default_timeout_ms(),
            insecure_skip_verify: false,
            user_agent: default_user_agent(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"server_url": "http://search.example:9999"}"#).unwrap();
        assert_eq!(config.server_url, "http://search.example:9999");
        assert_eq!(config.timeout_ms, 30_000);
        assert!(!config.insecure_skip_verify);
        assert!(config.user_agent.starts_with("indexden-rs/"));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server_url, ClientConfig::default().server_url);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(ClientConfig::load("/nonexistent/indexden.json").is_err());
    }
}
