//! Engine configuration

use crate::error::{RepriseError, RepriseResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level engine configuration.
///
/// Loaded from a TOML file; every field has a sensible default so an empty
/// file (or none at all) yields a working local setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker pool size per regression run
    #[serde(default = "EngineConfig::default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-case timeout for the model call
    #[serde(with = "humantime_serde", default = "EngineConfig::default_case_timeout")]
    pub case_timeout: Duration,

    /// Model backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Judge settings
    #[serde(default)]
    pub judge: JudgeConfig,
}

impl EngineConfig {
    const fn default_max_concurrency() -> usize {
        5
    }

    const fn default_case_timeout() -> Duration {
        Duration::from_secs(60)
    }

    /// Load configuration from a TOML file, or defaults when no path is
    /// given.
    pub fn load(path: Option<&Path>) -> RepriseResult<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    RepriseError::config(format!(
                        "failed to read config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                toml::from_str(&content).map_err(|e| {
                    RepriseError::config(format!(
                        "failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> RepriseResult<()> {
        if self.max_concurrency == 0 {
            return Err(RepriseError::config("max_concurrency must be at least 1"));
        }
        if self.case_timeout.is_zero() {
            return Err(RepriseError::config("case_timeout must be greater than 0"));
        }
        if self.backend.base_url.is_empty() {
            return Err(RepriseError::config("backend.base_url must not be empty"));
        }
        if self.judge.model_name.is_empty() {
            return Err(RepriseError::config("judge.model_name must not be empty"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: Self::default_max_concurrency(),
            case_timeout: Self::default_case_timeout(),
            backend: BackendConfig::default(),
            judge: JudgeConfig::default(),
        }
    }
}

/// Settings for the OpenAI-compatible model backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the chat completions API
    #[serde(default = "BackendConfig::default_base_url")]
    pub base_url: String,

    /// API key; falls back to the environment variable below
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable consulted when no key is configured
    #[serde(default = "BackendConfig::default_api_key_env")]
    pub api_key_env: String,

    /// TCP connect timeout
    #[serde(with = "humantime_serde", default = "BackendConfig::default_connect_timeout")]
    pub connect_timeout: Duration,
}

impl BackendConfig {
    fn default_base_url() -> String {
        String::from("https://api.openai.com/v1")
    }

    fn default_api_key_env() -> String {
        String::from("OPENAI_API_KEY")
    }

    const fn default_connect_timeout() -> Duration {
        Duration::from_secs(30)
    }

    /// Configured key, else the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_key: None,
            api_key_env: Self::default_api_key_env(),
            connect_timeout: Self::default_connect_timeout(),
        }
    }
}

/// Settings for the judge model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Model identifier used for judging
    #[serde(default = "JudgeConfig::default_model_name")]
    pub model_name: String,

    /// Timeout for one judge call
    #[serde(with = "humantime_serde", default = "JudgeConfig::default_call_timeout")]
    pub call_timeout: Duration,
}

impl JudgeConfig {
    fn default_model_name() -> String {
        String::from("gpt-4o-mini")
    }

    const fn default_call_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model_name: Self::default_model_name(),
            call_timeout: Self::default_call_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrency, 5);
        assert_eq!(config.case_timeout, Duration::from_secs(60));
        assert_eq!(config.judge.model_name, "gpt-4o-mini");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "max_concurrency = 8\ncase_timeout = \"90s\"\n\n[backend]\nbase_url = \"http://localhost:8080/v1\"\n\n[judge]\nmodel_name = \"local-judge\""
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.case_timeout, Duration::from_secs(90));
        assert_eq!(config.backend.base_url, "http://localhost:8080/v1");
        assert_eq!(config.judge.model_name, "local-judge");
    }

    #[test]
    fn test_invalid_concurrency_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_concurrency = 0").unwrap();
        assert!(EngineConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_api_key_falls_back_to_env() {
        let config = BackendConfig {
            api_key: Some("inline-key".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("inline-key"));
    }
}
