// src/environment.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::config::{ClientConfig, InputLimits, RegistrationPolicy, DEFAULT_API_URL};

/// One environment section of `config.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentConfig {
    pub api_url: Option<String>,
    pub auth_url: Option<String>,
    pub auth_anon_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub registration: Option<RegistrationPolicy>,
    pub limits: Option<InputLimits>,
    pub session_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: EnvironmentConfig,
    #[serde(default)]
    production: EnvironmentConfig,
}

impl EnvironmentConfig {
    /// Load configuration for the current environment.
    ///
    /// `config.yaml` is optional; environment variables override whatever it sets.
    pub fn load(config_path: Option<&Path>) -> Result<ClientConfig> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("config.yaml"));

        let section = if path.exists() {
            Self::load_from_file(&path, &environment)?
        } else if config_path.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        } else {
            EnvironmentConfig::default()
        };

        section.with_env_overrides()?.into_client_config()
    }

    fn get_environment() -> String {
        std::env::var("SPECTRAL_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    fn load_from_file(path: &Path, environment: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content, environment)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        Ok(match environment {
            "production" => file.production,
            _ => file.local,
        })
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var("SPECTRAL_API_URL") {
            self.api_url = Some(url);
        }
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            self.auth_url = Some(url);
        }
        if let Ok(key) = std::env::var("SUPABASE_ANON_KEY") {
            self.auth_anon_key = Some(key);
        }
        if let Ok(secs) = std::env::var("SPECTRAL_TIMEOUT_SECS") {
            let secs = secs
                .parse::<u64>()
                .context("SPECTRAL_TIMEOUT_SECS must be a number of seconds")?;
            self.timeout_seconds = Some(secs);
        }
        if let Ok(policy) = std::env::var("SPECTRAL_REGISTRATION") {
            let policy = RegistrationPolicy::parse(&policy).ok_or_else(|| {
                anyhow::anyhow!("SPECTRAL_REGISTRATION must be 'confirmed' or 'optimistic'")
            })?;
            self.registration = Some(policy);
        }
        if let Some(path) = std::env::var_os("SPECTRAL_SESSION_FILE") {
            self.session_file = Some(PathBuf::from(path));
        }
        if let Some(path) = std::env::var_os("SPECTRAL_LOG_FILE") {
            self.log_file = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    pub fn into_client_config(self) -> Result<ClientConfig> {
        let api_url = self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            anyhow::bail!("API URL must start with http:// or https://: {}", api_url);
        }

        let mut config = ClientConfig::new(&api_url);

        if let Some(auth_url) = self.auth_url {
            config = config.with_auth(&auth_url, self.auth_anon_key.as_deref().unwrap_or(""));
        }
        if let Some(secs) = self.timeout_seconds {
            if secs == 0 {
                anyhow::bail!("timeout_seconds must be greater than zero");
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(policy) = self.registration {
            config = config.with_registration_policy(policy);
        }
        if let Some(limits) = self.limits {
            config = config.with_limits(limits);
        }
        if let Some(path) = self.session_file {
            config = config.with_session_file(path);
        }
        if let Some(path) = self.log_file {
            config = config.with_log_file(path);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
local:
  api_url: "http://127.0.0.1:8000/"
  timeout_seconds: 30
  registration: optimistic
production:
  api_url: "https://api.example.com"
  auth_url: "https://project.supabase.co"
  auth_anon_key: "anon-key"
  limits:
    max_description_chars: 5000
    max_keyword_chars: 32
    max_keywords: 20
"#;

    #[test]
    fn test_local_section_selected_by_default() {
        let section = EnvironmentConfig::from_yaml(SAMPLE, "local").unwrap();
        let config = section.into_client_config().unwrap();

        assert_eq!(config.api_base_url, "http://127.0.0.1:8000");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.registration_policy, RegistrationPolicy::Optimistic);
        assert!(!config.has_identity_provider());
    }

    #[test]
    fn test_production_section() {
        let section = EnvironmentConfig::from_yaml(SAMPLE, "production").unwrap();
        let config = section.into_client_config().unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.auth_anon_key, "anon-key");
        assert_eq!(config.limits.max_keywords, 20);
        assert_eq!(config.registration_policy, RegistrationPolicy::Confirmed);
    }

    #[test]
    fn test_rejects_non_http_url() {
        let section = EnvironmentConfig {
            api_url: Some("ftp://nope".to_string()),
            ..Default::default()
        };
        assert!(section.into_client_config().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let section = EnvironmentConfig {
            timeout_seconds: Some(0),
            ..Default::default()
        };
        assert!(section.into_client_config().is_err());
    }

    #[test]
    fn test_missing_sections_default() {
        let section = EnvironmentConfig::from_yaml("production: {}\n", "local").unwrap();
        let config = section.into_client_config().unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
    }
}
