// src/config.rs
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Whether analysis waits for the job registration to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationPolicy {
    /// Trigger analysis only after a 2xx from `parse-job`.
    #[default]
    Confirmed,
    /// Trigger analysis unless the registration call fails at transport level.
    /// A job whose registration was rejected can still be analysed.
    Optimistic,
}

impl RegistrationPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "confirmed" | "strict" => Some(Self::Confirmed),
            "optimistic" | "relaxed" => Some(Self::Optimistic),
            _ => None,
        }
    }
}

/// Upper bounds on free-text input sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    pub max_description_chars: usize,
    pub max_keyword_chars: usize,
    pub max_keywords: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_description_chars: 20_000,
            max_keyword_chars: 64,
            max_keywords: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub auth_base_url: String,
    pub auth_anon_key: String,
    pub request_timeout: Duration,
    pub registration_policy: RegistrationPolicy,
    pub limits: InputLimits,
    pub session_file: PathBuf,
    pub log_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    pub fn new(api_base_url: &str) -> Self {
        Self {
            api_base_url: trim_base_url(api_base_url),
            auth_base_url: String::new(),
            auth_anon_key: String::new(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            registration_policy: RegistrationPolicy::default(),
            limits: InputLimits::default(),
            session_file: default_session_file(),
            log_file: PathBuf::from("/tmp/spectral.log"),
        }
    }

    pub fn with_auth(mut self, base_url: &str, anon_key: &str) -> Self {
        self.auth_base_url = trim_base_url(base_url);
        self.auth_anon_key = anon_key.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_registration_policy(mut self, policy: RegistrationPolicy) -> Self {
        self.registration_policy = policy;
        self
    }

    pub fn with_limits(mut self, limits: InputLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_session_file(mut self, path: PathBuf) -> Self {
        self.session_file = path;
        self
    }

    pub fn with_log_file(mut self, path: PathBuf) -> Self {
        self.log_file = path;
        self
    }

    pub fn has_identity_provider(&self) -> bool {
        !self.auth_base_url.is_empty()
    }
}

pub(crate) fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn default_session_file() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".spectral")
        .join("session.toml")
}
