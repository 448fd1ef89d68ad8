use crate::error::{CoachError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a supportive mental coach.";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub session: SessionConfig,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Explicit credential. When unset, `api_key_env` is consulted on every request.
    pub api_key: Option<String>,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_sessions: Option<usize>,
    pub idle_ttl_secs: Option<u64>,
    /// Most recent turns sent upstream; `None` sends the whole transcript.
    pub max_history_turns: Option<usize>,
    pub reap_interval_secs: u64,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            session: SessionConfig::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.into(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: Some(10_000),
            idle_ttl_secs: Some(3600),
            max_history_turns: None,
            reap_interval_secs: 60,
        }
    }
}

impl CoachConfig {
    /// Parse a TOML document. Missing sections and keys fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| CoachError::ConfigLoad(e.to_string()))
    }

    /// Load from `path` when given, otherwise defaults. Env overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .map_err(|e| CoachError::ConfigLoad(format!("{}: {e}", p.display())))?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        cfg.apply_env_with(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Apply `COACH_HOST`, `COACH_PORT`, `COACH_MODEL` and `OPENAI_BASE_URL`.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("COACH_HOST").filter(|v| !v.is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup("COACH_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "ignoring invalid COACH_PORT"),
            }
        }
        if let Some(model) = lookup("COACH_MODEL").filter(|v| !v.is_empty()) {
            self.provider.model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL").filter(|v| !v.is_empty()) {
            self.provider.base_url = url;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ProviderConfig {
    /// Resolve the credential from config, then from the process environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|key| std::env::var(key).ok())
    }

    pub fn resolve_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| lookup(&self.api_key_env).filter(|k| !k.trim().is_empty()))
    }
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Option<Duration> {
        self.idle_ttl_secs.map(Duration::from_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }
}
