//! Layered configuration: compiled-in defaults, an optional `memory.toml`
//! file, then `MEMORY_*` environment variables, lowest to highest
//! precedence.

use std::path::{Path, PathBuf};

use memory_core::{EvictionPolicy, SessionConfig};
use serde::Deserialize;
use thiserror::Error;

/// Errors while assembling a [`ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file existed but could not be read.
    #[error("reading {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    /// The config file existed but did not parse as TOML.
    #[error("parsing {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    /// An environment variable held a value of the wrong type.
    #[error("environment variable {name} has an invalid value: {value}")]
    InvalidEnv { name: String, value: String },
}

/// Optional completion-backend settings; absent means the rule extractor
/// runs unconditionally.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmConfig {
    /// Completion endpoint URL.
    pub endpoint: Option<String>,
    /// Bearer token for the endpoint, if required.
    pub api_key: Option<String>,
}

/// Partial, file/env-shaped view of [`ServerConfig`]. Every field is
/// optional so a layer only needs to name what it overrides.
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigLayer {
    bind_addr: Option<String>,
    storage_root: Option<PathBuf>,
    window_size: Option<u64>,
    processing_delay: Option<u64>,
    hot_buffer_size: Option<usize>,
    context_default_depth: Option<usize>,
    max_context_length: Option<usize>,
    llm_request_timeout_seconds: Option<u64>,
    enable_llm_extractor: Option<bool>,
    session_eviction_policy: Option<String>,
    max_sessions: Option<usize>,
    llm_endpoint: Option<String>,
    llm_api_key: Option<String>,
}

/// Fully-resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,
    /// Root directory under which each session gets its own subdirectory.
    pub storage_root: PathBuf,
    /// Per-session tunables (window, buffer, context, LLM timeout).
    pub session: SessionConfig,
    /// Eviction policy applied when `max_sessions` is reached.
    pub eviction_policy: EvictionPolicy,
    /// Capacity bound for live sessions, if any.
    pub max_sessions: Option<usize>,
    /// Completion backend, if one is configured and `enable_llm_extractor`
    /// is set.
    pub llm: Option<LlmConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            storage_root: PathBuf::from("./memory-sessions"),
            session: SessionConfig::default(),
            eviction_policy: EvictionPolicy::None,
            max_sessions: None,
            llm: None,
        }
    }
}

impl ServerConfig {
    /// Build config from defaults, optionally overridden by `config_path`
    /// (a `memory.toml`-shaped file), then by `MEMORY_*` environment
    /// variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = ServerConfig::default();

        if let Some(path) = config_path {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
            let layer: ConfigLayer = toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
            config.apply(layer)?;
        }

        config.apply(layer_from_env()?)?;
        Ok(config)
    }

    fn apply(&mut self, layer: ConfigLayer) -> Result<(), ConfigError> {
        if let Some(v) = layer.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = layer.storage_root {
            self.storage_root = v;
        }
        if let Some(v) = layer.window_size {
            self.session.window_size = v;
        }
        if let Some(v) = layer.processing_delay {
            self.session.processing_delay = v;
        }
        if let Some(v) = layer.hot_buffer_size {
            self.session.hot_buffer_size = v;
        }
        if let Some(v) = layer.context_default_depth {
            self.session.context_default_depth = v;
        }
        if let Some(v) = layer.max_context_length {
            self.session.max_context_length = v;
        }
        if let Some(v) = layer.llm_request_timeout_seconds {
            self.session.llm_request_timeout_seconds = v;
        }
        if let Some(v) = layer.enable_llm_extractor {
            self.session.enable_llm_extractor = v;
        }
        if let Some(v) = layer.max_sessions {
            self.max_sessions = Some(v);
        }
        if let Some(v) = layer.session_eviction_policy {
            self.eviction_policy = match v.as_str() {
                "none" => EvictionPolicy::None,
                "lru" => EvictionPolicy::Lru,
                other => return Err(ConfigError::InvalidEnv { name: "session_eviction_policy".into(), value: other.to_string() }),
            };
        }
        if layer.llm_endpoint.is_some() || layer.llm_api_key.is_some() {
            let mut llm = self.llm.clone().unwrap_or_default();
            if let Some(v) = layer.llm_endpoint {
                llm.endpoint = Some(v);
            }
            if let Some(v) = layer.llm_api_key {
                llm.api_key = Some(v);
            }
            self.llm = Some(llm);
        }
        Ok(())
    }
}

fn layer_from_env() -> Result<ConfigLayer, ConfigError> {
    let mut layer = ConfigLayer::default();
    layer.bind_addr = std::env::var("MEMORY_BIND_ADDR").ok();
    layer.storage_root = std::env::var("MEMORY_STORAGE_ROOT").ok().map(PathBuf::from);
    layer.window_size = parse_env("MEMORY_WINDOW_SIZE")?;
    layer.processing_delay = parse_env("MEMORY_PROCESSING_DELAY")?;
    layer.hot_buffer_size = parse_env("MEMORY_HOT_BUFFER_SIZE")?;
    layer.context_default_depth = parse_env("MEMORY_CONTEXT_DEFAULT_DEPTH")?;
    layer.max_context_length = parse_env("MEMORY_MAX_CONTEXT_LENGTH")?;
    layer.llm_request_timeout_seconds = parse_env("MEMORY_LLM_REQUEST_TIMEOUT_SECONDS")?;
    layer.enable_llm_extractor = parse_env("MEMORY_ENABLE_LLM_EXTRACTOR")?;
    layer.session_eviction_policy = std::env::var("MEMORY_SESSION_EVICTION_POLICY").ok();
    layer.max_sessions = parse_env("MEMORY_MAX_SESSIONS")?;
    layer.llm_endpoint = std::env::var("MEMORY_LLM_ENDPOINT").ok();
    layer.llm_api_key = std::env::var("MEMORY_LLM_API_KEY").ok();
    Ok(layer)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigError::InvalidEnv { name: name.to_string(), value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_distilled_spec() {
        let config = ServerConfig::default();
        assert_eq!(config.session.window_size, 4);
        assert_eq!(config.session.processing_delay, 1);
        assert_eq!(config.session.hot_buffer_size, 10);
        assert_eq!(config.session.max_context_length, 4000);
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.toml");
        std::fs::write(&path, "window_size = 8\nenable_llm_extractor = true\n").unwrap();
        let config = ServerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.session.window_size, 8);
        assert!(config.session.enable_llm_extractor);
    }
}
