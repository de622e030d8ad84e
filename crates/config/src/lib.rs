//! Configuration loading, validation, and management for agentbridge.
//!
//! Loads configuration from `~/.agentbridge/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.agentbridge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model backend
    #[serde(default)]
    pub model: ModelConfig,

    /// Tool/resource provider connection
    #[serde(default)]
    pub mcp: McpConfig,

    /// Orchestration loop behaviour
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP surface
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Bundled MCP server
    #[serde(default)]
    pub mcp_server: McpServerConfig,
}

fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

// ── [model] ─────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// "openai", "openrouter", "ollama", or "custom"
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override; required for "custom"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

// ── [mcp] ───────────────────────────────────────────────────────────────

/// How the gateway reaches the tool/resource provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpTransportKind {
    /// Streamable HTTP endpoint
    #[default]
    Http,
    /// Child process speaking newline-delimited JSON-RPC
    Stdio,
    /// The bundled server, in-process
    Embedded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub transport: McpTransportKind,

    #[serde(default = "default_mcp_url")]
    pub url: String,

    /// Program to spawn for the stdio transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_mcp_url() -> String {
    "http://127.0.0.1:8001/mcp".into()
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            transport: McpTransportKind::default(),
            url: default_mcp_url(),
            command: None,
            args: vec![],
            env: HashMap::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// ── [agent] ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Iteration budget when a request does not specify one
    #[serde(default = "default_max_iterations")]
    pub default_max_iterations: u32,

    /// Requests asking for more than this are rejected
    #[serde(default = "default_max_iterations_limit")]
    pub max_iterations_limit: u32,

    /// Whether the resource-read trigger is enabled by default
    #[serde(default = "default_true")]
    pub resource_reads: bool,

    #[serde(default = "default_resource_scheme")]
    pub resource_scheme: String,

    #[serde(default = "default_trigger_token")]
    pub trigger_token: String,
}

fn default_max_iterations() -> u32 {
    3
}
fn default_max_iterations_limit() -> u32 {
    25
}
fn default_resource_scheme() -> String {
    "data://".into()
}
fn default_trigger_token() -> String {
    "READ_RESOURCE:".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default_max_iterations: default_max_iterations(),
            max_iterations_limit: default_max_iterations_limit(),
            resource_reads: true,
            resource_scheme: default_resource_scheme(),
            trigger_token: default_trigger_token(),
        }
    }
}

// ── [gateway] ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_gateway_host() -> String {
    "0.0.0.0".into()
}
fn default_gateway_port() -> u16 {
    8080
}
fn default_allowed_origins() -> Vec<String> {
    vec!["*".into()]
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            allowed_origins: default_allowed_origins(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

// ── [mcp_server] ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    #[serde(default = "default_server_name")]
    pub name: String,
}

fn default_server_host() -> String {
    "127.0.0.1".into()
}
fn default_server_port() -> u16 {
    8001
}
fn default_server_name() -> String {
    "agentbridge-demo".into()
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            name: default_server_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.agentbridge/config.toml).
    ///
    /// Environment overrides:
    /// - `AGENTBRIDGE_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `AGENTBRIDGE_MODEL`
    /// - `AGENTBRIDGE_MCP_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from an explicit path and then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.model.api_key.is_none() {
            self.model.api_key = lookup("AGENTBRIDGE_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(model) = lookup("AGENTBRIDGE_MODEL") {
            self.model.model = model;
        }

        if let Some(url) = lookup("AGENTBRIDGE_MCP_URL") {
            self.mcp.url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentbridge")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        match self.model.provider.as_str() {
            "openai" | "openrouter" | "ollama" => {}
            "custom" if self.model.api_url.is_some() => {}
            "custom" => {
                return Err(ConfigError::ValidationError(
                    "model.api_url is required when model.provider = \"custom\"".into(),
                ));
            }
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown model.provider '{other}'"
                )));
            }
        }

        if self.agent.max_iterations_limit == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations_limit must be > 0".into(),
            ));
        }

        if self.agent.default_max_iterations > self.agent.max_iterations_limit {
            return Err(ConfigError::ValidationError(
                "agent.default_max_iterations must not exceed agent.max_iterations_limit".into(),
            ));
        }

        if self.agent.trigger_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.trigger_token must not be empty".into(),
            ));
        }

        if !self.agent.resource_scheme.ends_with("://") {
            return Err(ConfigError::ValidationError(
                "agent.resource_scheme must end with \"://\"".into(),
            ));
        }

        if self.mcp.transport == McpTransportKind::Stdio && self.mcp.command.is_none() {
            return Err(ConfigError::ValidationError(
                "mcp.command is required for the stdio transport".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.model.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
