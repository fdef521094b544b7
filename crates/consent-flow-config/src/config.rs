// consent-flow-config/src/config.rs
// ============================================================================
// Module: Consent Flow Configuration
// Description: Configuration loading and validation for Consent Flow.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: consent-flow-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to defaults; values that are
//! present are validated and reject the whole file when out of range.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use consent_flow_core::SigningPath;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "consent-flow.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "CONSENT_FLOW_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum API request timeout in milliseconds.
pub(crate) const MIN_API_TIMEOUT_MS: u64 = 100;
/// Maximum API request timeout in milliseconds.
pub(crate) const MAX_API_TIMEOUT_MS: u64 = 120_000;
/// Default API request timeout in milliseconds.
pub(crate) const DEFAULT_API_TIMEOUT_MS: u64 = 15_000;
/// Maximum API response size in bytes.
pub(crate) const MAX_API_RESPONSE_BYTES: usize = 64 * 1024 * 1024;
/// Default API response size limit in bytes.
pub(crate) const DEFAULT_API_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Maximum user agent length.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;
/// Minimum page margin in millimetres.
pub(crate) const MIN_MARGIN_MM: f32 = 5.0;
/// Maximum page margin in millimetres.
pub(crate) const MAX_MARGIN_MM: f32 = 50.0;
/// Default page margin in millimetres.
pub(crate) const DEFAULT_MARGIN_MM: f32 = 15.0;
/// Minimum assistant connect timeout in milliseconds.
pub(crate) const MIN_ASSISTANT_CONNECT_TIMEOUT_MS: u64 = 500;
/// Maximum assistant connect timeout in milliseconds.
pub(crate) const MAX_ASSISTANT_CONNECT_TIMEOUT_MS: u64 = 60_000;
/// Maximum language tag length.
pub(crate) const MAX_LANG_LENGTH: usize = 16;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Consent Flow configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsentFlowConfig {
    /// Remote API configuration.
    #[serde(default)]
    pub api: ApiConfig,
    /// Local storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Workflow configuration.
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Document rendering configuration.
    #[serde(default)]
    pub render: RenderConfig,
    /// Realtime assistant configuration.
    #[serde(default)]
    pub assistant: AssistantConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl ConsentFlowConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        Self::load_resolved(&resolved)
    }

    /// Loads configuration, falling back to defaults when no path was given
    /// and the default file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a file exists but is invalid, or when an
    /// explicit path cannot be read.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        let implicit = path.is_none() && env::var_os(CONFIG_ENV_VAR).is_none();
        if implicit && !resolved.exists() {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load_resolved(&resolved)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a resolved path.
    fn load_resolved(resolved: &Path) -> Result<Self, ConfigError> {
        validate_path(resolved)?;
        let bytes = fs::read(resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content =
            std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.storage.validate()?;
        self.workflow.validate()?;
        self.render.validate()?;
        self.assistant.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: API
// ============================================================================

/// Remote API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API base URL; remote features are unavailable when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Allow cleartext http (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum accepted response size in bytes.
    #[serde(default = "default_api_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            allow_http: false,
            timeout_ms: default_api_timeout_ms(),
            user_agent: default_user_agent(),
            max_response_bytes: default_api_response_bytes(),
        }
    }
}

impl ApiConfig {
    /// Validates API configuration.
    fn validate(&mut self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.base_url {
            let trimmed = base_url.trim().trim_end_matches('/').to_string();
            validate_endpoint("api.base_url", &trimmed, self.allow_http)?;
            self.base_url = Some(trimmed);
        }
        if self.timeout_ms < MIN_API_TIMEOUT_MS || self.timeout_ms > MAX_API_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "api.timeout_ms must be between {MIN_API_TIMEOUT_MS} and {MAX_API_TIMEOUT_MS}"
            )));
        }
        if self.user_agent.trim().is_empty() || self.user_agent.len() > MAX_USER_AGENT_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "api.user_agent must be 1 to {MAX_USER_AGENT_LENGTH} characters"
            )));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_API_RESPONSE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "api.max_response_bytes must be between 1 and {MAX_API_RESPONSE_BYTES}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Storage
// ============================================================================

/// Local storage configuration for session artifacts.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding auth sessions and custom templates.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Validates storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("storage.data_dir", &self.data_dir)
    }

    /// Returns the data directory path.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(self.data_dir.trim())
    }
}

// ============================================================================
// SECTION: Workflow
// ============================================================================

/// Workflow configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowConfig {
    /// Signing path taken after review.
    #[serde(default)]
    pub signing_path: SigningPath,
    /// Optional JSON step catalog replacing the built-in one.
    #[serde(default)]
    pub catalog_path: Option<String>,
}

impl WorkflowConfig {
    /// Validates workflow configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.catalog_path {
            validate_path_string("workflow.catalog_path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Render
// ============================================================================

/// Supported page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    /// ISO A4, 210 x 297 mm.
    #[default]
    A4,
    /// US Letter, 215.9 x 279.4 mm.
    Letter,
}

impl PageSize {
    /// Returns the page width and height in millimetres.
    #[must_use]
    pub const fn dimensions_mm(self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (215.9, 279.4),
        }
    }
}

/// Document rendering configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Page size.
    #[serde(default)]
    pub page_size: PageSize,
    /// Page margin in millimetres.
    #[serde(default = "default_margin_mm")]
    pub margin_mm: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            margin_mm: default_margin_mm(),
        }
    }
}

impl RenderConfig {
    /// Validates render configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.margin_mm.is_finite() || self.margin_mm < MIN_MARGIN_MM || self.margin_mm > MAX_MARGIN_MM {
            return Err(ConfigError::Invalid(format!(
                "render.margin_mm must be between {MIN_MARGIN_MM} and {MAX_MARGIN_MM}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Assistant
// ============================================================================

/// Realtime assistant configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// Enable the assistant side channel.
    #[serde(default)]
    pub enabled: bool,
    /// Realtime endpoint used for the session handshake.
    #[serde(default = "default_realtime_url")]
    pub realtime_url: String,
    /// Realtime model name.
    #[serde(default = "default_realtime_model")]
    pub model: String,
    /// Language tag used when requesting credentials.
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Optional connect timeout in milliseconds; unbounded when unset.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            realtime_url: default_realtime_url(),
            model: default_realtime_model(),
            lang: default_lang(),
            connect_timeout_ms: None,
        }
    }
}

impl AssistantConfig {
    /// Validates assistant configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint("assistant.realtime_url", self.realtime_url.trim(), false)?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("assistant.model must be non-empty".to_string()));
        }
        let lang = self.lang.trim();
        if lang.is_empty()
            || lang.len() > MAX_LANG_LENGTH
            || !lang.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
        {
            return Err(ConfigError::Invalid("assistant.lang must be a short language tag".to_string()));
        }
        if let Some(timeout) = self.connect_timeout_ms
            && !(MIN_ASSISTANT_CONNECT_TIMEOUT_MS ..= MAX_ASSISTANT_CONNECT_TIMEOUT_MS).contains(&timeout)
        {
            return Err(ConfigError::Invalid(format!(
                "assistant.connect_timeout_ms must be between {MIN_ASSISTANT_CONNECT_TIMEOUT_MS} and \
                 {MAX_ASSISTANT_CONNECT_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
    /// Audit disabled.
    None,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink receiving audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path when `sink = "file"`.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required when audit.sink is file".to_string()))
            }
            (_, Some(path)) => validate_path_string("audit.path", path),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an endpoint scheme.
fn validate_endpoint(field: &str, value: &str, allow_http: bool) -> Result<(), ConfigError> {
    let host = if let Some(rest) = value.strip_prefix("https://") {
        rest
    } else if let Some(rest) = value.strip_prefix("http://") {
        if !allow_http {
            return Err(ConfigError::Invalid(format!("{field} uses http:// without allow_http")));
        }
        rest
    } else {
        return Err(ConfigError::Invalid(format!("{field} must include http:// or https://")));
    };
    if host.is_empty() || host.starts_with('/') {
        return Err(ConfigError::Invalid(format!("{field} is missing a host")));
    }
    Ok(())
}

/// Default API request timeout.
const fn default_api_timeout_ms() -> u64 {
    DEFAULT_API_TIMEOUT_MS
}

/// Default API response size limit.
const fn default_api_response_bytes() -> usize {
    DEFAULT_API_RESPONSE_BYTES
}

/// Default user agent.
fn default_user_agent() -> String {
    format!("consent-flow/{}", env!("CARGO_PKG_VERSION"))
}

/// Default data directory.
fn default_data_dir() -> String {
    ".consent-flow".to_string()
}

/// Default page margin.
const fn default_margin_mm() -> f32 {
    DEFAULT_MARGIN_MM
}

/// Default realtime endpoint.
fn default_realtime_url() -> String {
    "https://api.openai.com/v1/realtime".to_string()
}

/// Default realtime model.
fn default_realtime_model() -> String {
    "gpt-realtime-mini".to_string()
}

/// Default assistant language.
fn default_lang() -> String {
    "en".to_string()
}
