//! Configuration loading, validation, and management for rentwise.
//!
//! Loads configuration from `~/.rentwise/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use rentwise_core::schema::{Dimension, ListingPlatform};

/// The root configuration structure.
///
/// Maps directly to `~/.rentwise/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Rental listing backend
    #[serde(default)]
    pub rental_api: RentalApiConfig,

    /// Language model used for delegated slot extraction
    #[serde(default)]
    pub llm: LlmConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Session store settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Defaults applied when routing a search
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Rule-based extractor pattern table
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalApiConfig {
    #[serde(default = "default_rental_base_url")]
    pub base_url: String,

    /// Sent as `X-User-ID` on every house call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default = "default_rental_timeout")]
    pub timeout_secs: u64,

    /// Retry a GET once when the transport fails.
    #[serde(default = "default_true")]
    pub retry_transient: bool,
}

fn default_rental_base_url() -> String {
    "http://localhost:8080".into()
}
fn default_rental_timeout() -> u64 {
    30
}

impl Default for RentalApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_rental_base_url(),
            user_id: None,
            timeout_secs: default_rental_timeout(),
            retry_transient: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible endpoint, e.g. `http://10.0.0.5:8888/v1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound for one extraction call.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Port joined with a per-request `model_ip`.
    #[serde(default = "default_model_service_port")]
    pub model_service_port: u16,

    #[serde(default = "default_model_service_path")]
    pub model_service_path: String,
}

fn default_model() -> String {
    "qwen3".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_llm_timeout() -> u64 {
    20
}
fn default_model_service_port() -> u16 {
    8888
}
fn default_model_service_path() -> String {
    "/v1".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
            model_service_port: default_model_service_port(),
            model_service_path: default_model_service_path(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("model_service_port", &self.model_service_port)
            .field("model_service_path", &self.model_service_path)
            .finish()
    }
}

impl LlmConfig {
    /// Whether delegated extraction should be used at all.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            || self.base_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Turn a per-request `model_ip` into a model base URL.
    ///
    /// A value containing `://` is taken as a full URL; a bare host becomes
    /// `http://<host>:<model_service_port><model_service_path>`.
    pub fn base_url_for_model_ip(&self, model_ip: &str) -> Option<String> {
        let ip = model_ip.trim();
        if ip.is_empty() {
            return None;
        }
        if ip.contains("://") {
            return Some(ip.trim_end_matches('/').to_string());
        }
        let url = format!(
            "http://{ip}:{}{}",
            self.model_service_port, self.model_service_path
        );
        Some(url.trim_end_matches('/').to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8765
}
fn default_host() -> String {
    "0.0.0.0".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// User/assistant pairs kept per session.
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    /// Drop sessions idle for longer than this. Unset keeps them for the
    /// process lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_ttl_secs: Option<u64>,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

/// Longest idle TTL accepted: one year.
pub const MAX_IDLE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

fn default_max_history_turns() -> usize {
    10
}
fn default_sweep_interval() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history_turns: default_max_history_turns(),
            idle_ttl_secs: None,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Page size sent with every search unless the user chose one.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Platform filter applied to searches unless the user chose one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_platform: Option<String>,

    /// Radius in meters for landmark searches.
    #[serde(default = "default_nearby_max_distance")]
    pub nearby_max_distance: f64,
}

fn default_page_size() -> u32 {
    20
}
fn default_nearby_max_distance() -> f64 {
    2000.0
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page: None,
            listing_platform: None,
            nearby_max_distance: default_nearby_max_distance(),
        }
    }
}

/// Keyword tables for the rule-based extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_districts")]
    pub districts: Vec<String>,

    /// Business areas and landmarks recognized by name.
    #[serde(default = "default_landmarks")]
    pub landmarks: Vec<String>,

    /// Words that turn a recognized name into a proximity search.
    #[serde(default = "default_proximity_markers")]
    pub proximity_markers: Vec<String>,

    #[serde(default = "default_near_subway_phrases")]
    pub near_subway_phrases: Vec<String>,

    /// `max_subway_dist` set by a near-subway phrase, in meters.
    #[serde(default = "default_near_subway_distance")]
    pub near_subway_distance: u32,

    /// Fixed destination of `commute_to_xierqi_max`.
    #[serde(default = "default_commute_destination")]
    pub commute_destination: String,

    /// Words that introduce a commute time without naming the destination.
    #[serde(default = "default_commute_phrases")]
    pub commute_phrases: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_districts() -> Vec<String> {
    strings(&[
        "海淀", "朝阳", "西城", "东城", "丰台", "通州", "昌平", "大兴", "房山", "顺义", "石景山",
        "门头沟",
    ])
}
fn default_landmarks() -> Vec<String> {
    strings(&[
        "西二旗站", "车公庄站", "国贸站", "西二旗", "上地", "国贸", "望京", "中关村", "五道口",
    ])
}
fn default_proximity_markers() -> Vec<String> {
    strings(&["附近", "边上", "周边", "靠近"])
}
fn default_near_subway_phrases() -> Vec<String> {
    strings(&["近地铁", "离地铁近", "地铁附近", "地铁旁"])
}
fn default_near_subway_distance() -> u32 {
    800
}
fn default_commute_destination() -> String {
    "西二旗".into()
}
fn default_commute_phrases() -> Vec<String> {
    strings(&["通勤"])
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            districts: default_districts(),
            landmarks: default_landmarks(),
            proximity_markers: default_proximity_markers(),
            near_subway_phrases: default_near_subway_phrases(),
            near_subway_distance: default_near_subway_distance(),
            commute_destination: default_commute_destination(),
            commute_phrases: default_commute_phrases(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.rentwise/config.toml).
    ///
    /// Environment variables override the file:
    /// - `X_USER_ID`, `RENTAL_API_BASE_URL`
    /// - `LLM_API_KEY`, `LLM_BASE_URL`, `LLM_MODEL`
    /// - `RENTWISE_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::read_file(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides through `lookup`. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(user_id) = get("X_USER_ID") {
            self.rental_api.user_id = Some(user_id);
        }
        if let Some(url) = get("RENTAL_API_BASE_URL") {
            self.rental_api.base_url = url;
        }
        if let Some(key) = get("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = get("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(model) = get("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(port) = get("RENTWISE_PORT") {
            match port.trim().parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid RENTWISE_PORT"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".rentwise")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.llm.timeout_secs == 0 || self.rental_api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be at least one second".into(),
            ));
        }

        if !self.rental_api.base_url.starts_with("http://")
            && !self.rental_api.base_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "rental_api.base_url must be an http(s) URL, got '{}'",
                self.rental_api.base_url
            )));
        }

        Dimension::PageSize
            .validate(&self.routing.page_size.to_string())
            .map_err(|e| ConfigError::ValidationError(format!("routing.page_size: {e}")))?;

        if let Some(page) = self.routing.page {
            Dimension::Page
                .validate(&page.to_string())
                .map_err(|e| ConfigError::ValidationError(format!("routing.page: {e}")))?;
        }

        Dimension::MaxDistance
            .validate(&self.routing.nearby_max_distance.to_string())
            .map_err(|e| {
                ConfigError::ValidationError(format!("routing.nearby_max_distance: {e}"))
            })?;

        if let Some(platform) = &self.routing.listing_platform {
            platform.parse::<ListingPlatform>().map_err(|e| {
                ConfigError::ValidationError(format!("routing.listing_platform: {e}"))
            })?;
        }

        if self.session.max_history_turns == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_history_turns must be > 0".into(),
            ));
        }

        if self.session.idle_ttl_secs == Some(0) || self.session.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session.idle_ttl_secs and session.sweep_interval_secs must be > 0".into(),
            ));
        }

        if self.session.idle_ttl_secs.is_some_and(|ttl| ttl > MAX_IDLE_TTL_SECS) {
            return Err(ConfigError::ValidationError(format!(
                "session.idle_ttl_secs must be <= {MAX_IDLE_TTL_SECS}"
            )));
        }

        Ok(())
    }

    /// Check if a user identifier is configured.
    pub fn has_user_id(&self) -> bool {
        self.rental_api
            .user_id
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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

impl From<ConfigError> for rentwise_core::Error {
    fn from(e: ConfigError) -> Self {
        rentwise_core::Error::Config {
            message: e.to_string(),
        }
    }
}
