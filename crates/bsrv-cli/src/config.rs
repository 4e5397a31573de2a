//! C11 — layered configuration: built-in defaults, then an optional TOML
//! file, then environment variable overrides, environment winning.
//!
//! Bound checks run once at [`Config::load`] and surface as a single
//! [`ConfigError`]; nothing here panics on bad input.

use std::path::Path;

use serde::Deserialize;

const ENV_PREFIX: &str = "BSRV_";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_auth: bool,
    pub api_key: Option<String>,
    pub rate_limit_requests_per_minute: u32,
    pub max_concurrent_connections: usize,
    pub ping_interval_secs: u64,
    pub ping_timeout_secs: u64,
    pub max_message_size_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            enable_auth: true,
            api_key: None,
            rate_limit_requests_per_minute: 60,
            max_concurrent_connections: 50,
            ping_interval_secs: 20,
            ping_timeout_secs: 10,
            max_message_size_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: Option<String>,
    pub timeout_ms: u32,
    pub slow_mo_ms: u32,
    pub disable_web_security: bool,
    pub disable_dev_shm: bool,
    pub no_sandbox: bool,
    pub ignore_https_errors: bool,
    pub max_sessions: usize,
    pub session_timeout_seconds: f64,
    pub cleanup_interval_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            user_agent: None,
            timeout_ms: 30_000,
            slow_mo_ms: 0,
            disable_web_security: false,
            disable_dev_shm: true,
            no_sandbox: false,
            ignore_https_errors: false,
            max_sessions: 10,
            session_timeout_seconds: 3_600.0,
            cleanup_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub enable_input_sanitization: bool,
    pub max_selector_length: usize,
    pub max_text_input_length: usize,
    pub max_url_length: usize,
    pub allow_custom_js: bool,
    pub js_timeout_ms: u32,
    pub allowed_domains: Option<Vec<String>>,
    pub blocked_domains: Option<Vec<String>>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_input_sanitization: true,
            max_selector_length: 1_000,
            max_text_input_length: 10_000,
            max_url_length: 2_048,
            allow_custom_js: false,
            js_timeout_ms: 5_000,
            allowed_domains: None,
            blocked_domains: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enable_session_log: bool,
    pub session_log_path: String,
    pub max_log_file_size_mb: u64,
    pub backup_count: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_session_log: true,
            session_log_path: "session.log".to_string(),
            max_log_file_size_mb: 10,
            backup_count: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Loads defaults, layers an optional TOML file on top, then layers
    /// `BSRV_*` environment variables on top of that, then validates.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)
                    .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
                toml::from_str(&text)
                    .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })?
            }
            _ => Config::default(),
        };

        apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.rate_limit_requests_per_minute == 0 {
            return Err(ConfigError::Invalid("server.rate_limit_requests_per_minute must be > 0".into()));
        }
        if self.browser.session_timeout_seconds <= 0.0 {
            return Err(ConfigError::Invalid("browser.session_timeout_seconds must be > 0".into()));
        }
        if self.browser.viewport_width == 0 || self.browser.viewport_height == 0 {
            return Err(ConfigError::Invalid("browser viewport dimensions must be positive".into()));
        }
        if self.server.enable_auth {
            let key_len = self.server.api_key.as_deref().unwrap_or("").len();
            if key_len < 16 {
                return Err(ConfigError::Invalid("server.api_key must be at least 16 characters when auth is enabled".into()));
            }
        }
        Ok(())
    }

    /// Flags that weaken the deployment's security posture. Logged once
    /// at `warn` by the caller through C12, never here (this module has
    /// no logging dependency of its own).
    pub fn security_degrading_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.browser.disable_web_security {
            flags.push("browser.disable_web_security");
        }
        if self.browser.no_sandbox {
            flags.push("browser.no_sandbox");
        }
        if !self.browser.disable_dev_shm {
            flags.push("browser.disable_dev_shm=false");
        }
        if !self.server.enable_auth {
            flags.push("server.enable_auth=false");
        }
        flags
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Some(v) = env_str("HOST") {
        config.server.host = v;
    }
    if let Some(v) = env_parse::<u16>("PORT") {
        config.server.port = v;
    }
    if let Some(v) = env_str("API_KEY") {
        config.server.api_key = Some(v);
    }
    if let Some(v) = env_bool("ENABLE_AUTH") {
        config.server.enable_auth = v;
    }
    if let Some(v) = env_parse::<u32>("RATE_LIMIT_REQUESTS_PER_MINUTE") {
        config.server.rate_limit_requests_per_minute = v;
    }
    if let Some(v) = env_parse::<usize>("MAX_CONCURRENT_CONNECTIONS") {
        config.server.max_concurrent_connections = v;
    }

    if let Some(v) = env_bool("HEADLESS") {
        config.browser.headless = v;
    }
    if let Some(v) = env_bool("DISABLE_WEB_SECURITY") {
        config.browser.disable_web_security = v;
    }
    if let Some(v) = env_bool("NO_SANDBOX") {
        config.browser.no_sandbox = v;
    }
    if let Some(v) = env_parse::<f64>("SESSION_TIMEOUT_SECONDS") {
        config.browser.session_timeout_seconds = v;
    }

    if let Some(v) = env_str("SESSION_LOG_PATH") {
        config.logging.session_log_path = v;
    }

    if let Some(v) = env_bool("ALLOW_CUSTOM_JS") {
        config.security.allow_custom_js = v;
    }
}

fn env_str(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}")).ok().filter(|v| !v.is_empty())
}

fn env_bool(suffix: &str) -> Option<bool> {
    env_str(suffix).map(|v| v.eq_ignore_ascii_case("true"))
}

fn env_parse<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    env_str(suffix).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let mut config = Config::default();
        config.server.enable_auth = false;
        config.validate().unwrap();
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let mut config = Config::default();
        config.server.enable_auth = false;
        config.server.rate_limit_requests_per_minute = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn short_api_key_rejected_when_auth_enabled() {
        let mut config = Config::default();
        config.server.enable_auth = true;
        config.server.api_key = Some("short".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn long_api_key_accepted_when_auth_enabled() {
        let mut config = Config::default();
        config.server.enable_auth = true;
        config.server.api_key = Some("a-sufficiently-long-secret-key".into());
        config.validate().unwrap();
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        // auth is on by default with no key configured, so validation
        // rejects the bare defaults until an operator supplies one.
        let err = Config::load(Some(Path::new("/nonexistent/bsrv.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn defaults_with_auth_disabled_load_cleanly() {
        let mut config = Config::default();
        config.server.enable_auth = false;
        config.validate().unwrap();
        assert_eq!(config.server.port, 8765);
    }

    #[test]
    fn security_degrading_flags_lists_enabled_risks() {
        let mut config = Config::default();
        config.browser.no_sandbox = true;
        let flags = config.security_degrading_flags();
        assert!(flags.contains(&"browser.no_sandbox"));
    }
}
