// crates/mcp-server/src/config.rs
// ============================================================================
// Module: MCP Server Configuration
// Description: Configuration loading and validation for the MCP server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: mcp-core, mcp-gateway, mcp-transport, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: a malformed file is an
//! error, never a silently-downgraded default.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use mcp_core::CacheConfig;
use mcp_core::RateLimitConfig;
use mcp_core::WorkerPoolConfig;
use mcp_transport::CorsConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "mcp-server.toml";
/// Environment variable used to override the config path.
const CONFIG_ENV_VAR: &str = "MCP_SERVER_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length accepted anywhere in configuration.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of bearer tokens accepted for auth.
const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of a single bearer token.
const MAX_AUTH_TOKEN_LENGTH: usize = 256;

/// Top-level MCP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Transport selection and binding.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Worker pool sizing.
    #[serde(default)]
    pub pool: PoolSectionConfig,
    /// Rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitSectionConfig,
    /// Resource content cache.
    #[serde(default)]
    pub cache: CacheSectionConfig,
    /// Optional gateway proxy configuration file path.
    #[serde(default)]
    pub gateway_config_path: Option<PathBuf>,
    /// Inbound request authentication.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Audit logging.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            pool: PoolSectionConfig::default(),
            rate_limit: RateLimitSectionConfig::default(),
            cache: CacheSectionConfig::default(),
            gateway_config_path: None,
            auth: AuthConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// an explicit `path`, else `MCP_SERVER_CONFIG`, else `mcp-server.toml`
    /// in the current directory. A missing default file is not an error;
    /// an explicit path or env-resolved path that is missing is.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read, is too large,
    /// is not valid UTF-8 or TOML, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, required) = resolve_path(path);
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                let mut config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(err) => return Err(ConfigError::Io(err.to_string())),
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transport.validate()?;
        self.pool.validate()?;
        self.rate_limit.validate()?;
        self.cache.validate()?;
        self.auth.validate()?;
        self.audit.validate()?;
        if let Some(path) = &self.gateway_config_path {
            validate_path_string("gateway_config_path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Supported MCP transport kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Stdin/stdout framed transport.
    #[default]
    Stdio,
    /// Raw TCP framed transport.
    Tcp,
    /// HTTP JSON-RPC transport with SSE notifications.
    Http,
}

/// Transport selection and binding.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Which transport to start.
    #[serde(default)]
    pub kind: TransportKind,
    /// Bind address, required for `tcp` and `http`.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum accepted frame/body size in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// CORS policy, consulted only by the `http` transport.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            bind: None,
            max_frame_bytes: default_max_frame_bytes(),
            cors: CorsConfig::default(),
        }
    }
}

impl TransportConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid("transport.max_frame_bytes must be > 0".to_string()));
        }
        match self.kind {
            TransportKind::Stdio => Ok(()),
            TransportKind::Tcp | TransportKind::Http => {
                let bind = self.bind.as_deref().unwrap_or_default().trim();
                if bind.is_empty() {
                    return Err(ConfigError::Invalid(
                        "transport.bind is required for tcp/http transports".to_string(),
                    ));
                }
                bind.parse::<SocketAddr>()
                    .map_err(|_| ConfigError::Invalid("transport.bind is not a valid socket address".to_string()))?;
                Ok(())
            }
        }
    }
}

/// Worker pool sizing, mirrors [`WorkerPoolConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSectionConfig {
    /// Number of worker threads.
    #[serde(default = "default_pool_workers")]
    pub workers: usize,
    /// Maximum queued-but-not-running tasks.
    #[serde(default = "default_pool_queue_size")]
    pub queue_size: usize,
    /// Graceful shutdown drain budget in milliseconds.
    #[serde(default = "default_pool_shutdown_ms")]
    pub graceful_shutdown_ms: u64,
}

impl Default for PoolSectionConfig {
    fn default() -> Self {
        Self {
            workers: default_pool_workers(),
            queue_size: default_pool_queue_size(),
            graceful_shutdown_ms: default_pool_shutdown_ms(),
        }
    }
}

impl PoolSectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("pool.workers must be > 0".to_string()));
        }
        if self.queue_size == 0 {
            return Err(ConfigError::Invalid("pool.queue_size must be > 0".to_string()));
        }
        Ok(())
    }

    /// Builds the runtime worker pool configuration.
    #[must_use]
    pub fn to_worker_pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            workers: self.workers,
            queue_size: self.queue_size,
            graceful_shutdown: Duration::from_millis(self.graceful_shutdown_ms),
        }
    }
}

/// Rate limit section, mirrors [`RateLimitConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSectionConfig {
    /// Maximum distinct client keys tracked at once.
    #[serde(default = "default_rate_limit_capacity")]
    pub capacity: usize,
    /// Width of the sliding window, in seconds.
    #[serde(default = "default_rate_limit_window_seconds")]
    pub window_seconds: u64,
    /// Maximum allowed requests per client within the window. Zero disables
    /// rate limiting entirely.
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: usize,
}

impl Default for RateLimitSectionConfig {
    fn default() -> Self {
        Self {
            capacity: default_rate_limit_capacity(),
            window_seconds: default_rate_limit_window_seconds(),
            max_requests: default_rate_limit_max_requests(),
        }
    }
}

impl RateLimitSectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("rate_limit.capacity must be > 0".to_string()));
        }
        Ok(())
    }

    /// Builds the runtime rate limiter configuration.
    #[must_use]
    pub fn to_rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            capacity: self.capacity,
            window_seconds: self.window_seconds,
            max_requests: self.max_requests,
        }
    }
}

/// Cache section, mirrors [`CacheConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSectionConfig {
    /// Maximum distinct URIs held at once.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Default entry time-to-live in seconds.
    #[serde(default = "default_cache_ttl_seconds")]
    pub default_ttl_seconds: u64,
}

impl Default for CacheSectionConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            default_ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

impl CacheSectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("cache.capacity must be > 0".to_string()));
        }
        Ok(())
    }

    /// Builds the runtime cache configuration.
    #[must_use]
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: self.capacity,
            default_ttl: Duration::from_secs(self.default_ttl_seconds),
        }
    }
}

/// Inbound request authentication.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Accepted bearer tokens. Empty means every request is accepted
    /// (suitable for `stdio` and loopback-only deployments).
    #[serde(default)]
    pub bearer_tokens: Vec<String>,
}

impl AuthConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bearer_tokens.len() > MAX_AUTH_TOKENS {
            return Err(ConfigError::Invalid("auth.bearer_tokens exceeds max entries".to_string()));
        }
        for token in &self.bearer_tokens {
            if token.trim().is_empty() {
                return Err(ConfigError::Invalid("auth.bearer_tokens entries must be non-empty".to_string()));
            }
            if token.len() > MAX_AUTH_TOKEN_LENGTH {
                return Err(ConfigError::Invalid("auth.bearer_tokens entry too long".to_string()));
            }
        }
        Ok(())
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines). `None` logs to stderr.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

/// Errors raised while loading or validating configuration.
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

/// Resolves the configuration path. Returns whether the path was explicit
/// (an explicit or env-resolved path that's missing is an error; the
/// built-in default name is not).
fn resolve_path(path: Option<&Path>) -> (PathBuf, bool) {
    if let Some(path) = path {
        return (path.to_path_buf(), true);
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return (PathBuf::from(env_path), true);
    }
    (PathBuf::from(DEFAULT_CONFIG_NAME), false)
}

fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    Ok(())
}

fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

const fn default_max_frame_bytes() -> usize {
    mcp_framing::DEFAULT_MAX_FRAME_BYTES
}

const fn default_pool_workers() -> usize {
    4
}

const fn default_pool_queue_size() -> usize {
    1024
}

const fn default_pool_shutdown_ms() -> u64 {
    5_000
}

const fn default_rate_limit_capacity() -> usize {
    10_000
}

const fn default_rate_limit_window_seconds() -> u64 {
    60
}

const fn default_rate_limit_max_requests() -> usize {
    120
}

const fn default_cache_capacity() -> usize {
    1024
}

const fn default_cache_ttl_seconds() -> u64 {
    300
}

const fn default_audit_enabled() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = env::current_dir().expect("cwd");
        env::set_current_dir(dir.path()).expect("chdir");
        let result = ServerConfig::load(None);
        env::set_current_dir(original).expect("restore cwd");
        let config = result.expect("load");
        assert_eq!(config.transport.kind, TransportKind::Stdio);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = ServerConfig::load(Some(Path::new("/does/not/exist/mcp-server.toml")));
        assert!(err.is_err());
    }

    #[test]
    fn well_formed_file_parses_and_validates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mcp-server.toml");
        fs::write(
            &path,
            r#"
            [transport]
            kind = "tcp"
            bind = "127.0.0.1:9000"

            [rate_limit]
            max_requests = 50
            "#,
        )
        .expect("write");
        let config = ServerConfig::load(Some(&path)).expect("load");
        assert_eq!(config.transport.kind, TransportKind::Tcp);
        assert_eq!(config.rate_limit.max_requests, 50);
    }

    #[test]
    fn tcp_transport_without_bind_fails_validation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mcp-server.toml");
        fs::write(&path, "[transport]\nkind = \"tcp\"\n").expect("write");
        let err = ServerConfig::load(Some(&path));
        assert!(err.is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mcp-server.toml");
        fs::write(&path, "not valid toml = [").expect("write");
        let err = ServerConfig::load(Some(&path));
        assert!(err.is_err());
    }
}
