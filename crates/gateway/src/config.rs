//! Gateway configuration.

use std::env;
use std::time::Duration;

use common::{AppError, AppResult, BackendConfig, QueryCacheConfig};

/// Where the console's data comes from.
#[derive(Debug, Clone)]
pub enum BackendMode {
    /// Hosted backend over HTTP
    Remote(BackendConfig),
    /// Backend handed to `AppContext::with_backend` by the caller
    Provided,
    /// In-process backend seeded with demo fixtures
    #[cfg(feature = "demo")]
    Demo,
}

impl BackendMode {
    /// Name reported by the health check
    pub fn name(&self) -> &'static str {
        match self {
            BackendMode::Remote(_) => "remote",
            BackendMode::Provided => "provided",
            #[cfg(feature = "demo")]
            BackendMode::Demo => "demo",
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub backend: BackendMode,
    /// Query cache tunables
    pub cache: QueryCacheConfig,
    /// How long a view waits for its queries before rendering as loading
    pub view_loading_timeout_ms: u64,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Demo admin login, used only in demo mode
    #[cfg(feature = "demo")]
    pub demo_admin_email: Option<String>,
    #[cfg(feature = "demo")]
    pub demo_admin_password: Option<String>,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> AppResult<T> {
    match var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("{} must be a number, got '{}'", name, raw))),
        None => Ok(default),
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails when `SUPABASE_URL` or `SUPABASE_ANON_KEY` is missing.
    pub fn from_env() -> AppResult<Self> {
        let url = var("SUPABASE_URL").ok_or_else(|| AppError::config("SUPABASE_URL is not set"))?;
        let anon_key =
            var("SUPABASE_ANON_KEY").ok_or_else(|| AppError::config("SUPABASE_ANON_KEY is not set"))?;
        let backend = BackendConfig {
            request_timeout_ms: parsed("REQUEST_TIMEOUT_MS", BackendConfig::default().request_timeout_ms)?,
            ..BackendConfig::new(url, anon_key)
        };
        Self::with_env_settings(BackendMode::Remote(backend))
    }

    /// Demo-mode configuration; no backend settings are read
    #[cfg(feature = "demo")]
    pub fn demo_from_env() -> AppResult<Self> {
        Ok(Self {
            demo_admin_email: var("DEMO_ADMIN_EMAIL"),
            demo_admin_password: var("DEMO_ADMIN_PASSWORD"),
            ..Self::with_env_settings(BackendMode::Demo)?
        })
    }

    /// Configuration for a caller-provided backend
    pub fn provided() -> Self {
        Self::default()
    }

    fn with_env_settings(backend: BackendMode) -> AppResult<Self> {
        let defaults = Self::default();
        let cache_defaults = QueryCacheConfig::default();

        Ok(Self {
            backend,
            cache: QueryCacheConfig {
                stale_time_ms: parsed("QUERY_STALE_TIME_MS", cache_defaults.stale_time_ms)?,
                read_retries: parsed("QUERY_READ_RETRIES", cache_defaults.read_retries)?,
                retry_delay_ms: parsed("QUERY_RETRY_DELAY_MS", cache_defaults.retry_delay_ms)?,
            },
            view_loading_timeout_ms: parsed("VIEW_LOADING_TIMEOUT_MS", defaults.view_loading_timeout_ms)?,
            host: var("GATEWAY_HOST").unwrap_or(defaults.host),
            port: parsed("GATEWAY_PORT", defaults.port)?,
            ..defaults
        })
    }

    pub fn view_loading_timeout(&self) -> Duration {
        Duration::from_millis(self.view_loading_timeout_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend: BackendMode::Provided,
            cache: QueryCacheConfig::default(),
            view_loading_timeout_ms: 2_000,
            host: "0.0.0.0".to_string(),
            port: 3000,
            #[cfg(feature = "demo")]
            demo_admin_email: None,
            #[cfg(feature = "demo")]
            demo_admin_password: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provided_backend_defaults() {
        let config = GatewayConfig::provided();
        assert_eq!(config.backend.name(), "provided");
        assert_eq!(config.view_loading_timeout(), Duration::from_secs(2));
        assert_eq!(config.cache.stale_time_ms, 300_000);
    }

    #[test]
    fn test_missing_backend_settings_fail_fast() {
        // Only meaningful when the test environment does not provide them
        if env::var("SUPABASE_URL").is_ok() || env::var("SUPABASE_ANON_KEY").is_ok() {
            return;
        }
        let err = GatewayConfig::from_env().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
