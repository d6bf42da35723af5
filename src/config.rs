use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Initial state of the smart-routing feature gate. Search is rejected
    /// while it is off; invocation stays available either way.
    pub smart_routing_enabled: bool,
    /// Optional bootstrap file describing backend servers and their catalogs.
    pub catalog_path: Option<PathBuf>,
    /// Deadline applied to tool invocations when the caller supplies none.
    pub invoke_timeout_ms: u64,
    /// Upper bound for caller-supplied invocation deadlines.
    pub max_invoke_timeout_ms: u64,
    /// Vector width of the built-in hashing embedder.
    pub embedding_dim: usize,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 30,
            smart_routing_enabled: false,
            catalog_path: None,
            invoke_timeout_ms: 60_000,
            max_invoke_timeout_ms: 300_000,
            embedding_dim: 384,
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// [`Config::default`] for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT", defaults.port)?,
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT", defaults.shutdown_timeout_secs)?,
            smart_routing_enabled: env_flag("SMART_ROUTING_ENABLED", defaults.smart_routing_enabled),
            catalog_path: env::var("CATALOG_PATH").ok().map(PathBuf::from),
            invoke_timeout_ms: parse_env("INVOKE_TIMEOUT_MS", defaults.invoke_timeout_ms)?,
            max_invoke_timeout_ms: parse_env("MAX_INVOKE_TIMEOUT_MS", defaults.max_invoke_timeout_ms)?,
            embedding_dim: parse_env("EMBEDDING_DIM", defaults.embedding_dim)?,
            max_body_bytes: parse_env("MAX_BODY_BYTES", defaults.max_body_bytes)?,
        };

        if config.embedding_dim == 0 {
            anyhow::bail!("EMBEDDING_DIM must be at least 1");
        }
        if config.invoke_timeout_ms == 0 || config.max_invoke_timeout_ms == 0 {
            anyhow::bail!("Invocation timeouts must be at least 1ms");
        }

        Ok(config)
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_millis(self.invoke_timeout_ms.min(self.max_invoke_timeout_ms))
    }

    /// Resolve the deadline for one invocation. Caller-supplied values are
    /// clamped to `[1, max_invoke_timeout_ms]`.
    pub fn effective_timeout(&self, requested_ms: Option<u64>) -> Duration {
        match requested_ms {
            Some(ms) => Duration::from_millis(ms.clamp(1, self.max_invoke_timeout_ms)),
            None => self.invoke_timeout(),
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| parse_flag(&v))
        .unwrap_or(default)
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
