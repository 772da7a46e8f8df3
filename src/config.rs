use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub lookup: LookupConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub max_redirects: usize,
    pub max_body_bytes: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    pub whois_server: String,
    pub whois_port: u16,
    pub whois_timeout_ms: u64,
    pub dns_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub path: String,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LookupConfig {
    pub fn whois_timeout(&self) -> Duration {
        Duration::from_millis(self.whois_timeout_ms)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }
}

impl Config {
    /// Defaults, then `phishlens.toml` if present, then `PHISHLENS_*` variables
    /// (nested keys joined with `__`, e.g. `PHISHLENS_FETCH__TIMEOUT_MS`).
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Self::defaults()?
            .add_source(config::File::with_name("phishlens").required(false))
            .add_source(
                config::Environment::with_prefix("PHISHLENS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("fetch.timeout_ms", 4000)?
            .set_default("fetch.max_redirects", 30)?
            .set_default("fetch.max_body_bytes", 2 * 1024 * 1024)?
            .set_default("fetch.user_agent", DEFAULT_USER_AGENT)?
            .set_default("lookup.whois_server", "whois.iana.org")?
            .set_default("lookup.whois_port", 43)?
            .set_default("lookup.whois_timeout_ms", 5000)?
            .set_default("lookup.dns_timeout_ms", 3000)?
            .set_default("model.path", "final_model/network_model.json")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            fetch: FetchConfig {
                timeout_ms: 4000,
                max_redirects: 30,
                max_body_bytes: 2 * 1024 * 1024,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            lookup: LookupConfig {
                whois_server: "whois.iana.org".to_string(),
                whois_port: 43,
                whois_timeout_ms: 5000,
                dns_timeout_ms: 3000,
            },
            model: ModelConfig {
                path: "final_model/network_model.json".to_string(),
            },
        }
    }
}
