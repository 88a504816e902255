//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/ifrof` |
//! | `HOST` / `PORT` | `0.0.0.0` / `3000` |
//! | `SEARCH_DAILY_LIMIT` | `10` |
//! | `RATE_LIMIT_ENABLED` | `true` |
//! | `RATE_LIMIT_REQUESTS` / `RATE_LIMIT_PERIOD_SECS` | `60` / `60` |
//! | `MAX_BODY_BYTES` | 8 MiB |
//! | `MAINTENANCE_INTERVAL_SECS` | `3600` (0 disables) |
//!
//! Upstream clients read their own `LLM_*`, `PERPLEXITY_*`, and `FIRECRAWL_*`
//! variables. A missing API key fails startup.

use std::str::FromStr;

use ifrof_core::defaults::{MAINTENANCE_INTERVAL_SECS, MAX_BODY_BYTES, SEARCH_DAILY_LIMIT};
use ifrof_core::Result;
use ifrof_db::PoolConfig;
use ifrof_inference::{LlmConfig, ScrapeConfig, SearchConfig};

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/ifrof";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BURST_REQUESTS: u32 = 60;
const DEFAULT_BURST_PERIOD_SECS: u64 = 60;

/// Global per-process request limiter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    pub period_secs: u64,
}

impl Default for BurstLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: DEFAULT_BURST_REQUESTS,
            period_secs: DEFAULT_BURST_PERIOD_SECS,
        }
    }
}

/// HTTP layer settings shared by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    pub max_body_bytes: usize,
    pub burst: BurstLimitConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: MAX_BODY_BYTES,
            burst: BurstLimitConfig::default(),
        }
    }
}

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool: PoolConfig,
    pub search_daily_limit: i32,
    pub maintenance_interval_secs: u64,
    pub http: HttpConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub scrape: ScrapeConfig,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_defaults = HttpConfig::default();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            host: std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env_or("PORT", DEFAULT_PORT),
            pool: PoolConfig::from_env(),
            search_daily_limit: env_or("SEARCH_DAILY_LIMIT", SEARCH_DAILY_LIMIT),
            maintenance_interval_secs: env_or(
                "MAINTENANCE_INTERVAL_SECS",
                MAINTENANCE_INTERVAL_SECS,
            ),
            http: HttpConfig {
                max_body_bytes: env_or("MAX_BODY_BYTES", http_defaults.max_body_bytes),
                burst: BurstLimitConfig {
                    enabled: env_flag("RATE_LIMIT_ENABLED", http_defaults.burst.enabled),
                    requests: env_or("RATE_LIMIT_REQUESTS", http_defaults.burst.requests),
                    period_secs: env_or(
                        "RATE_LIMIT_PERIOD_SECS",
                        http_defaults.burst.period_secs,
                    ),
                },
            },
            llm: LlmConfig::from_env()?,
            search: SearchConfig::from_env()?,
            scrape: ScrapeConfig::from_env()?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
