use std::{env, str::FromStr, time::Duration};

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub tokens: TokenConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
    pub refresh_breaker_threshold: u32,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub client_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub aux_token_ttl: Duration,
    pub flag_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub query_max_capacity: u64,
    pub query_ttl: Duration,
    pub storage_namespace: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_concurrent_requests: usize,
    pub login_path: String,
    pub public_paths: Vec<String>,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub page_size: u32,
}

pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/",
    "/about",
    "/privacy",
    "/terms",
    "/auth",
    "/auth/*",
    "/explore/*",
    "/health",
    "/api/auth/*",
];

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            api: ApiConfig {
                base_url: env_required("API_BASE_URL")?,
                request_timeout: Duration::from_secs(env_or_parse("REQUEST_TIMEOUT_SECS", 30)?),
                refresh_timeout: Duration::from_secs(env_or_parse("REFRESH_TIMEOUT_SECS", 15)?),
                refresh_breaker_threshold: env_or_parse("REFRESH_BREAKER_THRESHOLD", 3)?,
            },
            tokens: TokenConfig {
                client_secret: env_required("CLIENT_SECRET")?,
                access_token_ttl: Duration::from_secs(
                    env_or_parse("ACCESS_TOKEN_TTL_SECS", 86_400)?, // 1 day
                ),
                refresh_token_ttl: Duration::from_secs(
                    env_or_parse("REFRESH_TOKEN_TTL_SECS", 2_592_000)?, // 30 days
                ),
                aux_token_ttl: Duration::from_secs(env_or_parse("AUX_TOKEN_TTL_SECS", 3600)?),
                flag_ttl: Duration::from_secs(env_or_parse("FLAG_TTL_SECS", 31_536_000)?),
            },
            cache: CacheConfig {
                query_max_capacity: env_or_parse("QUERY_CACHE_MAX_CAPACITY", 1000)?,
                query_ttl: Duration::from_secs(env_or_parse("QUERY_CACHE_TTL_SECS", 300)?),
                storage_namespace: env_or_default("STORAGE_NAMESPACE", "iter-bene"),
            },
            server: ServerConfig {
                host: env_or_default("HOST", "127.0.0.1"),
                port: env_or_parse("PORT", 3000)?,
                max_concurrent_requests: env_or_parse("SERVER_MAX_CONCURRENT_REQUESTS", 100)?,
                login_path: env_or_default("LOGIN_PATH", "/auth"),
                public_paths: env_list(
                    "PUBLIC_PATHS",
                    DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
                ),
                secure_cookies: env_or_parse("SECURE_COOKIES", false)?,
            },
            feed: FeedConfig {
                page_size: env_or_parse("FEED_PAGE_SIZE", 10)?,
            },
        })
    }

    /// Builds a configuration with every optional setting at its default.
    pub fn with_defaults(base_url: &str, client_secret: &str) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.to_string(),
                request_timeout: Duration::from_secs(30),
                refresh_timeout: Duration::from_secs(15),
                refresh_breaker_threshold: 3,
            },
            tokens: TokenConfig {
                client_secret: client_secret.to_string(),
                access_token_ttl: Duration::from_secs(86_400),
                refresh_token_ttl: Duration::from_secs(2_592_000),
                aux_token_ttl: Duration::from_secs(3600),
                flag_ttl: Duration::from_secs(31_536_000),
            },
            cache: CacheConfig {
                query_max_capacity: 1000,
                query_ttl: Duration::from_secs(300),
                storage_namespace: "iter-bene".to_string(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                max_concurrent_requests: 100,
                login_path: "/auth".to_string(),
                public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
                secure_cookies: false,
            },
            feed: FeedConfig { page_size: 10 },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tokens.client_secret.len() < 32 {
            return Err(AppError::InvalidParams(
                "CLIENT_SECRET must be at least 32 characters".into(),
            ));
        }

        if self.api.refresh_timeout >= self.api.request_timeout {
            return Err(AppError::InvalidParams(
                "REFRESH_TIMEOUT_SECS must be shorter than REQUEST_TIMEOUT_SECS".into(),
            ));
        }

        if self.api.refresh_breaker_threshold == 0 {
            return Err(AppError::InvalidParams(
                "REFRESH_BREAKER_THRESHOLD must be positive".into(),
            ));
        }

        if !self.server.login_path.starts_with('/') {
            return Err(AppError::InvalidParams(
                "LOGIN_PATH must start with '/'".into(),
            ));
        }

        if self.feed.page_size == 0 {
            return Err(AppError::InvalidParams(
                "FEED_PAGE_SIZE must be positive".into(),
            ));
        }

        url::Url::parse(&self.api.base_url)?;

        Ok(())
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|_| AppError::InvalidParams(format!("Invalid value for {key}"))),
        Err(_) => Ok(default),
    }
}

fn env_required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| AppError::InvalidParams(format!("{key} is required")))
}

fn env_list(key: &str, default: Vec<String>) -> Vec<String> {
    env::var(key)
        .map(|val| {
            val.split(',')
                .map(|str_val| str_val.trim().to_string())
                .filter(|str_val| !str_val.is_empty())
                .collect()
        })
        .unwrap_or(default)
}
