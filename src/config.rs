use crate::error::{AppError, Result};
use crate::types::{EventType, FetchFilter};

pub const OPENSEA_API_URL: &str = "https://api.opensea.io/api/v1";
pub const PROFILE_BASE_URL: &str = "https://opensea.io/";

/// How often a poll cycle is started (seconds).
pub const POLL_INTERVAL_SECS: u64 = 60;

/// Page size requested from `/events`. Only one page is ever read.
pub const DEFAULT_EVENT_LIMIT: u32 = 20;

/// Timeout applied by the reqwest client to every outbound request (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Accent colour of the sale embed (#58B9FF).
pub const EMBED_COLOR: u32 = 5_814_783;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    pub webhook_url: String,
    pub profile_base_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    pub poll_interval_secs: u64,
    pub http_timeout_secs: u64,
    /// Await each webhook send inside the cycle instead of spawning it (AWAIT_SENDS)
    pub await_sends: bool,
    /// Contract filter (CONTRACT_ADDRESS). Either this or the slug may be set.
    pub contract_address: Option<String>,
    /// Collection filter (COLLECTION_SLUG)
    pub collection_slug: Option<String>,
    pub event_type: EventType,
    pub event_limit: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let webhook_url = std::env::var("WEBHOOK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::Config("WEBHOOK_URL must be set".to_string()))?;

        let event_type = std::env::var("EVENT_TYPE")
            .unwrap_or_else(|_| "successful".to_string())
            .parse::<EventType>()?;

        Ok(Self {
            api_url: std::env::var("OPENSEA_API_URL")
                .unwrap_or_else(|_| OPENSEA_API_URL.to_string()),
            api_key: std::env::var("OPENSEA_API_KEY").unwrap_or_default(),
            webhook_url,
            profile_base_url: std::env::var("PROFILE_BASE_URL")
                .unwrap_or_else(|_| PROFILE_BASE_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "notified.db".to_string()),
            api_port: parse_env("API_PORT", 3000)?,
            poll_interval_secs: parse_nonzero_env("POLL_INTERVAL_SECS", POLL_INTERVAL_SECS)?,
            http_timeout_secs: parse_nonzero_env("HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS)?,
            await_sends: parse_env("AWAIT_SENDS", false)?,
            contract_address: optional_env("CONTRACT_ADDRESS"),
            collection_slug: optional_env("COLLECTION_SLUG"),
            event_type,
            event_limit: parse_env("EVENT_LIMIT", DEFAULT_EVENT_LIMIT)?,
        })
    }

    /// The filter reused by every poll cycle.
    pub fn fetch_filter(&self) -> FetchFilter {
        FetchFilter {
            asset_contract_address: self.contract_address.clone(),
            collection_slug: self.collection_slug.clone(),
            event_type: self.event_type,
            limit: self.event_limit,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw}"))),
    }
}

/// Zero is rejected: `tokio::time::interval` panics on it and a zero reqwest
/// timeout fails every request.
fn parse_nonzero_env(key: &str, default: u64) -> Result<u64> {
    match parse_env(key, default)? {
        0 => Err(AppError::Config(format!("{key} must be > 0"))),
        n => Ok(n),
    }
}
