use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::{EventsResponse, FetchFilter, RawSaleEvent};

/// Reads one page of events from the marketplace REST API.
#[derive(Clone)]
pub struct EventFetcher {
    client: reqwest::Client,
    api_url: String,
}

impl EventFetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        Self::with_endpoint(&cfg.api_url, &cfg.api_key, cfg.http_timeout_secs)
    }

    pub fn with_endpoint(api_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key)
                .map_err(|_| AppError::Config("OPENSEA_API_KEY is not a valid header value".to_string()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Single GET against `/events`. No paging, no retry: the caller's next
    /// tick is the retry.
    pub async fn fetch_raw(&self, filter: &FetchFilter) -> Result<Vec<RawSaleEvent>> {
        let url = format!("{}/events", self.api_url);

        let resp: EventsResponse = self
            .client
            .get(&url)
            .query(filter)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            count = resp.asset_events.len(),
            event_type = %filter.event_type,
            "Fetched {} events",
            resp.asset_events.len()
        );
        Ok(resp.asset_events)
    }
}
