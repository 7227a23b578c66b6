//! HamQTH bulk spot feed over HTTP.
//!
//! One bounded-time GET against the CSV endpoint per refresh. The body is read
//! incrementally and cut at `max_body_bytes` (on a line boundary), then handed
//! to [`csv_parser::parse_body`].

pub mod csv_parser;

use std::time::Duration;

use async_trait::async_trait;
use dx_core::config::HamQthConfig;
use dx_core::error::DxError;
use dx_core::{Spot, SpotSource};
use tracing::{debug, info};

use crate::SpotFetcher;

/// HTTP fetcher for the HamQTH CSV feed.
pub struct HamQthFetcher {
    /// Shared HTTP client (user agent and timeout preconfigured).
    http: reqwest::Client,
    url: String,
    limit: usize,
    max_body_bytes: usize,
    timeout: Duration,
}

impl HamQthFetcher {
    /// Create a fetcher; no request is made until [`fetch_spots`](Self::fetch_spots).
    pub fn new(config: &HamQthConfig) -> Result<Self, DxError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| DxError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            url: config.url.clone(),
            limit: config.fetch_limit,
            max_body_bytes: config.max_body_bytes,
            timeout: config.timeout(),
        })
    }

    /// Fetch up to `limit` spots, in feed order.
    ///
    /// The whole exchange (connect, status, body) shares one deadline.
    pub async fn fetch_spots(&self, limit: usize) -> Result<Vec<Spot>, DxError> {
        let started = tokio::time::Instant::now();
        let body = tokio::time::timeout(self.timeout, self.fetch_body(limit))
            .await
            .map_err(|_| DxError::Timeout(self.timeout))??;

        let spots = csv_parser::parse_body(&body, limit);
        info!("[hamqth] fetched {} spot(s) from {} byte(s) in {:?}", spots.len(), body.len(), started.elapsed());
        Ok(spots)
    }

    async fn fetch_body(&self, limit: usize) -> Result<String, DxError> {
        let limit = limit.to_string();
        let mut response = self
            .http
            .get(&self.url)
            .query(&[("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| DxError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DxError::Status(status.as_u16()));
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| DxError::Transport(e.to_string()))? {
            body.extend_from_slice(&chunk);
            if body.len() >= self.max_body_bytes {
                debug!("[hamqth] body exceeds {} bytes, truncating", self.max_body_bytes);
                truncate_at_line(&mut body, self.max_body_bytes);
                break;
            }
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl SpotFetcher for HamQthFetcher {
    fn source(&self) -> SpotSource {
        SpotSource::HamQth
    }

    async fn fetch(&self) -> Result<Vec<Spot>, DxError> {
        self.fetch_spots(self.limit).await
    }
}

/// Cut `body` to at most `max` bytes, dropping any trailing partial line.
fn truncate_at_line(body: &mut Vec<u8>, max: usize) {
    body.truncate(max);
    match body.iter().rposition(|&b| b == b'\n') {
        Some(pos) => body.truncate(pos + 1),
        None => body.clear(),
    }
}
