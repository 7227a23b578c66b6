//! DXSpider cluster node over a telnet-style TCP session.
//!
//! - [`session`]: sans-IO handshake/stream state machine
//! - [`client`]: async socket driver with watchdog
//! - [`line_parser`]: broadcast and `sh/dx` listing grammars
//!
//! [`DxSpiderClient`] tries the configured nodes in order within one refresh
//! and returns the first non-empty result.

pub mod client;
pub mod line_parser;
pub mod session;

use std::time::Duration;

use async_trait::async_trait;
use dx_core::config::{DxSpiderConfig, NodeConfig};
use dx_core::error::DxError;
use dx_core::{Spot, SpotSource};
use tracing::{info, warn};

use self::session::SessionSettings;
use crate::SpotFetcher;

/// Session-backed spot source.
pub struct DxSpiderClient {
    nodes: Vec<NodeConfig>,
    settings: SessionSettings,
    watchdog: Duration,
}

impl DxSpiderClient {
    pub fn new(config: &DxSpiderConfig) -> Self {
        Self { nodes: config.nodes.clone(), settings: SessionSettings::from(config), watchdog: config.watchdog() }
    }

    /// Run sessions against each node in order until one yields spots.
    ///
    /// Returns the last node's error when every node fails.
    pub async fn fetch_spots(&self) -> Result<Vec<Spot>, DxError> {
        let mut last_err = DxError::Config("no dxspider nodes configured".into());
        for node in &self.nodes {
            let addr = node.addr();
            match client::run_session(&addr, self.settings.clone(), self.watchdog).await {
                Ok(spots) => {
                    info!("[dxspider] {} spot(s) from {addr}", spots.len());
                    return Ok(spots);
                }
                Err(e) => {
                    warn!("[dxspider] node {addr} failed: {e}");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

#[async_trait]
impl SpotFetcher for DxSpiderClient {
    fn source(&self) -> SpotSource {
        SpotSource::DxSpider
    }

    async fn fetch(&self) -> Result<Vec<Spot>, DxError> {
        self.fetch_spots().await
    }
}
