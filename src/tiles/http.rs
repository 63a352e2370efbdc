//! reqwest-backed tile services.
//!
//! The tile list is requested with a JSON `POST` of [`TileListRequest`];
//! tile content is fetched with a `GET`. Each service owns its client.

use crate::core::constants::DEFAULT_HTTP_TIMEOUT_SECS;
use crate::tiles::source::{TileContentLoader, TileListRequest, TileListResponse, TileListService};
use crate::{MapError, Result};
use async_trait::async_trait;
use log::{debug, trace};
use std::time::Duration;

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("scalemap/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()?)
}

/// Posts tile-list requests to a fixed endpoint
#[derive(Debug, Clone)]
pub struct HttpTileListService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTileListService {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TileListService for HttpTileListService {
    async fn fetch_tile_list(&self, request: TileListRequest) -> Result<TileListResponse> {
        debug!(
            "POST {} layer={} scale={}",
            self.endpoint, request.layer_id, request.scale
        );
        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(MapError::Http {
                status: response.status().as_u16(),
                url: self.endpoint.clone(),
            });
        }
        let tiles = response.json::<TileListResponse>().await?;
        trace!("tile list for layer {}: {} tiles", request.layer_id, tiles.tiles.len());
        Ok(tiles)
    }
}

/// Downloads tile content; with the `decode` feature the payload must also
/// decode as an image to count as loaded.
#[derive(Debug, Clone)]
pub struct HttpContentLoader {
    client: reqwest::Client,
}

impl HttpContentLoader {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl TileContentLoader for HttpContentLoader {
    async fn load(&self, url: &str) -> Result<()> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(MapError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        trace!("loaded {} ({} bytes)", url, bytes.len());
        decode(&bytes)
    }
}

#[cfg(feature = "decode")]
fn decode(bytes: &[u8]) -> Result<()> {
    image::load_from_memory(bytes)
        .map(|_| ())
        .map_err(|err| MapError::Decode(err.to_string()))
}

#[cfg(not(feature = "decode"))]
fn decode(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(MapError::Decode("empty tile payload".to_string()));
    }
    Ok(())
}
