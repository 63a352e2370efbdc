//! Request/response shapes and service traits for tile data.

use crate::core::bounds::Bounds;
use crate::core::geo::TileCode;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Asks for the tiles covering `world_bounds` at `scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileListRequest {
    pub layer_id: String,
    pub crs: String,
    pub scale: f64,
    pub world_bounds: Bounds,
}

/// Where a tile's content comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TileContent {
    /// Loaded separately through a [`TileContentLoader`]
    Url(String),
    /// Delivered with the tile list; counts as loaded immediately
    Inline(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDescriptor {
    pub code: TileCode,
    pub content: TileContent,
    /// World bounds covered by the tile
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileListResponse {
    pub tiles: Vec<TileDescriptor>,
}

/// Resolves tile lists. Transport failures are reported as `Err`.
#[async_trait]
pub trait TileListService: Send + Sync {
    async fn fetch_tile_list(&self, request: TileListRequest) -> Result<TileListResponse>;
}

/// Loads the content behind a tile URL; only completion status matters.
#[async_trait]
pub trait TileContentLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<()>;
}
