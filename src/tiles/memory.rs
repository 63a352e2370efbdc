//! In-memory tile services for headless hosts and tests.
//!
//! [`MemoryTileListService`] answers tile-list requests from a regular grid
//! laid over a world extent. [`MemoryContentLoader`] succeeds for every URL
//! except the ones it was told to fail.

use crate::core::bounds::Bounds;
use crate::core::geo::TileCode;
use crate::prelude::HashSet;
use crate::tiles::source::{
    TileContent, TileContentLoader, TileDescriptor, TileListRequest, TileListResponse,
    TileListService,
};
use crate::{MapError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Tile levels are derived from the scale so that doubling the scale moves one level
const LEVEL_OFFSET: f64 = 20.0;

#[derive(Debug)]
pub struct MemoryTileListService {
    extent: Bounds,
    tile_pixels: f64,
    inline: bool,
    failing: AtomicBool,
    requests: Mutex<Vec<TileListRequest>>,
    request_count: AtomicUsize,
}

impl MemoryTileListService {
    /// Grid over `extent` with tiles of `tile_pixels` screen pixels
    pub fn new(extent: Bounds, tile_pixels: f64) -> Self {
        Self {
            extent,
            tile_pixels: if tile_pixels > 0.0 { tile_pixels } else { 256.0 },
            inline: false,
            failing: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
            request_count: AtomicUsize::new(0),
        }
    }

    /// Deliver tile content inline instead of as URLs
    pub fn with_inline_content(mut self) -> Self {
        self.inline = true;
        self
    }

    /// While set, every request fails with a service error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TileListRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Tiles of the grid intersecting `bounds` at `scale`
    pub fn tiles_for(&self, layer_id: &str, scale: f64, bounds: &Bounds) -> Vec<TileDescriptor> {
        let Some(area) = self.extent.intersection(bounds) else {
            return Vec::new();
        };
        if scale <= 0.0 || area.is_empty() {
            return Vec::new();
        }

        let tile_world = self.tile_pixels / scale;
        let level = (scale.log2() + LEVEL_OFFSET).round().max(0.0) as u32;
        let columns = (self.extent.width() / tile_world).ceil().max(1.0) as u32;
        let rows = (self.extent.height() / tile_world).ceil().max(1.0) as u32;

        let first_x = ((area.min.x - self.extent.min.x) / tile_world).floor().max(0.0) as u32;
        let last_x = (((area.max.x - self.extent.min.x) / tile_world).ceil() as u32).min(columns);
        let first_y = ((self.extent.max.y - area.max.y) / tile_world).floor().max(0.0) as u32;
        let last_y = (((self.extent.max.y - area.min.y) / tile_world).ceil() as u32).min(rows);

        let mut tiles = Vec::new();
        for y in first_y..last_y {
            for x in first_x..last_x {
                let min_x = self.extent.min.x + x as f64 * tile_world;
                let max_y = self.extent.max.y - y as f64 * tile_world;
                let code = TileCode::new(level, x, y);
                let content = if self.inline {
                    TileContent::Inline(
                        [level, x, y]
                            .iter()
                            .flat_map(|part| part.to_le_bytes())
                            .collect(),
                    )
                } else {
                    TileContent::Url(format!("mem://{layer_id}/{code}"))
                };
                tiles.push(TileDescriptor {
                    code,
                    content,
                    bounds: Bounds::from_coords(min_x, max_y - tile_world, min_x + tile_world, max_y),
                });
            }
        }
        tiles
    }
}

#[async_trait]
impl TileListService for MemoryTileListService {
    async fn fetch_tile_list(&self, request: TileListRequest) -> Result<TileListResponse> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(MapError::Service(format!(
                "tile list rejected for layer {}",
                request.layer_id
            )));
        }
        Ok(TileListResponse {
            tiles: self.tiles_for(&request.layer_id, request.scale, &request.world_bounds),
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryContentLoader {
    failing_urls: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    load_count: AtomicUsize,
}

impl MemoryContentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_url(&self, url: impl Into<String>) {
        if let Ok(mut urls) = self.failing_urls.lock() {
            urls.insert(url.into());
        }
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TileContentLoader for MemoryContentLoader {
    async fn load(&self, url: &str) -> Result<()> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        let listed = self
            .failing_urls
            .lock()
            .map(|urls| urls.contains(url))
            .unwrap_or(false);
        if listed || self.fail_all.load(Ordering::SeqCst) {
            return Err(MapError::Service(format!("content unavailable: {url}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn service() -> MemoryTileListService {
        MemoryTileListService::new(Bounds::from_coords(0.0, 0.0, 1024.0, 1024.0), 256.0)
    }

    #[test]
    fn test_grid_covers_requested_bounds() {
        let service = service();
        let bounds = Bounds::from_coords(100.0, 100.0, 300.0, 300.0);
        let tiles = service.tiles_for("roads", 1.0, &bounds);

        // columns 0..2 and rows 2..4 (rows count down from the top)
        assert_eq!(tiles.len(), 4);
        for tile in &tiles {
            assert!(tile.bounds.intersects(&bounds));
            assert_eq!(tile.bounds.width(), 256.0);
        }
        assert!(tiles.iter().any(|t| t.code == TileCode::new(20, 0, 3)));
        assert!(matches!(&tiles[0].content, TileContent::Url(url) if url.starts_with("mem://roads/")));
    }

    #[test]
    fn test_inline_content_keeps_large_coordinates() {
        let service = MemoryTileListService::new(Bounds::from_coords(0.0, 0.0, 4800.0, 16.0), 16.0)
            .with_inline_content();
        let tiles = service.tiles_for("a", 1.0, &Bounds::from_coords(4500.0, 0.0, 4510.0, 16.0));

        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].code, TileCode::new(20, 281, 0));
        let expected: Vec<u8> = [20u32, 281, 0].iter().flat_map(|part| part.to_le_bytes()).collect();
        assert!(matches!(&tiles[0].content, TileContent::Inline(bytes) if *bytes == expected));
    }

    #[test]
    fn test_level_follows_scale() {
        let service = service();
        let bounds = Bounds::from_coords(0.0, 0.0, 1024.0, 1024.0);
        let coarse = service.tiles_for("a", 0.25, &bounds);
        let fine = service.tiles_for("a", 0.5, &bounds);
        assert_eq!(coarse.len(), 1);
        assert_eq!(coarse[0].code.level, 18);
        assert_eq!(fine.len(), 4);
        assert_eq!(fine[0].code.level, 19);
    }

    #[test]
    fn test_outside_extent_is_empty() {
        let service = service();
        let tiles = service.tiles_for("a", 1.0, &Bounds::from_coords(2000.0, 2000.0, 2100.0, 2100.0));
        assert!(tiles.is_empty());
    }

    #[test]
    fn test_failing_service_and_request_log() {
        let service = service();
        let request = TileListRequest {
            layer_id: "a".into(),
            crs: "EPSG:3857".into(),
            scale: 1.0,
            world_bounds: Bounds::from_coords(0.0, 0.0, 10.0, 10.0),
        };
        assert_eq!(block_on(service.fetch_tile_list(request.clone())).unwrap().tiles.len(), 1);

        service.set_failing(true);
        assert!(block_on(service.fetch_tile_list(request.clone())).is_err());
        assert_eq!(service.request_count(), 2);
        assert_eq!(service.requests()[1], request);
    }

    #[test]
    fn test_content_loader_failures() {
        let loader = MemoryContentLoader::new();
        loader.fail_url("mem://a/bad");
        assert!(block_on(loader.load("mem://a/good")).is_ok());
        assert!(block_on(loader.load("mem://a/bad")).is_err());
        loader.set_fail_all(true);
        assert!(block_on(loader.load("mem://a/good")).is_err());
        assert_eq!(loader.load_count(), 3);
    }
}
