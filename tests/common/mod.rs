//! Shared harness: a map renderer over in-memory services, driven by a
//! `LocalPool`.
#![allow(dead_code)]

use futures::executor::LocalPool;
use scalemap::prelude::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Harness {
    pub pool: LocalPool,
    pub tile_lists: Arc<MemoryTileListService>,
    pub content: Arc<MemoryContentLoader>,
    pub surfaces: Rc<MemorySurfaceFactory>,
}

impl Harness {
    /// World extent 0..4096 on both axes, 256 pixel tiles
    pub fn new() -> Self {
        init_logging();
        Self {
            pool: LocalPool::new(),
            tile_lists: Arc::new(MemoryTileListService::new(
                Bounds::from_coords(0.0, 0.0, 4096.0, 4096.0),
                256.0,
            )),
            content: Arc::new(MemoryContentLoader::new()),
            surfaces: Rc::new(MemorySurfaceFactory::new()),
        }
    }

    pub fn services(&self) -> RenderServices {
        RenderServices {
            spawner: Rc::new(LocalPoolSpawner::new(self.pool.spawner())),
            surfaces: self.surfaces.clone(),
            tile_lists: self.tile_lists.clone(),
            content: self.content.clone(),
        }
    }

    pub fn renderer(&self, config: RendererConfig) -> MapRenderer {
        let root = self.surfaces.create(SurfaceKind::Layer);
        MapRenderer::new(self.services(), config, root)
    }

    pub fn map(&self, config: MapConfig) -> MapView {
        let root = self.surfaces.create(SurfaceKind::Layer);
        MapView::new(config, self.services(), root)
    }

    /// Runs spawned work and applies completions until nothing is left
    pub fn pump(&mut self, renderer: &mut MapRenderer) {
        loop {
            self.pool.run_until_stalled();
            if renderer.process_messages() == 0 {
                return;
            }
        }
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Square view of 256 pixels centered on (2048, 2048)
pub fn view(scale: f64) -> Bounds {
    Bounds::from_center_and_size(Point::new(2048.0, 2048.0), 256.0 / scale, 256.0 / scale)
}
