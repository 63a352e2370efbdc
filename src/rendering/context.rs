use crate::core::config::RendererConfig;
use crate::layers::scale_renderer::RendererId;
use crate::rendering::surface::SurfaceFactory;
use crate::runtime::AsyncSpawner;
use crate::tiles::message::RenderMessage;
use crate::tiles::source::{TileContentLoader, TileListService};
use crate::Result;
use crossbeam_channel::Sender;
use futures::future::BoxFuture;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// External collaborators a renderer needs
#[derive(Clone)]
pub struct RenderServices {
    pub spawner: Rc<dyn AsyncSpawner>,
    pub surfaces: Rc<dyn SurfaceFactory>,
    pub tile_lists: Arc<dyn TileListService>,
    pub content: Arc<dyn TileContentLoader>,
}

/// Everything a scale renderer needs while fetching: the services, the
/// completion channel and the per-map fetch settings.
pub struct RenderContext {
    services: RenderServices,
    sender: Sender<RenderMessage>,
    crs: String,
    fetch_bounds_factor: f64,
    next_renderer_id: Cell<u64>,
}

impl RenderContext {
    pub fn new(services: RenderServices, sender: Sender<RenderMessage>, config: &RendererConfig) -> Self {
        Self {
            services,
            sender,
            crs: config.crs.clone(),
            fetch_bounds_factor: config.fetch_bounds_factor,
            next_renderer_id: Cell::new(0),
        }
    }

    pub fn surfaces(&self) -> &dyn SurfaceFactory {
        self.services.surfaces.as_ref()
    }

    pub fn tile_lists(&self) -> Arc<dyn TileListService> {
        self.services.tile_lists.clone()
    }

    pub fn content(&self) -> Arc<dyn TileContentLoader> {
        self.services.content.clone()
    }

    pub fn sender(&self) -> Sender<RenderMessage> {
        self.sender.clone()
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn fetch_bounds_factor(&self) -> f64 {
        self.fetch_bounds_factor
    }

    pub fn spawn(&self, future: BoxFuture<'static, ()>) -> Result<()> {
        self.services.spawner.spawn_boxed(future)
    }

    pub fn next_renderer_id(&self) -> RendererId {
        let id = self.next_renderer_id.get() + 1;
        self.next_renderer_id.set(id);
        RendererId(id)
    }
}
