use crate::{
    core::{
        bounds::Bounds,
        config::MapConfig,
        geo::Point,
        resolution::ZoomOption,
        viewport::ViewPort,
    },
    layers::layer::{LayerId, LayerOptions},
    rendering::{
        context::RenderServices,
        renderer::{MapRenderer, RendererEvent},
        surface::SurfaceHandle,
    },
    Result,
};
use instant::Instant;
use log::debug;

/// A viewport wired to a renderer.
///
/// Every viewport mutator queues events on the [`ViewPort`]; the map hands
/// them to the [`MapRenderer`] right away so the layers follow the view.
pub struct MapView {
    config: MapConfig,
    viewport: ViewPort,
    renderer: MapRenderer,
}

impl MapView {
    pub fn new(config: MapConfig, services: RenderServices, root: SurfaceHandle) -> Self {
        let config = config.validated();
        let viewport = ViewPort::from_config(&config.viewport);
        let renderer = MapRenderer::new(services, config.renderer.clone(), root);
        let mut map = Self {
            config,
            viewport,
            renderer,
        };
        if map.viewport.state().is_initialized() {
            let (bounds, scale) = (map.viewport.bounds(), map.viewport.scale());
            map.renderer.navigate_to(bounds, scale, 0, Instant::now());
        }
        map
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn viewport(&self) -> &ViewPort {
        &self.viewport
    }

    pub fn renderer(&self) -> &MapRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut MapRenderer {
        &mut self.renderer
    }

    pub fn add_layer(&mut self, options: LayerOptions) -> LayerId {
        self.renderer.add_layer(options)
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Result<()> {
        self.renderer.remove_layer(id)
    }

    pub fn apply_position(&mut self, coordinate: Point, now: Instant) {
        self.viewport.apply_position(coordinate);
        self.dispatch(now);
    }

    pub fn apply_scale(&mut self, scale: f64, option: ZoomOption, rescale_point: Option<Point>, now: Instant) {
        self.viewport.apply_scale(scale, option, rescale_point);
        self.dispatch(now);
    }

    pub fn apply_bounds(&mut self, bounds: &Bounds, option: ZoomOption, now: Instant) {
        self.viewport.apply_bounds(bounds, option);
        self.dispatch(now);
    }

    pub fn zoom_in(&mut self, rescale_point: Option<Point>, now: Instant) {
        self.viewport.zoom_in(rescale_point);
        self.dispatch(now);
    }

    pub fn zoom_out(&mut self, rescale_point: Option<Point>, now: Instant) {
        self.viewport.zoom_out(rescale_point);
        self.dispatch(now);
    }

    pub fn set_size(&mut self, width: f64, height: f64, now: Instant) {
        self.viewport.set_size(width, height);
        self.dispatch(now);
    }

    /// While dragging, position changes are followed without animation
    pub fn set_pan_dragging(&mut self, dragging: bool) {
        self.viewport.set_pan_dragging(dragging);
    }

    /// Hands queued viewport events to the renderer; returns how many
    pub fn dispatch(&mut self, now: Instant) -> usize {
        let events = self.viewport.take_events();
        for event in &events {
            self.renderer.on_viewport_event(event, now);
        }
        if !events.is_empty() {
            debug!("dispatched {} viewport events", events.len());
        }
        events.len()
    }

    /// One frame: pending viewport events, completions and animation.
    /// Returns whether an animation is still running.
    pub fn update(&mut self, now: Instant) -> bool {
        self.dispatch(now);
        self.renderer.update(now)
    }

    pub fn drain_events(&mut self) -> Vec<RendererEvent> {
        self.renderer.drain_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ViewPortConfig;
    use crate::rendering::surface::{MemorySurfaceFactory, SurfaceFactory, SurfaceKind};
    use crate::runtime::LocalPoolSpawner;
    use crate::tiles::memory::{MemoryContentLoader, MemoryTileListService};
    use futures::executor::LocalPool;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::time::Duration;

    fn map(pool: &LocalPool, viewport: ViewPortConfig) -> MapView {
        let surfaces = Rc::new(MemorySurfaceFactory::new());
        let services = RenderServices {
            spawner: Rc::new(LocalPoolSpawner::new(pool.spawner())),
            surfaces: surfaces.clone(),
            tile_lists: Arc::new(MemoryTileListService::new(
                Bounds::from_coords(0.0, 0.0, 4096.0, 4096.0),
                256.0,
            )),
            content: Arc::new(MemoryContentLoader::new()),
        };
        let config = MapConfig {
            viewport,
            ..MapConfig::default()
        };
        MapView::new(config, services, surfaces.create(SurfaceKind::Layer))
    }

    fn settle(pool: &mut LocalPool, map: &mut MapView, now: Instant) {
        loop {
            pool.run_until_stalled();
            if map.renderer_mut().process_messages() == 0 {
                break;
            }
        }
        map.update(now);
    }

    #[test]
    fn test_initial_scale_is_shown_without_animation() {
        let mut pool = LocalPool::new();
        let mut map = map(
            &pool,
            ViewPortConfig {
                width: 256.0,
                height: 256.0,
                center: Point::new(2048.0, 2048.0),
                scale: Some(1.0),
                ..ViewPortConfig::default()
            },
        );
        let layer = map.add_layer(LayerOptions::raster("base"));
        assert_eq!(map.renderer().current_scale(), Some(1.0));
        assert!(!map.renderer().is_animating());

        settle(&mut pool, &mut map, Instant::now());
        let cache = map.renderer().scale_cache(layer).unwrap();
        assert!(cache.is_rendered(1.0));
        assert_eq!(cache.visible_scales(), vec![1.0]);
    }

    #[test]
    fn test_viewport_changes_drive_navigation() {
        let mut pool = LocalPool::new();
        let mut map = map(
            &pool,
            ViewPortConfig {
                width: 256.0,
                height: 256.0,
                center: Point::new(2048.0, 2048.0),
                scale: Some(1.0),
                resolutions: vec![4.0, 2.0, 1.0, 0.5],
                ..ViewPortConfig::default()
            },
        );
        let layer = map.add_layer(LayerOptions::raster("base"));
        let start = Instant::now();
        settle(&mut pool, &mut map, start);

        map.zoom_in(None, start);
        assert_eq!(map.viewport().scale(), 2.0);
        assert_eq!(map.renderer().current_scale(), Some(2.0));
        assert!(map.renderer().is_animating());

        settle(&mut pool, &mut map, start + Duration::from_millis(1000));
        assert!(!map.renderer().is_animating());
        let cache = map.renderer().scale_cache(layer).unwrap();
        assert_eq!(cache.visible_scales(), vec![2.0]);
        assert!(map
            .drain_events()
            .contains(&RendererEvent::NavigationCompleted { scale: 2.0 }));
    }

    #[test]
    fn test_drag_and_resize_are_immediate() {
        let pool = LocalPool::new();
        let mut map = map(
            &pool,
            ViewPortConfig {
                width: 256.0,
                height: 256.0,
                center: Point::new(2048.0, 2048.0),
                scale: Some(1.0),
                ..ViewPortConfig::default()
            },
        );
        map.add_layer(LayerOptions::raster("base"));
        let now = Instant::now();

        map.set_pan_dragging(true);
        map.apply_position(Point::new(2100.0, 2048.0), now);
        assert!(!map.renderer().is_animating());
        map.set_pan_dragging(false);

        map.set_size(512.0, 256.0, now);
        assert!(!map.renderer().is_animating());
        let target = map.renderer().target().unwrap();
        assert_eq!(target.bounds, map.viewport().bounds());
        assert_eq!(map.dispatch(now), 0);
    }
}
