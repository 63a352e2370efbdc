//! Bounded set of resident scales for one layer.
//!
//! Usage order is tracked with an unbounded `LruCache` of scale keys; eviction
//! is done by hand so that visible scales and the scale just ensured are
//! skipped.

use crate::core::bounds::Bounds;
use crate::core::constants::MIN_SCALE_CACHE_CAPACITY;
use crate::core::geo::Point;
use crate::core::transform::Transform;
use crate::layers::layer::LayerId;
use crate::layers::scale_renderer::{RenderStatus, TiledScaleRenderer};
use crate::prelude::HashMap;
use crate::rendering::context::RenderContext;
use crate::rendering::surface::{SurfaceHandle, SurfaceKind};
use crate::tiles::message::RenderMessage;
use log::{debug, trace, warn};
use lru::LruCache;

/// Hashable key for a scale. Built from the bit pattern, so only identical
/// scales share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScaleKey(u64);

impl ScaleKey {
    pub fn new(scale: f64) -> Self {
        // fold -0.0 into 0.0
        let scale = if scale == 0.0 { 0.0 } else { scale };
        Self(scale.to_bits())
    }

    pub fn scale(self) -> f64 {
        f64::from_bits(self.0)
    }
}

pub struct ScaleCache {
    layer_id: LayerId,
    capacity: usize,
    /// Layer container; scale containers are its children
    container: SurfaceHandle,
    renderers: HashMap<ScaleKey, TiledScaleRenderer>,
    /// Most recently used first
    usage: LruCache<ScaleKey, ()>,
}

impl ScaleCache {
    pub fn new(layer_id: LayerId, capacity: usize, container: SurfaceHandle) -> Self {
        Self {
            layer_id,
            capacity: capacity.max(MIN_SCALE_CACHE_CAPACITY),
            container,
            renderers: HashMap::default(),
            usage: LruCache::unbounded(),
        }
    }

    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn container(&self) -> &SurfaceHandle {
        &self.container
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    pub fn contains(&self, scale: f64) -> bool {
        self.renderers.contains_key(&ScaleKey::new(scale))
    }

    pub fn renderer(&self, scale: f64) -> Option<&TiledScaleRenderer> {
        self.renderers.get(&ScaleKey::new(scale))
    }

    /// Resident scales, most recently used first
    pub fn resident_scales(&self) -> Vec<f64> {
        self.usage.iter().map(|(key, _)| key.scale()).collect()
    }

    pub fn visible_scales(&self) -> Vec<f64> {
        self.usage
            .iter()
            .filter(|(key, _)| self.is_key_visible(key))
            .map(|(key, _)| key.scale())
            .collect()
    }

    pub fn is_rendered(&self, scale: f64) -> bool {
        self.renderer(scale).is_some_and(|r| r.is_rendered())
    }

    pub fn is_visible(&self, scale: f64) -> bool {
        self.is_key_visible(&ScaleKey::new(scale))
    }

    fn is_key_visible(&self, key: &ScaleKey) -> bool {
        self.renderers.get(key).is_some_and(|r| r.is_visible())
    }

    /// Gets or creates the renderer for `scale`, renders `bounds` on it and
    /// marks it most recently used. Evicts least recently used hidden scales
    /// beyond capacity.
    pub fn ensure_scale(&mut self, scale: f64, bounds: &Bounds, ctx: &RenderContext) -> RenderStatus {
        let key = ScaleKey::new(scale);
        if !self.renderers.contains_key(&key) {
            let container = ctx.surfaces().create(SurfaceKind::Scale);
            // new scales go underneath whatever is showing
            self.container.borrow_mut().insert(container.clone(), 0);
            let renderer = TiledScaleRenderer::new(ctx.next_renderer_id(), self.layer_id, scale, container);
            debug!("{}: scale {} created", self.layer_id, scale);
            self.renderers.insert(key, renderer);
        }

        let status = match self.renderers.get_mut(&key) {
            Some(renderer) => renderer.render(bounds, ctx),
            None => RenderStatus::Pending,
        };
        self.usage.put(key, ());
        self.evict(key);
        status
    }

    fn evict(&mut self, protect: ScaleKey) {
        while self.usage.len() > self.capacity {
            let victim = self
                .usage
                .iter()
                .rev()
                .map(|(key, _)| *key)
                .find(|key| *key != protect && !self.is_key_visible(key));

            let Some(victim) = victim else {
                warn!(
                    "{}: {} resident scales, all visible or in use",
                    self.layer_id,
                    self.usage.len()
                );
                break;
            };
            self.usage.pop(&victim);
            self.discard(victim);
            debug!("{}: evicted scale {}", self.layer_id, victim.scale());
        }
    }

    fn discard(&mut self, key: ScaleKey) {
        if let Some(mut renderer) = self.renderers.remove(&key) {
            renderer.dispose();
            let id = renderer.container().borrow().id();
            self.container.borrow_mut().remove(id);
        }
    }

    /// Shows or hides one scale; its transform is reset to identity
    pub fn set_scale_visibility(&mut self, scale: f64, visible: bool) -> bool {
        match self.renderers.get_mut(&ScaleKey::new(scale)) {
            Some(renderer) => {
                renderer.set_visible(visible);
                true
            }
            None => false,
        }
    }

    /// Moves a resident scale's content without fetching
    pub fn apply_scale_translation(&mut self, scale: f64, translation: Point) -> bool {
        match self.renderers.get_mut(&ScaleKey::new(scale)) {
            Some(renderer) => {
                renderer.set_translation(translation);
                true
            }
            None => false,
        }
    }

    pub fn apply_scale_transform(&mut self, scale: f64, transform: Transform) -> bool {
        match self.renderers.get_mut(&ScaleKey::new(scale)) {
            Some(renderer) => {
                renderer.set_transform(transform);
                true
            }
            None => false,
        }
    }

    pub fn scale_translation(&self, scale: f64) -> Option<Point> {
        self.renderer(scale).map(|r| r.translation())
    }

    /// Raises a scale's container above its siblings
    pub fn bring_to_front(&mut self, scale: f64) -> bool {
        let Some(renderer) = self.renderers.get(&ScaleKey::new(scale)) else {
            return false;
        };
        let surface = renderer.container().clone();
        let id = surface.borrow().id();
        let mut container = self.container.borrow_mut();
        container.remove(id);
        container.add(surface);
        true
    }

    /// Applies a completion addressed to this layer. Returns the scale that
    /// just became rendered, if any.
    pub fn handle_message(&mut self, message: RenderMessage, ctx: &RenderContext) -> Option<f64> {
        let address = message.address();
        let Some(renderer) = self.renderers.get_mut(&address.scale) else {
            trace!("{}: completion for evicted scale {} dropped", self.layer_id, address.scale.scale());
            return None;
        };
        if renderer.id() != address.renderer {
            trace!("{}: completion for replaced renderer dropped", self.layer_id);
            return None;
        }
        renderer
            .handle_message(message, ctx)
            .then(|| renderer.scale())
    }

    /// Drops every tile of every hidden scale and invalidates the visible
    /// ones, so the next `ensure_scale` fetches fresh content.
    pub fn invalidate(&mut self) {
        let hidden: Vec<ScaleKey> = self
            .renderers
            .iter()
            .filter(|(_, r)| !r.is_visible())
            .map(|(key, _)| *key)
            .collect();
        for key in hidden {
            self.usage.pop(&key);
            self.discard(key);
        }
        for renderer in self.renderers.values_mut() {
            renderer.invalidate();
        }
    }

    /// Disposes every renderer and detaches their containers
    pub fn dispose(&mut self) {
        let keys: Vec<ScaleKey> = self.renderers.keys().copied().collect();
        for key in keys {
            self.discard(key);
        }
        self.usage.clear();
    }
}

impl Drop for ScaleCache {
    fn drop(&mut self) {
        self.dispose();
    }
}
