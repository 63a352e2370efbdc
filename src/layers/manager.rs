use crate::layers::layer::{Layer, LayerId, LayerKind, LayerOptions};
use crate::layers::scale_cache::ScaleCache;
use crate::prelude::HashMap;
use crate::rendering::surface::{SurfaceFactory, SurfaceHandle, SurfaceKind};
use crate::{MapError, Result};
use log::debug;

/// One layer with its container and scale cache
pub struct LayerEntry {
    layer: Layer,
    container: SurfaceHandle,
    cache: ScaleCache,
    /// Previous scale kept visible until the current one finishes rendering
    pending_swap: Option<f64>,
}

impl LayerEntry {
    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn id(&self) -> LayerId {
        self.layer.id
    }

    pub fn container(&self) -> &SurfaceHandle {
        &self.container
    }

    pub fn cache(&self) -> &ScaleCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ScaleCache {
        &mut self.cache
    }

    pub fn pending_swap(&self) -> Option<f64> {
        self.pending_swap
    }

    pub fn set_pending_swap(&mut self, scale: Option<f64>) {
        self.pending_swap = scale;
    }

    /// Toggles the layer container; cached scales are left alone
    pub fn set_visible(&mut self, visible: bool) {
        self.layer.visible = visible;
        self.container.borrow_mut().set_visible(visible);
    }

    /// Restyles a raster layer in place
    pub fn set_opacity(&mut self, opacity: f64) -> Result<()> {
        if !self.layer.capability().restyles_in_place() {
            return Err(MapError::Layer(format!(
                "{} is a vector layer; opacity needs a refresh",
                self.layer.id
            )));
        }
        if !opacity.is_finite() {
            return Err(MapError::Layer(format!(
                "{}: opacity {} is not a number in 0..1",
                self.layer.id, opacity
            )));
        }
        let opacity = opacity.clamp(0.0, 1.0);
        self.layer.kind = LayerKind::Raster { opacity };
        self.container.borrow_mut().set_opacity(opacity);
        Ok(())
    }
}

/// Layers of one map in draw order (first is bottom-most)
pub struct LayerStack {
    root: SurfaceHandle,
    layers: HashMap<LayerId, LayerEntry>,
    render_order: Vec<LayerId>,
    next_id: u64,
    cache_capacity: usize,
}

impl LayerStack {
    pub fn new(root: SurfaceHandle, cache_capacity: usize) -> Self {
        Self {
            root,
            layers: HashMap::default(),
            render_order: Vec::new(),
            next_id: 0,
            cache_capacity,
        }
    }

    pub fn root(&self) -> &SurfaceHandle {
        &self.root
    }

    /// Adds a layer on top of the stack
    pub fn add(&mut self, options: LayerOptions, surfaces: &dyn SurfaceFactory) -> LayerId {
        self.next_id += 1;
        let id = LayerId(self.next_id);
        let layer = Layer::new(id, options);

        let container = surfaces.create(SurfaceKind::Layer);
        {
            let mut surface = container.borrow_mut();
            surface.set_visible(layer.visible);
            surface.set_opacity(layer.opacity());
        }
        self.root.borrow_mut().add(container.clone());

        let cache = ScaleCache::new(id, self.cache_capacity, container.clone());
        debug!("{} ({}) added", id, layer.name);
        self.layers.insert(
            id,
            LayerEntry {
                layer,
                container,
                cache,
                pending_swap: None,
            },
        );
        self.render_order.push(id);
        id
    }

    /// Removes a layer, disposing its cache and detaching its container
    pub fn remove(&mut self, id: LayerId) -> Result<Layer> {
        let mut entry = self
            .layers
            .remove(&id)
            .ok_or_else(|| MapError::Layer(format!("unknown layer {id}")))?;
        self.render_order.retain(|other| *other != id);

        entry.cache.dispose();
        let surface_id = entry.container.borrow().id();
        self.root.borrow_mut().remove(surface_id);
        debug!("{} removed", id);
        Ok(entry.layer)
    }

    /// Moves a layer to `index` in draw order and reorders the containers to match
    pub fn reorder(&mut self, id: LayerId, index: usize) -> Result<()> {
        let entry = self
            .layers
            .get(&id)
            .ok_or_else(|| MapError::Layer(format!("unknown layer {id}")))?;

        let index = index.min(self.render_order.len().saturating_sub(1));
        self.render_order.retain(|other| *other != id);
        self.render_order.insert(index, id);

        let surface = entry.container.clone();
        let surface_id = surface.borrow().id();
        let mut root = self.root.borrow_mut();
        root.remove(surface_id);
        root.insert(surface, index);
        Ok(())
    }

    pub fn get(&self, id: LayerId) -> Option<&LayerEntry> {
        self.layers.get(&id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut LayerEntry> {
        self.layers.get_mut(&id)
    }

    pub fn try_get_mut(&mut self, id: LayerId) -> Result<&mut LayerEntry> {
        self.layers
            .get_mut(&id)
            .ok_or_else(|| MapError::Layer(format!("unknown layer {id}")))
    }

    /// Layer ids in draw order
    pub fn ids(&self) -> Vec<LayerId> {
        self.render_order.clone()
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.render_order.iter().position(|other| *other == id)
    }

    pub fn for_each_layer_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut LayerEntry),
    {
        for id in &self.render_order {
            if let Some(entry) = self.layers.get_mut(id) {
                f(entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Disposes every layer
    pub fn clear(&mut self) {
        for id in self.ids() {
            let _ = self.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::surface::{children, MemorySurfaceFactory};

    fn stack(surfaces: &MemorySurfaceFactory) -> LayerStack {
        LayerStack::new(surfaces.create(SurfaceKind::Layer), 3)
    }

    fn root_order(stack: &LayerStack) -> Vec<u64> {
        children(stack.root()).iter().map(|s| s.borrow().id()).collect()
    }

    fn container_id(stack: &LayerStack, id: LayerId) -> u64 {
        stack.get(id).unwrap().container().borrow().id()
    }

    #[test]
    fn test_add_and_remove_layers() {
        let surfaces = MemorySurfaceFactory::new();
        let mut stack = stack(&surfaces);

        let base = stack.add(LayerOptions::raster("base"), &surfaces);
        let roads = stack.add(LayerOptions::vector("roads").hidden(), &surfaces);
        assert_eq!(stack.ids(), vec![base, roads]);
        assert_eq!(stack.root().borrow().child_count(), 2);
        assert!(!stack.get(roads).unwrap().container().borrow().state().visible);

        let removed = stack.remove(base).unwrap();
        assert_eq!(removed.name, "base");
        assert_eq!(stack.ids(), vec![roads]);
        assert_eq!(stack.root().borrow().child_count(), 1);
        assert!(matches!(stack.remove(base), Err(MapError::Layer(_))));
    }

    #[test]
    fn test_reorder_moves_containers() {
        let surfaces = MemorySurfaceFactory::new();
        let mut stack = stack(&surfaces);
        let a = stack.add(LayerOptions::raster("a"), &surfaces);
        let b = stack.add(LayerOptions::raster("b"), &surfaces);
        let c = stack.add(LayerOptions::raster("c"), &surfaces);

        stack.reorder(c, 0).unwrap();
        assert_eq!(stack.ids(), vec![c, a, b]);
        assert_eq!(
            root_order(&stack),
            vec![container_id(&stack, c), container_id(&stack, a), container_id(&stack, b)]
        );

        stack.reorder(c, 99).unwrap();
        assert_eq!(stack.ids(), vec![a, b, c]);
        assert_eq!(stack.index_of(c), Some(2));
        assert!(stack.reorder(LayerId(42), 0).is_err());
    }

    #[test]
    fn test_opacity_only_for_raster_layers() {
        let surfaces = MemorySurfaceFactory::new();
        let mut stack = stack(&surfaces);
        let base = stack.add(LayerOptions::raster("base"), &surfaces);
        let roads = stack.add(LayerOptions::vector("roads"), &surfaces);

        stack.get_mut(base).unwrap().set_opacity(0.4).unwrap();
        let entry = stack.get(base).unwrap();
        assert_eq!(entry.layer().opacity(), 0.4);
        assert_eq!(entry.container().borrow().state().opacity, 0.4);

        assert!(stack.get_mut(roads).unwrap().set_opacity(0.4).is_err());

        let entry = stack.get_mut(base).unwrap();
        assert!(matches!(entry.set_opacity(f64::NAN), Err(MapError::Layer(_))));
        assert!(entry.set_opacity(f64::INFINITY).is_err());
        assert_eq!(entry.layer().opacity(), 0.4);
        entry.set_opacity(3.0).unwrap();
        assert_eq!(entry.container().borrow().state().opacity, 1.0);
    }

    #[test]
    fn test_visibility_leaves_cache_alone() {
        let surfaces = MemorySurfaceFactory::new();
        let mut stack = stack(&surfaces);
        let base = stack.add(LayerOptions::raster("base"), &surfaces);

        let entry = stack.get_mut(base).unwrap();
        entry.set_visible(false);
        assert!(!entry.layer().visible);
        assert!(!entry.container().borrow().state().visible);
        assert_eq!(entry.cache().capacity(), 3);
    }
}
