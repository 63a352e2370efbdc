//! Host drawable surfaces.
//!
//! The renderer never draws pixels itself. It builds a tree of surfaces
//! (layer container → scale container → tile) and sets their visibility,
//! offsets, transforms and opacity; the host maps these onto its widget
//! toolkit. A surface's transform applies on top of its left/top offset.

use crate::core::transform::Transform;
use crate::prelude::HashMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

pub type SurfaceId = u64;

/// Shared handle to a surface; parents hold their children this way
pub type SurfaceHandle = Rc<RefCell<dyn Surface>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Root container of one layer
    Layer,
    /// Container holding the tiles of one resident scale
    Scale,
    Tile,
}

/// Read-back of everything the renderer set on a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceState {
    pub visible: bool,
    pub left: f64,
    pub top: f64,
    pub transform: Transform,
    pub opacity: f64,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            visible: true,
            left: 0.0,
            top: 0.0,
            transform: Transform::identity(),
            opacity: 1.0,
        }
    }
}

pub trait Surface {
    fn id(&self) -> SurfaceId;
    fn kind(&self) -> SurfaceKind;

    /// Appends `child` on top of the existing children
    fn add(&mut self, child: SurfaceHandle);
    /// Inserts `child` at `index` (clamped to the child count)
    fn insert(&mut self, child: SurfaceHandle, index: usize);
    fn remove(&mut self, id: SurfaceId) -> Option<SurfaceHandle>;

    fn set_visible(&mut self, visible: bool);
    fn set_left(&mut self, left: f64);
    fn set_top(&mut self, top: f64);
    fn set_transform(&mut self, transform: Transform);
    fn set_opacity(&mut self, opacity: f64);

    fn child_count(&self) -> usize;
    fn child(&self, index: usize) -> Option<SurfaceHandle>;
    fn state(&self) -> SurfaceState;

    fn index_of(&self, id: SurfaceId) -> Option<usize> {
        (0..self.child_count()).find(|&i| {
            self.child(i)
                .map(|child| child.borrow().id() == id)
                .unwrap_or(false)
        })
    }
}

/// Creates surfaces for the renderer
pub trait SurfaceFactory {
    fn create(&self, kind: SurfaceKind) -> SurfaceHandle;
}

/// Headless surface that just records what it was told
pub struct MemorySurface {
    id: SurfaceId,
    kind: SurfaceKind,
    state: SurfaceState,
    children: Vec<SurfaceHandle>,
}

impl MemorySurface {
    pub fn new(id: SurfaceId, kind: SurfaceKind) -> Self {
        Self {
            id,
            kind,
            state: SurfaceState::default(),
            children: Vec::new(),
        }
    }
}

impl fmt::Debug for MemorySurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySurface")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("children", &self.children.len())
            .finish()
    }
}

impl Surface for MemorySurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn add(&mut self, child: SurfaceHandle) {
        self.children.push(child);
    }

    fn insert(&mut self, child: SurfaceHandle, index: usize) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    fn remove(&mut self, id: SurfaceId) -> Option<SurfaceHandle> {
        let index = self
            .children
            .iter()
            .position(|child| child.borrow().id() == id)?;
        Some(self.children.remove(index))
    }

    fn set_visible(&mut self, visible: bool) {
        self.state.visible = visible;
    }

    fn set_left(&mut self, left: f64) {
        self.state.left = left;
    }

    fn set_top(&mut self, top: f64) {
        self.state.top = top;
    }

    fn set_transform(&mut self, transform: Transform) {
        self.state.transform = transform;
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.state.opacity = opacity.clamp(0.0, 1.0);
    }

    fn child_count(&self) -> usize {
        self.children.len()
    }

    fn child(&self, index: usize) -> Option<SurfaceHandle> {
        self.children.get(index).cloned()
    }

    fn state(&self) -> SurfaceState {
        self.state
    }
}

/// Factory for [`MemorySurface`]s; counts what it created per kind
#[derive(Debug, Default)]
pub struct MemorySurfaceFactory {
    next_id: Cell<SurfaceId>,
    created: RefCell<HashMap<SurfaceKind, usize>>,
}

impl MemorySurfaceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self, kind: SurfaceKind) -> usize {
        self.created.borrow().get(&kind).copied().unwrap_or(0)
    }
}

impl SurfaceFactory for MemorySurfaceFactory {
    fn create(&self, kind: SurfaceKind) -> SurfaceHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        *self.created.borrow_mut().entry(kind).or_insert(0) += 1;
        Rc::new(RefCell::new(MemorySurface::new(id, kind)))
    }
}

/// Children of `surface`, bottom to top
pub fn children(surface: &SurfaceHandle) -> Vec<SurfaceHandle> {
    let surface = surface.borrow();
    let children: Vec<SurfaceHandle> = (0..surface.child_count())
        .filter_map(|i| surface.child(i))
        .collect();
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;

    #[test]
    fn test_memory_surface_children() {
        let factory = MemorySurfaceFactory::new();
        let root = factory.create(SurfaceKind::Layer);
        let a = factory.create(SurfaceKind::Scale);
        let b = factory.create(SurfaceKind::Scale);
        let c = factory.create(SurfaceKind::Scale);
        let (a_id, b_id, c_id) = (a.borrow().id(), b.borrow().id(), c.borrow().id());

        root.borrow_mut().add(a);
        root.borrow_mut().add(b);
        root.borrow_mut().insert(c, 0);

        let ids: Vec<_> = children(&root).iter().map(|s| s.borrow().id()).collect();
        assert_eq!(ids, vec![c_id, a_id, b_id]);
        assert_eq!(root.borrow().index_of(b_id), Some(2));

        assert!(root.borrow_mut().remove(a_id).is_some());
        assert!(root.borrow_mut().remove(a_id).is_none());
        assert_eq!(root.borrow().child_count(), 2);
        assert_eq!(factory.created(SurfaceKind::Scale), 3);
        assert_eq!(factory.created(SurfaceKind::Tile), 0);
    }

    #[test]
    fn test_memory_surface_state() {
        let factory = MemorySurfaceFactory::new();
        let surface = factory.create(SurfaceKind::Tile);
        {
            let mut s = surface.borrow_mut();
            s.set_visible(false);
            s.set_left(10.0);
            s.set_top(-4.0);
            s.set_opacity(1.5);
            s.set_transform(Transform::new(2.0, Point::new(1.0, 1.0)));
        }
        let state = surface.borrow().state();
        assert!(!state.visible);
        assert_eq!((state.left, state.top), (10.0, -4.0));
        assert_eq!(state.opacity, 1.0);
        assert_eq!(state.transform.scale(), 2.0);
    }
}
