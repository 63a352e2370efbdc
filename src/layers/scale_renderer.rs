//! Tiles of one layer at one fixed scale.
//!
//! A renderer fetches the tile list for (an enlarged copy of) the requested
//! bounds, adds a surface for every new tile and loads tile content. Async
//! work is spawned through the [`RenderContext`]; completions come back as
//! [`RenderMessage`]s and are applied with [`TiledScaleRenderer::handle_message`]
//! on the owning thread.

use crate::core::bounds::Bounds;
use crate::core::geo::{Point, TileCode};
use crate::core::transform::Transform;
use crate::layers::layer::LayerId;
use crate::layers::scale_cache::ScaleKey;
use crate::prelude::HashMap;
use crate::rendering::context::RenderContext;
use crate::rendering::surface::{SurfaceHandle, SurfaceKind};
use crate::tiles::message::{RenderMessage, RendererAddress};
use crate::tiles::source::{TileContent, TileDescriptor, TileListRequest, TileListResponse};
use crate::Result;
use futures::future::{AbortHandle, Abortable};
use futures::FutureExt;
use log::{debug, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RendererId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Nothing requested yet (or everything invalidated)
    Idle,
    /// A tile-list request is in flight
    Fetching,
    /// Tile list received, content loads outstanding
    Rendering,
    Rendered,
}

/// Outcome of a `render` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Rendered,
    /// Completion will be reported through a later message
    Pending,
}

struct TileEntry {
    descriptor: TileDescriptor,
    surface: SurfaceHandle,
    loaded: bool,
    failed: bool,
}

pub struct TiledScaleRenderer {
    id: RendererId,
    layer_id: LayerId,
    scale: f64,
    container: SurfaceHandle,
    visible: bool,
    translation: Point,

    tiles: HashMap<TileCode, TileEntry>,
    pending_tile_count: usize,
    state: RenderState,

    current_fetched_bounds: Option<Bounds>,
    /// Bounds of the last tile list that actually arrived
    confirmed_bounds: Option<Bounds>,
    fetch_count: usize,
    fetch_ticket: u64,
    fetch_abort: Option<AbortHandle>,
    has_fetched: bool,
    /// Bumped on invalidation so loads started before it are ignored
    epoch: u64,
    disposed: Arc<AtomicBool>,
}

impl TiledScaleRenderer {
    /// Creates a hidden renderer drawing into `container`
    pub fn new(id: RendererId, layer_id: LayerId, scale: f64, container: SurfaceHandle) -> Self {
        container.borrow_mut().set_visible(false);
        Self {
            id,
            layer_id,
            scale,
            container,
            visible: false,
            translation: Point::zero(),
            tiles: HashMap::default(),
            pending_tile_count: 0,
            state: RenderState::Idle,
            current_fetched_bounds: None,
            confirmed_bounds: None,
            fetch_count: 0,
            fetch_ticket: 0,
            fetch_abort: None,
            has_fetched: false,
            epoch: 0,
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Container offset that puts `view_bounds`' top-left corner at the origin
    pub fn translation_for(view_bounds: &Bounds, scale: f64) -> Point {
        Point::new(-view_bounds.min.x * scale, view_bounds.max.y * scale)
    }

    pub fn id(&self) -> RendererId {
        self.id
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn key(&self) -> ScaleKey {
        ScaleKey::new(self.scale)
    }

    pub fn address(&self) -> RendererAddress {
        RendererAddress {
            layer: self.layer_id,
            scale: self.key(),
            renderer: self.id,
        }
    }

    pub fn container(&self) -> &SurfaceHandle {
        &self.container
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn is_rendered(&self) -> bool {
        self.state == RenderState::Rendered
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch_abort.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn translation(&self) -> Point {
        self.translation
    }

    pub fn pending_tile_count(&self) -> usize {
        self.pending_tile_count
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn failed_tile_count(&self) -> usize {
        self.tiles.values().filter(|t| t.failed).count()
    }

    pub fn tile_codes(&self) -> Vec<TileCode> {
        let mut codes: Vec<TileCode> = self.tiles.keys().copied().collect();
        codes.sort();
        codes
    }

    pub fn tile_surface(&self, code: &TileCode) -> Option<SurfaceHandle> {
        self.tiles.get(code).map(|t| t.surface.clone())
    }

    pub fn tile_bounds(&self, code: &TileCode) -> Option<Bounds> {
        self.tiles.get(code).map(|t| t.descriptor.bounds)
    }

    pub fn current_fetched_bounds(&self) -> Option<Bounds> {
        self.current_fetched_bounds
    }

    /// Number of tile-list requests issued so far
    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    /// Makes sure `bounds` is covered. Bounds already covered by the last
    /// fetch are answered without a new request.
    pub fn render(&mut self, bounds: &Bounds, ctx: &RenderContext) -> RenderStatus {
        if self.is_disposed() {
            return RenderStatus::Pending;
        }
        if let Some(covered) = self.current_fetched_bounds {
            if covered.contains_bounds(bounds) {
                return if self.is_rendered() {
                    RenderStatus::Rendered
                } else {
                    RenderStatus::Pending
                };
            }
        }

        if let Some(handle) = self.fetch_abort.take() {
            handle.abort();
        }
        let fetch_bounds = bounds.scaled(ctx.fetch_bounds_factor());
        self.current_fetched_bounds = Some(fetch_bounds);
        self.start_fetch(fetch_bounds, ctx);
        RenderStatus::Pending
    }

    fn start_fetch(&mut self, fetch_bounds: Bounds, ctx: &RenderContext) {
        self.fetch_ticket += 1;
        self.fetch_count += 1;
        self.state = RenderState::Fetching;

        let ticket = self.fetch_ticket;
        let address = self.address();
        let request = TileListRequest {
            layer_id: self.layer_id.to_string(),
            crs: ctx.crs().to_string(),
            scale: self.scale,
            world_bounds: fetch_bounds,
        };
        debug!(
            "{} scale {}: fetching tile list #{} for {:?}",
            self.layer_id, self.scale, ticket, fetch_bounds
        );

        let service = ctx.tile_lists();
        let sender = ctx.sender();
        let disposed = self.disposed.clone();
        let (abort_handle, registration) = AbortHandle::new_pair();
        let fetch = Abortable::new(
            async move { service.fetch_tile_list(request).await },
            registration,
        );
        let task = async move {
            // aborted fetches report nothing
            let Ok(result) = fetch.await else {
                return;
            };
            if disposed.load(Ordering::Acquire) {
                return;
            }
            let _ = sender.send(RenderMessage::TileList {
                address,
                ticket,
                result,
            });
        };

        self.fetch_abort = Some(abort_handle);
        if let Err(err) = ctx.spawn(task.boxed()) {
            let _ = ctx.sender().send(RenderMessage::TileList {
                address,
                ticket,
                result: Err(err),
            });
        }
    }

    fn start_load(&self, code: TileCode, url: String, ctx: &RenderContext) {
        let address = self.address();
        let epoch = self.epoch;
        let loader = ctx.content();
        let sender = ctx.sender();
        let disposed = self.disposed.clone();
        let task = async move {
            let result = loader.load(&url).await;
            if disposed.load(Ordering::Acquire) {
                return;
            }
            let _ = sender.send(RenderMessage::TileLoaded {
                address,
                epoch,
                code,
                result,
            });
        };

        if let Err(err) = ctx.spawn(task.boxed()) {
            let _ = ctx.sender().send(RenderMessage::TileLoaded {
                address,
                epoch,
                code,
                result: Err(err),
            });
        }
    }

    /// Applies a completion; returns true when this made the scale rendered
    pub fn handle_message(&mut self, message: RenderMessage, ctx: &RenderContext) -> bool {
        match message {
            RenderMessage::TileList { ticket, result, .. } => {
                self.handle_tile_list(ticket, result, ctx)
            }
            RenderMessage::TileLoaded {
                epoch,
                code,
                result,
                ..
            } => self.handle_tile_loaded(epoch, code, result),
        }
    }

    pub fn handle_tile_list(
        &mut self,
        ticket: u64,
        result: Result<TileListResponse>,
        ctx: &RenderContext,
    ) -> bool {
        if self.is_disposed() || ticket != self.fetch_ticket || self.fetch_abort.is_none() {
            trace!("{} scale {}: stale tile list #{} ignored", self.layer_id, self.scale, ticket);
            return false;
        }
        self.fetch_abort = None;
        self.has_fetched = true;

        match result {
            Ok(response) => {
                self.confirmed_bounds = self.current_fetched_bounds;
                let mut added = 0;
                for descriptor in response.tiles {
                    if self.tiles.contains_key(&descriptor.code) {
                        continue;
                    }
                    self.add_tile(descriptor, ctx);
                    added += 1;
                }
                debug!(
                    "{} scale {}: {} new tiles, {} pending",
                    self.layer_id, self.scale, added, self.pending_tile_count
                );
            }
            Err(err) => {
                warn!(
                    "{} scale {}: tile list failed, keeping {} tiles: {}",
                    self.layer_id,
                    self.scale,
                    self.tiles.len(),
                    err
                );
                self.current_fetched_bounds = self.confirmed_bounds;
            }
        }
        self.settle()
    }

    pub fn handle_tile_loaded(&mut self, epoch: u64, code: TileCode, result: Result<()>) -> bool {
        if self.is_disposed() || epoch != self.epoch {
            return false;
        }
        let Some(entry) = self.tiles.get_mut(&code) else {
            return false;
        };
        if entry.loaded {
            return false;
        }
        entry.loaded = true;
        if let Err(err) = result {
            debug!("{} scale {}: tile {} failed: {}", self.layer_id, self.scale, code, err);
            entry.failed = true;
            entry.surface.borrow_mut().set_visible(false);
        } else {
            trace!("{} scale {}: tile {} loaded", self.layer_id, self.scale, code);
        }
        self.pending_tile_count = self.pending_tile_count.saturating_sub(1);
        self.settle()
    }

    fn add_tile(&mut self, descriptor: TileDescriptor, ctx: &RenderContext) {
        let surface = ctx.surfaces().create(SurfaceKind::Tile);
        {
            let mut tile = surface.borrow_mut();
            tile.set_left(descriptor.bounds.min.x * self.scale);
            tile.set_top(-descriptor.bounds.max.y * self.scale);
        }
        self.container.borrow_mut().add(surface.clone());

        let loaded = match &descriptor.content {
            TileContent::Url(url) => {
                self.pending_tile_count += 1;
                self.start_load(descriptor.code, url.clone(), ctx);
                false
            }
            TileContent::Inline(_) => true,
        };
        self.tiles.insert(
            descriptor.code,
            TileEntry {
                descriptor,
                surface,
                loaded,
                failed: false,
            },
        );
    }

    /// Recomputes the state; true when it just became `Rendered`
    fn settle(&mut self) -> bool {
        let was_rendered = self.state == RenderState::Rendered;
        self.state = if self.fetch_abort.is_some() {
            RenderState::Fetching
        } else if self.pending_tile_count > 0 {
            RenderState::Rendering
        } else if self.has_fetched {
            RenderState::Rendered
        } else {
            RenderState::Idle
        };
        !was_rendered && self.state == RenderState::Rendered
    }

    /// Aborts the in-flight tile-list request; content loads keep running
    pub fn cancel(&mut self) {
        if let Some(handle) = self.fetch_abort.take() {
            handle.abort();
            self.fetch_ticket += 1;
            self.current_fetched_bounds = self.confirmed_bounds;
            debug!("{} scale {}: fetch cancelled", self.layer_id, self.scale);
            self.settle();
        }
    }

    /// Drops every tile so the next `render` fetches from scratch
    pub fn invalidate(&mut self) {
        self.cancel();
        self.epoch += 1;
        self.remove_tile_surfaces();
        self.pending_tile_count = 0;
        self.current_fetched_bounds = None;
        self.confirmed_bounds = None;
        self.has_fetched = false;
        self.state = RenderState::Idle;
    }

    /// Shows or hides the scale, resetting its transform to identity
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        let mut container = self.container.borrow_mut();
        container.set_transform(Transform::identity());
        container.set_visible(visible);
    }

    pub fn set_translation(&mut self, translation: Point) {
        self.translation = translation;
        let mut container = self.container.borrow_mut();
        container.set_left(translation.x);
        container.set_top(translation.y);
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.container.borrow_mut().set_transform(transform);
    }

    /// Late completions are ignored from here on
    pub fn dispose(&mut self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.fetch_abort.take() {
            handle.abort();
        }
        self.remove_tile_surfaces();
        self.pending_tile_count = 0;
        self.state = RenderState::Idle;
        self.visible = false;
        self.container.borrow_mut().set_visible(false);
        debug!("{} scale {}: disposed", self.layer_id, self.scale);
    }

    fn remove_tile_surfaces(&mut self) {
        let mut container = self.container.borrow_mut();
        for (_, entry) in self.tiles.drain() {
            let id = entry.surface.borrow().id();
            container.remove(id);
        }
    }
}

impl Drop for TiledScaleRenderer {
    fn drop(&mut self) {
        self.disposed.store(true, Ordering::Release);
        if let Some(handle) = self.fetch_abort.take() {
            handle.abort();
        }
    }
}
