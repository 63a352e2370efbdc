//! Composition root of the rendering core.
//!
//! `MapRenderer` owns the layer stack (one [`ScaleCache`] per layer), the
//! map-wide [`NavigationAnimationController`] and the completion channel all
//! renderers report into. The host drives it from its event loop:
//! viewport events go to [`MapRenderer::on_viewport_event`], and every frame
//! calls [`MapRenderer::update`] and then [`MapRenderer::drain_events`].

use crate::animation::navigation::{NavigationAnimationController, Participant};
use crate::core::bounds::Bounds;
use crate::core::config::RendererConfig;
use crate::core::events::ViewPortEvent;
use crate::core::geo::Point;
use crate::core::transform::Transform;
use crate::layers::layer::{Layer, LayerId, LayerOptions};
use crate::layers::manager::{LayerEntry, LayerStack};
use crate::layers::scale_cache::{ScaleCache, ScaleKey};
use crate::layers::scale_renderer::{RenderStatus, TiledScaleRenderer};
use crate::rendering::context::{RenderContext, RenderServices};
use crate::rendering::surface::SurfaceHandle;
use crate::tiles::message::RenderMessage;
use crate::Result;
use crossbeam_channel::{unbounded, Receiver};
use instant::Instant;
use log::{debug, trace};

/// Notifications for the host, collected until [`MapRenderer::drain_events`]
#[derive(Debug, Clone, PartialEq)]
pub enum RendererEvent {
    /// Every tile of `scale` finished loading (or failed) for `layer`
    ScaleRendered { layer: LayerId, scale: f64 },
    /// The navigation to `scale` reached its end state
    NavigationCompleted { scale: f64 },
}

/// Where the map is navigating to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationTarget {
    pub bounds: Bounds,
    pub scale: f64,
    /// Scale container offset for `bounds` at `scale`
    pub translation: Point,
}

impl NavigationTarget {
    pub fn new(bounds: Bounds, scale: f64) -> Self {
        Self {
            bounds,
            scale,
            translation: TiledScaleRenderer::translation_for(&bounds, scale),
        }
    }
}

/// The scale whose containers an animation moves, and their base offset
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    scale: f64,
    translation: Point,
}

impl Anchor {
    /// Transform that lines the anchor's content up with `target`
    fn transform_to(&self, target: &NavigationTarget) -> Transform {
        let factor = target.scale / self.scale;
        Transform::new(
            factor,
            target.translation.subtract(&self.translation.multiply(factor)),
        )
    }
}

fn same_scale(a: f64, b: f64) -> bool {
    ScaleKey::new(a) == ScaleKey::new(b)
}

pub struct MapRenderer {
    config: RendererConfig,
    ctx: RenderContext,
    receiver: Receiver<RenderMessage>,
    layers: LayerStack,
    animation: NavigationAnimationController,
    target: Option<NavigationTarget>,
    anchor: Option<Anchor>,
    events: Vec<RendererEvent>,
}

impl MapRenderer {
    /// Creates a renderer drawing layer containers into `root`
    pub fn new(services: RenderServices, config: RendererConfig, root: SurfaceHandle) -> Self {
        let config = config.validated();
        let (sender, receiver) = unbounded();
        let ctx = RenderContext::new(services, sender, &config);
        Self {
            layers: LayerStack::new(root, config.scale_cache_capacity),
            animation: NavigationAnimationController::new(config.easing),
            config,
            ctx,
            receiver,
            target: None,
            anchor: None,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    pub fn root(&self) -> &SurfaceHandle {
        self.layers.root()
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id).map(LayerEntry::layer)
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.ids()
    }

    pub fn scale_cache(&self, id: LayerId) -> Option<&ScaleCache> {
        self.layers.get(id).map(LayerEntry::cache)
    }

    pub fn animation(&self) -> &NavigationAnimationController {
        &self.animation
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_running()
    }

    pub fn target(&self) -> Option<NavigationTarget> {
        self.target
    }

    pub fn current_scale(&self) -> Option<f64> {
        self.target.map(|target| target.scale)
    }

    // Layer lifecycle

    /// Adds a layer on top. When the map already shows a scale the new layer
    /// starts rendering it right away.
    pub fn add_layer(&mut self, options: LayerOptions) -> LayerId {
        let id = self.layers.add(options, self.ctx.surfaces());
        if let Some(target) = self.target {
            if let Some(entry) = self.layers.get_mut(id) {
                let cache = entry.cache_mut();
                cache.ensure_scale(target.scale, &target.bounds, &self.ctx);
                cache.set_scale_visibility(target.scale, true);
                cache.apply_scale_translation(target.scale, target.translation);
            }
        }
        id
    }

    /// Removes a layer and disposes every scale it holds
    pub fn remove_layer(&mut self, id: LayerId) -> Result<()> {
        self.layers.remove(id).map(|_| ())
    }

    pub fn reorder_layer(&mut self, id: LayerId, index: usize) -> Result<()> {
        self.layers.reorder(id, index)
    }

    /// Shows or hides a layer without touching its cached scales
    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> Result<()> {
        self.layers.try_get_mut(id)?.set_visible(visible);
        Ok(())
    }

    /// Restyles a raster layer in place. Vector layers are refused; use
    /// [`MapRenderer::refresh_layer`] for them.
    pub fn set_layer_opacity(&mut self, id: LayerId, opacity: f64) -> Result<()> {
        self.layers.try_get_mut(id)?.set_opacity(opacity)
    }

    /// Drops a layer's tiles and renders the current target again
    pub fn refresh_layer(&mut self, id: LayerId) -> Result<()> {
        let target = self.target;
        let entry = self.layers.try_get_mut(id)?;
        if let Some(stale) = entry.pending_swap() {
            entry.cache_mut().set_scale_visibility(stale, false);
            entry.set_pending_swap(None);
        }
        let cache = entry.cache_mut();
        cache.invalidate();
        if let Some(target) = target {
            cache.ensure_scale(target.scale, &target.bounds, &self.ctx);
            cache.set_scale_visibility(target.scale, true);
            cache.apply_scale_translation(target.scale, target.translation);
        }
        debug!("{} refreshed", id);
        Ok(())
    }

    // Per-layer scale control

    pub fn ensure_scale(&mut self, id: LayerId, scale: f64, bounds: &Bounds) -> Result<RenderStatus> {
        let entry = self.layers.try_get_mut(id)?;
        Ok(entry.cache_mut().ensure_scale(scale, bounds, &self.ctx))
    }

    /// Returns whether the scale is resident
    pub fn set_scale_visibility(&mut self, id: LayerId, scale: f64, visible: bool) -> Result<bool> {
        Ok(self
            .layers
            .try_get_mut(id)?
            .cache_mut()
            .set_scale_visibility(scale, visible))
    }

    /// Returns whether the scale is resident
    pub fn apply_scale_translation(&mut self, id: LayerId, scale: f64, translation: Point) -> Result<bool> {
        Ok(self
            .layers
            .try_get_mut(id)?
            .cache_mut()
            .apply_scale_translation(scale, translation))
    }

    // Navigation

    /// Follows a viewport change. Drags and resizes are applied without
    /// animation.
    pub fn on_viewport_event(&mut self, event: &ViewPortEvent, now: Instant) {
        let millis = if event.is_immediate() {
            0
        } else {
            self.config.animation_millis
        };
        trace!("viewport {:?} -> scale {}", event.kind, event.scale);
        self.navigate_to(event.bounds, event.scale, millis, now);
    }

    /// Makes every layer render `bounds` at `scale` and animates from what is
    /// on screen. A navigation arriving mid-animation extends it.
    pub fn navigate_to(&mut self, bounds: Bounds, scale: f64, animation_millis: u64, now: Instant) {
        if !(scale.is_finite() && scale > 0.0) || bounds.is_empty() {
            debug!("navigation to scale {} over {:?} skipped", scale, bounds);
            return;
        }
        let next = NavigationTarget::new(bounds, scale);
        let Some(previous) = self.target.replace(next) else {
            // nothing on screen yet
            self.ensure_all(&next);
            self.finish_navigation();
            return;
        };

        if self.animation.is_running() {
            if let Some(anchor) = self.anchor {
                self.extend_navigation(anchor, previous, next, animation_millis, now);
                return;
            }
        }
        if let Some(stale) = self.anchor.take() {
            // a cancelled animation was never settled
            self.animation.release();
            self.settle(&previous, Some(stale));
        }

        let anchor = Anchor {
            scale: previous.scale,
            translation: previous.translation,
        };
        self.retire(anchor, &previous, &next);
        self.ensure_all(&next);

        let mut participants = Vec::new();
        self.layers.for_each_layer_mut(|entry| {
            let moving = entry.pending_swap().unwrap_or(anchor.scale);
            let cache = entry.cache_mut();
            if let Some(renderer) = cache.renderer(moving) {
                let surface = renderer.container().clone();
                let base = surface.borrow().state().transform;
                participants.push(Participant::with_base(surface, base));
            }
            // the old scale covers the new one until the swap
            cache.bring_to_front(moving);
            if !same_scale(next.scale, moving) {
                cache.set_scale_visibility(next.scale, true);
                cache.apply_scale_translation(next.scale, next.translation);
            }
        });

        self.anchor = Some(anchor);
        let transform = anchor.transform_to(&next);
        debug!(
            "navigating from scale {} to {} over {} ms",
            anchor.scale, next.scale, animation_millis
        );
        let frame = self.animation.start(
            participants,
            transform.scale(),
            Point::zero(),
            transform.translate(),
            animation_millis,
            now,
        );
        if frame.completed {
            self.finish_navigation();
        }
    }

    fn extend_navigation(
        &mut self,
        anchor: Anchor,
        previous: NavigationTarget,
        next: NavigationTarget,
        animation_millis: u64,
        now: Instant,
    ) {
        self.retire(anchor, &previous, &next);
        self.ensure_all(&next);
        self.layers.for_each_layer_mut(|entry| {
            let moving = entry.pending_swap().unwrap_or(anchor.scale);
            if !same_scale(next.scale, moving) {
                let cache = entry.cache_mut();
                cache.set_scale_visibility(next.scale, true);
                cache.apply_scale_translation(next.scale, next.translation);
            }
        });

        let transform = anchor.transform_to(&next);
        trace!("navigation retargeted to scale {}", next.scale);
        let completed = self
            .animation
            .extend(transform.scale(), transform.translate(), animation_millis, now)
            .is_some_and(|frame| frame.completed);
        if completed {
            self.finish_navigation();
        }
    }

    /// Hides the previous target wherever it is not the scale being moved.
    /// Runs before the next target is ensured so it can be evicted.
    fn retire(&mut self, anchor: Anchor, previous: &NavigationTarget, next: &NavigationTarget) {
        self.layers.for_each_layer_mut(|entry| {
            let moving = entry.pending_swap().unwrap_or(anchor.scale);
            if !same_scale(previous.scale, moving) && !same_scale(previous.scale, next.scale) {
                entry.cache_mut().set_scale_visibility(previous.scale, false);
            }
        });
    }

    /// Settles every layer on the current target and reports completion
    fn finish_navigation(&mut self) {
        let anchor = self.anchor.take();
        self.animation.release();
        let Some(target) = self.target else {
            return;
        };
        self.settle(&target, anchor);
        debug!("navigation settled at scale {}", target.scale);
        self.events.push(RendererEvent::NavigationCompleted { scale: target.scale });
    }

    /// Shows `target` at rest. The scales animated towards it are hidden
    /// when the target is rendered, otherwise one of them stays lined up
    /// with it until the target reports rendered.
    fn settle(&mut self, target: &NavigationTarget, anchor: Option<Anchor>) {
        self.layers.for_each_layer_mut(|entry| {
            let mut stale: Vec<f64> = Vec::new();
            if let Some(anchor) = anchor {
                stale.push(anchor.scale);
            }
            if let Some(pending) = entry.pending_swap() {
                stale.push(pending);
            }
            stale.retain(|scale| !same_scale(*scale, target.scale));
            stale.dedup_by(|a, b| same_scale(*a, *b));

            let cache = entry.cache_mut();
            cache.set_scale_visibility(target.scale, true);
            cache.apply_scale_translation(target.scale, target.translation);

            let keep = if cache.is_rendered(target.scale) {
                None
            } else {
                stale
                    .iter()
                    .copied()
                    .find(|scale| cache.is_rendered(*scale))
                    .or_else(|| stale.iter().copied().find(|scale| cache.contains(*scale)))
            };
            for scale in &stale {
                if Some(*scale) != keep {
                    cache.set_scale_visibility(*scale, false);
                }
            }
            if let Some(scale) = keep {
                let translation = cache.scale_translation(scale).unwrap_or_default();
                let transform = Anchor { scale, translation }.transform_to(target);
                cache.set_scale_visibility(scale, true);
                cache.apply_scale_transform(scale, transform);
                cache.bring_to_front(scale);
            }
            entry.set_pending_swap(keep);
        });
    }

    fn ensure_all(&mut self, target: &NavigationTarget) {
        let ctx = &self.ctx;
        self.layers.for_each_layer_mut(|entry| {
            entry
                .cache_mut()
                .ensure_scale(target.scale, &target.bounds, ctx);
        });
    }

    /// Stops the animation where it is. Follow with [`MapRenderer::redraw`].
    pub fn cancel_navigation(&mut self) -> bool {
        self.animation.cancel()
    }

    /// Re-renders the current target and settles every layer on it without
    /// animation
    pub fn redraw(&mut self) {
        self.animation.cancel();
        let Some(target) = self.target else {
            return;
        };
        self.ensure_all(&target);
        self.finish_navigation();
    }

    // Event loop

    /// Applies completed fetches and loads. Returns the number of messages
    /// handled.
    pub fn process_messages(&mut self) -> usize {
        let messages: Vec<RenderMessage> = self.receiver.try_iter().collect();
        let count = messages.len();
        for message in messages {
            let layer_id = message.address().layer;
            let Some(entry) = self.layers.get_mut(layer_id) else {
                trace!("completion for removed {} dropped", layer_id);
                continue;
            };
            let Some(scale) = entry.cache_mut().handle_message(message, &self.ctx) else {
                continue;
            };
            debug!("{} scale {} rendered", layer_id, scale);
            self.events.push(RendererEvent::ScaleRendered {
                layer: layer_id,
                scale,
            });

            let is_target = self
                .target
                .is_some_and(|target| same_scale(target.scale, scale));
            if is_target && !self.animation.is_running() {
                if let Some(stale) = entry.pending_swap() {
                    entry.cache_mut().set_scale_visibility(stale, false);
                    entry.set_pending_swap(None);
                }
            }
        }
        count
    }

    /// One event-loop turn: completions, then the animation frame. Returns
    /// whether an animation is still running.
    pub fn update(&mut self, now: Instant) -> bool {
        self.process_messages();
        if let Some(frame) = self.animation.tick(now) {
            if frame.completed {
                self.finish_navigation();
            }
        }
        self.animation.is_running()
    }

    pub fn drain_events(&mut self) -> Vec<RendererEvent> {
        std::mem::take(&mut self.events)
    }

    /// Disposes every layer
    pub fn dispose(&mut self) {
        self.animation.cancel();
        self.animation.release();
        self.layers.clear();
        self.target = None;
        self.anchor = None;
    }
}
