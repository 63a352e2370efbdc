//! The viewport: center, scale and pixel size of the visible map region.
//!
//! Every mutation replaces the [`ViewState`] wholesale, remembers the previous
//! one and queues a [`ViewPortEvent`] for the renderer. Scales are routed
//! through the resolution snapper before they are applied.

use crate::core::bounds::Bounds;
use crate::core::config::{normalize_resolutions, ViewPortConfig};
use crate::core::constants::{DEFAULT_MAXIMUM_SCALE, ZOOM_STEP_FACTOR};
use crate::core::events::{ViewPortEvent, ViewPortEventKind};
use crate::core::geo::Point;
use crate::core::resolution::{self, SnapContext, Snapped, ZoomOption};
use crate::core::transform::Matrix;
use crate::traits::ScaleEq;
use log::debug;
use serde::{Deserialize, Serialize};

/// Immutable snapshot of where the viewport is looking
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewState {
    /// World-space center
    pub x: f64,
    pub y: f64,
    /// Pixels per world unit; 0 while uninitialized
    pub scale: f64,
    /// World position used as the pan-space origin
    pub pan_origin_x: f64,
    pub pan_origin_y: f64,
    pub pan_dragging: bool,
}

impl ViewState {
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn pan_origin(&self) -> Point {
        Point::new(self.pan_origin_x, self.pan_origin_y)
    }

    pub fn is_initialized(&self) -> bool {
        self.scale > 0.0
    }

    fn with_center(self, center: Point) -> Self {
        Self {
            x: center.x,
            y: center.y,
            ..self
        }
    }

    fn with_pan_origin(self, origin: Point) -> Self {
        Self {
            pan_origin_x: origin.x,
            pan_origin_y: origin.y,
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewPort {
    state: ViewState,
    last_view_state: Option<ViewState>,
    width: f64,
    height: f64,
    maximum_scale: f64,
    minimum_scale: Option<f64>,
    max_bounds: Option<Bounds>,
    resolutions: Vec<f64>,
    resolution_index: Option<usize>,
    zoom_option: ZoomOption,
    events: Vec<ViewPortEvent>,
}

impl ViewPort {
    pub fn new(width: f64, height: f64) -> Self {
        Self::from_config(&ViewPortConfig {
            width,
            height,
            ..ViewPortConfig::default()
        })
    }

    /// Builds a viewport from a configuration. An initial scale, when present,
    /// is snapped like any other; no event is queued for the initial state.
    pub fn from_config(config: &ViewPortConfig) -> Self {
        let config = config.clone().validated();
        let mut viewport = Self {
            state: ViewState::default()
                .with_center(config.center)
                .with_pan_origin(config.center),
            last_view_state: None,
            width: config.width,
            height: config.height,
            maximum_scale: config.maximum_scale,
            minimum_scale: config.minimum_scale,
            max_bounds: config.max_bounds,
            resolutions: config.resolutions,
            resolution_index: None,
            zoom_option: config.zoom_option,
            events: Vec::new(),
        };

        if let Some(scale) = config.scale {
            let option = if viewport.resolutions.is_empty() {
                ZoomOption::Exact
            } else {
                ZoomOption::LevelClosest
            };
            let snapped = viewport.snap(scale, option);
            viewport.state.scale = snapped.scale;
            viewport.resolution_index = snapped.index;
            let center = viewport.clamp_center(viewport.state.center(), snapped.scale);
            viewport.state = viewport.state.with_center(center).with_pan_origin(center);
        }
        viewport
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn last_view_state(&self) -> Option<&ViewState> {
        self.last_view_state.as_ref()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    pub fn center(&self) -> Point {
        self.state.center()
    }

    pub fn resolutions(&self) -> &[f64] {
        &self.resolutions
    }

    pub fn resolution_index(&self) -> Option<usize> {
        self.resolution_index
    }

    pub fn max_bounds(&self) -> Option<&Bounds> {
        self.max_bounds.as_ref()
    }

    pub fn maximum_scale(&self) -> f64 {
        self.maximum_scale
    }

    pub fn minimum_scale(&self) -> Option<f64> {
        self.minimum_scale
    }

    /// Visible world bounds; collapses to the center while uninitialized
    pub fn bounds(&self) -> Bounds {
        let scale = self.state.scale;
        if scale <= 0.0 {
            return Bounds::from_center_and_size(self.center(), 0.0, 0.0);
        }
        Bounds::from_center_and_size(self.center(), self.width / scale, self.height / scale)
    }

    pub fn set_resolutions(&mut self, resolutions: Vec<f64>) {
        self.resolutions = normalize_resolutions(resolutions);
        let current = self.state.scale;
        self.resolution_index = if current > 0.0 {
            self.resolutions
                .iter()
                .position(|r| (1.0 / r).scale_eq(current))
        } else {
            None
        };
    }

    pub fn set_maximum_scale(&mut self, maximum_scale: f64) {
        self.maximum_scale = if maximum_scale.is_finite() && maximum_scale > 0.0 {
            maximum_scale
        } else {
            DEFAULT_MAXIMUM_SCALE
        };
        if self.minimum_scale.is_some_and(|min| min > self.maximum_scale) {
            self.minimum_scale = None;
        }
    }

    pub fn set_minimum_scale(&mut self, minimum_scale: Option<f64>) {
        self.minimum_scale = minimum_scale
            .filter(|min| min.is_finite() && *min > 0.0 && *min <= self.maximum_scale);
    }

    pub fn set_max_bounds(&mut self, max_bounds: Option<Bounds>) {
        self.max_bounds = max_bounds.filter(|b| b.is_valid() && !b.is_empty());
    }

    /// Changes the pixel size, keeping center and scale
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        self.height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        self.commit(self.state, ViewPortEventKind::Resized);
    }

    pub fn set_pan_dragging(&mut self, dragging: bool) {
        self.state.pan_dragging = dragging;
    }

    /// Recenters on `coordinate`, pulled back inside the maximum bounds
    pub fn apply_position(&mut self, coordinate: Point) {
        if !coordinate.is_finite() {
            return;
        }
        let center = self.clamp_center(coordinate, self.state.scale);
        self.commit(self.state.with_center(center), ViewPortEventKind::Translated);
    }

    /// Snaps and applies `scale`. With a `rescale_point`, that world position
    /// keeps its screen position; otherwise the center is preserved.
    pub fn apply_scale(&mut self, scale: f64, option: ZoomOption, rescale_point: Option<Point>) {
        let old_scale = self.state.scale;
        let snapped = self.snap(scale, option);
        let new_scale = snapped.scale;

        let mut center = self.state.center();
        if let Some(anchor) = rescale_point.filter(|p| p.is_finite()) {
            if old_scale > 0.0 {
                let factor = new_scale / old_scale;
                let shift = anchor.subtract(&center).multiply(1.0 - 1.0 / factor);
                center = center.add(&shift);
            }
        }
        let center = self.clamp_center(center, new_scale);

        self.resolution_index = snapped.index;
        let next = ViewState {
            scale: new_scale,
            ..self.state.with_center(center)
        };
        self.commit(next, ViewPortEventKind::Scaled);
    }

    /// Fits `bounds` into the view, centers on it and, for non-empty bounds,
    /// moves the pan origin to the new center.
    pub fn apply_bounds(&mut self, bounds: &Bounds, option: ZoomOption) {
        if !bounds.is_valid() {
            return;
        }
        let desired = if bounds.is_empty() {
            self.minimum_scale_value()
        } else {
            (self.width / bounds.width()).min(self.height / bounds.height())
        };
        let snapped = self.snap(desired, option);
        let center = self.clamp_center(bounds.center(), snapped.scale);

        self.resolution_index = snapped.index;
        let mut next = ViewState {
            scale: snapped.scale,
            ..self.state.with_center(center)
        };
        if !bounds.is_empty() {
            next = next.with_pan_origin(center);
        }
        self.commit(next, ViewPortEventKind::Changed);
    }

    /// One level in, or a fixed factor without resolutions
    pub fn zoom_in(&mut self, rescale_point: Option<Point>) {
        self.zoom_by(ZOOM_STEP_FACTOR, rescale_point);
    }

    pub fn zoom_out(&mut self, rescale_point: Option<Point>) {
        self.zoom_by(1.0 / ZOOM_STEP_FACTOR, rescale_point);
    }

    fn zoom_by(&mut self, factor: f64, rescale_point: Option<Point>) {
        if self.state.scale <= 0.0 {
            return;
        }
        let option = if self.resolutions.is_empty() {
            ZoomOption::Exact
        } else {
            self.zoom_option
        };
        self.apply_scale(self.state.scale * factor, option, rescale_point);
    }

    /// Makes the current center the pan-space origin
    pub fn reset_pan_origin(&mut self) {
        self.state = self.state.with_pan_origin(self.state.center());
    }

    /// Queued events, oldest first
    pub fn take_events(&mut self) -> Vec<ViewPortEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn world_to_view_transformation(&self) -> Matrix {
        let s = self.state.scale;
        if s <= 0.0 {
            return Matrix::identity();
        }
        Matrix::scaling(s, -s).then(&self.world_to_view_translation())
    }

    pub fn world_to_view_translation(&self) -> Matrix {
        let s = self.state.scale;
        if s <= 0.0 {
            return Matrix::identity();
        }
        Matrix::translation(
            self.width / 2.0 - self.state.x * s,
            self.height / 2.0 + self.state.y * s,
        )
    }

    pub fn world_to_view_scaling(&self) -> Matrix {
        let s = self.state.scale;
        if s <= 0.0 {
            return Matrix::identity();
        }
        Matrix::scaling(s, -s)
    }

    pub fn world_to_pan_transformation(&self) -> Matrix {
        let s = self.state.scale;
        if s <= 0.0 {
            return Matrix::identity();
        }
        Matrix::scaling(s, -s).then(&self.world_to_pan_translation())
    }

    pub fn world_to_pan_translation(&self) -> Matrix {
        let s = self.state.scale;
        if s <= 0.0 {
            return Matrix::identity();
        }
        Matrix::translation(-self.state.pan_origin_x * s, self.state.pan_origin_y * s)
    }

    pub fn pan_to_view_translation(&self) -> Matrix {
        let s = self.state.scale;
        if s <= 0.0 {
            return Matrix::identity();
        }
        Matrix::translation(
            self.width / 2.0 - (self.state.x - self.state.pan_origin_x) * s,
            self.height / 2.0 + (self.state.y - self.state.pan_origin_y) * s,
        )
    }

    pub fn world_to_view(&self, point: &Point) -> Point {
        self.world_to_view_transformation().apply(point)
    }

    /// Inverse of [`Self::world_to_view`]; identity while uninitialized
    pub fn view_to_world(&self, point: &Point) -> Point {
        self.world_to_view_transformation()
            .invert()
            .map(|m| m.apply(point))
            .unwrap_or(*point)
    }

    /// Lowest applicable scale: the configured floor, else the coarsest
    /// resolution, else the current scale.
    pub fn minimum_scale_value(&self) -> f64 {
        if let Some(min) = self.minimum_scale {
            return min;
        }
        if let Some(coarsest) = self.resolutions.first() {
            return 1.0 / coarsest;
        }
        if self.state.scale > 0.0 {
            self.state.scale
        } else {
            1.0
        }
    }

    fn snap(&self, desired: f64, option: ZoomOption) -> Snapped {
        let desired = if desired.is_finite() && desired > 0.0 {
            desired
        } else {
            self.minimum_scale_value()
        };
        resolution::snap(
            desired,
            option,
            &SnapContext {
                resolutions: &self.resolutions,
                minimum_scale: self.minimum_scale,
                maximum_scale: self.maximum_scale,
                current_index: self.resolution_index,
                current_scale: self.state.scale,
            },
        )
    }

    fn clamp_center(&self, center: Point, scale: f64) -> Point {
        let Some(max) = self.max_bounds else {
            return center;
        };
        if scale <= 0.0 {
            return center;
        }
        let half_width = self.width / scale / 2.0;
        let half_height = self.height / scale / 2.0;
        Point::new(
            clamp_axis(center.x, half_width, max.min.x, max.max.x),
            clamp_axis(center.y, half_height, max.min.y, max.max.y),
        )
    }

    fn commit(&mut self, next: ViewState, kind: ViewPortEventKind) {
        let previous = self.state;
        self.last_view_state = Some(previous);
        self.state = next;

        let event = ViewPortEvent {
            kind,
            bounds: self.bounds(),
            scale: next.scale,
            previous_scale: previous.scale,
            same_scale: next.scale.scale_eq(previous.scale),
            pan_dragging: next.pan_dragging,
        };
        debug!(
            "viewport {:?}: scale {} -> {}, center ({:.3}, {:.3})",
            kind, previous.scale, next.scale, next.x, next.y
        );
        self.events.push(event);
    }
}

/// Keeps a half-extent inside `[min, max]`, centering when it cannot fit
fn clamp_axis(value: f64, half_extent: f64, min: f64, max: f64) -> f64 {
    if 2.0 * half_extent >= max - min {
        (min + max) / 2.0
    } else {
        value.clamp(min + half_extent, max - half_extent)
    }
}
