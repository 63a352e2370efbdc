use crate::core::bounds::Bounds;

/// What kind of viewport mutation produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewPortEventKind {
    /// Bounds were applied (scale and center may both have moved)
    Changed,
    Scaled,
    Translated,
    Resized,
}

/// Emitted by the viewport after every mutation and consumed by the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct ViewPortEvent {
    pub kind: ViewPortEventKind,
    /// Visible world bounds after the mutation
    pub bounds: Bounds,
    pub scale: f64,
    pub previous_scale: f64,
    pub same_scale: bool,
    pub pan_dragging: bool,
}

impl ViewPortEvent {
    /// Drags and resizes are followed without animation
    pub fn is_immediate(&self) -> bool {
        self.pan_dragging || self.kind == ViewPortEventKind::Resized
    }
}
