pub mod layer;
pub mod manager;
pub mod scale_cache;
pub mod scale_renderer;

// Re-exports for convenience
pub use layer::{Layer, LayerId, LayerKind, LayerOptions, RenderCapability};
pub use manager::{LayerEntry, LayerStack};
pub use scale_cache::{ScaleCache, ScaleKey};
pub use scale_renderer::{RenderState, RenderStatus, RendererId, TiledScaleRenderer};
