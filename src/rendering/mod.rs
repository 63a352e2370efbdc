pub mod context;
pub mod renderer;
pub mod surface;

// Re-export main types
pub use context::{RenderContext, RenderServices};
pub use renderer::{MapRenderer, NavigationTarget, RendererEvent};
pub use surface::{MemorySurface, MemorySurfaceFactory, Surface, SurfaceFactory, SurfaceHandle};
