//! # scalemap
//!
//! Viewport and scale-level tile cache engine for interactive maps.
//!
//! The crate tracks the visible region of a map (center, scale, pixel size,
//! optional fixed resolutions) and renders each layer as a small stack of
//! per-scale tile caches. Navigation between scales is animated across all
//! layers in lock-step, and the previous scale stays on screen until the new
//! one has finished loading.
//!
//! Host integration happens through narrow seams: a [`rendering::surface::Surface`]
//! tree for drawing, [`tiles::source::TileListService`] and
//! [`tiles::source::TileContentLoader`] for data, and a
//! [`runtime::AsyncSpawner`] for driving futures.

pub mod animation;
pub mod core;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod runtime;
pub mod tiles;
pub mod traits;

pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::Bounds,
    config::{MapConfig, RenderProfile},
    geo::{Point, TileCode},
    map::MapView,
    resolution::ZoomOption,
    transform::{Matrix, Transform},
    viewport::{ViewPort, ViewState},
};

pub use layers::{
    layer::{LayerId, LayerKind, LayerOptions},
    scale_cache::ScaleCache,
    scale_renderer::TiledScaleRenderer,
};

pub use animation::navigation::NavigationAnimationController;

pub use rendering::{
    context::RenderServices,
    renderer::{MapRenderer, RendererEvent},
    surface::{MemorySurfaceFactory, Surface, SurfaceFactory},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Tile service error: {0}")]
    Service(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger` as the `log` backend; later calls do nothing
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::builder().format_timestamp_millis().try_init();
}
