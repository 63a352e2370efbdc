//! Defaults and limits for the viewport, the scale caches, the tile services
//! and the navigation animation.

/// Resident scales kept per layer unless configured otherwise.
pub const DEFAULT_SCALE_CACHE_CAPACITY: usize = 3;

/// A layer must be able to hold the previous and the current scale at once.
pub const MIN_SCALE_CACHE_CAPACITY: usize = 2;

/// Two scales closer than this are the same scale.
pub const SCALE_EPSILON: f64 = 1e-7;

/// Requested bounds are grown by this factor before asking for a tile list,
/// so that small pans are served from tiles already fetched.
pub const DEFAULT_FETCH_BOUNDS_FACTOR: f64 = 2.0;

/// Default navigation animation length.
pub const DEFAULT_ANIMATION_MILLIS: u64 = 250;

/// Upper scale bound when none is configured (pixels per world unit).
pub const DEFAULT_MAXIMUM_SCALE: f64 = 1.0e6;

/// Reference system sent with tile-list requests when none is configured.
pub const DEFAULT_CRS: &str = "EPSG:3857";

/// Factor applied by `zoom_in`/`zoom_out` before snapping.
pub const ZOOM_STEP_FACTOR: f64 = 2.0;

/// Timeout for HTTP tile services.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
