//! Configuration for the viewport and the renderer
//!
//! Configurations are plain serde structs with defaults for every field, so a
//! JSON document only needs to name what it changes. Out-of-range values are
//! clamped by [`MapConfig::validated`] instead of being rejected; only
//! malformed JSON is an error. [`RenderProfile`] offers renderer presets.

use crate::animation::easing::EasingType;
use crate::core::bounds::Bounds;
use crate::core::constants::{
    DEFAULT_ANIMATION_MILLIS, DEFAULT_CRS, DEFAULT_FETCH_BOUNDS_FACTOR, DEFAULT_MAXIMUM_SCALE,
    DEFAULT_SCALE_CACHE_CAPACITY, MIN_SCALE_CACHE_CAPACITY,
};
use crate::core::geo::Point;
use crate::core::resolution::ZoomOption;
use crate::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewPortConfig {
    /// Pixel size of the host canvas
    pub width: f64,
    pub height: f64,
    /// Initial world-space center
    pub center: Point,
    /// Initial scale, uninitialized when absent
    pub scale: Option<f64>,
    pub maximum_scale: f64,
    pub minimum_scale: Option<f64>,
    pub max_bounds: Option<Bounds>,
    /// Resolutions (world units per pixel); sorted descending on validation
    pub resolutions: Vec<f64>,
    /// Snapping used by `zoom_in`/`zoom_out` when resolutions exist
    pub zoom_option: ZoomOption,
}

impl Default for ViewPortConfig {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            center: Point::zero(),
            scale: None,
            maximum_scale: DEFAULT_MAXIMUM_SCALE,
            minimum_scale: None,
            max_bounds: None,
            resolutions: Vec::new(),
            zoom_option: ZoomOption::LevelChange,
        }
    }
}

impl ViewPortConfig {
    pub fn validated(mut self) -> Self {
        self.width = non_negative(self.width);
        self.height = non_negative(self.height);
        if !self.center.is_finite() {
            self.center = Point::zero();
        }
        if !(self.maximum_scale.is_finite() && self.maximum_scale > 0.0) {
            self.maximum_scale = DEFAULT_MAXIMUM_SCALE;
        }
        self.minimum_scale = self
            .minimum_scale
            .filter(|min| min.is_finite() && *min > 0.0 && *min <= self.maximum_scale);
        self.scale = self.scale.filter(|s| s.is_finite() && *s > 0.0);
        self.max_bounds = self.max_bounds.filter(|b| b.is_valid() && !b.is_empty());
        self.resolutions = normalize_resolutions(self.resolutions);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Resident scales per layer
    pub scale_cache_capacity: usize,
    /// Growth applied to requested bounds before fetching a tile list
    pub fetch_bounds_factor: f64,
    /// Navigation animation length for ordinary viewport changes
    pub animation_millis: u64,
    pub easing: EasingType,
    /// Reference system sent with tile-list requests
    pub crs: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RenderProfile::Balanced.resolve()
    }
}

impl RendererConfig {
    pub fn validated(mut self) -> Self {
        self.scale_cache_capacity = self.scale_cache_capacity.max(MIN_SCALE_CACHE_CAPACITY);
        if !(self.fetch_bounds_factor.is_finite() && self.fetch_bounds_factor >= 1.0) {
            self.fetch_bounds_factor = DEFAULT_FETCH_BOUNDS_FACTOR;
        }
        if self.crs.trim().is_empty() {
            self.crs = DEFAULT_CRS.to_string();
        }
        self
    }
}

/// Renderer presets
#[derive(Debug, Clone, PartialEq)]
pub enum RenderProfile {
    Balanced,
    /// Fewer resident scales, no over-fetching
    LowMemory,
    /// More resident scales and shorter animations
    Responsive,
    Custom(RendererConfig),
}

impl RenderProfile {
    pub fn resolve(&self) -> RendererConfig {
        match self {
            Self::Balanced => RendererConfig {
                scale_cache_capacity: DEFAULT_SCALE_CACHE_CAPACITY,
                fetch_bounds_factor: DEFAULT_FETCH_BOUNDS_FACTOR,
                animation_millis: DEFAULT_ANIMATION_MILLIS,
                easing: EasingType::EaseOut,
                crs: DEFAULT_CRS.to_string(),
            },
            Self::LowMemory => RendererConfig {
                scale_cache_capacity: MIN_SCALE_CACHE_CAPACITY,
                fetch_bounds_factor: 1.0,
                animation_millis: DEFAULT_ANIMATION_MILLIS,
                easing: EasingType::Linear,
                crs: DEFAULT_CRS.to_string(),
            },
            Self::Responsive => RendererConfig {
                scale_cache_capacity: 5,
                fetch_bounds_factor: 3.0,
                animation_millis: 150,
                easing: EasingType::EaseOut,
                crs: DEFAULT_CRS.to_string(),
            },
            Self::Custom(config) => config.clone().validated(),
        }
    }
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub viewport: ViewPortConfig,
    pub renderer: RendererConfig,
}

impl MapConfig {
    pub fn new(viewport: ViewPortConfig, renderer: RendererConfig) -> Self {
        Self { viewport, renderer }.validated()
    }

    /// Parses a JSON document and clamps whatever is out of range
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_profile(mut self, profile: RenderProfile) -> Self {
        self.renderer = profile.resolve();
        self
    }

    pub fn validated(self) -> Self {
        Self {
            viewport: self.viewport.validated(),
            renderer: self.renderer.validated(),
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Positive finite resolutions, sorted descending, duplicates removed
pub fn normalize_resolutions(mut resolutions: Vec<f64>) -> Vec<f64> {
    resolutions.retain(|r| r.is_finite() && *r > 0.0);
    resolutions.sort_by(|a, b| b.total_cmp(a));
    resolutions.dedup();
    resolutions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_profile_presets() {
        let balanced = RenderProfile::Balanced.resolve();
        let low_memory = RenderProfile::LowMemory.resolve();
        let responsive = RenderProfile::Responsive.resolve();

        assert_eq!(balanced.scale_cache_capacity, 3);
        assert_eq!(balanced.fetch_bounds_factor, 2.0);
        assert_eq!(balanced.crs, DEFAULT_CRS);

        assert_eq!(low_memory.scale_cache_capacity, MIN_SCALE_CACHE_CAPACITY);
        assert!(responsive.scale_cache_capacity > balanced.scale_cache_capacity);
        assert!(responsive.animation_millis < balanced.animation_millis);
    }

    #[test]
    fn test_custom_profile_is_clamped() {
        let custom = RenderProfile::Custom(RendererConfig {
            scale_cache_capacity: 0,
            fetch_bounds_factor: 0.5,
            animation_millis: 10,
            easing: EasingType::Linear,
            crs: String::new(),
        })
        .resolve();

        assert_eq!(custom.scale_cache_capacity, MIN_SCALE_CACHE_CAPACITY);
        assert_eq!(custom.fetch_bounds_factor, DEFAULT_FETCH_BOUNDS_FACTOR);
        assert_eq!(custom.crs, DEFAULT_CRS);
        assert_eq!(custom.animation_millis, 10);
    }

    #[test]
    fn test_from_json_partial_document() {
        let config = MapConfig::from_json(
            r#"{
                "viewport": {
                    "width": 800,
                    "height": 600,
                    "resolutions": [1, 8, 2, 4, 4, -3],
                    "minimum_scale": -1
                },
                "renderer": { "scale_cache_capacity": 1, "easing": "linear" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.viewport.width, 800.0);
        assert_eq!(config.viewport.resolutions, vec![8.0, 4.0, 2.0, 1.0]);
        assert_eq!(config.viewport.minimum_scale, None);
        assert_eq!(config.renderer.scale_cache_capacity, MIN_SCALE_CACHE_CAPACITY);
        assert_eq!(config.renderer.easing, EasingType::Linear);
        assert_eq!(config.renderer.animation_millis, DEFAULT_ANIMATION_MILLIS);
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(matches!(
            MapConfig::from_json("{ not json"),
            Err(crate::MapError::Serialization(_))
        ));
    }

    #[test]
    fn test_json_round_trip_keeps_values() {
        let config = MapConfig::default().with_profile(RenderProfile::Responsive);
        let json = config.to_json().unwrap();
        assert_eq!(MapConfig::from_json(&json).unwrap(), config.validated());
    }
}
