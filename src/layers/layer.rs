use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

/// What a layer draws; fixed when the layer is added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    Raster { opacity: f64 },
    Vector,
}

impl LayerKind {
    pub fn raster() -> Self {
        Self::Raster { opacity: 1.0 }
    }

    pub fn capability(&self) -> RenderCapability {
        match self {
            LayerKind::Raster { .. } => RenderCapability::RendersRaster,
            LayerKind::Vector => RenderCapability::RendersVector,
        }
    }
}

/// How style changes reach the screen.
///
/// Raster layers restyle through container opacity without touching tiles;
/// vector layers have to re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderCapability {
    RendersRaster,
    RendersVector,
}

impl RenderCapability {
    pub fn restyles_in_place(self) -> bool {
        matches!(self, RenderCapability::RendersRaster)
    }
}

/// Options for adding a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerOptions {
    pub name: String,
    pub kind: LayerKind,
    pub visible: bool,
}

impl LayerOptions {
    pub fn raster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::raster(),
            visible: true,
        }
    }

    pub fn vector(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Vector,
            visible: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// A layer as tracked by the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub visible: bool,
    capability: RenderCapability,
}

impl Layer {
    pub fn new(id: LayerId, options: LayerOptions) -> Self {
        let capability = options.kind.capability();
        Self {
            id,
            name: options.name,
            kind: options.kind,
            visible: options.visible,
            capability,
        }
    }

    pub fn capability(&self) -> RenderCapability {
        self.capability
    }

    pub fn opacity(&self) -> f64 {
        match self.kind {
            LayerKind::Raster { opacity } => opacity,
            LayerKind::Vector => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_follows_kind() {
        let raster = Layer::new(LayerId(1), LayerOptions::raster("base"));
        let vector = Layer::new(LayerId(2), LayerOptions::vector("roads").hidden());

        assert_eq!(raster.capability(), RenderCapability::RendersRaster);
        assert!(raster.capability().restyles_in_place());
        assert_eq!(vector.capability(), RenderCapability::RendersVector);
        assert!(!vector.visible);
        assert_eq!(vector.opacity(), 1.0);
        assert_eq!(LayerId(7).to_string(), "layer-7");
    }

    #[test]
    fn test_layer_kind_json() {
        let kind: LayerKind = serde_json::from_str(r#"{"type":"raster","opacity":0.5}"#).unwrap();
        assert_eq!(kind, LayerKind::Raster { opacity: 0.5 });
        let kind: LayerKind = serde_json::from_str(r#"{"type":"vector"}"#).unwrap();
        assert_eq!(kind, LayerKind::Vector);
    }
}
