//! Prelude module for common scalemap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use scalemap::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    config::{MapConfig, RenderProfile, RendererConfig, ViewPortConfig},
    events::{ViewPortEvent, ViewPortEventKind},
    geo::{Point, TileCode},
    map::MapView,
    resolution::{SnapContext, Snapped, ZoomOption},
    transform::{Matrix, Transform},
    viewport::{ViewPort, ViewState},
};

pub use crate::layers::{
    layer::{Layer, LayerId, LayerKind, LayerOptions, RenderCapability},
    manager::{LayerEntry, LayerStack},
    scale_cache::{ScaleCache, ScaleKey},
    scale_renderer::{RenderState, RenderStatus, RendererId, TiledScaleRenderer},
};

pub use crate::animation::{
    easing::EasingType,
    navigation::{AnimationFrame, AnimationState, NavigationAnimationController, Participant, Tween},
};

pub use crate::rendering::{
    context::{RenderContext, RenderServices},
    renderer::{MapRenderer, NavigationTarget, RendererEvent},
    surface::{
        MemorySurface, MemorySurfaceFactory, Surface, SurfaceFactory, SurfaceHandle, SurfaceId,
        SurfaceKind, SurfaceState,
    },
};

pub use crate::tiles::{
    memory::{MemoryContentLoader, MemoryTileListService},
    message::RenderMessage,
    source::{
        TileContent, TileContentLoader, TileDescriptor, TileListRequest, TileListResponse,
        TileListService,
    },
};

pub use crate::runtime::{AsyncSpawner, LocalPoolSpawner};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::TokioSpawner;

pub use crate::traits::Lerp;

pub use crate::{Error as MapError, Result};

pub use std::{
    cell::RefCell,
    rc::Rc,
    sync::Arc,
    time::Duration,
};

pub use instant::Instant;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

pub use futures::future::BoxFuture;
