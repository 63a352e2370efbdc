use crate::core::geo::TileCode;
use crate::layers::layer::LayerId;
use crate::layers::scale_cache::ScaleKey;
use crate::layers::scale_renderer::RendererId;
use crate::tiles::source::TileListResponse;
use crate::Result;

/// Identifies the renderer a completion belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendererAddress {
    pub layer: LayerId,
    pub scale: ScaleKey,
    pub renderer: RendererId,
}

/// Completion of an async operation, marshalled back to the owning thread
#[derive(Debug)]
pub enum RenderMessage {
    TileList {
        address: RendererAddress,
        ticket: u64,
        result: Result<TileListResponse>,
    },
    TileLoaded {
        address: RendererAddress,
        epoch: u64,
        code: TileCode,
        result: Result<()>,
    },
}

impl RenderMessage {
    pub fn address(&self) -> RendererAddress {
        match self {
            RenderMessage::TileList { address, .. } | RenderMessage::TileLoaded { address, .. } => {
                *address
            }
        }
    }
}
