pub mod http;
pub mod memory;
pub mod message;
pub mod source;

// Re-exports for convenience
pub use http::{HttpContentLoader, HttpTileListService};
pub use memory::{MemoryContentLoader, MemoryTileListService};
pub use message::{RenderMessage, RendererAddress};
pub use source::{TileContentLoader, TileListService};
