//! Tile layer.
//!
//! Tiles are the unit of work of the pyramid writer: each one is read from
//! the scene at a zoom level and encoded before it is handed to the
//! container.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              TiffConverter              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │  read_tile          TileEncoder         │
//! │  (scene block  →    (raster → JPEG)     │
//! │   zero-padded                           │
//! │   raster)                               │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            ContainerWriter              │
//! └─────────────────────────────────────────┘
//! ```

mod encoder;
mod reader;

pub use encoder::{
    clamp_quality, JpegTileEncoder, TileCodec, TileEncoder, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use reader::read_tile;
