//! # Slide Converter
//!
//! Converts a multi-dimensional microscopy scene into a tiled,
//! multi-resolution TIFF.
//!
//! Two layouts are produced:
//!
//! - **SVS**: every zoom level is a top-level directory; a single plane of
//!   1 or 3 channels.
//! - **OME-TIFF**: level 0 of each channel chunk, slice and frame is a
//!   top-level directory, the reduced levels are its sub-directories; the
//!   first directory carries OME-XML.
//!
//! ## Architecture
//!
//! - [`scene`] - Source scene contract, in-memory and image-file scenes
//! - [`params`] - Conversion parameters and their defaults
//! - [`geometry`] - Rectangles and zoom level arithmetic
//! - [`tile`] - Tile reading and encoding
//! - [`mod@format`] - TIFF/BigTIFF writer, SVS and OME-XML descriptions
//! - [`converter`] - Layout planning and pyramid writing
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use slide_converter::{
//!     convert_scene, ConversionParameters, DataType, EncodeParams, ImageFormat, MemoryScene,
//! };
//!
//! let scene = Arc::new(MemoryScene::new("slide", 4096, 4096, 3, DataType::U8));
//! let params = ConversionParameters::new(ImageFormat::Svs, EncodeParams::jpeg(90))
//!     .with_tile_size(256, 256);
//! let mut progress = |percent: u32| println!("{}%", percent);
//! convert_scene(scene, &params, Path::new("slide.svs"), Some(&mut progress)).unwrap();
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod format;
pub mod geometry;
pub mod params;
pub mod scene;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, CompressionMethod, FormatArg, OutputFormat};
pub use converter::{
    convert_scene, create_tiff_or_remove, ConversionState, ProgressSink, PyramidDirectory,
    PyramidPage, PyramidStructure, TiffConverter,
};
pub use error::{CodecError, ConvertError, ErrorKind, SceneError, TiffError};
pub use format::tiff::{ByteOrder, Compression, FieldType, TiffHeader, TiffTag};
pub use format::{
    ChannelInfo, ContainerWriter, OmeDescription, SvsDescription, SvsMetadata, TiffDirectory,
    TiffFileWriter,
};
pub use geometry::{
    compute_num_tiles, compute_num_zoom_levels, compute_zoom_level_rect, scale_rect, scale_size,
    Rect, Size,
};
pub use params::{
    ContainerParams, ConversionParameters, EncodeParams, ImageFormat, Jpeg2000Codec,
    DEFAULT_JPEG_QUALITY, TILE_ALIGNMENT,
};
pub use scene::{open_scene, DataType, MemoryScene, Raster, Resolution, Scene};
pub use tile::{read_tile, JpegTileEncoder, TileCodec, TileEncoder};
