//! Tile encoders.
//!
//! Tiles read from the scene arrive as interleaved [`Raster`]s and leave as
//! compressed streams ready to be appended to the container. Encoders write
//! into a caller-owned scratch buffer so one allocation serves a whole
//! directory.
//!
//! # Design Decisions
//!
//! - **Baseline JPEG only**: tiles are 8-bit gray or 8-bit RGB. Anything else
//!   is rejected before it reaches the codec.
//!
//! - **One stream per tile**: every tile carries its own tables, so readers
//!   can decode tiles independently.
//!
//! - **JPEG 2000**: no encoder is linked in; the request fails with
//!   [`CodecError::Unavailable`].

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::error::CodecError;
use crate::params::EncodeParams;
use crate::scene::{DataType, Raster};

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// TileEncoder Trait
// =============================================================================

/// Compresses one tile according to the directory's codec settings.
pub trait TileEncoder: Send {
    /// Replace the contents of `out` with the encoded tile.
    fn encode(&self, tile: &Raster, params: &EncodeParams, out: &mut Vec<u8>) -> Result<(), CodecError>;
}

// =============================================================================
// JPEG Encoder
// =============================================================================

/// Baseline JPEG encoder for 8-bit gray and RGB tiles.
#[derive(Debug, Clone, Default)]
pub struct JpegTileEncoder {}

impl JpegTileEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Encode `tile` at `quality` (clamped to 1-100) into `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The tile is not 8-bit
    /// - The tile has other than 1 or 3 channels, or more than one plane
    /// - Encoding fails
    pub fn encode_raster(&self, tile: &Raster, quality: u8, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let color = jpeg_color_type(tile)?;
        let expected = tile.plane_bytes();
        if tile.data().len() != expected {
            return Err(CodecError::BufferSize {
                expected,
                actual: tile.data().len(),
            });
        }

        out.clear();
        let mut encoder = JpegEncoder::new_with_quality(&mut *out, clamp_quality(quality));
        encoder
            .encode(tile.data(), tile.width(), tile.height(), color)
            .map_err(|e| CodecError::EncodeError {
                message: e.to_string(),
            })
    }
}

fn jpeg_color_type(tile: &Raster) -> Result<ExtendedColorType, CodecError> {
    let unsupported = |reason: String| CodecError::UnsupportedRaster {
        codec: "JPEG",
        reason,
    };
    if tile.data_type() != DataType::U8 {
        return Err(unsupported(format!("{} samples, need uint8", tile.data_type())));
    }
    if tile.planes() != 1 {
        return Err(unsupported(format!("{} planes, need 1", tile.planes())));
    }
    match tile.channels() {
        1 => Ok(ExtendedColorType::L8),
        3 => Ok(ExtendedColorType::Rgb8),
        n => Err(unsupported(format!("{} channels, need 1 or 3", n))),
    }
}

// =============================================================================
// Codec Dispatch
// =============================================================================

/// Encoder used by the TIFF writer: picks the codec from [`EncodeParams`].
#[derive(Debug, Clone, Default)]
pub struct TileCodec {
    jpeg: JpegTileEncoder,
}

impl TileCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TileEncoder for TileCodec {
    fn encode(&self, tile: &Raster, params: &EncodeParams, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match *params {
            EncodeParams::Jpeg { quality } => self.jpeg.encode_raster(tile, quality, out),
            EncodeParams::Jpeg2000 { .. } => Err(CodecError::Unavailable("JPEG 2000")),
        }
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Clamp quality to valid range.
///
/// Values below 1 become 1, values above 100 become 100.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
