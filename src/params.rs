//! Conversion parameters.
//!
//! A [`ConversionParameters`] value names the target layout, the codec, the
//! container tiling and the selected sub-region of the source. Anything left
//! unset is filled from the scene by
//! [`ConversionParameters::update_not_defined_parameters`].
//!
//! # Defaults
//!
//! | Setting | Unset value | Filled with |
//! |---|---|---|
//! | crop rectangle | invalid rect | full scene rectangle |
//! | channel range | empty | all scene channels |
//! | slice / frame range | empty | `0..1` (SVS) or all scene planes (OME-TIFF) |
//! | zoom levels | `<= 0` | [`compute_num_zoom_levels`] of the crop size |

use std::ops::Range;

use serde::Serialize;

use crate::error::ConvertError;
use crate::geometry::{compute_num_zoom_levels, Rect, Size};
use crate::scene::Scene;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Default JPEG 2000 compression rate.
pub const DEFAULT_JPEG2000_RATE: f32 = 4.5;

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: i32 = 256;

/// Tiled TIFF requires tile edges to be multiples of this.
pub const TILE_ALIGNMENT: i32 = 16;

/// Zoom level count meaning "compute from the image size".
pub const AUTO_ZOOM_LEVELS: i32 = -1;

// =============================================================================
// Target Format
// =============================================================================

/// Pyramid layout of the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    /// Every zoom level is a top-level directory; one plane only.
    Svs,
    /// Level 0 is a top-level directory, smaller levels are its sub-directories.
    OmeTiff,
}

impl ImageFormat {
    pub const fn name(self) -> &'static str {
        match self {
            ImageFormat::Svs => "SVS",
            ImageFormat::OmeTiff => "OMETIFF",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Codec Parameters
// =============================================================================

/// Container flavour of a JPEG 2000 stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Jpeg2000Codec {
    /// Raw codestream (J2K)
    #[default]
    J2kStream,
    /// JP2 file wrapper
    J2kFile,
}

/// Codec settings for encoded tiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum EncodeParams {
    Jpeg {
        quality: u8,
    },
    Jpeg2000 {
        rate: f32,
        subsampling_x: u8,
        subsampling_y: u8,
        codec: Jpeg2000Codec,
    },
}

impl EncodeParams {
    pub const fn jpeg(quality: u8) -> Self {
        EncodeParams::Jpeg { quality }
    }

    pub const fn jpeg2000(rate: f32) -> Self {
        EncodeParams::Jpeg2000 {
            rate,
            subsampling_x: 1,
            subsampling_y: 1,
            codec: Jpeg2000Codec::J2kStream,
        }
    }

    pub const fn is_jpeg(&self) -> bool {
        matches!(self, EncodeParams::Jpeg { .. })
    }

    /// Human-readable codec name.
    pub const fn name(&self) -> &'static str {
        match self {
            EncodeParams::Jpeg { .. } => "JPEG",
            EncodeParams::Jpeg2000 { .. } => "JPEG 2000",
        }
    }

    fn validate(&self) -> Result<(), ConvertError> {
        match *self {
            EncodeParams::Jpeg { quality } if quality > 100 => Err(
                ConvertError::invalid_argument(format!("JPEG quality must be 0..=100, got {}", quality)),
            ),
            EncodeParams::Jpeg2000 { rate, .. } if !(rate > 0.0) => Err(
                ConvertError::invalid_argument(format!("JPEG 2000 rate must be positive, got {}", rate)),
            ),
            EncodeParams::Jpeg2000 {
                subsampling_x,
                subsampling_y,
                ..
            } if subsampling_x == 0 || subsampling_y == 0 => Err(ConvertError::invalid_argument(
                "JPEG 2000 subsampling factors must be positive",
            )),
            _ => Ok(()),
        }
    }
}

impl Default for EncodeParams {
    fn default() -> Self {
        EncodeParams::jpeg(DEFAULT_JPEG_QUALITY)
    }
}

// =============================================================================
// Container Parameters
// =============================================================================

/// Container settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContainerParams {
    Tiff {
        tile_width: i32,
        tile_height: i32,
        /// Number of pyramid levels, or a non-positive value for "auto".
        num_zoom_levels: i32,
    },
}

impl Default for ContainerParams {
    fn default() -> Self {
        ContainerParams::Tiff {
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            num_zoom_levels: AUTO_ZOOM_LEVELS,
        }
    }
}

impl ContainerParams {
    pub fn tile_size(&self) -> Size {
        match *self {
            ContainerParams::Tiff {
                tile_width,
                tile_height,
                ..
            } => Size::new(tile_width, tile_height),
        }
    }

    pub fn num_zoom_levels(&self) -> i32 {
        match *self {
            ContainerParams::Tiff {
                num_zoom_levels, ..
            } => num_zoom_levels,
        }
    }
}

// =============================================================================
// ConversionParameters
// =============================================================================

/// Everything that drives one conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionParameters {
    pub format: ImageFormat,
    pub container: ContainerParams,
    pub encoding: EncodeParams,
    /// Crop rectangle relative to the scene origin; invalid means "whole scene".
    pub rect: Rect,
    pub channel_range: Range<usize>,
    pub slice_range: Range<usize>,
    pub frame_range: Range<usize>,
}

impl ConversionParameters {
    /// Parameters with default tiling and every selection left unset.
    pub fn new(format: ImageFormat, encoding: EncodeParams) -> Self {
        Self {
            format,
            container: ContainerParams::default(),
            encoding,
            rect: Rect::default(),
            channel_range: 0..0,
            slice_range: 0..0,
            frame_range: 0..0,
        }
    }

    pub fn with_tile_size(mut self, width: i32, height: i32) -> Self {
        let ContainerParams::Tiff {
            tile_width,
            tile_height,
            ..
        } = &mut self.container;
        *tile_width = width;
        *tile_height = height;
        self
    }

    pub fn with_zoom_levels(mut self, levels: i32) -> Self {
        self.set_num_zoom_levels(levels);
        self
    }

    fn set_num_zoom_levels(&mut self, levels: i32) {
        let ContainerParams::Tiff {
            num_zoom_levels, ..
        } = &mut self.container;
        *num_zoom_levels = levels;
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn with_channel_range(mut self, range: Range<usize>) -> Self {
        self.channel_range = range;
        self
    }

    pub fn with_slice_range(mut self, range: Range<usize>) -> Self {
        self.slice_range = range;
        self
    }

    pub fn with_frame_range(mut self, range: Range<usize>) -> Self {
        self.frame_range = range;
        self
    }

    #[inline]
    pub fn tile_size(&self) -> Size {
        self.container.tile_size()
    }

    #[inline]
    pub fn num_zoom_levels(&self) -> i32 {
        self.container.num_zoom_levels()
    }

    /// Check settings that do not depend on the scene.
    pub fn validate(&self) -> Result<(), ConvertError> {
        let tile = self.tile_size();
        if tile.is_empty() {
            return Err(ConvertError::invalid_argument(format!(
                "tile size must be positive, got {}x{}",
                tile.width, tile.height
            )));
        }
        if tile.width % TILE_ALIGNMENT != 0 || tile.height % TILE_ALIGNMENT != 0 {
            return Err(ConvertError::invalid_argument(format!(
                "tile size must be a multiple of {}, got {}x{}",
                TILE_ALIGNMENT, tile.width, tile.height
            )));
        }
        self.encoding.validate()
    }

    /// Fill every unset selection from `scene`.
    ///
    /// Applying this twice is the same as applying it once. For SVS an unset
    /// slice or frame range becomes `0..1`; an explicit multi-plane range is
    /// kept and rejected later by the layout planner.
    pub fn update_not_defined_parameters(&mut self, scene: &dyn Scene) {
        if !self.rect.is_valid() {
            self.rect = Rect::from_size(scene.rect().size());
        }
        if self.channel_range.is_empty() {
            self.channel_range = 0..scene.num_channels();
        }
        if self.slice_range.is_empty() {
            self.slice_range = match self.format {
                ImageFormat::Svs => 0..1,
                ImageFormat::OmeTiff => 0..scene.num_z_slices(),
            };
        }
        if self.frame_range.is_empty() {
            self.frame_range = match self.format {
                ImageFormat::Svs => 0..1,
                ImageFormat::OmeTiff => 0..scene.num_t_frames(),
            };
        }
        if self.num_zoom_levels() < 1 {
            let levels = compute_num_zoom_levels(self.rect.width, self.rect.height);
            self.set_num_zoom_levels(levels);
        }
    }
}
