//! Source scene abstraction.
//!
//! A scene is a randomly readable image plane with three extra axes:
//! channel, Z-slice and T-frame. The converter never looks at file formats;
//! it only consumes the [`Scene`] trait.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              TiffConverter              │
//! └────────────────────┬────────────────────┘
//!                      │ read_resampled_block
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Scene Trait                │
//! └────────────────────┬────────────────────┘
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  MemoryScene    │    │  image-file driver  │
//! │  (in memory)    │    │  (PNG/JPEG/TIFF)    │
//! └─────────────────┘    └─────────────────────┘
//! ```

mod image_file;
mod memory;
mod raster;

use std::ops::Range;
use std::path::Path;

use serde::Serialize;

use crate::error::SceneError;
use crate::geometry::{Rect, Size};

pub use image_file::open_image;
pub use memory::MemoryScene;
pub use raster::Raster;

/// Driver name that picks a driver from the file itself.
pub const DRIVER_AUTO: &str = "AUTO";

/// Driver name of the raster image-file driver.
pub const DRIVER_IMAGE: &str = "IMAGE";

// =============================================================================
// Data Types
// =============================================================================

/// Sample type of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    U8,
    I8,
    U16,
    I16,
    I32,
    F32,
    F64,
}

impl DataType {
    /// Size of one sample in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::I32 | DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }

    #[inline]
    pub const fn bits_per_sample(self) -> u16 {
        (self.size_in_bytes() * 8) as u16
    }

    /// TIFF SampleFormat value (1 = unsigned, 2 = signed, 3 = IEEE float).
    pub const fn sample_format(self) -> u16 {
        match self {
            DataType::U8 | DataType::U16 => 1,
            DataType::I8 | DataType::I16 | DataType::I32 => 2,
            DataType::F32 | DataType::F64 => 3,
        }
    }

    /// Pixel type name used in OME metadata.
    pub const fn ome_name(self) -> &'static str {
        match self {
            DataType::U8 => "uint8",
            DataType::I8 => "int8",
            DataType::U16 => "uint16",
            DataType::I16 => "int16",
            DataType::I32 => "int32",
            DataType::F32 => "float",
            DataType::F64 => "double",
        }
    }

    /// Encode `value` as one little-endian sample, saturating integer types.
    pub fn write_sample(self, value: f64, out: &mut [u8]) {
        match self {
            DataType::U8 => out[0] = value.round().clamp(0.0, u8::MAX as f64) as u8,
            DataType::I8 => out[0] = (value.round().clamp(i8::MIN as f64, i8::MAX as f64) as i8) as u8,
            DataType::U16 => out[..2].copy_from_slice(
                &(value.round().clamp(0.0, u16::MAX as f64) as u16).to_le_bytes(),
            ),
            DataType::I16 => out[..2].copy_from_slice(
                &(value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16).to_le_bytes(),
            ),
            DataType::I32 => out[..4].copy_from_slice(
                &(value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32).to_le_bytes(),
            ),
            DataType::F32 => out[..4].copy_from_slice(&(value as f32).to_le_bytes()),
            DataType::F64 => out[..8].copy_from_slice(&value.to_le_bytes()),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.ome_name())
    }
}

/// Physical pixel size in metres per pixel; zero when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Resolution {
    pub x: f64,
    pub y: f64,
}

impl Resolution {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// =============================================================================
// Scene Trait
// =============================================================================

/// Read contract of a source scene.
///
/// Block rectangles passed to [`Scene::read_resampled_block`] are relative
/// to the scene origin, i.e. `(0, 0)` is the top-left pixel of
/// [`Scene::rect`] whatever its offset inside the containing slide.
pub trait Scene: Send + Sync {
    /// Scene rectangle inside its slide.
    fn rect(&self) -> Rect;

    fn num_channels(&self) -> usize;

    fn num_z_slices(&self) -> usize {
        1
    }

    fn num_t_frames(&self) -> usize {
        1
    }

    /// Sample type of `channel`. Callers only pass indices below
    /// [`Scene::num_channels`].
    fn channel_data_type(&self, channel: usize) -> DataType;

    /// Channel label, empty when the source carries none.
    fn channel_name(&self, _channel: usize) -> String {
        String::new()
    }

    fn resolution(&self) -> Resolution {
        Resolution::default()
    }

    /// Objective magnification, zero when unknown.
    fn magnification(&self) -> f64 {
        0.0
    }

    fn name(&self) -> String;

    fn file_path(&self) -> String;

    /// Read `rect` of the listed channels, resampled to `size`.
    ///
    /// The result holds `slices.len() * frames.len()` planes with the slice
    /// index varying fastest.
    fn read_resampled_block(
        &self,
        rect: Rect,
        size: Size,
        channels: &[usize],
        slices: Range<usize>,
        frames: Range<usize>,
    ) -> Result<Raster, SceneError>;
}

// =============================================================================
// Driver Selection
// =============================================================================

/// Open scene `index` of the file at `path` through the named driver.
///
/// `AUTO` and `IMAGE` both resolve to the raster image-file driver, which
/// exposes exactly one scene per file.
pub fn open_scene(path: &Path, driver: &str, index: usize) -> Result<Box<dyn Scene>, SceneError> {
    match driver.to_ascii_uppercase().as_str() {
        DRIVER_AUTO | DRIVER_IMAGE => {
            if index != 0 {
                return Err(SceneError::SceneIndexOutOfRange { index, count: 1 });
            }
            let scene = open_image(path)?;
            Ok(Box::new(scene))
        }
        _ => Err(SceneError::UnknownDriver(driver.to_string())),
    }
}
