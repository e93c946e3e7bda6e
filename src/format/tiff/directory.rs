//! Directory descriptor handed to the container writer.

use crate::error::TiffError;
use crate::params::EncodeParams;
use crate::scene::{DataType, Resolution};

use super::tags::{Compression, Photometric};

/// Everything the writer needs to emit the tags of one tiled directory.
#[derive(Debug, Clone, PartialEq)]
pub struct TiffDirectory {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Samples per pixel
    pub channels: usize,
    pub data_type: DataType,
    pub encoding: EncodeParams,
    /// ImageDescription text; not written when empty
    pub description: String,
    /// Metres per pixel; zero when unknown
    pub resolution: Resolution,
    /// Reduced-resolution level (NewSubfileType = 1)
    pub reduced: bool,
}

impl TiffDirectory {
    /// Compression code for the directory's codec and sample layout.
    pub fn compression(&self) -> Compression {
        match self.encoding {
            EncodeParams::Jpeg { .. } => Compression::Jpeg,
            EncodeParams::Jpeg2000 { .. } if self.is_rgb8() => Compression::Jpeg2000Rgb,
            EncodeParams::Jpeg2000 { .. } => Compression::Jpeg2000,
        }
    }

    pub fn photometric(&self) -> Photometric {
        match self.encoding {
            EncodeParams::Jpeg { .. } if self.channels == 3 => Photometric::YCbCr,
            EncodeParams::Jpeg2000 { .. } if self.is_rgb8() => Photometric::Rgb,
            _ => Photometric::MinIsBlack,
        }
    }

    fn is_rgb8(&self) -> bool {
        self.channels == 3 && self.data_type == DataType::U8
    }

    #[inline]
    pub fn tiles_across(&self) -> u32 {
        self.width.div_ceil(self.tile_width.max(1))
    }

    #[inline]
    pub fn tiles_down(&self) -> u32 {
        self.height.div_ceil(self.tile_height.max(1))
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles_across() as usize * self.tiles_down() as usize
    }

    /// Row-major tile index of the tile whose top-left pixel is `(x, y)`.
    pub fn tile_index(&self, x: u32, y: u32) -> Result<usize, TiffError> {
        if x >= self.width
            || y >= self.height
            || x % self.tile_width != 0
            || y % self.tile_height != 0
        {
            return Err(TiffError::TileOutOfGrid {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let column = (x / self.tile_width) as usize;
        let row = (y / self.tile_height) as usize;
        Ok(row * self.tiles_across() as usize + column)
    }

    pub fn validate(&self) -> Result<(), TiffError> {
        if self.width == 0 || self.height == 0 {
            return Err(TiffError::InvalidDirectory(format!(
                "image size {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(TiffError::InvalidDirectory(format!(
                "tile size {}x{} is empty",
                self.tile_width, self.tile_height
            )));
        }
        if self.channels == 0 || self.channels > u16::MAX as usize {
            return Err(TiffError::InvalidDirectory(format!(
                "{} samples per pixel",
                self.channels
            )));
        }
        Ok(())
    }
}
