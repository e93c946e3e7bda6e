//! Owned pixel buffers exchanged between scenes, the tile reader and codecs.
//!
//! A raster stores one or more planes of `width x height` pixels. Samples of
//! one pixel are interleaved (chunky), multi-byte samples are little-endian,
//! and planes follow each other with the slice index varying fastest.

use super::DataType;
use crate::error::CodecError;

/// Interleaved, possibly multi-plane pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    channels: usize,
    planes: usize,
    data_type: DataType,
    data: Vec<u8>,
}

impl Raster {
    /// Zero-filled single-plane raster.
    pub fn zeroed(width: u32, height: u32, channels: usize, data_type: DataType) -> Self {
        Self::zeroed_planes(width, height, channels, 1, data_type)
    }

    /// Zero-filled raster with `planes` planes.
    pub fn zeroed_planes(
        width: u32,
        height: u32,
        channels: usize,
        planes: usize,
        data_type: DataType,
    ) -> Self {
        let len = width as usize * height as usize * channels * planes * data_type.size_in_bytes();
        Self {
            width,
            height,
            channels,
            planes,
            data_type,
            data: vec![0; len],
        }
    }

    /// Wrap an existing single-plane buffer, checking its length.
    pub fn from_vec(
        width: u32,
        height: u32,
        channels: usize,
        data_type: DataType,
        data: Vec<u8>,
    ) -> Result<Self, CodecError> {
        let expected = width as usize * height as usize * channels * data_type.size_in_bytes();
        if data.len() != expected {
            return Err(CodecError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            planes: 1,
            data_type,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn planes(&self) -> usize {
        self.planes
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Bytes per pixel (all channels of one pixel).
    #[inline]
    pub fn pixel_bytes(&self) -> usize {
        self.channels * self.data_type.size_in_bytes()
    }

    /// Bytes per row of one plane.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.pixel_bytes()
    }

    /// Bytes per plane.
    #[inline]
    pub fn plane_bytes(&self) -> usize {
        self.row_bytes() * self.height as usize
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes of plane `index`.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        let len = self.plane_bytes();
        self.data.get(index * len..(index + 1) * len)
    }

    /// Copy `src` into this raster with its top-left corner at `(x, y)`.
    ///
    /// Pixels that would land outside this raster are dropped. Both rasters
    /// must share channel count, data type and plane count; otherwise
    /// nothing is copied and `false` is returned.
    pub fn blit(&mut self, src: &Raster, x: u32, y: u32) -> bool {
        if src.channels != self.channels
            || src.data_type != self.data_type
            || src.planes != self.planes
        {
            return false;
        }
        if x >= self.width || y >= self.height {
            return true;
        }
        let cols = src.width.min(self.width - x) as usize;
        let rows = src.height.min(self.height - y) as usize;
        let pixel = self.pixel_bytes();
        let copy_len = cols * pixel;
        let (dst_plane, src_plane) = (self.plane_bytes(), src.plane_bytes());
        let (dst_row, src_row) = (self.row_bytes(), src.row_bytes());

        for plane in 0..self.planes {
            for row in 0..rows {
                let src_start = plane * src_plane + row * src_row;
                let dst_start = plane * dst_plane + (y as usize + row) * dst_row + x as usize * pixel;
                self.data[dst_start..dst_start + copy_len]
                    .copy_from_slice(&src.data[src_start..src_start + copy_len]);
            }
        }
        true
    }
}
