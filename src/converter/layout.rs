//! Planned on-disk layout of a pyramid.
//!
//! ```text
//! SVS (flat)                       OME-TIFF (sub-directories)
//! ┌──────────────┐                 ┌──────────────┐
//! │ page: zoom 0 │                 │ page: zoom 0 │──┬── sub: zoom 1
//! ├──────────────┤                 ├──────────────┤  └── sub: zoom 2
//! │ page: zoom 1 │                 │ page: zoom 0 │──┬── sub: zoom 1
//! ├──────────────┤                 │  (next chunk)│  └── sub: zoom 2
//! │ page: zoom 2 │                 └──────────────┘
//! └──────────────┘
//! ```

use std::ops::Range;

use serde::Serialize;

use crate::error::ConvertError;
use crate::format::ChannelInfo;
use crate::geometry::Rect;

/// One physical directory: a channel chunk of one slice and frame at one
/// zoom level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PyramidDirectory {
    pub channel_range: Range<usize>,
    pub slice_range: Range<usize>,
    pub frame_range: Range<usize>,
    /// Single-element range naming the pyramid level.
    pub zoom_level_range: Range<i32>,
    pub plane_count: usize,
    /// Set on the first directory only, when the file is written.
    pub description: String,
}

impl PyramidDirectory {
    pub(crate) fn new(channels: Range<usize>, slice: usize, frame: usize) -> Self {
        Self {
            channel_range: channels,
            slice_range: slice..slice + 1,
            frame_range: frame..frame + 1,
            zoom_level_range: 0..1,
            plane_count: 1,
            description: String::new(),
        }
    }

    /// Same planes at another zoom level.
    pub(crate) fn at_zoom_level(&self, zoom_level: i32) -> Self {
        Self {
            zoom_level_range: zoom_level..zoom_level + 1,
            description: String::new(),
            ..self.clone()
        }
    }

    /// The directory's zoom level.
    pub fn zoom_level(&self) -> Result<i32, ConvertError> {
        if self.zoom_level_range.len() != 1 {
            return Err(ConvertError::invalid_state(format!(
                "directory must cover exactly one zoom level, got {}..{}",
                self.zoom_level_range.start, self.zoom_level_range.end
            )));
        }
        Ok(self.zoom_level_range.start)
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channel_range.len()
    }
}

/// A top-level directory and, for OME-TIFF, its reduced levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PyramidPage {
    pub directory: PyramidDirectory,
    pub sub_directories: Vec<PyramidDirectory>,
}

impl PyramidPage {
    pub(crate) fn new(directory: PyramidDirectory) -> Self {
        Self {
            directory,
            sub_directories: Vec::new(),
        }
    }

    #[inline]
    pub fn num_sub_directories(&self) -> usize {
        self.sub_directories.len()
    }

    pub fn sub_directory(&self, index: usize) -> Result<&PyramidDirectory, ConvertError> {
        self.sub_directories.get(index).ok_or_else(|| {
            ConvertError::invalid_state(format!(
                "sub-directory index {} out of range: page has {}",
                index,
                self.sub_directories.len()
            ))
        })
    }
}

/// Complete plan of one output file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PyramidStructure {
    pub pages: Vec<PyramidPage>,
    /// Crop rectangle relative to the scene origin.
    pub crop_rect: Rect,
    /// Tiles over all directories; the progress denominator.
    pub total_tiles: usize,
    /// Present only when some selected channel is named.
    pub channels: Vec<ChannelInfo>,
}

impl PyramidStructure {
    #[inline]
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Result<&PyramidPage, ConvertError> {
        self.pages.get(index).ok_or_else(|| {
            ConvertError::invalid_state(format!(
                "page index {} out of range: structure has {} page(s)",
                index,
                self.pages.len()
            ))
        })
    }

    /// Number of physical directories, sub-directories included.
    pub fn num_directories(&self) -> usize {
        self.pages.iter().map(|p| 1 + p.num_sub_directories()).sum()
    }

    /// Directories in file order: each page followed by its sub-directories.
    pub fn directories(&self) -> impl Iterator<Item = &PyramidDirectory> {
        self.pages
            .iter()
            .flat_map(|p| std::iter::once(&p.directory).chain(p.sub_directories.iter()))
    }
}
