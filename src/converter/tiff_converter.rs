//! Layout planner and pyramid writer.
//!
//! A [`TiffConverter`] converts one scene in two steps:
//!
//! 1. [`TiffConverter::create_file_layout`] resolves the parameters against
//!    the scene, validates them and plans every directory of the output.
//! 2. [`TiffConverter::create_tiff`] (or [`TiffConverter::write_to`] for a
//!    caller-supplied container) reads, encodes and writes every tile.
//!
//! ```text
//! Unplanned ──create_file_layout──▶ Planned ──create_tiff──▶ Written
//!     ▲                               │  ▲                      │
//!     └────────── planning error ─────┘  └─ create_file_layout ─┘
//! ```

use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info};

use super::layout::{PyramidDirectory, PyramidPage, PyramidStructure};
use super::progress::{ProgressCounter, ProgressSink};
use crate::error::ConvertError;
use crate::format::{
    ChannelInfo, ContainerWriter, OmeDescription, SvsDescription, TiffDataBlock, TiffDirectory,
    TiffFileWriter,
};
use crate::geometry::{compute_num_tiles, compute_zoom_level_rect, scale_rect, scale_size, Rect, Size};
use crate::params::{ConversionParameters, EncodeParams, ImageFormat};
use crate::scene::{DataType, Resolution, Scene};
use crate::tile::read_tile;

/// Estimated raw pixel volume above which BigTIFF is written.
pub const BIGTIFF_THRESHOLD: u64 = 2 << 30;

/// Lifecycle of a [`TiffConverter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    Unplanned,
    Planned,
    Written,
}

struct Plan {
    scene: Arc<dyn Scene>,
    params: ConversionParameters,
    structure: PyramidStructure,
}

/// Converts a scene into a tiled pyramidal TIFF.
pub struct TiffConverter {
    plan: Option<Plan>,
    state: ConversionState,
}

impl fmt::Debug for TiffConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("TiffConverter");
        out.field("state", &self.state);
        if let Some(plan) = &self.plan {
            out.field("scene", &plan.scene.name())
                .field("format", &plan.params.format)
                .field("pages", &plan.structure.num_pages())
                .field("total_tiles", &plan.structure.total_tiles);
        }
        out.finish()
    }
}

impl Default for TiffConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffConverter {
    pub fn new() -> Self {
        Self {
            plan: None,
            state: ConversionState::Unplanned,
        }
    }

    #[inline]
    pub fn state(&self) -> ConversionState {
        self.state
    }

    // =========================================================================
    // Layout Planning
    // =========================================================================

    /// Plan the output file for `scene`.
    ///
    /// Unset parameters are filled from the scene first. Any previous plan is
    /// discarded; on failure the converter is left unplanned.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for malformed parameters, ranges outside the scene
    ///   or a crop rectangle outside the scene
    /// - `UnsupportedOperation` for codec or layout constraints: JPEG with
    ///   non-8-bit channels, SVS with a channel count other than 1 or 3 under
    ///   JPEG, mixed data types or more than one slice or frame
    pub fn create_file_layout(
        &mut self,
        scene: Arc<dyn Scene>,
        parameters: &ConversionParameters,
    ) -> Result<(), ConvertError> {
        self.plan = None;
        self.state = ConversionState::Unplanned;

        let mut params = parameters.clone();
        params.validate()?;
        params.update_not_defined_parameters(scene.as_ref());

        let structure = plan_layout(scene.as_ref(), &params)?;
        info!(
            "Planned {} layout for scene '{}': {} page(s), {} directories, {} tiles, {} {}",
            params.format,
            scene.name(),
            structure.num_pages(),
            structure.num_directories(),
            structure.total_tiles,
            params.encoding.name(),
            structure.crop_rect
        );

        self.plan = Some(Plan {
            scene,
            params,
            structure,
        });
        self.state = ConversionState::Planned;
        Ok(())
    }

    fn plan(&self) -> Result<&Plan, ConvertError> {
        self.plan
            .as_ref()
            .ok_or_else(|| ConvertError::invalid_state("file layout has not been created"))
    }

    /// The planned structure.
    pub fn structure(&self) -> Result<&PyramidStructure, ConvertError> {
        Ok(&self.plan()?.structure)
    }

    /// Parameters after defaults were filled in.
    pub fn parameters(&self) -> Result<&ConversionParameters, ConvertError> {
        Ok(&self.plan()?.params)
    }

    /// Number of planned pages; zero before planning.
    pub fn num_pages(&self) -> usize {
        self.plan.as_ref().map_or(0, |p| p.structure.num_pages())
    }

    pub fn page(&self, index: usize) -> Result<&PyramidPage, ConvertError> {
        self.plan()?.structure.page(index)
    }

    /// Tiles to write over the whole file; zero before planning.
    pub fn total_tiles(&self) -> usize {
        self.plan.as_ref().map_or(0, |p| p.structure.total_tiles)
    }

    /// Uncompressed size of every planned directory, in bytes.
    pub fn estimated_raw_size(&self) -> Result<u64, ConvertError> {
        let plan = self.plan()?;
        let mut total = 0u64;
        for dir in plan.structure.directories() {
            let level = scale_size(plan.structure.crop_rect.size(), dir.zoom_level()?, true)?;
            let sample_bytes: usize = dir
                .channel_range
                .clone()
                .map(|c| plan.scene.channel_data_type(c).size_in_bytes())
                .sum();
            total += level.area() as u64 * sample_bytes as u64 * dir.plane_count as u64;
        }
        Ok(total)
    }

    // =========================================================================
    // Descriptions
    // =========================================================================

    /// Metadata text of the first directory.
    ///
    /// `file_name` is the output file name referenced by OME-XML.
    pub fn image_description(&self, file_name: &str) -> Result<String, ConvertError> {
        let plan = self.plan()?;
        let scene = plan.scene.as_ref();
        let params = &plan.params;
        let crop = plan.structure.crop_rect;

        match params.format {
            ImageFormat::Svs => {
                let tile = params.tile_size();
                let path = scene.file_path();
                let description = SvsDescription {
                    width: crop.width,
                    height: crop.height,
                    tile_width: tile.width,
                    tile_height: tile.height,
                    encoding: &params.encoding,
                    resolution: scene.resolution(),
                    magnification: scene.magnification(),
                    file_path: &path,
                };
                Ok(description.render(Local::now().naive_local()))
            }
            ImageFormat::OmeTiff => {
                let name = scene.name();
                let blocks: Vec<TiffDataBlock> = plan
                    .structure
                    .pages
                    .iter()
                    .map(|page| TiffDataBlock {
                        size_c: page.directory.channel_range.len(),
                        size_z: page.directory.slice_range.len(),
                        size_t: page.directory.frame_range.len(),
                        plane_count: page.directory.plane_count,
                    })
                    .collect();
                let description = OmeDescription {
                    image_name: &name,
                    size_x: crop.width,
                    size_y: crop.height,
                    size_c: params.channel_range.len(),
                    size_z: params.slice_range.len(),
                    size_t: params.frame_range.len(),
                    data_type: scene.channel_data_type(params.channel_range.start),
                    resolution: scene.resolution(),
                    magnification: scene.magnification(),
                    channels: &plan.structure.channels,
                    blocks: &blocks,
                    file_name,
                };
                Ok(description.render())
            }
        }
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Write the planned pyramid to `path`.
    ///
    /// The file is created or truncated. A failed conversion leaves whatever
    /// was written in place; see [`super::convert_scene`] for a caller that
    /// removes it.
    pub fn create_tiff(
        &mut self,
        path: &Path,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<(), ConvertError> {
        let bigtiff = self.estimated_raw_size()? > BIGTIFF_THRESHOLD;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut writer = TiffFileWriter::create(path, bigtiff)?;
        self.write_to(&mut writer, &file_name, progress)?;
        writer.finish()?;
        info!(
            "Wrote {} ({}) with {} tiles",
            path.display(),
            if bigtiff { "BigTIFF" } else { "TIFF" },
            self.total_tiles()
        );
        Ok(())
    }

    /// Write the planned pyramid through `writer`.
    ///
    /// Directories are emitted in file order: each page, then its
    /// sub-directories. Progress is reported once per tile.
    pub fn write_to(
        &mut self,
        writer: &mut dyn ContainerWriter,
        file_name: &str,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<(), ConvertError> {
        let description = self.image_description(file_name)?;
        let plan = self
            .plan
            .as_mut()
            .ok_or_else(|| ConvertError::invalid_state("file layout has not been created"))?;
        if let Some(first) = plan.structure.pages.first_mut() {
            first.directory.description = description;
        }

        let plan = &*plan;
        let mut counter = ProgressCounter::new(plan.structure.total_tiles, progress);
        let mut scratch = Vec::new();
        for page in &plan.structure.pages {
            let sub_dirs = page.num_sub_directories();
            write_directory(plan, &page.directory, sub_dirs, writer, &mut counter, &mut scratch)?;
            for sub in &page.sub_directories {
                write_directory(plan, sub, 0, writer, &mut counter, &mut scratch)?;
            }
        }

        debug!(
            "Wrote {} of {} planned tiles",
            counter.current(),
            plan.structure.total_tiles
        );
        self.state = ConversionState::Written;
        Ok(())
    }
}

// =============================================================================
// Planning
// =============================================================================

fn plan_layout(
    scene: &dyn Scene,
    params: &ConversionParameters,
) -> Result<PyramidStructure, ConvertError> {
    check_range("channel", &params.channel_range, scene.num_channels())?;
    check_range("slice", &params.slice_range, scene.num_z_slices())?;
    check_range("frame", &params.frame_range, scene.num_t_frames())?;
    check_encoding(scene, params)?;
    if params.format == ImageFormat::Svs {
        check_flat_layout(scene, params)?;
    }

    let crop = compute_crop_rect(scene, params)?;
    let tile = params.tile_size();
    let levels = params.num_zoom_levels();
    check_levels(crop.size(), tile, levels)?;

    let chunk = channel_chunk_size(scene, params);
    let mut structure = PyramidStructure {
        crop_rect: crop,
        ..PyramidStructure::default()
    };

    let level0_tiles = compute_num_tiles(crop.size(), tile);
    let mut level_tiles = Vec::with_capacity(levels as usize);
    for zoom in 1..levels {
        let rect = compute_zoom_level_rect(crop, tile, zoom)?;
        level_tiles.push((zoom, compute_num_tiles(rect.size(), tile)));
    }

    for frame in params.frame_range.clone() {
        for slice in params.slice_range.clone() {
            let mut start = params.channel_range.start;
            while start < params.channel_range.end {
                let end = (start + chunk).min(params.channel_range.end);
                let base = PyramidDirectory::new(start..end, slice, frame);
                structure.total_tiles += level0_tiles;

                let mut page = PyramidPage::new(base.clone());
                let mut extra_pages = Vec::new();
                for &(zoom, tiles) in &level_tiles {
                    structure.total_tiles += tiles;
                    match params.format {
                        ImageFormat::OmeTiff => page.sub_directories.push(base.at_zoom_level(zoom)),
                        ImageFormat::Svs => extra_pages.push(PyramidPage::new(base.at_zoom_level(zoom))),
                    }
                }
                structure.pages.push(page);
                structure.pages.extend(extra_pages);
                start = end;
            }
        }
    }

    let named = params
        .channel_range
        .clone()
        .any(|c| !scene.channel_name(c).is_empty());
    if named {
        structure.channels = params
            .channel_range
            .clone()
            .enumerate()
            .map(|(i, c)| ChannelInfo::new(i, scene.channel_name(c)))
            .collect();
    }

    Ok(structure)
}

fn check_range(axis: &str, range: &Range<usize>, count: usize) -> Result<(), ConvertError> {
    if range.is_empty() || range.end > count {
        return Err(ConvertError::invalid_argument(format!(
            "{} range {}..{} is outside the scene's {} {}(s)",
            axis, range.start, range.end, count, axis
        )));
    }
    Ok(())
}

fn check_encoding(scene: &dyn Scene, params: &ConversionParameters) -> Result<(), ConvertError> {
    if !params.encoding.is_jpeg() {
        return Ok(());
    }
    if let Some(channel) = params
        .channel_range
        .clone()
        .find(|&c| scene.channel_data_type(c) != DataType::U8)
    {
        return Err(ConvertError::unsupported(format!(
            "JPEG needs 8-bit channels; channel {} is {}",
            channel,
            scene.channel_data_type(channel)
        )));
    }
    if params.format == ImageFormat::Svs && !matches!(params.channel_range.len(), 1 | 3) {
        return Err(ConvertError::unsupported(format!(
            "SVS with JPEG needs 1 or 3 channels, got {}",
            params.channel_range.len()
        )));
    }
    Ok(())
}

fn check_flat_layout(scene: &dyn Scene, params: &ConversionParameters) -> Result<(), ConvertError> {
    if params.slice_range.len() != 1 || params.frame_range.len() != 1 {
        return Err(ConvertError::unsupported(format!(
            "SVS holds a single plane; got {} slice(s) and {} frame(s)",
            params.slice_range.len(),
            params.frame_range.len()
        )));
    }
    let first = scene.channel_data_type(params.channel_range.start);
    if params
        .channel_range
        .clone()
        .any(|c| scene.channel_data_type(c) != first)
    {
        return Err(ConvertError::unsupported(
            "SVS needs all selected channels to share one data type",
        ));
    }
    Ok(())
}

/// Validate the crop rectangle against the scene and return it unchanged.
pub fn compute_crop_rect(scene: &dyn Scene, params: &ConversionParameters) -> Result<Rect, ConvertError> {
    let scene_rect = Rect::from_size(scene.rect().size());
    let crop = params.rect;
    if !crop.is_valid() {
        return Err(ConvertError::invalid_argument(format!(
            "crop rectangle {} is empty",
            crop
        )));
    }
    if !scene_rect.contains_rect(&crop) {
        return Err(ConvertError::invalid_argument(format!(
            "crop rectangle {} exceeds the scene {}",
            crop, scene_rect
        )));
    }
    Ok(crop)
}

fn check_levels(crop: Size, tile: Size, levels: i32) -> Result<(), ConvertError> {
    for zoom in 0..levels {
        let level = scale_size(crop, zoom, true)?;
        if level.is_empty() {
            return Err(ConvertError::invalid_argument(format!(
                "zoom level {} of a {}x{} image is empty; use at most {} level(s)",
                zoom, crop.width, crop.height, zoom
            )));
        }
        let max = i64::from(i32::MAX);
        if (i64::from(tile.width) << zoom) > max || (i64::from(tile.height) << zoom) > max {
            return Err(ConvertError::invalid_argument(format!(
                "tile size {}x{} overflows at zoom level {}",
                tile.width, tile.height, zoom
            )));
        }
    }
    Ok(())
}

/// Channels stored together in one directory.
fn channel_chunk_size(scene: &dyn Scene, params: &ConversionParameters) -> usize {
    let range = &params.channel_range;
    match params.format {
        ImageFormat::Svs => range.len(),
        ImageFormat::OmeTiff => {
            let groupable = scene.num_channels() == 3 && range.start == 0 && range.len() == 3;
            match params.encoding {
                EncodeParams::Jpeg { .. } => {
                    let bytes = range.clone().all(|c| scene.channel_data_type(c) == DataType::U8);
                    if groupable && bytes {
                        3
                    } else {
                        1
                    }
                }
                EncodeParams::Jpeg2000 { .. } => {
                    if groupable {
                        3
                    } else {
                        1
                    }
                }
            }
        }
    }
}

// =============================================================================
// Writing
// =============================================================================

fn directory_tags(plan: &Plan, dir: &PyramidDirectory, zoom: i32) -> Result<TiffDirectory, ConvertError> {
    let level = scale_size(plan.structure.crop_rect.size(), zoom, true)?;
    let tile = plan.params.tile_size();
    let resolution = plan.scene.resolution();
    let factor = f64::from(1u32 << zoom);

    Ok(TiffDirectory {
        width: level.width as u32,
        height: level.height as u32,
        tile_width: tile.width as u32,
        tile_height: tile.height as u32,
        channels: dir.num_channels(),
        data_type: plan.scene.channel_data_type(dir.channel_range.start),
        encoding: plan.params.encoding,
        description: dir.description.clone(),
        resolution: Resolution::new(resolution.x * factor, resolution.y * factor),
        reduced: zoom > 0,
    })
}

fn write_directory(
    plan: &Plan,
    dir: &PyramidDirectory,
    sub_dirs: usize,
    writer: &mut dyn ContainerWriter,
    counter: &mut ProgressCounter<'_>,
    scratch: &mut Vec<u8>,
) -> Result<(), ConvertError> {
    let zoom = dir.zoom_level()?;
    let tags = directory_tags(plan, dir, zoom)?;
    writer.set_tags(&tags)?;
    if sub_dirs > 0 {
        writer.init_sub_dirs(sub_dirs)?;
    }

    let crop = plan.structure.crop_rect;
    let tile = plan.params.tile_size();
    let level = Size::new(tags.width as i32, tags.height as i32);
    let stride = scale_size(tile, zoom, false)?;
    let channels: Vec<usize> = dir.channel_range.clone().collect();
    let (slice, frame) = (dir.slice_range.start, dir.frame_range.start);
    let before = counter.current();

    let mut row = i64::from(crop.y);
    while row < crop.bottom() {
        let y = row as i32;
        let mut column = i64::from(crop.x);
        while column < crop.right() {
            let x = column as i32;
            let local = scale_rect(
                Rect::new(x - crop.x, y - crop.y, stride.width, stride.height),
                zoom,
                true,
            )?;
            if local.x < level.width && local.y < level.height {
                let block = Rect::new(x, y, stride.width, stride.height);
                let raster = read_tile(plan.scene.as_ref(), &channels, zoom, block, slice, frame)?;
                if raster.width() != tile.width as u32 || raster.height() != tile.height as u32 {
                    return Err(ConvertError::invalid_state(format!(
                        "tile at {} read as {}x{}, expected {}x{}",
                        block,
                        raster.width(),
                        raster.height(),
                        tile.width,
                        tile.height
                    )));
                }
                writer.write_tile(
                    local.x as u32,
                    local.y as u32,
                    &plan.params.encoding,
                    &raster,
                    scratch,
                )?;
                counter.tick();
            }
            column += i64::from(stride.width);
        }
        row += i64::from(stride.height);
    }

    writer.write_directory()?;
    debug!(
        "Directory zoom {} channels {}..{} slice {} frame {}: {}x{}, {} tiles",
        zoom,
        dir.channel_range.start,
        dir.channel_range.end,
        slice,
        frame,
        level.width,
        level.height,
        counter.current() - before
    );
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
