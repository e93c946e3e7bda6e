//! Test utilities for integration tests.
//!
//! This module provides synthetic scenes, a container writer that records
//! the calls it receives, and a minimal TIFF directory scanner used to read
//! produced files back.

use std::ops::Range;
use std::sync::Arc;

use slide_converter::format::tiff::{ByteOrder, FieldType, TiffHeader, TiffTag};
use slide_converter::{
    ContainerWriter, ConvertError, DataType, EncodeParams, MemoryScene, Raster, Rect, Resolution,
    Scene, SceneError, Size, TiffDirectory,
};

// =============================================================================
// Synthetic Scenes
// =============================================================================

/// 8-bit RGB scene with a distinct gradient per channel.
pub fn rgb_scene(width: i32, height: i32) -> MemoryScene {
    let mut scene = MemoryScene::new("rgb", width, height, 3, DataType::U8)
        .with_resolution(Resolution::new(0.25e-6, 0.25e-6))
        .with_magnification(40.0)
        .with_file_path("/data/slides/rgb.png");
    scene.fill_channel(0, 0, 0, |x, _| (x % 256) as f64).unwrap();
    scene.fill_channel(1, 0, 0, |_, y| (y % 256) as f64).unwrap();
    scene.fill_channel(2, 0, 0, |x, y| ((x + y) % 256) as f64).unwrap();
    scene
}

/// Fluorescence-style stack: named 8-bit channels over slices and frames.
pub fn stack_scene(width: i32, height: i32, channels: usize, slices: usize, frames: usize) -> MemoryScene {
    let names: Vec<String> = (0..channels).map(|c| format!("C{}", c)).collect();
    let mut scene = MemoryScene::new("stack", width, height, channels, DataType::U8)
        .with_planes(slices, frames)
        .with_channel_names(names);
    for frame in 0..frames {
        for slice in 0..slices {
            for channel in 0..channels {
                let base = (channel * 50 + slice * 10 + frame) as f64;
                scene
                    .fill_channel(channel, slice, frame, move |x, _| base + (x % 8) as f64)
                    .unwrap();
            }
        }
    }
    scene
}

pub fn shared(scene: MemoryScene) -> Arc<dyn Scene> {
    Arc::new(scene)
}

/// Scene of any size that stores no pixels; every read returns zeros.
///
/// Used for layouts too large to back with memory.
pub struct VirtualScene {
    pub width: i32,
    pub height: i32,
    pub channel_types: Vec<DataType>,
    pub slices: usize,
    pub frames: usize,
}

impl VirtualScene {
    pub fn new(width: i32, height: i32, channel_types: Vec<DataType>) -> Self {
        Self {
            width,
            height,
            channel_types,
            slices: 1,
            frames: 1,
        }
    }

    pub fn with_planes(mut self, slices: usize, frames: usize) -> Self {
        self.slices = slices;
        self.frames = frames;
        self
    }
}

impl Scene for VirtualScene {
    fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn num_channels(&self) -> usize {
        self.channel_types.len()
    }

    fn num_z_slices(&self) -> usize {
        self.slices
    }

    fn num_t_frames(&self) -> usize {
        self.frames
    }

    fn channel_data_type(&self, channel: usize) -> DataType {
        self.channel_types[channel]
    }

    fn name(&self) -> String {
        "virtual".to_string()
    }

    fn file_path(&self) -> String {
        String::new()
    }

    fn read_resampled_block(
        &self,
        _rect: Rect,
        size: Size,
        channels: &[usize],
        slices: Range<usize>,
        frames: Range<usize>,
    ) -> Result<Raster, SceneError> {
        Ok(Raster::zeroed_planes(
            size.width as u32,
            size.height as u32,
            channels.len(),
            slices.len() * frames.len(),
            self.channel_types[channels[0]],
        ))
    }
}

// =============================================================================
// Recording Container Writer
// =============================================================================

/// One call received by [`RecordingWriter`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriterCall {
    SetTags(TiffDirectory),
    InitSubDirs(usize),
    Tile { x: u32, y: u32, width: u32, height: u32 },
    WriteDirectory,
}

/// Container writer that only records what it is asked to do.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    pub calls: Vec<WriterCall>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories in the order their tags were set.
    pub fn directories(&self) -> Vec<&TiffDirectory> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                WriterCall::SetTags(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    /// Number of tiles written to each directory.
    pub fn tiles_per_directory(&self) -> Vec<usize> {
        let mut counts = Vec::new();
        for call in &self.calls {
            match call {
                WriterCall::SetTags(_) => counts.push(0),
                WriterCall::Tile { .. } => {
                    if let Some(last) = counts.last_mut() {
                        *last += 1;
                    }
                }
                _ => {}
            }
        }
        counts
    }

    pub fn tile_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, WriterCall::Tile { .. }))
            .count()
    }
}

impl ContainerWriter for RecordingWriter {
    fn set_tags(&mut self, directory: &TiffDirectory) -> Result<(), ConvertError> {
        self.calls.push(WriterCall::SetTags(directory.clone()));
        Ok(())
    }

    fn init_sub_dirs(&mut self, count: usize) -> Result<(), ConvertError> {
        self.calls.push(WriterCall::InitSubDirs(count));
        Ok(())
    }

    fn write_tile(
        &mut self,
        x: u32,
        y: u32,
        _encoding: &EncodeParams,
        tile: &Raster,
        _scratch: &mut Vec<u8>,
    ) -> Result<(), ConvertError> {
        self.calls.push(WriterCall::Tile {
            x,
            y,
            width: tile.width(),
            height: tile.height(),
        });
        Ok(())
    }

    fn write_directory(&mut self) -> Result<(), ConvertError> {
        self.calls.push(WriterCall::WriteDirectory);
        Ok(())
    }
}

// =============================================================================
// TIFF Directory Scanner
// =============================================================================

/// One raw IFD entry.
#[derive(Debug, Clone)]
pub struct ScannedEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u64,
    /// The entry's value/offset field
    pub field: Vec<u8>,
}

/// Entries of one IFD.
#[derive(Debug, Clone)]
pub struct ScannedDirectory {
    pub offset: u64,
    pub entries: Vec<ScannedEntry>,
}

/// Header and top-level directory chain of a TIFF stream.
pub struct ScannedTiff {
    pub bytes: Vec<u8>,
    pub header: TiffHeader,
    pub directories: Vec<ScannedDirectory>,
}

pub fn scan_tiff(bytes: Vec<u8>) -> ScannedTiff {
    let header = TiffHeader::parse(&bytes).expect("valid TIFF header");
    let mut directories = Vec::new();
    let mut offset = header.first_ifd_offset;
    while offset != 0 {
        let (dir, next) = read_directory(&bytes, &header, offset);
        directories.push(dir);
        offset = next;
    }
    ScannedTiff {
        bytes,
        header,
        directories,
    }
}

fn read_directory(bytes: &[u8], header: &TiffHeader, offset: u64) -> (ScannedDirectory, u64) {
    let order = header.byte_order;
    let mut pos = offset as usize;
    let count = if header.is_bigtiff {
        order.read_u64(&bytes[pos..]) as usize
    } else {
        order.read_u16(&bytes[pos..]) as usize
    };
    pos += header.ifd_count_size();

    let field_size = header.offset_size();
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let tag = order.read_u16(&bytes[pos..]);
        let field_type = order.read_u16(&bytes[pos + 2..]);
        let (n, field_at) = if header.is_bigtiff {
            (order.read_u64(&bytes[pos + 4..]), pos + 12)
        } else {
            (order.read_u32(&bytes[pos + 4..]) as u64, pos + 8)
        };
        entries.push(ScannedEntry {
            tag,
            field_type,
            count: n,
            field: bytes[field_at..field_at + field_size].to_vec(),
        });
        pos += header.ifd_entry_size();
    }
    let next = header.read_offset(&bytes[pos..]);
    (ScannedDirectory { offset, entries }, next)
}

impl ScannedTiff {
    fn entry<'a>(&self, dir: &'a ScannedDirectory, tag: TiffTag) -> Option<&'a ScannedEntry> {
        dir.entries.iter().find(|e| e.tag == tag.as_u16())
    }

    /// Raw bytes of an entry's values, inline or out of line.
    fn value_bytes<'a>(&'a self, entry: &'a ScannedEntry) -> &'a [u8] {
        let field_type = FieldType::from_u16(entry.field_type).expect("known field type");
        let len = field_type.size_in_bytes() * entry.count as usize;
        if len <= entry.field.len() {
            &entry.field[..len]
        } else {
            let at = self.header.read_offset(&entry.field) as usize;
            &self.bytes[at..at + len]
        }
    }

    /// Integer values of a tag; rationals yield their numerators.
    pub fn values(&self, dir: &ScannedDirectory, tag: TiffTag) -> Vec<u64> {
        let Some(entry) = self.entry(dir, tag) else {
            return Vec::new();
        };
        let order: ByteOrder = self.header.byte_order;
        let field_type = FieldType::from_u16(entry.field_type).expect("known field type");
        let size = field_type.size_in_bytes();
        self.value_bytes(entry)
            .chunks_exact(size)
            .map(|v| match field_type {
                FieldType::Byte | FieldType::Ascii | FieldType::Undefined => v[0] as u64,
                FieldType::Short => order.read_u16(v) as u64,
                FieldType::Long | FieldType::Ifd | FieldType::Rational => order.read_u32(v) as u64,
                FieldType::Long8 | FieldType::Ifd8 => order.read_u64(v),
            })
            .collect()
    }

    pub fn value(&self, dir: &ScannedDirectory, tag: TiffTag) -> Option<u64> {
        self.values(dir, tag).first().copied()
    }

    /// ASCII value without its terminating NUL.
    pub fn text(&self, dir: &ScannedDirectory, tag: TiffTag) -> Option<String> {
        let entry = self.entry(dir, tag)?;
        let raw = self.value_bytes(entry);
        let raw = raw.strip_suffix(&[0]).unwrap_or(raw);
        Some(String::from_utf8_lossy(raw).into_owned())
    }

    /// Directories referenced by the SubIFDs tag of `dir`.
    pub fn sub_directories(&self, dir: &ScannedDirectory) -> Vec<ScannedDirectory> {
        self.values(dir, TiffTag::SubIfds)
            .into_iter()
            .map(|offset| read_directory(&self.bytes, &self.header, offset).0)
            .collect()
    }

    /// Width and height of a directory.
    pub fn size(&self, dir: &ScannedDirectory) -> (u64, u64) {
        (
            self.value(dir, TiffTag::ImageWidth).unwrap_or(0),
            self.value(dir, TiffTag::ImageLength).unwrap_or(0),
        )
    }

    /// Encoded bytes of tile `index` of a directory.
    pub fn tile_data(&self, dir: &ScannedDirectory, index: usize) -> &[u8] {
        let offset = self.values(dir, TiffTag::TileOffsets)[index] as usize;
        let count = self.values(dir, TiffTag::TileByteCounts)[index] as usize;
        &self.bytes[offset..offset + count]
    }
}
