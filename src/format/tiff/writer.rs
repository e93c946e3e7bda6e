//! Streaming TIFF/BigTIFF writer.
//!
//! Directories are written strictly one after another. Tile data is
//! appended as it arrives, and the IFD follows its out-of-line values once
//! the directory is closed:
//!
//! ```text
//! ┌────────┬─────────┬───────────────┬─────┬─────────┬───────────────┬─────┐
//! │ header │ tiles 0 │ values 0      │ IFD │ tiles 1 │ values 1      │ IFD │ ...
//! └───┬────┴─────────┴───────────────┴──▲──┴─────────┴───────────────┴──▲──┘
//!     └─────── first IFD offset ────────┘  └──── next IFD offset ────────┘
//! ```
//!
//! Only link fields are patched in place: the header's first-IFD offset, the
//! previous top-level IFD's next offset and reserved SubIFDs slots.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::error::{ConvertError, TiffError};
use crate::params::EncodeParams;
use crate::scene::Raster;
use crate::tile::{TileCodec, TileEncoder};

use super::directory::TiffDirectory;
use super::header::{ByteOrder, TiffHeader};
use super::tags::{FieldType, Photometric, ResolutionUnit, TiffTag};

// =============================================================================
// ContainerWriter Trait
// =============================================================================

/// Sink for the directories of a tiled container.
///
/// Calls for one directory follow the sequence
/// `set_tags`, optionally `init_sub_dirs`, any number of `write_tile`,
/// `write_directory`. Reserved sub-directories are filled by the next
/// directories written, in order.
pub trait ContainerWriter {
    /// Open a new directory described by `directory`.
    fn set_tags(&mut self, directory: &TiffDirectory) -> Result<(), ConvertError>;

    /// Reserve `count` sub-directory slots in the open directory.
    fn init_sub_dirs(&mut self, count: usize) -> Result<(), ConvertError>;

    /// Encode `tile` and store it as the tile whose top-left pixel is `(x, y)`.
    fn write_tile(
        &mut self,
        x: u32,
        y: u32,
        encoding: &EncodeParams,
        tile: &Raster,
        scratch: &mut Vec<u8>,
    ) -> Result<(), ConvertError>;

    /// Close the open directory.
    fn write_directory(&mut self) -> Result<(), ConvertError>;
}

// =============================================================================
// IFD Entries
// =============================================================================

/// One IFD entry with its value already serialized in file byte order.
struct Entry {
    tag: TiffTag,
    field_type: FieldType,
    count: u64,
    data: Vec<u8>,
}

impl Entry {
    fn shorts(order: ByteOrder, tag: TiffTag, values: &[u16]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 2);
        values.iter().for_each(|&v| order.put_u16(&mut data, v));
        Self {
            tag,
            field_type: FieldType::Short,
            count: values.len() as u64,
            data,
        }
    }

    fn long(order: ByteOrder, tag: TiffTag, value: u32) -> Self {
        let mut data = Vec::with_capacity(4);
        order.put_u32(&mut data, value);
        Self {
            tag,
            field_type: FieldType::Long,
            count: 1,
            data,
        }
    }

    /// Offsets or counts: LONG/IFD in classic TIFF, LONG8/IFD8 in BigTIFF.
    fn offsets(header: &TiffHeader, tag: TiffTag, values: &[u64]) -> Result<Self, TiffError> {
        let field_type = match (tag, header.is_bigtiff) {
            (TiffTag::SubIfds, false) => FieldType::Ifd,
            (TiffTag::SubIfds, true) => FieldType::Ifd8,
            (_, false) => FieldType::Long,
            (_, true) => FieldType::Long8,
        };
        let mut data = Vec::with_capacity(values.len() * header.offset_size());
        for &value in values {
            header.put_offset(&mut data, value)?;
        }
        Ok(Self {
            tag,
            field_type,
            count: values.len() as u64,
            data,
        })
    }

    fn ascii(tag: TiffTag, text: &str) -> Self {
        let mut data = Vec::with_capacity(text.len() + 1);
        data.extend_from_slice(text.as_bytes());
        data.push(0);
        Self {
            tag,
            field_type: FieldType::Ascii,
            count: data.len() as u64,
            data,
        }
    }

    fn rational(order: ByteOrder, tag: TiffTag, (numerator, denominator): (u32, u32)) -> Self {
        let mut data = Vec::with_capacity(8);
        order.put_u32(&mut data, numerator);
        order.put_u32(&mut data, denominator);
        Self {
            tag,
            field_type: FieldType::Rational,
            count: 1,
            data,
        }
    }
}

/// Closest rational with a power-of-ten denominator that fits in 32 bits.
fn to_rational(value: f64) -> (u32, u32) {
    if !(value > 0.0) || !value.is_finite() {
        return (1, 1);
    }
    for denominator in [10_000u32, 1_000, 100, 10, 1] {
        let numerator = (value * denominator as f64).round();
        if numerator <= u32::MAX as f64 {
            return (numerator as u32, denominator);
        }
    }
    (u32::MAX, 1)
}

// =============================================================================
// TiffFileWriter
// =============================================================================

struct OpenDirectory {
    descriptor: TiffDirectory,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
    sub_ifds: usize,
    /// Fills a reserved SubIFDs slot instead of joining the top-level chain
    is_sub_ifd: bool,
}

/// [`ContainerWriter`] producing a classic TIFF or BigTIFF stream.
pub struct TiffFileWriter<W: Write + Seek> {
    inner: W,
    header: TiffHeader,
    encoder: Box<dyn TileEncoder>,
    software: String,
    /// Current end of the stream
    end: u64,
    /// Position of the link field that receives the next top-level IFD
    next_link: u64,
    open: Option<OpenDirectory>,
    sub_ifd_slots: VecDeque<u64>,
    directories: usize,
}

impl TiffFileWriter<BufWriter<File>> {
    /// Create (truncate) `path` and write a little-endian header.
    pub fn create(path: &Path, bigtiff: bool) -> Result<Self, TiffError> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), ByteOrder::LittleEndian, bigtiff)
    }
}

impl<W: Write + Seek> TiffFileWriter<W> {
    /// Start a TIFF stream at the beginning of `inner`.
    pub fn new(mut inner: W, byte_order: ByteOrder, bigtiff: bool) -> Result<Self, TiffError> {
        let header = TiffHeader::new(byte_order, bigtiff);
        let bytes = header.encode();
        inner.seek(SeekFrom::Start(0))?;
        inner.write_all(&bytes)?;

        Ok(Self {
            inner,
            header,
            encoder: Box::new(TileCodec::new()),
            software: format!("slide-converter {}", env!("CARGO_PKG_VERSION")),
            end: bytes.len() as u64,
            next_link: header.first_ifd_field(),
            open: None,
            sub_ifd_slots: VecDeque::new(),
            directories: 0,
        })
    }

    /// Replace the tile encoder.
    pub fn with_encoder(mut self, encoder: Box<dyn TileEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn header(&self) -> &TiffHeader {
        &self.header
    }

    /// Number of directories written so far.
    pub fn directory_count(&self) -> usize {
        self.directories
    }

    /// Flush and return the underlying stream.
    ///
    /// Fails when a directory is still open or reserved sub-directories were
    /// never written.
    pub fn finish(mut self) -> Result<W, TiffError> {
        if self.open.is_some() {
            return Err(TiffError::DirectoryAlreadyOpen);
        }
        if !self.sub_ifd_slots.is_empty() {
            return Err(TiffError::InvalidDirectory(format!(
                "{} reserved sub-directories were never written",
                self.sub_ifd_slots.len()
            )));
        }
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), TiffError> {
        self.inner.write_all(bytes)?;
        self.end += bytes.len() as u64;
        Ok(())
    }

    /// Pad the stream to a word boundary.
    fn align(&mut self) -> Result<(), TiffError> {
        if self.end % 2 == 1 {
            self.append(&[0])?;
        }
        Ok(())
    }

    /// Overwrite the offset field at `position` and return to the end.
    fn patch(&mut self, position: u64, value: u64) -> Result<(), TiffError> {
        let mut bytes = Vec::with_capacity(8);
        self.header.put_offset(&mut bytes, value)?;
        self.inner.seek(SeekFrom::Start(position))?;
        self.inner.write_all(&bytes)?;
        self.inner.seek(SeekFrom::Start(self.end))?;
        Ok(())
    }

    fn build_entries(&self, dir: &OpenDirectory) -> Result<Vec<Entry>, TiffError> {
        let order = self.header.byte_order;
        let d = &dir.descriptor;
        let samples = d.channels as u16;

        let mut entries = vec![
            Entry::long(order, TiffTag::NewSubfileType, u32::from(d.reduced)),
            Entry::long(order, TiffTag::ImageWidth, d.width),
            Entry::long(order, TiffTag::ImageLength, d.height),
            Entry::shorts(
                order,
                TiffTag::BitsPerSample,
                &vec![d.data_type.bits_per_sample(); d.channels],
            ),
            Entry::shorts(order, TiffTag::Compression, &[d.compression() as u16]),
            Entry::shorts(order, TiffTag::PhotometricInterpretation, &[d.photometric() as u16]),
            Entry::shorts(order, TiffTag::SamplesPerPixel, &[samples]),
            Entry::shorts(order, TiffTag::PlanarConfiguration, &[1]),
            Entry::ascii(TiffTag::Software, &self.software),
            Entry::long(order, TiffTag::TileWidth, d.tile_width),
            Entry::long(order, TiffTag::TileLength, d.tile_height),
            Entry::offsets(&self.header, TiffTag::TileOffsets, &dir.offsets)?,
            Entry::offsets(&self.header, TiffTag::TileByteCounts, &dir.byte_counts)?,
            Entry::shorts(
                order,
                TiffTag::SampleFormat,
                &vec![d.data_type.sample_format(); d.channels],
            ),
        ];

        if !d.description.is_empty() {
            entries.push(Entry::ascii(TiffTag::ImageDescription, &d.description));
        }

        if d.resolution.x > 0.0 && d.resolution.y > 0.0 {
            // Metres per pixel to pixels per centimetre
            entries.push(Entry::rational(order, TiffTag::XResolution, to_rational(0.01 / d.resolution.x)));
            entries.push(Entry::rational(order, TiffTag::YResolution, to_rational(0.01 / d.resolution.y)));
            entries.push(Entry::shorts(order, TiffTag::ResolutionUnit, &[ResolutionUnit::Centimeter as u16]));
        } else {
            entries.push(Entry::rational(order, TiffTag::XResolution, (1, 1)));
            entries.push(Entry::rational(order, TiffTag::YResolution, (1, 1)));
            entries.push(Entry::shorts(order, TiffTag::ResolutionUnit, &[ResolutionUnit::None as u16]));
        }

        if dir.sub_ifds > 0 {
            entries.push(Entry::offsets(&self.header, TiffTag::SubIfds, &vec![0; dir.sub_ifds])?);
        }

        if d.photometric() == Photometric::YCbCr {
            entries.push(Entry::shorts(order, TiffTag::YCbCrSubSampling, &[1, 1]));
        }

        entries.sort_by_key(|e| e.tag.as_u16());
        Ok(entries)
    }

    fn close_directory(&mut self) -> Result<(), TiffError> {
        let dir = self.open.take().ok_or(TiffError::NoOpenDirectory)?;
        let entries = self.build_entries(&dir)?;
        let header = self.header;
        let value_size = header.offset_size();

        // Out-of-line values first, each on a word boundary.
        let mut locations = Vec::with_capacity(entries.len());
        for entry in &entries {
            if entry.field_type.fits_inline(entry.count, header.is_bigtiff) {
                locations.push(None);
            } else {
                self.align()?;
                locations.push(Some(self.end));
                self.append(&entry.data)?;
            }
        }

        self.align()?;
        let ifd_offset = self.end;
        let order = header.byte_order;
        let mut ifd = Vec::with_capacity(
            header.ifd_count_size() + entries.len() * header.ifd_entry_size() + value_size,
        );
        if header.is_bigtiff {
            order.put_u64(&mut ifd, entries.len() as u64);
        } else {
            order.put_u16(&mut ifd, entries.len() as u16);
        }

        let mut slots = Vec::new();
        for (entry, location) in entries.iter().zip(&locations) {
            order.put_u16(&mut ifd, entry.tag.as_u16());
            order.put_u16(&mut ifd, entry.field_type as u16);
            if header.is_bigtiff {
                order.put_u64(&mut ifd, entry.count);
            } else {
                order.put_u32(&mut ifd, entry.count as u32);
            }

            let value_position = ifd_offset + ifd.len() as u64;
            match location {
                Some(offset) => header.put_offset(&mut ifd, *offset)?,
                None => {
                    ifd.extend_from_slice(&entry.data);
                    ifd.resize(ifd.len() + value_size - entry.data.len(), 0);
                }
            }

            if entry.tag == TiffTag::SubIfds {
                let base = location.unwrap_or(value_position);
                slots.extend((0..entry.count).map(|i| base + i * value_size as u64));
            }
        }
        header.put_offset(&mut ifd, 0)?;
        let next_field = ifd_offset + (ifd.len() - value_size) as u64;
        self.append(&ifd)?;

        if dir.is_sub_ifd {
            let slot = self.sub_ifd_slots.pop_front().ok_or_else(|| {
                TiffError::InvalidDirectory("no reserved sub-directory slot left".into())
            })?;
            self.patch(slot, ifd_offset)?;
        } else {
            self.patch(self.next_link, ifd_offset)?;
            self.next_link = next_field;
        }
        self.sub_ifd_slots.extend(slots);
        self.directories += 1;

        debug!(
            "Wrote {} {} {}x{} with {} tiles at offset {}",
            if dir.is_sub_ifd { "sub-directory" } else { "directory" },
            self.directories - 1,
            dir.descriptor.width,
            dir.descriptor.height,
            dir.offsets.len(),
            ifd_offset
        );
        Ok(())
    }
}

impl<W: Write + Seek> ContainerWriter for TiffFileWriter<W> {
    fn set_tags(&mut self, directory: &TiffDirectory) -> Result<(), ConvertError> {
        if self.open.is_some() {
            return Err(TiffError::DirectoryAlreadyOpen.into());
        }
        directory.validate()?;
        let tiles = directory.tile_count();
        self.open = Some(OpenDirectory {
            descriptor: directory.clone(),
            offsets: vec![0; tiles],
            byte_counts: vec![0; tiles],
            sub_ifds: 0,
            is_sub_ifd: !self.sub_ifd_slots.is_empty(),
        });
        Ok(())
    }

    fn init_sub_dirs(&mut self, count: usize) -> Result<(), ConvertError> {
        let dir = self.open.as_mut().ok_or(TiffError::NoOpenDirectory)?;
        dir.sub_ifds = count;
        Ok(())
    }

    fn write_tile(
        &mut self,
        x: u32,
        y: u32,
        encoding: &EncodeParams,
        tile: &Raster,
        scratch: &mut Vec<u8>,
    ) -> Result<(), ConvertError> {
        let dir = self.open.as_ref().ok_or(TiffError::NoOpenDirectory)?;
        let d = &dir.descriptor;
        let index = d.tile_index(x, y)?;
        if tile.width() != d.tile_width
            || tile.height() != d.tile_height
            || tile.channels() != d.channels
            || tile.data_type() != d.data_type
        {
            return Err(TiffError::TileShape {
                expected: format!(
                    "{}x{} x{} {}",
                    d.tile_width, d.tile_height, d.channels, d.data_type
                ),
                actual: format!(
                    "{}x{} x{} {}",
                    tile.width(),
                    tile.height(),
                    tile.channels(),
                    tile.data_type()
                ),
            }
            .into());
        }

        self.encoder.encode(tile, encoding, scratch)?;
        let offset = self.end;
        self.append(scratch)?;
        trace!("Tile ({}, {}) -> {} bytes at {}", x, y, scratch.len(), offset);

        if let Some(dir) = self.open.as_mut() {
            dir.offsets[index] = offset;
            dir.byte_counts[index] = scratch.len() as u64;
        }
        Ok(())
    }

    fn write_directory(&mut self) -> Result<(), ConvertError> {
        self.close_directory()?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
