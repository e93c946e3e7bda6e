//! TIFF container writer.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. The writer emits little-endian files by default.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB files),
//!   while BigTIFF uses 64-bit offsets. The writer produces both.
//!
//! - **IFD (Image File Directory)**: Holds the tags and tile locations of one image.
//!   Pyramid levels are either chained top-level IFDs or SubIFDs of the first level.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD entry,
//!   larger values are stored at an offset pointed to by the entry.

mod directory;
mod header;
mod tags;
mod writer;

pub use directory::TiffDirectory;
pub use header::{ByteOrder, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{Compression, FieldType, Photometric, ResolutionUnit, TiffTag};
pub use writer::{ContainerWriter, TiffFileWriter};
