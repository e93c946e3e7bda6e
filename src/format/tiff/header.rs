//! TIFF header layout and byte-order helpers.
//!
//! # TIFF Header Structure
//!
//! ## Classic TIFF (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! ## BigTIFF (16 bytes)
//! ```text
//! Bytes 0-1: Byte order
//! Bytes 2-3: Version (43 = 0x002B)
//! Bytes 4-5: Offset byte size (always 8)
//! Bytes 6-7: Reserved (0)
//! Bytes 8-15: Offset to first IFD (8 bytes)
//! ```
//!
//! The writer emits the header with a zero first-IFD offset and patches it
//! once the first directory lands in the file.

use crate::error::TiffError;

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Version number for BigTIFF
const VERSION_BIGTIFF: u16 = 43;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    #[default]
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }

    #[inline]
    pub fn put_u16(self, out: &mut Vec<u8>, value: u16) {
        match self {
            ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    #[inline]
    pub fn put_u32(self, out: &mut Vec<u8>, value: u32) {
        match self {
            ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    #[inline]
    pub fn put_u64(self, out: &mut Vec<u8>, value: u64) {
        match self {
            ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    const fn magic(self) -> u16 {
        match self {
            ByteOrder::LittleEndian => BYTE_ORDER_LITTLE_ENDIAN,
            ByteOrder::BigEndian => BYTE_ORDER_BIG_ENDIAN,
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// File header of a classic TIFF or BigTIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    pub const fn new(byte_order: ByteOrder, is_bigtiff: bool) -> Self {
        Self {
            byte_order,
            is_bigtiff,
            first_ifd_offset: 0,
        }
    }

    /// Serialize the header.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        // The magic is the same byte pair in both orders.
        out.extend_from_slice(&self.byte_order.magic().to_le_bytes());
        if self.is_bigtiff {
            self.byte_order.put_u16(&mut out, VERSION_BIGTIFF);
            self.byte_order.put_u16(&mut out, 8);
            self.byte_order.put_u16(&mut out, 0);
            self.byte_order.put_u64(&mut out, self.first_ifd_offset);
        } else {
            self.byte_order.put_u16(&mut out, VERSION_TIFF);
            self.byte_order
                .put_u32(&mut out, self.first_ifd_offset as u32);
        }
        out
    }

    /// Parse a header from the first bytes of a file.
    pub fn parse(bytes: &[u8]) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::InvalidHeader(format!(
                "need {} bytes, got {}",
                TIFF_HEADER_SIZE,
                bytes.len()
            )));
        }

        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => {
                return Err(TiffError::InvalidHeader(format!(
                    "bad byte order marker 0x{:04X}",
                    magic
                )))
            }
        };

        match byte_order.read_u16(&bytes[2..4]) {
            VERSION_TIFF => Ok(TiffHeader {
                byte_order,
                is_bigtiff: false,
                first_ifd_offset: byte_order.read_u32(&bytes[4..8]) as u64,
            }),
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::InvalidHeader(format!(
                        "need {} bytes, got {}",
                        BIGTIFF_HEADER_SIZE,
                        bytes.len()
                    )));
                }
                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidHeader(format!(
                        "BigTIFF offset size must be 8, got {}",
                        offset_size
                    )));
                }
                Ok(TiffHeader {
                    byte_order,
                    is_bigtiff: true,
                    first_ifd_offset: byte_order.read_u64(&bytes[8..16]),
                })
            }
            version => Err(TiffError::InvalidHeader(format!(
                "unknown version {}",
                version
            ))),
        }
    }

    /// Header length in bytes.
    #[inline]
    pub const fn size(&self) -> usize {
        if self.is_bigtiff {
            BIGTIFF_HEADER_SIZE
        } else {
            TIFF_HEADER_SIZE
        }
    }

    /// File position of the first-IFD offset field.
    #[inline]
    pub const fn first_ifd_field(&self) -> u64 {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Size of an IFD entry in bytes.
    ///
    /// Classic TIFF: 12 bytes (2 tag + 2 type + 4 count + 4 value/offset)
    /// BigTIFF: 20 bytes (2 tag + 2 type + 8 count + 8 value/offset)
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count field at the start of an IFD.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of offset fields: next-IFD links and entry value slots.
    #[inline]
    pub const fn offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Append an offset-sized value.
    pub fn put_offset(&self, out: &mut Vec<u8>, value: u64) -> Result<(), TiffError> {
        if self.is_bigtiff {
            self.byte_order.put_u64(out, value);
        } else {
            let value = u32::try_from(value).map_err(|_| TiffError::OffsetOverflow(value))?;
            self.byte_order.put_u32(out, value);
        }
        Ok(())
    }

    /// Read an offset-sized value.
    pub fn read_offset(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u32(bytes) as u64
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
