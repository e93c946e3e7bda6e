//! OME-XML image description.
//!
//! An OME-TIFF carries its dimensional model in the first directory's
//! ImageDescription as an OME-XML document. Each top-level directory is
//! mapped to its (C, Z, T) position by a `TiffData` element:
//!
//! ```text
//! OME
//! ├── Instrument/Objective   (when the magnification is known)
//! └── Image
//!     └── Pixels             (XYCZT, sizes, type, physical size)
//!         ├── Channel *      (when any channel is named)
//!         └── TiffData *     (one per top-level directory)
//!             └── UUID
//! ```

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use super::format_number;
use crate::scene::{DataType, Resolution};

const OME_NAMESPACE: &str = "http://www.openmicroscopy.org/Schemas/OME/2016-06";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Channel metadata record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
}

impl ChannelInfo {
    /// Record for the `index`-th selected channel of image 0.
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            id: format!("Channel:0:{}", index),
            name: name.into(),
        }
    }
}

/// Plane extent of one top-level directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffDataBlock {
    pub size_c: usize,
    pub size_z: usize,
    pub size_t: usize,
    pub plane_count: usize,
}

/// Inputs of an OME-XML description.
#[derive(Debug, Clone)]
pub struct OmeDescription<'a> {
    pub image_name: &'a str,
    pub size_x: i32,
    pub size_y: i32,
    pub size_c: usize,
    pub size_z: usize,
    pub size_t: usize,
    pub data_type: DataType,
    /// Metres per pixel; each axis omitted when not positive.
    pub resolution: Resolution,
    pub magnification: f64,
    pub channels: &'a [ChannelInfo],
    pub blocks: &'a [TiffDataBlock],
    /// Output file name written into every UUID element.
    pub file_name: &'a str,
}

impl OmeDescription<'_> {
    pub fn render(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            xml,
            "<OME xmlns=\"{ns}\" xmlns:xsi=\"{xsi}\" xsi:schemaLocation=\"{ns} {ns}/ome.xsd\">",
            ns = OME_NAMESPACE,
            xsi = XSI_NAMESPACE
        );

        if self.magnification > 0.0 {
            let _ = writeln!(
                xml,
                "  <Instrument ID=\"Instrument:0\">\n    <Objective ID=\"Objective:0:0\" NominalMagnification=\"{}\"/>\n  </Instrument>",
                format_number(self.magnification)
            );
        }

        xml.push_str("  <Image ID=\"Image:0\"");
        if !self.image_name.is_empty() {
            let _ = write!(xml, " Name=\"{}\"", escape(self.image_name));
        }
        xml.push_str(">\n");

        let _ = write!(
            xml,
            "    <Pixels ID=\"Pixels:0\" DimensionOrder=\"XYCZT\" SizeX=\"{}\" SizeY=\"{}\" SizeZ=\"{}\" SizeC=\"{}\" SizeT=\"{}\" Type=\"{}\"",
            self.size_x,
            self.size_y,
            self.size_z.max(1),
            self.size_c.max(1),
            self.size_t.max(1),
            self.data_type.ome_name()
        );
        if self.resolution.x > 0.0 {
            let _ = write!(
                xml,
                " PhysicalSizeX=\"{}\" PhysicalSizeXUnit=\"µm\"",
                format_number(self.resolution.x * 1e6)
            );
        }
        if self.resolution.y > 0.0 {
            let _ = write!(
                xml,
                " PhysicalSizeY=\"{}\" PhysicalSizeYUnit=\"µm\"",
                format_number(self.resolution.y * 1e6)
            );
        }
        xml.push_str(">\n");

        for channel in self.channels {
            let _ = write!(
                xml,
                "      <Channel ID=\"{}\" SamplesPerPixel=\"1\"",
                escape(&channel.id)
            );
            if !channel.name.is_empty() {
                let _ = write!(xml, " Name=\"{}\"", escape(&channel.name));
            }
            xml.push_str("/>\n");
        }

        let uuid = self.file_uuid();
        let file_name = escape(self.file_name);
        let (mut first_c, mut first_z, mut first_t) = (0, 0, 0);
        for (ifd, block) in self.blocks.iter().enumerate() {
            let _ = writeln!(
                xml,
                "      <TiffData IFD=\"{}\" FirstC=\"{}\" SizeC=\"{}\" FirstZ=\"{}\" SizeZ=\"{}\" FirstT=\"{}\" SizeT=\"{}\" PlaneCount=\"{}\">",
                ifd, first_c, block.size_c, first_z, block.size_z, first_t, block.size_t, block.plane_count
            );
            let _ = writeln!(
                xml,
                "        <UUID FileName=\"{}\">{}</UUID>\n      </TiffData>",
                file_name, uuid
            );

            // Channels advance first, then slices, then frames.
            first_c += block.size_c;
            if first_c >= self.size_c {
                first_c = 0;
                first_z += block.size_z;
                if first_z >= self.size_z {
                    first_z = 0;
                    first_t += block.size_t;
                }
            }
        }

        xml.push_str("    </Pixels>\n  </Image>\n</OME>\n");
        xml
    }

    /// Name-based identifier of the output file, shared by all its TiffData.
    fn file_uuid(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.file_name.as_bytes());
        hasher.update([0]);
        hasher.update(self.image_name.as_bytes());
        for value in [
            self.size_x as u64,
            self.size_y as u64,
            self.size_c as u64,
            self.size_z as u64,
            self.size_t as u64,
            self.blocks.len() as u64,
        ] {
            hasher.update(value.to_le_bytes());
        }
        let mut bytes: [u8; 16] = [0; 16];
        bytes.copy_from_slice(&hasher.finalize()[..16]);
        // RFC 4122 version 5 layout
        bytes[6] = (bytes[6] & 0x0F) | 0x50;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;

        let hex = hex::encode(bytes);
        format!(
            "urn:uuid:{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

/// Escape text for use inside a double-quoted XML attribute or element.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
