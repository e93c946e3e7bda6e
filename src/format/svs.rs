//! Aperio SVS image description.
//!
//! SVS viewers recognise a flat pyramidal TIFF by the text in the first
//! directory's ImageDescription tag:
//!
//! ```text
//! SlideIO Library 2.0
//! 46920x33600(256x256) JPEG/RGB Q=95
//! |MPP = 0.25|AppMag = 40|Filename = slide|Date = 03/14/2024|Time = 09:26:53
//! ```
//!
//! The first line names the writer, the second the image and tile size and
//! the codec, the third is a pipe-separated list of `key = value` pairs.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDateTime;

use super::format_number;
use crate::params::EncodeParams;
use crate::scene::Resolution;

/// First line of every description this crate writes.
pub const SVS_LIBRARY_LINE: &str = "SlideIO Library 2.0";

// =============================================================================
// Description Builder
// =============================================================================

/// Inputs of an SVS description.
#[derive(Debug, Clone)]
pub struct SvsDescription<'a> {
    pub width: i32,
    pub height: i32,
    pub tile_width: i32,
    pub tile_height: i32,
    pub encoding: &'a EncodeParams,
    /// Metres per pixel; omitted when not positive.
    pub resolution: Resolution,
    /// Omitted when not positive.
    pub magnification: f64,
    /// Source file path; only its stem is written.
    pub file_path: &'a str,
}

impl SvsDescription<'_> {
    /// Render the description stamped with the wall-clock time `now`.
    pub fn render(&self, now: NaiveDateTime) -> String {
        let mut text = format!(
            "{}\n{}x{}({}x{}) ",
            SVS_LIBRARY_LINE, self.width, self.height, self.tile_width, self.tile_height
        );
        match self.encoding {
            EncodeParams::Jpeg { quality } => text.push_str(&format!("JPEG/RGB Q={}", quality)),
            EncodeParams::Jpeg2000 { .. } => text.push_str("J2K"),
        }
        text.push('\n');

        if self.resolution.x > 0.0 {
            text.push_str(&format!("|MPP = {}", format_number(self.resolution.x * 1e6)));
        }
        if self.magnification > 0.0 {
            text.push_str(&format!("|AppMag = {}", format_number(self.magnification)));
        }
        let stem = Path::new(self.file_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        text.push_str(&format!("|Filename = {}", stem));

        text.push_str(&format!(
            "|Date = {}|Time = {}",
            now.format("%m/%d/%Y"),
            now.format("%H:%M:%S")
        ));
        text
    }
}

// =============================================================================
// SVS Metadata
// =============================================================================

/// Values read back from an SVS ImageDescription.
#[derive(Debug, Clone, Default)]
pub struct SvsMetadata {
    /// Microns per pixel (resolution)
    pub mpp: Option<f64>,

    /// Objective magnification (e.g., 20, 40)
    pub magnification: Option<f64>,

    /// Scanner vendor name
    pub vendor: Option<String>,

    /// Source file stem
    pub filename: Option<String>,

    /// Every `key = value` pair
    pub properties: HashMap<String, String>,
}

impl SvsMetadata {
    /// Parse metadata from an ImageDescription string.
    pub fn parse(description: &str) -> Self {
        let mut metadata = SvsMetadata::default();

        if description.contains("Aperio") {
            metadata.vendor = Some("Aperio".to_string());
        } else if description.starts_with(SVS_LIBRARY_LINE) {
            metadata.vendor = Some("SlideIO".to_string());
        }

        for part in description.split('|') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            metadata
                .properties
                .insert(key.to_string(), value.to_string());

            match key {
                "MPP" => metadata.mpp = value.parse().ok(),
                "AppMag" => metadata.magnification = value.parse().ok(),
                "Filename" => metadata.filename = Some(value.to_string()),
                _ => {}
            }
        }

        metadata
    }
}

// =============================================================================
// Tests
// =============================================================================
