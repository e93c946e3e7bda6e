//! Command-line configuration for the converter.
//!
//! Options mirror a conversion: source selection (`--driver`,
//! `--scene-index`), target layout (`--format`, `--tile-size`,
//! `--zoom-levels`), codec (`--compression-method`, `--quality`,
//! `--compression-rate`) and the sub-region to convert (`--rect`,
//! `--channel-range`, `--slice-range`, `--frame-range`).
//!
//! # Example
//!
//! ```text
//! slide-converter slide.png slide.svs -f SVS -m Jpeg -q 90 -t 256
//! slide-converter stack.tif stack.ome.tif --channel-range 0,2 --info-only
//! ```
//!
//! # Environment Variables
//!
//! Output-shaping options fall back to variables with the
//! `SLIDE_CONVERTER_` prefix:
//!
//! - `SLIDE_CONVERTER_LOG_LEVEL` - Log level 0-3 (default: 1)
//! - `SLIDE_CONVERTER_SILENT` - Suppress summary and progress
//! - `SLIDE_CONVERTER_OUTPUT_FORMAT` - Summary as `text` or `json`

use std::ops::Range;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::ConvertError;
use crate::geometry::Rect;
use crate::params::{
    ConversionParameters, EncodeParams, ImageFormat, DEFAULT_JPEG_QUALITY, TILE_ALIGNMENT,
};
use crate::scene::Scene;

// =============================================================================
// Default Values
// =============================================================================

/// Default tile edge for the command line.
pub const DEFAULT_CLI_TILE_SIZE: i32 = 512;

/// Default JPEG 2000 compression rate for the command line.
pub const DEFAULT_COMPRESSION_RATE: f32 = 5.0;

/// Default source driver.
pub const DEFAULT_DRIVER: &str = "AUTO";

/// Default log level (errors only).
pub const DEFAULT_LOG_LEVEL: u8 = 1;

/// Largest accepted explicit zoom level count.
pub const MAX_ZOOM_LEVELS: i32 = 100;

// =============================================================================
// Option Values
// =============================================================================

/// `--format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    #[value(name = "SVS")]
    Svs,
    #[value(name = "OMETIFF")]
    OmeTiff,
}

impl From<FormatArg> for ImageFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Svs => ImageFormat::Svs,
            FormatArg::OmeTiff => ImageFormat::OmeTiff,
        }
    }
}

/// `--compression-method` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompressionMethod {
    #[value(name = "Jpeg")]
    Jpeg,
    #[value(name = "Jpeg2000")]
    Jpeg2000,
}

/// How the conversion summary is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Slide Converter - tiled pyramidal TIFF writer.
///
/// Converts a scene into an SVS (flat pyramid) or OME-TIFF (sub-directory
/// pyramid) file with JPEG or JPEG 2000 tiles.
#[derive(Parser, Debug, Clone)]
#[command(name = "slide-converter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file.
    pub input: PathBuf,

    /// Output file.
    pub output: PathBuf,

    // =========================================================================
    // Source
    // =========================================================================
    /// Index of the scene to convert.
    #[arg(short = 'n', long, default_value_t = 0)]
    pub scene_index: usize,

    /// Source driver (AUTO picks one from the file).
    #[arg(short, long, default_value = DEFAULT_DRIVER)]
    pub driver: String,

    // =========================================================================
    // Target
    // =========================================================================
    /// Output layout.
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = FormatArg::OmeTiff)]
    pub format: FormatArg,

    /// Tile edge in pixels.
    #[arg(short, long, default_value_t = DEFAULT_CLI_TILE_SIZE)]
    pub tile_size: i32,

    /// Number of pyramid levels; -1 or 0 computes it from the image size.
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    pub zoom_levels: i32,

    // =========================================================================
    // Codec
    // =========================================================================
    /// Tile codec. JPEG 2000 layouts can be planned with --info-only but not encoded.
    #[arg(short = 'm', long, value_enum, ignore_case = true, default_value_t = CompressionMethod::Jpeg)]
    pub compression_method: CompressionMethod,

    /// JPEG quality (0-100).
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY)]
    pub quality: u8,

    /// JPEG 2000 compression rate.
    #[arg(short, long, default_value_t = DEFAULT_COMPRESSION_RATE)]
    pub compression_rate: f32,

    // =========================================================================
    // Region
    // =========================================================================
    /// Region to convert as `x,y,width,height`.
    #[arg(short, long, value_parser = parse_rect)]
    pub rect: Option<Rect>,

    /// Channels to convert as `start,end` (end exclusive).
    #[arg(long, value_parser = parse_range)]
    pub channel_range: Option<Range<usize>>,

    /// Z slices to convert as `start,end` (end exclusive).
    #[arg(long, value_parser = parse_range)]
    pub slice_range: Option<Range<usize>>,

    /// Time frames to convert as `start,end` (end exclusive).
    #[arg(long, value_parser = parse_range)]
    pub frame_range: Option<Range<usize>>,

    // =========================================================================
    // Behaviour
    // =========================================================================
    /// Print neither the summary nor the progress bar.
    #[arg(short, long, default_value_t = false, env = "SLIDE_CONVERTER_SILENT")]
    pub silent: bool,

    /// Print the planned conversion and stop.
    #[arg(short, long, default_value_t = false)]
    pub info_only: bool,

    /// Overwrite the output file if it exists.
    #[arg(short = 'x', long, default_value_t = false)]
    pub delete_if_exists: bool,

    // =========================================================================
    // Logging
    // =========================================================================
    /// Log level: 0 fatal, 1 error, 2 warning, 3 info.
    #[arg(short, long, default_value_t = DEFAULT_LOG_LEVEL, env = "SLIDE_CONVERTER_LOG_LEVEL")]
    pub log_level: u8,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Summary output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "SLIDE_CONVERTER_OUTPUT_FORMAT")]
    pub output_format: OutputFormat,
}

impl Cli {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size <= 0 || self.tile_size % TILE_ALIGNMENT != 0 {
            return Err(format!(
                "tile_size must be a positive multiple of {}, got {}",
                TILE_ALIGNMENT, self.tile_size
            ));
        }
        if !(-1..=MAX_ZOOM_LEVELS).contains(&self.zoom_levels) {
            return Err(format!(
                "zoom_levels must be between -1 and {}, got {}",
                MAX_ZOOM_LEVELS, self.zoom_levels
            ));
        }
        if self.quality > 100 {
            return Err("quality must be between 0 and 100".to_string());
        }
        if !(self.compression_rate > 0.0) {
            return Err("compression_rate must be positive".to_string());
        }
        if self.log_level > 3 {
            return Err("log_level must be between 0 and 3".to_string());
        }
        Ok(())
    }

    /// Codec settings selected on the command line.
    pub fn encoding(&self) -> EncodeParams {
        match self.compression_method {
            CompressionMethod::Jpeg => EncodeParams::jpeg(self.quality),
            CompressionMethod::Jpeg2000 => EncodeParams::jpeg2000(self.compression_rate),
        }
    }

    /// Build conversion parameters, checking the region against `scene`.
    ///
    /// Unset selections stay unset; the planner fills them from the scene.
    pub fn to_parameters(&self, scene: &dyn Scene) -> Result<ConversionParameters, ConvertError> {
        let mut params = ConversionParameters::new(self.format.into(), self.encoding())
            .with_tile_size(self.tile_size, self.tile_size)
            .with_zoom_levels(self.zoom_levels);

        if let Some(rect) = self.rect {
            let scene_rect = Rect::from_size(scene.rect().size());
            if !scene_rect.contains_rect(&rect) {
                return Err(ConvertError::invalid_argument(format!(
                    "rectangle {} is outside the scene {}",
                    rect, scene_rect
                )));
            }
            params = params.with_rect(rect);
        }
        if let Some(range) = &self.channel_range {
            check_range("channel", range, scene.num_channels())?;
            params = params.with_channel_range(range.clone());
        }
        if let Some(range) = &self.slice_range {
            check_range("slice", range, scene.num_z_slices())?;
            params = params.with_slice_range(range.clone());
        }
        if let Some(range) = &self.frame_range {
            check_range("frame", range, scene.num_t_frames())?;
            params = params.with_frame_range(range.clone());
        }
        Ok(params)
    }
}

fn check_range(axis: &str, range: &Range<usize>, count: usize) -> Result<(), ConvertError> {
    if range.end > count {
        return Err(ConvertError::invalid_argument(format!(
            "{} range {},{} exceeds the scene's {} {}(s)",
            axis, range.start, range.end, count, axis
        )));
    }
    Ok(())
}

// =============================================================================
// Value Parsers
// =============================================================================

fn parse_numbers<T: std::str::FromStr>(value: &str, expected: usize) -> Result<Vec<T>, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != expected {
        return Err(format!(
            "expected {} comma-separated values, got '{}'",
            expected, value
        ));
    }
    parts
        .iter()
        .map(|p| p.parse::<T>().map_err(|_| format!("'{}' is not a valid number", p)))
        .collect()
}

/// Parse `x,y,width,height` with non-negative origin and positive size.
pub fn parse_rect(value: &str) -> Result<Rect, String> {
    let v: Vec<i32> = parse_numbers(value, 4)?;
    if v[0] < 0 || v[1] < 0 {
        return Err(format!("rectangle origin must be non-negative, got '{}'", value));
    }
    if v[2] <= 0 || v[3] <= 0 {
        return Err(format!("rectangle size must be positive, got '{}'", value));
    }
    Ok(Rect::new(v[0], v[1], v[2], v[3]))
}

/// Parse `start,end` with `start < end`.
pub fn parse_range(value: &str) -> Result<Range<usize>, String> {
    let v: Vec<usize> = parse_numbers(value, 2)?;
    if v[0] >= v[1] {
        return Err(format!("range start must be below its end, got '{}'", value));
    }
    Ok(v[0]..v[1])
}

// =============================================================================
// Tests
// =============================================================================
