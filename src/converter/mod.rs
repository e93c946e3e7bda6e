//! Scene to pyramid conversion.
//!
//! - [`layout`]: the planned pages and directories of an output file
//! - [`TiffConverter`]: plans the layout and writes the pyramid
//! - [`ProgressSink`]: per-tile progress callback
//!
//! [`convert_scene`] wraps the whole sequence for callers that want the
//! partial output removed when a conversion fails.

pub mod layout;
mod progress;
mod tiff_converter;

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

pub use layout::{PyramidDirectory, PyramidPage, PyramidStructure};
pub use progress::{percent, ProgressSink};
pub use tiff_converter::{compute_crop_rect, ConversionState, TiffConverter, BIGTIFF_THRESHOLD};

use crate::error::ConvertError;
use crate::params::ConversionParameters;
use crate::scene::Scene;

/// Write a planned converter to `output`, deleting the file if writing fails.
pub fn create_tiff_or_remove(
    converter: &mut TiffConverter,
    output: &Path,
    progress: Option<&mut dyn ProgressSink>,
) -> Result<(), ConvertError> {
    let result = converter.create_tiff(output, progress);
    if result.is_err() && output.exists() {
        match std::fs::remove_file(output) {
            Ok(()) => warn!("Removed partial output {}", output.display()),
            Err(e) => warn!("Failed to remove partial output {}: {}", output.display(), e),
        }
    }
    result
}

/// Plan and write `scene` to a new file at `output`.
///
/// # Errors
///
/// Fails with `InvalidState` if `output` already exists, otherwise with any
/// planning or writing error. A partially written file is removed.
pub fn convert_scene(
    scene: Arc<dyn Scene>,
    params: &ConversionParameters,
    output: &Path,
    progress: Option<&mut dyn ProgressSink>,
) -> Result<TiffConverter, ConvertError> {
    if output.exists() {
        return Err(ConvertError::invalid_state(format!(
            "output file {} already exists",
            output.display()
        )));
    }
    let mut converter = TiffConverter::new();
    converter.create_file_layout(scene, params)?;
    create_tiff_or_remove(&mut converter, output, progress)?;
    Ok(converter)
}
