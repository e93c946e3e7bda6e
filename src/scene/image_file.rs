//! Raster image-file driver.
//!
//! Decodes PNG, JPEG and TIFF files with the `image` crate into a
//! [`MemoryScene`]. Gray sources become one channel, color sources three;
//! alpha is dropped. 8-bit, 16-bit and float samples are preserved.

use std::path::Path;

use image::{ColorType, DynamicImage, ImageReader};
use tracing::debug;

use super::{DataType, MemoryScene};
use crate::error::SceneError;

/// Decode the image at `path` into a single-scene, single-plane source.
pub fn open_image(path: &Path) -> Result<MemoryScene, SceneError> {
    let open_error = |message: String| SceneError::Open {
        path: path.display().to_string(),
        message,
    };

    let reader = ImageReader::open(path)
        .map_err(|e| open_error(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| open_error(e.to_string()))?;
    let img = reader.decode().map_err(|e| open_error(e.to_string()))?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (width, height) = (img.width() as i32, img.height() as i32);
    let color = img.color();
    let channels = if color.has_color() { 3 } else { 1 };
    let (data_type, interleaved) = interleaved_samples(&img, color, channels);

    debug!(
        "Decoded {}: {}x{} {:?} -> {} channel(s) of {}",
        path.display(),
        width,
        height,
        color,
        channels,
        data_type
    );

    let mut scene = MemoryScene::new(name, width, height, channels, data_type)
        .with_file_path(path.display().to_string());
    for (channel, plane) in deinterleave(&interleaved, channels, data_type.size_in_bytes())
        .into_iter()
        .enumerate()
    {
        scene.set_plane(channel, 0, 0, plane)?;
    }
    Ok(scene)
}

/// Little-endian interleaved samples with alpha removed.
fn interleaved_samples(img: &DynamicImage, color: ColorType, channels: usize) -> (DataType, Vec<u8>) {
    match color {
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
            let samples: Vec<u16> = if channels == 3 {
                img.to_rgb16().into_raw()
            } else {
                img.to_luma16().into_raw()
            };
            let bytes = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
            (DataType::U16, bytes)
        }
        ColorType::Rgb32F | ColorType::Rgba32F => {
            let bytes = img
                .to_rgb32f()
                .into_raw()
                .iter()
                .flat_map(|s| s.to_le_bytes())
                .collect();
            (DataType::F32, bytes)
        }
        _ => {
            let bytes = if channels == 3 {
                img.to_rgb8().into_raw()
            } else {
                img.to_luma8().into_raw()
            };
            (DataType::U8, bytes)
        }
    }
}

fn deinterleave(data: &[u8], channels: usize, sample: usize) -> Vec<Vec<u8>> {
    let pixel = channels * sample;
    let pixels = data.len() / pixel.max(1);
    let mut planes = vec![Vec::with_capacity(pixels * sample); channels];
    for px in data.chunks_exact(pixel) {
        for (channel, plane) in planes.iter_mut().enumerate() {
            plane.extend_from_slice(&px[channel * sample..(channel + 1) * sample]);
        }
    }
    planes
}
