//! Reads one output tile from a scene.
//!
//! A tile covers a block of the scene at zoom 0 resolution and is resampled
//! to `block / 2^zoom`. Blocks hanging over the scene edge are zero-filled
//! outside the scene.
//!
//! ```text
//!   scene                         tile (block / 2^zoom)
//!   ┌───────────────┐             ┌───────┬───┐
//!   │           ┌───┼───┐         │ data  │ 0 │
//!   │           │ ∩ │   │   ──►   ├───────┘   │
//!   └───────────┼───┘   │         │     0     │
//!               └───────┘         └───────────┘
//! ```

use tracing::trace;

use crate::error::ConvertError;
use crate::geometry::{scale_size, Rect};
use crate::scene::{Raster, Scene};

/// Read `block` of the listed channels for one slice and frame, downscaled by
/// `2^zoom`.
///
/// `block` is relative to the scene origin. The result is always
/// `block.size >> zoom` pixels; parts outside the scene are 0.
pub fn read_tile(
    scene: &dyn Scene,
    channels: &[usize],
    zoom: i32,
    block: Rect,
    slice: usize,
    frame: usize,
) -> Result<Raster, ConvertError> {
    if channels.is_empty() {
        return Err(ConvertError::invalid_argument("tile read needs at least one channel"));
    }
    if !block.is_valid() {
        return Err(ConvertError::invalid_argument(format!(
            "tile block {} is empty",
            block
        )));
    }
    let tile_size = scale_size(block.size(), zoom, true)?;
    let scene_rect = Rect::from_size(scene.rect().size());

    if scene_rect.contains_rect(&block) {
        let raster = scene.read_resampled_block(
            block,
            tile_size,
            channels,
            slice..slice + 1,
            frame..frame + 1,
        )?;
        return Ok(raster);
    }

    let data_type = scene.channel_data_type(channels[0]);
    let mut tile = Raster::zeroed(
        tile_size.width as u32,
        tile_size.height as u32,
        channels.len(),
        data_type,
    );

    let Some(inside) = block.intersection(&scene_rect) else {
        trace!("Block {} lies outside the scene, emitting blank tile", block);
        return Ok(tile);
    };

    let inside_size = scale_size(inside.size(), zoom, true)?;
    if inside_size.is_empty() {
        return Ok(tile);
    }
    let part = scene.read_resampled_block(
        inside,
        inside_size,
        channels,
        slice..slice + 1,
        frame..frame + 1,
    )?;
    trace!(
        "Block {} crosses the scene edge, read {} and padded",
        block,
        inside
    );
    // Blocks start on the crop grid, so the part always sits at the tile origin.
    if !tile.blit(&part, 0, 0) {
        return Err(ConvertError::invalid_state(format!(
            "scene returned {} channel(s) of {} for block {}, expected {} of {}",
            part.channels(),
            part.data_type(),
            inside,
            tile.channels(),
            tile.data_type()
        )));
    }
    Ok(tile)
}
