//! Pyramid geometry.
//!
//! Integer rectangles and sizes plus the arithmetic used to move between
//! zoom levels. Zoom level `n` is the source scaled by `1 / 2^n`; every
//! conversion between levels is a bit shift applied to each field
//! independently.
//!
//! ```text
//! level 0   ┌───────────────┐  width
//!           │               │
//!           └───────────────┘
//! level 1   ┌───────┐          width >> 1
//!           └───────┘
//! level 2   ┌───┐              width >> 2
//!           └───┘
//! ```

use serde::Serialize;

use crate::error::ConvertError;

/// Both dimensions must exceed this for another zoom level to be added.
pub const ZOOM_LEVEL_THRESHOLD: i32 = 1000;

// =============================================================================
// Size
// =============================================================================

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    /// True when either dimension is non-positive.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

// =============================================================================
// Rect
// =============================================================================

/// Axis-aligned integer rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size anchored at the origin.
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Exclusive right edge, widened so it cannot overflow.
    pub const fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge, widened so it cannot overflow.
    pub const fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// A rectangle is valid when it covers at least one pixel.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlapping area of two rectangles, or `None` when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right > i64::from(x) && bottom > i64::from(y) {
            // Both extents are bounded by an input width or height
            Some(Rect::new(
                x,
                y,
                (right - i64::from(x)) as i32,
                (bottom - i64::from(y)) as i32,
            ))
        } else {
            None
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.x, self.y, self.width, self.height
        )
    }
}

// =============================================================================
// Zoom Level Arithmetic
// =============================================================================

/// Number of pyramid levels for an image of the given size.
///
/// Starts at 1 and adds a level each time both dimensions still exceed
/// [`ZOOM_LEVEL_THRESHOLD`] before being halved.
pub fn compute_num_zoom_levels(width: i32, height: i32) -> i32 {
    let mut levels = 1;
    let (mut width, mut height) = (width, height);
    while width > ZOOM_LEVEL_THRESHOLD && height > ZOOM_LEVEL_THRESHOLD {
        width /= 2;
        height /= 2;
        levels += 1;
    }
    levels
}

fn check_zoom_level(zoom_level: i32) -> Result<u32, ConvertError> {
    if !(0..31).contains(&zoom_level) {
        return Err(ConvertError::invalid_argument(format!(
            "zoom level must be in 0..31, got {}",
            zoom_level
        )));
    }
    Ok(zoom_level as u32)
}

/// Shift a size down (`downscale`) or up by `zoom_level` binary orders.
pub fn scale_size(size: Size, zoom_level: i32, downscale: bool) -> Result<Size, ConvertError> {
    let shift = check_zoom_level(zoom_level)?;
    Ok(if downscale {
        Size::new(size.width >> shift, size.height >> shift)
    } else {
        Size::new(size.width << shift, size.height << shift)
    })
}

/// Shift every field of a rectangle by `zoom_level` binary orders.
///
/// Origin and extent are shifted independently, so the result is not always
/// the geometric image of the input rectangle.
pub fn scale_rect(rect: Rect, zoom_level: i32, downscale: bool) -> Result<Rect, ConvertError> {
    let shift = check_zoom_level(zoom_level)?;
    Ok(if downscale {
        Rect::new(
            rect.x >> shift,
            rect.y >> shift,
            rect.width >> shift,
            rect.height >> shift,
        )
    } else {
        Rect::new(
            rect.x << shift,
            rect.y << shift,
            rect.width << shift,
            rect.height << shift,
        )
    })
}

/// Rectangle of `scene_rect` at `zoom_level`, padded to whole tiles.
pub fn compute_zoom_level_rect(
    scene_rect: Rect,
    tile_size: Size,
    zoom_level: i32,
) -> Result<Rect, ConvertError> {
    if tile_size.is_empty() {
        return Err(ConvertError::invalid_argument(format!(
            "tile size must be positive, got {}x{}",
            tile_size.width, tile_size.height
        )));
    }
    let mut rect = scale_rect(scene_rect, zoom_level, true)?;
    rect.width = round_up(rect.width, tile_size.width);
    rect.height = round_up(rect.height, tile_size.height);
    Ok(rect)
}

/// Number of tiles needed to cover an image.
pub fn compute_num_tiles(image_size: Size, tile_size: Size) -> usize {
    if image_size.is_empty() || tile_size.is_empty() {
        return 0;
    }
    let across = (image_size.width - 1) / tile_size.width + 1;
    let down = (image_size.height - 1) / tile_size.height + 1;
    across as usize * down as usize
}

fn round_up(value: i32, multiple: i32) -> i32 {
    if value <= 0 {
        return 0;
    }
    ((value - 1) / multiple + 1) * multiple
}

// =============================================================================
// Tests
// =============================================================================
