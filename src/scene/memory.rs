//! In-memory scene.
//!
//! Holds every (frame, slice, channel) plane as its own buffer so channels
//! may carry different sample types. Resampled reads use nearest-neighbour
//! sampling.

use std::ops::Range;

use super::{DataType, Raster, Resolution, Scene};
use crate::error::SceneError;
use crate::geometry::{Rect, Size};

/// Scene backed by plain byte buffers.
#[derive(Debug, Clone)]
pub struct MemoryScene {
    name: String,
    file_path: String,
    rect: Rect,
    channel_types: Vec<DataType>,
    channel_names: Vec<String>,
    slices: usize,
    frames: usize,
    resolution: Resolution,
    magnification: f64,
    /// Indexed by `(frame * slices + slice) * channels + channel`.
    planes: Vec<Vec<u8>>,
}

impl MemoryScene {
    /// Zero-filled scene with one slice and one frame.
    pub fn new(
        name: impl Into<String>,
        width: i32,
        height: i32,
        channels: usize,
        data_type: DataType,
    ) -> Self {
        Self::with_channel_types(name, width, height, vec![data_type; channels])
    }

    /// Zero-filled scene whose channels carry the given types.
    pub fn with_channel_types(
        name: impl Into<String>,
        width: i32,
        height: i32,
        channel_types: Vec<DataType>,
    ) -> Self {
        let mut scene = Self {
            name: name.into(),
            file_path: String::new(),
            rect: Rect::new(0, 0, width.max(0), height.max(0)),
            channel_names: vec![String::new(); channel_types.len()],
            channel_types,
            slices: 1,
            frames: 1,
            resolution: Resolution::default(),
            magnification: 0.0,
            planes: Vec::new(),
        };
        scene.allocate();
        scene
    }

    fn allocate(&mut self) {
        let pixels = self.rect.size().area();
        let mut planes = Vec::with_capacity(self.frames * self.slices * self.channel_types.len());
        for _ in 0..self.frames * self.slices {
            for data_type in &self.channel_types {
                planes.push(vec![0u8; pixels * data_type.size_in_bytes()]);
            }
        }
        self.planes = planes;
    }

    /// Resize the slice and frame axes. Pixel data is reset to zero.
    pub fn with_planes(mut self, slices: usize, frames: usize) -> Self {
        self.slices = slices.max(1);
        self.frames = frames.max(1);
        self.allocate();
        self
    }

    /// Move the scene rectangle inside its slide without changing its size.
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.rect.x = x;
        self.rect.y = y;
        self
    }

    pub fn with_channel_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        for (slot, name) in self.channel_names.iter_mut().zip(names) {
            *slot = name.into();
        }
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_magnification(mut self, magnification: f64) -> Self {
        self.magnification = magnification;
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = path.into();
        self
    }

    fn plane_index(&self, channel: usize, slice: usize, frame: usize) -> usize {
        (frame * self.slices + slice) * self.channel_types.len() + channel
    }

    /// Fill one plane of one channel from a per-pixel function.
    pub fn fill_channel(
        &mut self,
        channel: usize,
        slice: usize,
        frame: usize,
        value: impl Fn(i32, i32) -> f64,
    ) -> Result<(), SceneError> {
        self.check_plane(channel, slice, frame)?;
        let data_type = self.channel_types[channel];
        let size = data_type.size_in_bytes();
        let width = self.rect.width;
        let index = self.plane_index(channel, slice, frame);
        let plane = &mut self.planes[index];
        for (i, sample) in plane.chunks_exact_mut(size).enumerate() {
            let x = (i % width as usize) as i32;
            let y = (i / width as usize) as i32;
            data_type.write_sample(value(x, y), sample);
        }
        Ok(())
    }

    /// Replace one plane of one channel with raw little-endian samples.
    pub fn set_plane(
        &mut self,
        channel: usize,
        slice: usize,
        frame: usize,
        data: Vec<u8>,
    ) -> Result<(), SceneError> {
        self.check_plane(channel, slice, frame)?;
        let expected = self.rect.size().area() * self.channel_types[channel].size_in_bytes();
        if data.len() != expected {
            return Err(SceneError::PlaneSize {
                expected,
                actual: data.len(),
            });
        }
        let index = self.plane_index(channel, slice, frame);
        self.planes[index] = data;
        Ok(())
    }

    fn check_plane(&self, channel: usize, slice: usize, frame: usize) -> Result<(), SceneError> {
        if channel >= self.channel_types.len() {
            return Err(SceneError::ChannelOutOfRange {
                channel,
                count: self.channel_types.len(),
            });
        }
        check_axis("slice", slice..slice + 1, self.slices)?;
        check_axis("frame", frame..frame + 1, self.frames)
    }
}

fn check_axis(axis: &'static str, range: Range<usize>, count: usize) -> Result<(), SceneError> {
    if range.is_empty() || range.end > count {
        return Err(SceneError::PlaneOutOfRange {
            axis,
            start: range.start,
            end: range.end,
            count,
        });
    }
    Ok(())
}

impl Scene for MemoryScene {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn num_channels(&self) -> usize {
        self.channel_types.len()
    }

    fn num_z_slices(&self) -> usize {
        self.slices
    }

    fn num_t_frames(&self) -> usize {
        self.frames
    }

    fn channel_data_type(&self, channel: usize) -> DataType {
        self.channel_types
            .get(channel)
            .copied()
            .unwrap_or(DataType::U8)
    }

    fn channel_name(&self, channel: usize) -> String {
        self.channel_names.get(channel).cloned().unwrap_or_default()
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn magnification(&self) -> f64 {
        self.magnification
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn file_path(&self) -> String {
        self.file_path.clone()
    }

    fn read_resampled_block(
        &self,
        rect: Rect,
        size: Size,
        channels: &[usize],
        slices: Range<usize>,
        frames: Range<usize>,
    ) -> Result<Raster, SceneError> {
        let bounds = Rect::from_size(self.rect.size());
        if !rect.is_valid() || !bounds.contains_rect(&rect) || size.is_empty() {
            return Err(SceneError::BlockOutOfBounds {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                scene_width: bounds.width,
                scene_height: bounds.height,
            });
        }
        check_axis("slice", slices.clone(), self.slices)?;
        check_axis("frame", frames.clone(), self.frames)?;

        let Some(&first) = channels.first() else {
            return Err(SceneError::ChannelOutOfRange {
                channel: 0,
                count: 0,
            });
        };
        for &channel in channels {
            if channel >= self.channel_types.len() {
                return Err(SceneError::ChannelOutOfRange {
                    channel,
                    count: self.channel_types.len(),
                });
            }
        }
        let data_type = self.channel_types[first];
        if channels.iter().any(|&c| self.channel_types[c] != data_type) {
            return Err(SceneError::MixedDataTypes {
                channels: channels.to_vec(),
            });
        }

        let sample = data_type.size_in_bytes();
        let plane_count = slices.len() * frames.len();
        let mut raster = Raster::zeroed_planes(
            size.width as u32,
            size.height as u32,
            channels.len(),
            plane_count,
            data_type,
        );

        // Source column/row for every destination column/row.
        let columns: Vec<usize> = (0..size.width as i64)
            .map(|dx| (rect.x as i64 + dx * rect.width as i64 / size.width as i64) as usize)
            .collect();
        let rows: Vec<usize> = (0..size.height as i64)
            .map(|dy| (rect.y as i64 + dy * rect.height as i64 / size.height as i64) as usize)
            .collect();

        let scene_width = self.rect.width as usize;
        let pixel_bytes = raster.pixel_bytes();
        let row_bytes = raster.row_bytes();
        let plane_bytes = raster.plane_bytes();
        let out = raster.data_mut();

        let mut plane_out = 0;
        for frame in frames {
            for slice in slices.clone() {
                for (c, &channel) in channels.iter().enumerate() {
                    let src = &self.planes[self.plane_index(channel, slice, frame)];
                    for (dy, &sy) in rows.iter().enumerate() {
                        for (dx, &sx) in columns.iter().enumerate() {
                            let s = (sy * scene_width + sx) * sample;
                            let d = plane_out * plane_bytes + dy * row_bytes + dx * pixel_bytes + c * sample;
                            out[d..d + sample].copy_from_slice(&src[s..s + sample]);
                        }
                    }
                }
                plane_out += 1;
            }
        }

        Ok(raster)
    }
}
