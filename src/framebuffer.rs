//! Frame buffer and depth buffer the rasterizer writes into.
//!
//! Both buffers cover a `Region` of the screen, addressed with global pixel
//! coordinates with (0, 0) at the bottom left. A full frame is just the region
//! at the origin with the frame size; the parallel renderer hands every worker
//! a horizontal band of the frame instead.

use image::{ImageBuffer, Luma, Rgb, RgbImage};

use crate::error::{RenderError, Result};

/// Raw rgb8 pixel data.
pub type Color = Rgb<u8>;

pub const BLACK: Color = Rgb([0, 0, 0]);
pub const WHITE: Color = Rgb([255, 255, 255]);
pub const RED: Color = Rgb([255, 0, 0]);
pub const GREEN: Color = Rgb([0, 255, 0]);
pub const BLUE: Color = Rgb([64, 128, 255]);

/// Get convex combination of two colors: t * c_1 + (1 - t) * c_2.
/// t is unrestricted, channels saturate.
pub fn color_blend(color_1: Color, color_2: Color, t: f32) -> Color {
    let mix = |a: u8, b: u8| (t * a as f32 + (1.0 - t) * b as f32).clamp(0.0, 255.0) as u8;
    return Rgb([
        mix(color_1[0], color_2[0]),
        mix(color_1[1], color_2[1]),
        mix(color_1[2], color_2[2]),
    ]);
}

/// Rectangle of pixels in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        return Self { x, y, width, height };
    }

    /// Region at the origin covering a whole frame.
    pub fn frame(width: u32, height: u32) -> Self {
        return Self::new(0, 0, width, height);
    }

    /// Last column inside the region.
    pub fn max_x(&self) -> i32 {
        return self.x + self.width as i32 - 1;
    }

    /// Last row inside the region.
    pub fn max_y(&self) -> i32 {
        return self.y + self.height as i32 - 1;
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        return x >= self.x && x <= self.max_x() && y >= self.y && y <= self.max_y();
    }

    /// Number of pixels, with zero sized and overflowing regions rejected.
    fn pixel_count(&self) -> Result<usize> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidDimensions(format!(
                "region {}x{} is empty",
                self.width, self.height
            )));
        }
        return (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or_else(|| {
                RenderError::InvalidDimensions(format!(
                    "region {}x{} overflows",
                    self.width, self.height
                ))
            });
    }

    /// Flat index of a pixel, rows stored bottom to top.
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.contains(x, y) {
            return None;
        }
        let local_x = (x - self.x) as usize;
        let local_y = (y - self.y) as usize;
        return Some(local_x + local_y * self.width as usize);
    }
}

/// Allocates a buffer of `len` copies of `value`, reporting allocation failure
/// instead of aborting.
fn try_filled<T: Clone>(len: usize, value: T, what: &'static str) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| RenderError::Allocation { what, pixels: len })?;
    buffer.resize(len, value);
    return Ok(buffer);
}

/// rgb8 color buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    region: Region,
    pixels: Vec<Color>,
}

impl Framebuffer {
    /// Frame buffer filled with black.
    pub fn new(region: Region) -> Result<Self> {
        let pixels = try_filled(region.pixel_count()?, BLACK, "frame buffer")?;
        return Ok(Self { region, pixels });
    }

    pub fn region(&self) -> Region {
        return self.region;
    }

    pub fn width(&self) -> u32 {
        return self.region.width;
    }

    pub fn height(&self) -> u32 {
        return self.region.height;
    }

    /// Sets pixel to a color at specified coordinate.
    /// Returns false if the coordinate is outside of the buffer.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        match self.region.index(x, y) {
            Some(index) => {
                self.pixels[index] = color;
                return true;
            }
            None => return false,
        }
    }

    /// Color at the coordinate, `None` outside of the buffer.
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Color> {
        return self.region.index(x, y).map(|index| self.pixels[index]);
    }

    /// Sets all pixels to a single color.
    pub fn fill(&mut self, color: Color) {
        self.pixels.iter_mut().for_each(|pixel| *pixel = color);
    }

    /// Copies every pixel of `other` that falls inside this buffer.
    pub fn blit(&mut self, other: &Framebuffer) {
        let source = other.region;
        for y in source.y..=source.max_y() {
            for x in source.x..=source.max_x() {
                if let Some(color) = other.get_pixel(x, y) {
                    self.set_pixel(x, y, color);
                }
            }
        }
    }

    /// Image with the usual top-down row order, ready for display or encoding.
    pub fn to_image(&self) -> RgbImage {
        let (width, height) = (self.region.width, self.region.height);
        return ImageBuffer::from_fn(width, height, |col, row| {
            self.pixels[col as usize + (height - 1 - row) as usize * width as usize]
        });
    }

    /// Encodes the buffer to a file, format picked by the extension.
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        self.to_image().save(path)?;
        return Ok(());
    }
}

/// Which side of a depth comparison counts as nearer to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthTest {
    /// Higher values are nearer. Matches the window depth produced by
    /// `transform::perspective`, where the camera looks down -z.
    #[default]
    Greater,
    /// Lower values are nearer.
    Less,
}

impl DepthTest {
    /// Value meaning no surface seen yet.
    pub fn sentinel(self) -> f32 {
        match self {
            DepthTest::Greater => f32::MIN,
            DepthTest::Less => f32::MAX,
        }
    }

    /// Strict comparison, so equal depth never overwrites.
    pub fn passes(self, new: f32, old: f32) -> bool {
        match self {
            DepthTest::Greater => new > old,
            DepthTest::Less => new < old,
        }
    }
}

/// Per-pixel depth buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffer {
    region: Region,
    test: DepthTest,
    values: Vec<f32>,
}

impl DepthBuffer {
    pub fn new(region: Region, test: DepthTest) -> Result<Self> {
        let values = try_filled(region.pixel_count()?, test.sentinel(), "depth buffer")?;
        return Ok(Self { region, test, values });
    }

    pub fn test(&self) -> DepthTest {
        return self.test;
    }

    pub fn get(&self, x: i32, y: i32) -> Option<f32> {
        return self.region.index(x, y).map(|index| self.values[index]);
    }

    /// Resets every pixel to the sentinel.
    pub fn clear(&mut self) {
        let sentinel = self.test.sentinel();
        self.values.iter_mut().for_each(|value| *value = sentinel);
    }

    /// True if a fragment at `depth` would be visible. Pixels outside of the
    /// buffer never pass.
    pub fn passes(&self, x: i32, y: i32, depth: f32) -> bool {
        match self.region.index(x, y) {
            Some(index) => self.test.passes(depth, self.values[index]),
            None => false,
        }
    }

    /// Compare and write in one step. Returns whether the value was stored.
    pub fn test_and_set(&mut self, x: i32, y: i32, depth: f32) -> bool {
        let Some(index) = self.region.index(x, y) else {
            return false;
        };
        if !self.test.passes(depth, self.values[index]) {
            return false;
        }
        self.values[index] = depth;
        return true;
    }

    /// Copies every value of `other` that falls inside this buffer, without
    /// depth testing.
    pub fn blit(&mut self, other: &DepthBuffer) {
        let source = other.region;
        for y in source.y..=source.max_y() {
            for x in source.x..=source.max_x() {
                if let (Some(from), Some(to)) = (source.index(x, y), self.region.index(x, y)) {
                    self.values[to] = other.values[from];
                }
            }
        }
    }

    /// Grayscale picture of the buffer, nearest surfaces brightest. Pixels
    /// that never got a surface stay black.
    pub fn to_image(&self) -> ImageBuffer<Luma<u8>, Vec<u8>> {
        let sentinel = self.test.sentinel();
        let (z_min, z_max) = self
            .values
            .iter()
            .filter(|value| **value != sentinel)
            .fold((f32::MAX, f32::MIN), |(lo, hi), value| (lo.min(*value), hi.max(*value)));
        let scale = if z_max > z_min { z_max - z_min } else { 1.0 };
        let (width, height) = (self.region.width, self.region.height);
        return ImageBuffer::from_fn(width, height, |col, row| {
            let value = self.values[col as usize + (height - 1 - row) as usize * width as usize];
            if value == sentinel {
                return Luma([0]);
            }
            let t = (value - z_min) / scale;
            let nearness = match self.test {
                DepthTest::Greater => t,
                DepthTest::Less => 1.0 - t,
            };
            // Keep the farthest surface distinguishable from the background.
            return Luma([(32.0 + nearness * 223.0) as u8]);
        });
    }
}

/// Color and depth buffers covering the same region.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    pub color: Framebuffer,
    pub depth: DepthBuffer,
}

impl RenderTarget {
    pub fn new(region: Region, test: DepthTest) -> Result<Self> {
        return Ok(Self {
            color: Framebuffer::new(region)?,
            depth: DepthBuffer::new(region, test)?,
        });
    }

    pub fn region(&self) -> Region {
        return self.color.region();
    }

    /// Clears color to black and depth to the sentinel.
    pub fn clear(&mut self) {
        self.color.fill(BLACK);
        self.depth.clear();
    }

    /// Read old depth, compare, write depth and color. Returns whether the
    /// fragment was committed.
    pub fn commit(&mut self, x: i32, y: i32, depth: f32, color: Color) -> bool {
        if !self.depth.test_and_set(x, y, depth) {
            return false;
        }
        return self.color.set_pixel(x, y, color);
    }

    /// Pastes a tile rendered separately into this target.
    pub fn blit(&mut self, tile: &RenderTarget) {
        self.color.blit(&tile.color);
        self.depth.blit(&tile.depth);
    }
}
