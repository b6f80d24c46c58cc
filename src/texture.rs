use std::path::Path;

use image::RgbImage;

use crate::error::Result;
use crate::framebuffer::{Color, WHITE};
use crate::geometry::Vec2f;

/// rgb8 texture sampled with uv coordinates, (0, 0) at the bottom left.
#[derive(Debug, Clone)]
pub struct Texture {
    image: RgbImage,
}

impl Texture {
    pub fn new(image: RgbImage) -> Self {
        return Self { image };
    }

    /// Decodes any format the image crate understands (tga included).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let image = image::open(path)?.to_rgb8();
        return Ok(Self::new(image));
    }

    /// 1x1 white texture, so untextured meshes shade as plain white.
    pub fn blank() -> Self {
        return Self::new(RgbImage::from_pixel(1, 1, WHITE));
    }

    pub fn width(&self) -> u32 {
        return self.image.width();
    }

    pub fn height(&self) -> u32 {
        return self.image.height();
    }

    /// Texel at (x, y) counted from the bottom left, clamped to the edges.
    pub fn get(&self, x: i32, y: i32) -> Color {
        let x = x.clamp(0, self.width() as i32 - 1) as u32;
        let y = y.clamp(0, self.height() as i32 - 1) as u32;
        // Image rows are stored top to bottom.
        return *self.image.get_pixel(x, self.height() - 1 - y);
    }

    /// Nearest texel lookup: uv scaled by the texture size.
    pub fn sample(&self, uv: Vec2f) -> Color {
        let x = (uv.x * self.width() as f32).floor() as i32;
        let y = (uv.y * self.height() as f32).floor() as i32;
        return self.get(x, y);
    }
}
