use std::thread;

use crate::error::{RenderError, Result};
use crate::framebuffer::{DepthTest, Region};

/// Frame size and how the renderer splits its work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Worker threads in the pool.
    pub threads: usize,
    /// Height in rows of every horizontal tile, the last one may be shorter.
    pub tile_height: u32,
    pub depth_test: DepthTest,
}

impl RenderConfig {
    /// Default settings for a frame of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        return Self {
            width,
            height,
            ..Self::default()
        };
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidDimensions(format!(
                "frame {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.width > i32::MAX as u32 || self.height > i32::MAX as u32 {
            return Err(RenderError::InvalidDimensions(format!(
                "frame {}x{} exceeds the addressable range",
                self.width, self.height
            )));
        }
        if self.threads == 0 {
            return Err(RenderError::InvalidDimensions(String::from("at least one worker thread is needed")));
        }
        if self.tile_height == 0 {
            return Err(RenderError::InvalidDimensions(String::from("tile height must be positive")));
        }
        return Ok(());
    }

    /// The whole frame as a region.
    pub fn frame(&self) -> Region {
        return Region::frame(self.width, self.height);
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        let threads = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        return Self {
            width: 800,
            height: 800,
            threads,
            tile_height: 32,
            depth_test: DepthTest::Greater,
        };
    }
}
