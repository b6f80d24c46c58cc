//! Drawing whole meshes: the single-threaded pass and the tiled renderer.
//!
//! `Renderer` splits the frame into horizontal bands. Every band is rendered by
//! one pool job into a target that owns exactly the band's pixels, so no two
//! jobs can ever touch the same pixel, and the finished bands are pasted into
//! the frame on the calling thread.

use std::sync::mpsc;
use std::sync::Arc;

use log::debug;
use nalgebra::vector;
use threadpool::ThreadPool;

use crate::config::RenderConfig;
use crate::error::{RenderError, Result};
use crate::framebuffer::{Color, Framebuffer, Region, RenderTarget};
use crate::geometry::Vec2i;
use crate::mesh::Mesh;
use crate::rasterizer::{self, MIN_CLIP_W};
use crate::shader::Shader;
use crate::transform::Transform;

/// Runs the vertex stage and rasterizes every face of `mesh` into `target`.
/// Returns the number of committed pixels.
pub fn draw_mesh<M, S>(mesh: &M, transform: &Transform, shader: &mut S, target: &mut RenderTarget) -> usize
where
    M: Mesh + ?Sized,
    S: Shader<M> + ?Sized,
{
    let mut written = 0;
    for face in 0..mesh.face_count() {
        let clip = [0, 1, 2].map(|slot| shader.vertex(mesh, transform, face, slot));
        written += rasterizer::triangle(clip, &transform.viewport, &*shader, mesh, target);
    }
    debug!(
        "{} faces drawn into {:?}, {} pixels written",
        mesh.face_count(),
        target.region(),
        written
    );
    return written;
}

/// Draws the edges of every face that is fully in front of the camera.
/// No depth test, no culling.
pub fn draw_wireframe<M>(mesh: &M, transform: &Transform, framebuffer: &mut Framebuffer, color: Color)
where
    M: Mesh + ?Sized,
{
    for face in 0..mesh.face_count() {
        let clip = [0, 1, 2].map(|slot| transform.clip(mesh.face_vertex(face, slot)));
        if clip.iter().any(|v| v.w <= MIN_CLIP_W) {
            continue;
        }
        let screen: [Vec2i; 3] = clip.map(|v| {
            let p = transform.screen(v);
            vector![p.x.round() as i32, p.y.round() as i32]
        });
        for i in 0..3 {
            rasterizer::line(screen[i], screen[(i + 1) % 3], framebuffer, color);
        }
    }
}

/// Renders frames on a worker pool, one job per horizontal tile.
pub struct Renderer {
    config: RenderConfig,
    pool: ThreadPool,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPool::with_name(String::from("tile renderer"), config.threads);
        return Ok(Self { config, pool });
    }

    pub fn config(&self) -> &RenderConfig {
        return &self.config;
    }

    /// Bottom to top bands covering the frame without overlap.
    pub fn tiles(&self) -> Vec<Region> {
        let (width, height) = (self.config.width, self.config.height);
        let mut tiles = Vec::new();
        let mut y = 0;
        while y < height {
            let rows = self.config.tile_height.min(height - y);
            tiles.push(Region::new(0, y as i32, width, rows));
            y += rows;
        }
        return tiles;
    }

    /// Renders a full frame. Every job gets its own copy of the shader, so
    /// varyings never leak between threads.
    pub fn render<M, S>(&self, mesh: &Arc<M>, transform: &Transform, shader: &S) -> Result<RenderTarget>
    where
        M: Mesh + Send + Sync + 'static,
        S: Shader<M> + Clone + Send + 'static,
    {
        // Allocate the frame up front so an oversized frame fails before any work is queued.
        let mut frame = RenderTarget::new(self.config.frame(), self.config.depth_test)?;
        let tiles = self.tiles();
        let expected = tiles.len();

        let (sender, receiver) = mpsc::channel();
        for tile in tiles {
            let sender = sender.clone();
            let mesh = Arc::clone(mesh);
            let transform = *transform;
            let mut shader = shader.clone();
            let depth_test = self.config.depth_test;
            // @OPTI every job reruns the vertex stage over the whole mesh, binning faces
            // by tile first would skip the faces a band can never see.
            self.pool.execute(move || {
                let result = RenderTarget::new(tile, depth_test).map(|mut target| {
                    let written = draw_mesh(&*mesh, &transform, &mut shader, &mut target);
                    (target, written)
                });
                let _ = sender.send(result);
            });
        }
        // Only the jobs hold senders now, recv fails once a job died without reporting.
        drop(sender);

        let mut written = 0;
        for received in 0..expected {
            let (tile, tile_written) = receiver
                .recv()
                .map_err(|_| RenderError::WorkerLost { received, expected })??;
            frame.blit(&tile);
            written += tile_written;
        }
        debug!("frame of {} tiles done, {} pixels written", expected, written);
        return Ok(frame);
    }
}
