//! Line and triangle rasterization.
//!
//! Triangles are filled by walking their bounding box (clipped to the target
//! region) and testing every pixel with barycentric weights. A pixel is inside
//! when all three weights are non-negative, so pixels exactly on an edge shared
//! by two triangles are painted by both (no cracks). Only counter-clockwise
//! triangles in screen space (x right, y up) with an area of at least
//! `MIN_TRIANGLE_AREA` are drawn; everything else is culled.
//!
//! All triangle functions return the number of pixels they committed.

use std::cmp::{max, min};

use log::trace;
use nalgebra::{matrix, vector};

use crate::framebuffer::{Color, Framebuffer, Region, RenderTarget};
use crate::geometry::{from_hom_point, to_hom_point, Cofactor, Mat4f, Vec2f, Vec2i, Vec3f, Vec4f};
use crate::mesh::Mesh;
use crate::shader::Shader;

/// Triangles with a smaller signed area (in pixels) are back-facing or degenerate.
pub const MIN_TRIANGLE_AREA: f32 = 1.0;

/// Vertices with a clip w at or below this are at or behind the eye.
pub const MIN_CLIP_W: f32 = 1e-6;

/// Signed area via the shoelace formula, positive for counter-clockwise order.
pub fn signed_triangle_area(a: Vec2f, b: Vec2f, c: Vec2f) -> f32 {
    return 0.5
        * ((b.y - a.y) * (b.x + a.x) + (c.y - b.y) * (c.x + b.x) + (a.y - c.y) * (a.x + c.x));
}

/// Barycentric weights of `p` relative to the triangle, summing to 1.
/// `None` for a degenerate triangle.
pub fn barycentric(p: Vec2f, a: Vec2f, b: Vec2f, c: Vec2f) -> Option<Vec3f> {
    let total = signed_triangle_area(a, b, c);
    if total.abs() < f32::EPSILON {
        return None;
    }
    return Some(vector![
        signed_triangle_area(p, b, c) / total,
        signed_triangle_area(p, c, a) / total,
        signed_triangle_area(p, a, b) / total
    ]);
}

fn to_f32(v: Vec2i) -> Vec2f {
    return vector![v.x as f32, v.y as f32];
}

/// Pixel box around a triangle.
#[derive(Debug)]
struct BoundingBox {
    ll: Vec2i, // lower left corner
    ur: Vec2i, // upper right corner
}

impl BoundingBox {
    /// Box around the points, clipped to the region. `None` when nothing is left.
    fn around(points: &[Vec2f; 3], region: Region) -> Option<Self> {
        let min_x = points.iter().map(|p| p.x).fold(f32::MAX, f32::min);
        let min_y = points.iter().map(|p| p.y).fold(f32::MAX, f32::min);
        let max_x = points.iter().map(|p| p.x).fold(f32::MIN, f32::max);
        let max_y = points.iter().map(|p| p.y).fold(f32::MIN, f32::max);
        let bbox = BoundingBox {
            ll: vector![
                max(min_x.floor() as i32, region.x),
                max(min_y.floor() as i32, region.y)
            ],
            ur: vector![
                min(max_x.ceil() as i32, region.max_x()),
                min(max_y.ceil() as i32, region.max_y())
            ],
        };
        if bbox.ll.x > bbox.ur.x || bbox.ll.y > bbox.ur.y {
            return None;
        }
        return Some(bbox);
    }
}

/// Draws a line between two pixels with Bresenham's algorithm.
///
/// Steep lines are walked along y, and the endpoints are ordered by the walked
/// axis, so a -> b and b -> a light exactly the same pixels.
pub fn line(a: Vec2i, b: Vec2i, framebuffer: &mut Framebuffer, color: Color) {
    let (mut start, mut end) = (a, b);
    let steep = (start.x - end.x).abs() < (start.y - end.y).abs();
    if steep {
        start = start.yx();
        end = end.yx();
    }
    if start.x > end.x {
        std::mem::swap(&mut start, &mut end);
    }

    let dx = end.x - start.x;
    let dy = (end.y - start.y).abs();
    let y_step = if end.y > start.y { 1 } else { -1 };
    let mut y = start.y;
    let mut error = 0;
    for x in start.x..=end.x {
        if steep {
            framebuffer.set_pixel(y, x, color);
        } else {
            framebuffer.set_pixel(x, y, color);
        }
        error += 2 * dy;
        if error > dx {
            y += y_step;
            error -= 2 * dx;
        }
    }
}

/// Fills a 2D triangle with a color, no depth test and either winding.
/// Used for debug drawing.
pub fn triangle_2d(t: [Vec2i; 3], framebuffer: &mut Framebuffer, color: Color) -> usize {
    let (a, mut b, mut c) = (to_f32(t[0]), to_f32(t[1]), to_f32(t[2]));
    let mut total = signed_triangle_area(a, b, c);
    if total.abs() < MIN_TRIANGLE_AREA {
        return 0;
    }
    if total < 0.0 {
        std::mem::swap(&mut b, &mut c);
        total = -total;
    }
    let Some(bbox) = BoundingBox::around(&[a, b, c], framebuffer.region()) else {
        return 0;
    };

    let mut written = 0;
    for x in bbox.ll.x..=bbox.ur.x {
        for y in bbox.ll.y..=bbox.ur.y {
            let p = vector![x as f32, y as f32];
            let alpha = signed_triangle_area(p, b, c) / total;
            let beta = signed_triangle_area(p, c, a) / total;
            let gamma = signed_triangle_area(p, a, b) / total;
            if alpha < 0.0 || beta < 0.0 || gamma < 0.0 {
                continue;
            }
            if framebuffer.set_pixel(x, y, color) {
                written += 1;
            }
        }
    }
    return written;
}

/// Fills a screen space triangle with a color, depth interpolated linearly
/// from the per-vertex `depth`.
pub fn triangle_depth(t: [Vec2i; 3], depth: Vec3f, target: &mut RenderTarget, color: Color) -> usize {
    let (a, b, c) = (to_f32(t[0]), to_f32(t[1]), to_f32(t[2]));
    let total = signed_triangle_area(a, b, c);
    if total < MIN_TRIANGLE_AREA {
        // Back-facing or degenerate.
        return 0;
    }
    let Some(bbox) = BoundingBox::around(&[a, b, c], target.region()) else {
        return 0;
    };

    let mut written = 0;
    for x in bbox.ll.x..=bbox.ur.x {
        for y in bbox.ll.y..=bbox.ur.y {
            let p = vector![x as f32, y as f32];
            let alpha = signed_triangle_area(p, b, c) / total;
            let beta = signed_triangle_area(p, c, a) / total;
            let gamma = signed_triangle_area(p, a, b) / total;
            if alpha < 0.0 || beta < 0.0 || gamma < 0.0 {
                // Outside of the triangle.
                continue;
            }
            let z = alpha * depth.x + beta * depth.y + gamma * depth.z;
            if target.commit(x, y, z, color) {
                written += 1;
            }
        }
    }
    return written;
}

/// Clip space triangle filled with a flat color.
pub fn triangle_flat(clip: [Vec4f; 3], viewport: &Mat4f, target: &mut RenderTarget, color: Color) -> usize {
    return rasterize(clip, viewport, target, |_| Some(color));
}

/// Clip space triangle colored by the fragment stage of `shader`.
///
/// Expects `shader.vertex` to have been called for the three slots of the face
/// that produced `clip`.
pub fn triangle<M, S>(
    clip: [Vec4f; 3],
    viewport: &Mat4f,
    shader: &S,
    mesh: &M,
    target: &mut RenderTarget,
) -> usize
where
    M: Mesh + ?Sized,
    S: Shader<M> + ?Sized,
{
    return rasterize(clip, viewport, target, |bar| shader.fragment(mesh, bar));
}

/// Shared clip space loop.
///
/// Depth is interpolated with screen space weights (window space is where
/// depth is linear), while `fragment` receives the weights corrected by each
/// vertex's 1/w so attributes vary correctly with distance.
fn rasterize<F>(clip: [Vec4f; 3], viewport: &Mat4f, target: &mut RenderTarget, mut fragment: F) -> usize
where
    F: FnMut(Vec3f) -> Option<Color>,
{
    if clip.iter().any(|v| v.w <= MIN_CLIP_W) {
        // No near plane clipping: a triangle touching the eye plane is dropped whole.
        trace!("skipping triangle behind the camera: {:?}", clip.map(|v| v.w));
        return 0;
    }
    let ndc = clip.map(from_hom_point);
    let screen = ndc.map(|v| (viewport * to_hom_point(v)).xy());

    if signed_triangle_area(screen[0], screen[1], screen[2]) < MIN_TRIANGLE_AREA {
        return 0;
    }
    let abc = matrix![screen[0].x, screen[0].y, 1.0;
                      screen[1].x, screen[1].y, 1.0;
                      screen[2].x, screen[2].y, 1.0];
    // Weights of pixel p are (ABC^T)^-1 * (p.x, p.y, 1).
    let Some(to_barycentric) = abc.cofactor_inverse_transpose() else {
        return 0;
    };
    let Some(bbox) = BoundingBox::around(&screen, target.region()) else {
        return 0;
    };
    let depths = vector![ndc[0].z, ndc[1].z, ndc[2].z];
    let inverse_w = vector![1.0 / clip[0].w, 1.0 / clip[1].w, 1.0 / clip[2].w];

    let mut written = 0;
    for x in bbox.ll.x..=bbox.ur.x {
        for y in bbox.ll.y..=bbox.ur.y {
            let bc_screen = to_barycentric * vector![x as f32, y as f32, 1.0];
            if bc_screen.x < 0.0 || bc_screen.y < 0.0 || bc_screen.z < 0.0 {
                continue;
            }
            let z = bc_screen.dot(&depths);
            if !target.depth.passes(x, y, z) {
                continue;
            }
            let bc_clip = bc_screen.component_mul(&inverse_w);
            let bc_clip = bc_clip / (bc_clip.x + bc_clip.y + bc_clip.z);
            let Some(color) = fragment(bc_clip) else {
                continue;
            };
            if target.commit(x, y, z, color) {
                written += 1;
            }
        }
    }
    return written;
}
