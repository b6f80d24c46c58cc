//! Camera matrices and the per-frame transform context.
//!
//! The camera looks down its local -z axis. After `look_at` the center of
//! interest sits at the origin and the eye at z = focal distance; `perspective`
//! then sets w = 1 - z / f, so the center keeps its size, points nearer the eye
//! get bigger and points at or behind the eye end up with w <= 0.

use nalgebra::{matrix, vector};

use crate::error::{RenderError, Result};
use crate::framebuffer::Region;
use crate::geometry::{from_hom_point, normalized, to_hom_point, Cofactor, Mat4f, Vec3f, Vec4f};

/// View matrix: rotation into the camera basis composed with a translation
/// moving `center` to the origin.
///
/// Basis: forward n = eye - center, right l = up x n, true up m = n x l.
/// Fails when `up` is parallel to the viewing direction or eye == center.
pub fn look_at(eye: Vec3f, center: Vec3f, up: Vec3f) -> Result<Mat4f> {
    let n = normalized(eye - center)
        .ok_or(RenderError::DegenerateCamera("eye and center coincide"))?;
    let l = normalized(up.cross(&n))
        .ok_or(RenderError::DegenerateCamera("up is parallel to the view direction"))?;
    let m = normalized(n.cross(&l))
        .ok_or(RenderError::DegenerateCamera("up is parallel to the view direction"))?;
    let rotation = matrix![l.x, l.y, l.z, 0.0;
                           m.x, m.y, m.z, 0.0;
                           n.x, n.y, n.z, 0.0;
                           0.0, 0.0, 0.0, 1.0];
    let translation = matrix![1.0, 0.0, 0.0, -center.x;
                              0.0, 1.0, 0.0, -center.y;
                              0.0, 0.0, 1.0, -center.z;
                              0.0, 0.0, 0.0, 1.0];
    return Ok(rotation * translation);
}

/// Perspective matrix producing w = 1 - z / focal_distance.
pub fn perspective(focal_distance: f32) -> Mat4f {
    let coef = -1.0 / focal_distance;
    return matrix![1.0, 0.0, 0.0,  0.0;
                   0.0, 1.0, 0.0,  0.0;
                   0.0, 0.0, 1.0,  0.0;
                   0.0, 0.0, coef, 1.0];
}

/// Maps [-1, 1]^2 to the pixel rectangle [x, x + w] x [y, y + h], z unchanged.
pub fn viewport(x: i32, y: i32, w: u32, h: u32) -> Mat4f {
    let (x, y, w, h) = (x as f32, y as f32, w as f32, h as f32);
    return matrix![w / 2.0, 0.0,     0.0, x + w / 2.0;
                   0.0,     h / 2.0, 0.0, y + h / 2.0;
                   0.0,     0.0,     1.0, 0.0;
                   0.0,     0.0,     0.0, 1.0];
}

/// Camera placement and projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3f,
    pub center: Vec3f,
    pub up: Vec3f,
    /// Pixel rectangle the normalized device coordinates map onto.
    pub viewport: Region,
    /// Perspective distance. Defaults to |eye - center|.
    pub focal_distance: Option<f32>,
}

impl Camera {
    pub fn new(eye: Vec3f, center: Vec3f, up: Vec3f, viewport: Region) -> Self {
        return Self {
            eye,
            center,
            up,
            viewport,
            focal_distance: None,
        };
    }

    pub fn focal_distance(&self) -> f32 {
        return self.focal_distance.unwrap_or_else(|| (self.eye - self.center).norm());
    }
}

impl Default for Camera {
    fn default() -> Self {
        return Self::new(
            vector![1.0, 1.0, 3.0],
            vector![0.0, 0.0, 0.0],
            vector![0.0, 1.0, 0.0],
            Region::frame(800, 800),
        );
    }
}

/// Matrices for one rendering pass, built once per frame and passed to every
/// draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub model_view: Mat4f,
    pub perspective: Mat4f,
    pub viewport: Mat4f,
    /// Inverse transpose of `model_view`, applied to normals.
    pub normal: Mat4f,
}

impl Transform {
    pub fn from_camera(camera: &Camera) -> Result<Self> {
        let focal_distance = camera.focal_distance();
        if !focal_distance.is_finite() || focal_distance <= 0.0 {
            return Err(RenderError::DegenerateCamera("focal distance must be positive"));
        }
        let region = camera.viewport;
        let model_view = look_at(camera.eye, camera.center, camera.up)?;
        let normal = model_view
            .cofactor_inverse_transpose()
            .ok_or(RenderError::DegenerateCamera("view matrix is singular"))?;
        return Ok(Self {
            model_view,
            perspective: perspective(focal_distance),
            viewport: viewport(region.x, region.y, region.width, region.height),
            normal,
        });
    }

    /// Object space point to clip space.
    pub fn clip(&self, point: Vec3f) -> Vec4f {
        return self.perspective * self.model_view * to_hom_point(point);
    }

    /// Clip space to screen space: perspective division, then viewport.
    /// x, y are pixel coordinates and z the window depth.
    pub fn screen(&self, clip: Vec4f) -> Vec3f {
        return from_hom_point(self.viewport * to_hom_point(from_hom_point(clip)));
    }
}
