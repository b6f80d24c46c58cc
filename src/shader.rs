//! Programmable stages of the pipeline.
//!
//! A shader is driven one triangle at a time: `vertex` is called for slots 0, 1
//! and 2 of a face, then `fragment` for every covered pixel that passed the
//! depth test. Whatever `vertex` stores in the shader (varyings) is only valid
//! for the fragments of that same triangle.

use nalgebra::Matrix2x3;

use crate::framebuffer::{color_blend, Color, BLACK};
use crate::geometry::{normalized, to_hom_vector, Vec3f, Vec4f};
use crate::mesh::Mesh;
use crate::transform::Transform;

pub trait Shader<M: Mesh + ?Sized> {
    /// Projects the `slot`-th vertex of `face` to clip space. May record
    /// per-vertex data for the fragment stage.
    fn vertex(&mut self, mesh: &M, uniforms: &Transform, face: usize, slot: usize) -> Vec4f;

    /// Color of a fragment at perspective corrected barycentric weights.
    /// `None` discards the fragment.
    fn fragment(&self, mesh: &M, bar: Vec3f) -> Option<Color>;
}

/// Constant color, no varyings.
#[derive(Debug, Clone, Copy)]
pub struct FlatShader {
    pub color: Color,
}

impl FlatShader {
    pub fn new(color: Color) -> Self {
        return Self { color };
    }
}

impl<M: Mesh + ?Sized> Shader<M> for FlatShader {
    fn vertex(&mut self, mesh: &M, uniforms: &Transform, face: usize, slot: usize) -> Vec4f {
        return uniforms.clip(mesh.face_vertex(face, slot));
    }

    fn fragment(&self, _mesh: &M, _bar: Vec3f) -> Option<Color> {
        return Some(self.color);
    }
}

/// Nearest lookup into the mesh diffuse texture.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureShader {
    varying_uv: Matrix2x3<f32>, // UV of each vertex as columns.
}

impl TextureShader {
    pub fn new() -> Self {
        return Self::default();
    }
}

impl<M: Mesh + ?Sized> Shader<M> for TextureShader {
    fn vertex(&mut self, mesh: &M, uniforms: &Transform, face: usize, slot: usize) -> Vec4f {
        self.varying_uv.set_column(slot, &mesh.tex_coord(face, slot));
        return uniforms.clip(mesh.face_vertex(face, slot));
    }

    fn fragment(&self, mesh: &M, bar: Vec3f) -> Option<Color> {
        let uv = self.varying_uv * bar;
        return Some(mesh.diffuse().sample(uv));
    }
}

/// Diffuse texture darkened by a per-vertex light intensity, interpolated
/// across the face.
#[derive(Debug, Clone, Copy)]
pub struct GouraudShader {
    // Direction towards the light in world space.
    pub light_direction: Vec3f,
    varying_uv: Matrix2x3<f32>,
    varying_intensity: Vec3f,
}

impl GouraudShader {
    pub fn new(light_direction: Vec3f) -> Self {
        return Self {
            light_direction,
            varying_uv: Matrix2x3::zeros(),
            varying_intensity: Vec3f::zeros(),
        };
    }
}

impl<M: Mesh + ?Sized> Shader<M> for GouraudShader {
    fn vertex(&mut self, mesh: &M, uniforms: &Transform, face: usize, slot: usize) -> Vec4f {
        // Normals and the light are compared in camera space.
        let normal = (uniforms.normal * to_hom_vector(mesh.normal(face, slot))).xyz();
        let light = (uniforms.model_view * to_hom_vector(self.light_direction)).xyz();
        let intensity = match (normalized(normal), normalized(light)) {
            (Some(n), Some(l)) => n.dot(&l).max(0.0),
            _ => 0.0,
        };
        self.varying_intensity[slot] = intensity;
        self.varying_uv.set_column(slot, &mesh.tex_coord(face, slot));
        return uniforms.clip(mesh.face_vertex(face, slot));
    }

    fn fragment(&self, mesh: &M, bar: Vec3f) -> Option<Color> {
        let uv = self.varying_uv * bar;
        let color = mesh.diffuse().sample(uv);
        return Some(color_blend(color, BLACK, bar.dot(&self.varying_intensity)));
    }
}
