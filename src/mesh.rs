//! Mesh data the pipeline reads from.
//!
//! The rasterizer and shaders only go through the `Mesh` trait. `Model` is the
//! implementation used by the binary and the tests: built in memory, or parsed
//! from a Wavefront obj file with a diffuse texture next to it.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{info, warn};
use nalgebra::vector;
use obj::raw::object::Polygon;
use obj::raw::{parse_obj, RawObj};

use crate::error::{RenderError, Result};
use crate::geometry::{normalized, Vec2f, Vec3f};
use crate::texture::Texture;

/// Read access to a triangulated mesh.
pub trait Mesh {
    fn vertex_count(&self) -> usize;
    fn face_count(&self) -> usize;
    /// Position by vertex index.
    fn vertex(&self, index: usize) -> Vec3f;
    /// Position of the `slot`-th (0..3) vertex of a face.
    fn face_vertex(&self, face: usize, slot: usize) -> Vec3f;
    fn tex_coord(&self, face: usize, slot: usize) -> Vec2f;
    fn normal(&self, face: usize, slot: usize) -> Vec3f;
    fn diffuse(&self) -> &Texture;
}

/// Attribute indices of one corner of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: usize,
    pub tex_coord: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceVertex {
    pub fn new(position: usize, tex_coord: Option<usize>, normal: Option<usize>) -> Self {
        return Self { position, tex_coord, normal };
    }
}

/// Indexed triangle mesh with a diffuse texture.
#[derive(Debug, Clone)]
pub struct Model {
    positions: Vec<Vec3f>,
    tex_coords: Vec<Vec2f>,
    normals: Vec<Vec3f>,
    faces: Vec<[FaceVertex; 3]>,
    diffuse: Texture,
}

impl Model {
    /// Builds a model, checking that every face index is in range.
    pub fn new(
        positions: Vec<Vec3f>,
        tex_coords: Vec<Vec2f>,
        normals: Vec<Vec3f>,
        faces: Vec<[FaceVertex; 3]>,
    ) -> Result<Self> {
        fn check(face: usize, what: &'static str, index: usize, len: usize) -> Result<()> {
            if index >= len {
                return Err(RenderError::IndexOutOfRange { face, what, index, len });
            }
            return Ok(());
        }

        for (face, corners) in faces.iter().enumerate() {
            for corner in corners {
                check(face, "position", corner.position, positions.len())?;
                if let Some(index) = corner.tex_coord {
                    check(face, "texture coordinate", index, tex_coords.len())?;
                }
                if let Some(index) = corner.normal {
                    check(face, "normal", index, normals.len())?;
                }
            }
        }

        return Ok(Self {
            positions,
            tex_coords,
            normals,
            faces,
            diffuse: Texture::blank(),
        });
    }

    /// Model where every triangle uses the same index for position and,
    /// when `tex_coords` is not empty, for texture coordinate.
    pub fn from_triangles(
        positions: Vec<Vec3f>,
        tex_coords: Vec<Vec2f>,
        triangles: Vec<[usize; 3]>,
    ) -> Result<Self> {
        let textured = !tex_coords.is_empty();
        let faces = triangles
            .iter()
            .map(|triangle| triangle.map(|i| FaceVertex::new(i, textured.then_some(i), None)))
            .collect();
        return Self::new(positions, tex_coords, Vec::new(), faces);
    }

    pub fn with_diffuse(mut self, diffuse: Texture) -> Self {
        self.diffuse = diffuse;
        return self;
    }

    /// Parses Wavefront obj data. Every face must be a triangle.
    pub fn from_obj<R: BufRead>(reader: R) -> Result<Self> {
        let raw: RawObj = parse_obj(reader)?;

        let positions = raw.positions.iter().map(|&(x, y, z, _)| vector![x, y, z]).collect();
        let tex_coords = raw.tex_coords.iter().map(|&(u, v, _)| vector![u, v]).collect();
        let normals = raw.normals.iter().map(|&(x, y, z)| vector![x, y, z]).collect();

        let mut faces = Vec::with_capacity(raw.polygons.len());
        for (face, polygon) in raw.polygons.iter().enumerate() {
            let corners: Vec<FaceVertex> = match polygon {
                Polygon::P(p) => p.iter().map(|&v| FaceVertex::new(v, None, None)).collect(),
                Polygon::PT(p) => p.iter().map(|&(v, t)| FaceVertex::new(v, Some(t), None)).collect(),
                Polygon::PN(p) => p.iter().map(|&(v, n)| FaceVertex::new(v, None, Some(n))).collect(),
                Polygon::PTN(p) => p
                    .iter()
                    .map(|&(v, t, n)| FaceVertex::new(v, Some(t), Some(n)))
                    .collect(),
            };
            let triangle: [FaceVertex; 3] = corners
                .try_into()
                .map_err(|corners: Vec<FaceVertex>| RenderError::NonTriangularFace {
                    face,
                    count: corners.len(),
                })?;
            faces.push(triangle);
        }

        return Self::new(positions, tex_coords, normals, faces);
    }

    /// Loads an obj file and `<stem>_diffuse.tga` next to it. A missing
    /// diffuse map falls back to a blank texture.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let model = Self::from_obj(BufReader::new(File::open(path)?))?;
        info!("Number of vertices - {}", model.vertex_count());
        info!("Number of faces    - {}", model.face_count());

        let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default();
        let diffuse_path = path.with_file_name(format!("{}_diffuse.tga", stem));
        if !diffuse_path.exists() {
            warn!("no diffuse map at {}, using a blank texture", diffuse_path.display());
            return Ok(model);
        }
        let diffuse = Texture::load(&diffuse_path)?;
        info!(
            "Diffuse map {} - {}x{}",
            diffuse_path.display(),
            diffuse.width(),
            diffuse.height()
        );
        return Ok(model.with_diffuse(diffuse));
    }

    /// Unit normal of the face plane, zero for degenerate faces.
    pub fn face_normal(&self, face: usize) -> Vec3f {
        let a = self.face_vertex(face, 0);
        let b = self.face_vertex(face, 1);
        let c = self.face_vertex(face, 2);
        return normalized((b - a).cross(&(c - a))).unwrap_or_else(Vec3f::zeros);
    }
}

impl Mesh for Model {
    fn vertex_count(&self) -> usize {
        return self.positions.len();
    }

    fn face_count(&self) -> usize {
        return self.faces.len();
    }

    fn vertex(&self, index: usize) -> Vec3f {
        return self.positions[index];
    }

    fn face_vertex(&self, face: usize, slot: usize) -> Vec3f {
        return self.positions[self.faces[face][slot].position];
    }

    /// Zero when the face has no texture coordinates.
    fn tex_coord(&self, face: usize, slot: usize) -> Vec2f {
        match self.faces[face][slot].tex_coord {
            Some(index) => self.tex_coords[index],
            None => Vec2f::zeros(),
        }
    }

    /// Falls back to the face normal when the obj file has none.
    fn normal(&self, face: usize, slot: usize) -> Vec3f {
        match self.faces[face][slot].normal {
            Some(index) => self.normals[index],
            None => self.face_normal(face),
        }
    }

    fn diffuse(&self) -> &Texture {
        return &self.diffuse;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TRIANGLE_OBJ: &str = "\
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.5 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn parses_triangulated_obj() {
        let model = Model::from_obj(TRIANGLE_OBJ.as_bytes()).unwrap();
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.face_count(), 1);
        assert_relative_eq!(model.face_vertex(0, 1), vector![1.0, -1.0, 0.0]);
        assert_relative_eq!(model.vertex(2), vector![0.0, 1.0, 0.0]);
        assert_relative_eq!(model.tex_coord(0, 2), vector![0.5, 1.0]);
        assert_relative_eq!(model.normal(0, 0), vector![0.0, 0.0, 1.0]);
        assert_eq!(model.diffuse().width(), 1);
    }

    #[test]
    fn rejects_quads() {
        let quad = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        match Model::from_obj(quad.as_bytes()) {
            Err(RenderError::NonTriangularFace { face, count }) => {
                assert_eq!(face, 0);
                assert_eq!(count, 4);
            }
            other => panic!("expected a non-triangular face error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let result = Model::from_triangles(vec![Vec3f::zeros(); 2], Vec::new(), vec![[0, 1, 2]]);
        assert!(matches!(
            result,
            Err(RenderError::IndexOutOfRange { what: "position", index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn missing_attributes_have_defaults() {
        let model = Model::from_triangles(
            vec![vector![0.0, 0.0, 0.0], vector![1.0, 0.0, 0.0], vector![0.0, 1.0, 0.0]],
            Vec::new(),
            vec![[0, 1, 2]],
        )
        .unwrap();
        assert_relative_eq!(model.tex_coord(0, 1), Vec2f::zeros());
        assert_relative_eq!(model.normal(0, 1), vector![0.0, 0.0, 1.0]);
    }
}
