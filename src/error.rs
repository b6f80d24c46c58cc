//! Error types for model loading and frame setup.
//!
//! Per-triangle problems (degenerate area, vertices behind the camera) are not
//! errors: the rasterizer skips those triangles and keeps going.

use thiserror::Error;

/// Error type for everything in the crate that can fail.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse obj: {0}")]
    Obj(#[from] obj::ObjError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Faces must be triangles.
    #[error("face {face} has {count} vertices, the mesh must be triangulated")]
    NonTriangularFace { face: usize, count: usize },

    /// A face refers to a vertex attribute that does not exist.
    #[error("face {face} refers to {what} {index}, but only {len} are present")]
    IndexOutOfRange {
        face: usize,
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Frame or depth buffer could not be allocated.
    #[error("failed to allocate {what} for {pixels} pixels")]
    Allocation { what: &'static str, pixels: usize },

    #[error("degenerate camera: {0}")]
    DegenerateCamera(&'static str),

    /// A pool job died before sending its tile back.
    #[error("render worker exited before finishing its tile ({received} of {expected} tiles received)")]
    WorkerLost { received: usize, expected: usize },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RenderError>;
