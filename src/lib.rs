//! Small CPU software rasterizer.
//!
//! A frame goes through the usual stages: a `Shader` turns mesh vertices into
//! clip coordinates with the matrices of a `Transform`, the rasterizer culls
//! back faces, walks the covered pixels with barycentric weights, depth tests
//! them against a `DepthBuffer` and asks the shader for a color. `Renderer`
//! does the same over a thread pool, one horizontal tile per job.

pub mod config;
pub mod error;
pub mod framebuffer;
pub mod geometry;
pub mod mesh;
pub mod rasterizer;
pub mod render;
pub mod shader;
pub mod texture;
pub mod transform;

pub use config::RenderConfig;
pub use error::{RenderError, Result};
pub use framebuffer::{Color, DepthBuffer, DepthTest, Framebuffer, Region, RenderTarget};
pub use mesh::{Mesh, Model};
pub use render::{draw_mesh, draw_wireframe, Renderer};
pub use shader::{FlatShader, GouraudShader, Shader, TextureShader};
pub use texture::Texture;
pub use transform::{Camera, Transform};
