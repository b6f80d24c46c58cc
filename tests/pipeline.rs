use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use image::{Rgb, RgbImage};
use nalgebra::{vector, Matrix2x3};

use tiny_gl::framebuffer::{BLACK, RED};
use tiny_gl::geometry::{Vec3f, Vec4f};
use tiny_gl::{
    draw_mesh, Camera, Color, DepthTest, FlatShader, Mesh, Model, Region, RenderConfig, RenderTarget,
    Renderer, Shader, Texture, TextureShader, Transform,
};

/// Writes the interpolated v texture coordinate to the red channel and marks
/// coverage with full green.
#[derive(Debug, Clone, Default)]
struct VShader {
    varying_uv: Matrix2x3<f32>,
}

impl<M: Mesh + ?Sized> Shader<M> for VShader {
    fn vertex(&mut self, mesh: &M, uniforms: &Transform, face: usize, slot: usize) -> Vec4f {
        self.varying_uv.set_column(slot, &mesh.tex_coord(face, slot));
        return uniforms.clip(mesh.face_vertex(face, slot));
    }

    fn fragment(&self, _mesh: &M, bar: Vec3f) -> Option<Color> {
        let uv = self.varying_uv * bar;
        return Some(Rgb([(uv.y * 255.0).round() as u8, 255, 0]));
    }
}

/// Unit square on the y = 0 plane, v = 0 along the near edge (z = 1) and
/// v = 1 along the far one.
fn floor_quad() -> Model {
    let positions = vec![
        vector![-1.0, 0.0, 1.0],  // near left
        vector![1.0, 0.0, 1.0],   // near right
        vector![1.0, 0.0, -1.0],  // far right
        vector![-1.0, 0.0, -1.0], // far left
    ];
    let tex_coords = vec![vector![0.0, 0.0], vector![1.0, 0.0], vector![1.0, 1.0], vector![0.0, 1.0]];
    return Model::from_triangles(positions, tex_coords, vec![[0, 1, 2], [0, 2, 3]]).unwrap();
}

fn oblique_camera(size: u32) -> Transform {
    let camera = Camera::new(
        vector![0.0, 1.0, 2.0],
        vector![0.0, 0.0, 0.0],
        vector![0.0, 1.0, 0.0],
        Region::frame(size, size),
    );
    return Transform::from_camera(&camera).unwrap();
}

fn checker_texture() -> Texture {
    let image = RgbImage::from_fn(8, 8, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([200, 40, 40])
        } else {
            Rgb([40, 40, 200])
        }
    });
    return Texture::new(image);
}

#[test]
fn oblique_quad_is_perspective_correct() {
    let transform = oblique_camera(100);
    let mut target = RenderTarget::new(Region::frame(100, 100), DepthTest::Greater).unwrap();
    draw_mesh(&floor_quad(), &transform, &mut VShader::default(), &mut target);

    let covered: Vec<i32> = (0..100)
        .filter(|&y| target.color.get_pixel(50, y).map(|c| c[1]) == Some(255))
        .collect();
    let (first, last) = (covered[0], covered[covered.len() - 1]);
    // The near edge lands around row 13 and the far edge around row 66.
    assert!(first > 5 && first < 20, "first covered row {}", first);
    assert!(last > 60 && last < 72, "last covered row {}", last);

    // The near half of the quad takes more than half of the screen, so the
    // middle row sees v near 0.3 where screen space interpolation gives 0.5.
    let middle = (first + last) / 2;
    let v = target.color.get_pixel(50, middle).unwrap()[0] as f32 / 255.0;
    assert!(v > 0.2 && v < 0.4, "v = {} at row {}", v, middle);
    assert!((v - 0.5).abs() > 0.1);

    // v grows monotonically towards the far edge.
    let values: Vec<u8> = covered.iter().map(|&y| target.color.get_pixel(50, y).unwrap()[0]).collect();
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn occlusion_does_not_depend_on_draw_order() {
    let positions = vec![
        // Near square at z = 0.5.
        vector![-0.5, -0.5, 0.5],
        vector![0.5, -0.5, 0.5],
        vector![0.5, 0.5, 0.5],
        vector![-0.5, 0.5, 0.5],
        // Far square at z = -0.5, shifted to the right.
        vector![0.0, -0.5, -0.5],
        vector![1.0, -0.5, -0.5],
        vector![1.0, 0.5, -0.5],
        vector![0.0, 0.5, -0.5],
    ];
    let near = [[0, 1, 2], [0, 2, 3]];
    let far = [[4, 5, 6], [4, 6, 7]];
    let near_first = Model::from_triangles(positions.clone(), Vec::new(), [near, far].concat()).unwrap();
    let far_first = Model::from_triangles(positions, Vec::new(), [far, near].concat()).unwrap();

    let camera = Camera::new(
        vector![0.0, 0.0, 3.0],
        vector![0.0, 0.0, 0.0],
        vector![0.0, 1.0, 0.0],
        Region::frame(64, 64),
    );
    let transform = Transform::from_camera(&camera).unwrap();

    let render = |model: &Model| {
        let mut target = RenderTarget::new(Region::frame(64, 64), DepthTest::Greater).unwrap();
        // Color by depth so a wrong winner would show.
        let mut shader = DepthColorShader::default();
        draw_mesh(model, &transform, &mut shader, &mut target);
        target
    };
    let a = render(&near_first);
    let b = render(&far_first);
    assert_eq!(a, b);

    // Overlap of both squares shows the near one.
    let center = transform.screen(transform.clip(vector![0.25, 0.0, 0.5]));
    let pixel = a.color.get_pixel(center.x.round() as i32, center.y.round() as i32).unwrap();
    assert_eq!(pixel, RED);
}

/// Red for faces in front of z = 0, blue behind.
#[derive(Debug, Clone, Default)]
struct DepthColorShader {
    front: bool,
}

impl<M: Mesh + ?Sized> Shader<M> for DepthColorShader {
    fn vertex(&mut self, mesh: &M, uniforms: &Transform, face: usize, slot: usize) -> Vec4f {
        let position = mesh.face_vertex(face, slot);
        self.front = position.z > 0.0;
        return uniforms.clip(position);
    }

    fn fragment(&self, _mesh: &M, _bar: Vec3f) -> Option<Color> {
        return Some(if self.front { RED } else { Rgb([0, 0, 255]) });
    }
}

#[test]
fn tiled_renderer_matches_single_threaded_pass() {
    let transform = oblique_camera(96);
    let model = Arc::new(floor_quad().with_diffuse(checker_texture()));

    let mut single = RenderTarget::new(Region::frame(96, 96), DepthTest::Greater).unwrap();
    let written = draw_mesh(&*model, &transform, &mut TextureShader::new(), &mut single);
    assert!(written > 0);

    for (threads, tile_height) in [(1, 96), (4, 16), (3, 5)] {
        let mut config = RenderConfig::new(96, 96);
        config.threads = threads;
        config.tile_height = tile_height;
        let renderer = Renderer::new(config).unwrap();
        let tiled = renderer.render(&model, &transform, &TextureShader::new()).unwrap();
        assert_eq!(tiled, single, "{} threads, tiles of {} rows", threads, tile_height);
    }
}

#[test]
fn repeated_frames_are_identical() {
    let transform = oblique_camera(64);
    let model = Arc::new(floor_quad());
    let mut config = RenderConfig::new(64, 64);
    config.threads = 2;
    let renderer = Renderer::new(config).unwrap();
    let first = renderer.render(&model, &transform, &FlatShader::new(RED)).unwrap();
    let second = renderer.render(&model, &transform, &FlatShader::new(RED)).unwrap();
    assert_eq!(first, second);
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tiny_gl_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    return dir;
}

const FACING_TRIANGLE_OBJ: &str = "\
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
fn obj_model_with_diffuse_map_renders_textured() {
    let dir = scratch_dir("textured");
    let obj_path = dir.join("triangle.obj");
    fs::write(&obj_path, FACING_TRIANGLE_OBJ).unwrap();
    RgbImage::from_pixel(4, 4, RED).save(dir.join("triangle_diffuse.tga")).unwrap();

    let model = Model::load(&obj_path).unwrap();
    assert_eq!(model.face_count(), 1);
    assert_eq!(model.diffuse().width(), 4);

    let camera = Camera::new(
        vector![0.0, 0.0, 3.0],
        vector![0.0, 0.0, 0.0],
        vector![0.0, 1.0, 0.0],
        Region::frame(40, 40),
    );
    let transform = Transform::from_camera(&camera).unwrap();
    let mut target = RenderTarget::new(Region::frame(40, 40), DepthTest::Greater).unwrap();
    draw_mesh(&model, &transform, &mut TextureShader::new(), &mut target);

    assert_eq!(target.color.get_pixel(20, 15), Some(RED));
    assert_eq!(target.color.get_pixel(1, 38), Some(BLACK));

    let output = dir.join("frame.tga");
    target.color.save(&output).unwrap();
    let saved = image::open(&output).unwrap().to_rgb8();
    // Saved images are top-down.
    assert_eq!(*saved.get_pixel(20, 39 - 15), RED);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_diffuse_map_falls_back_to_white() {
    let dir = scratch_dir("untextured");
    let obj_path = dir.join("bare.obj");
    fs::write(&obj_path, FACING_TRIANGLE_OBJ).unwrap();
    let model = Model::load(&obj_path).unwrap();
    assert_eq!(model.diffuse().sample(vector![0.5, 0.5]), Rgb([255, 255, 255]));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_obj_is_an_io_error() {
    let result = Model::load("does/not/exist.obj");
    assert!(matches!(result, Err(tiny_gl::RenderError::Io(_))));
}
