use std::str::FromStr;
use std::sync::Arc;
use std::time;

use image::{DynamicImage, RgbImage};
use log::info;
use nalgebra::vector;
use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};

use tiny_gl::framebuffer::WHITE;
use tiny_gl::{
    draw_wireframe, Camera, FlatShader, Framebuffer, GouraudShader, Model, RenderConfig, Renderer,
    TextureShader, Transform,
};

/// Shading used for the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Texture,
    Gouraud,
    Flat,
    Wireframe,
}

impl FromStr for Pipeline {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "default" | "texture" => Ok(Pipeline::Texture),
            "gouraud" => Ok(Pipeline::Gouraud),
            "flat" => Ok(Pipeline::Flat),
            "wireframe" => Ok(Pipeline::Wireframe),
            _ => Err(format!(
                "unknown shader pipeline '{}', expected texture, gouraud, flat or wireframe",
                name
            )),
        }
    }
}

/// Execution parameters collected from the command line.
pub struct Params {
    pub width: u32,
    pub height: u32,
    pub print_fps: bool,
    pub asset_path: String,
    pub shader_pipeline_name: String,
    /// Render once into this file instead of opening a window.
    pub output: Option<String>,
    /// Show the depth buffer instead of the colors.
    pub show_depth: bool,
    /// Worker threads, all cores when not set.
    pub threads: Option<usize>,
}

/// Helper, defining exit event to be an Escape key press.
fn is_exit_event(window_event: event::WindowEvent) -> bool {
    if let event::WindowEvent::KeyboardInput(event) = window_event {
        if event.input.key_code == Some(event::VirtualKeyCode::Escape) && event.input.state.is_released() {
            return true;
        }
    }

    return false;
}

/// Everything a frame needs, set up once.
struct Scene {
    model: Arc<Model>,
    renderer: Renderer,
    transform: Transform,
    pipeline: Pipeline,
    show_depth: bool,
}

impl Scene {
    fn render_frame(&self) -> tiny_gl::Result<RgbImage> {
        let target = match self.pipeline {
            Pipeline::Texture => self.renderer.render(&self.model, &self.transform, &TextureShader::new())?,
            Pipeline::Gouraud => {
                // Light from the upper right front, in world space.
                let shader = GouraudShader::new(vector![1.0, 1.0, 1.0]);
                self.renderer.render(&self.model, &self.transform, &shader)?
            }
            Pipeline::Flat => self.renderer.render(&self.model, &self.transform, &FlatShader::new(WHITE))?,
            Pipeline::Wireframe => {
                let mut framebuffer = Framebuffer::new(self.renderer.config().frame())?;
                draw_wireframe(&*self.model, &self.transform, &mut framebuffer, WHITE);
                return Ok(framebuffer.to_image());
            }
        };
        if self.show_depth {
            return Ok(DynamicImage::ImageLuma8(target.depth.to_image()).to_rgb8());
        }
        return Ok(target.color.to_image());
    }
}

/// Loads the model and either renders a single image to `params.output` or
/// launches the window, redrawing until Escape is pressed.
pub fn run(params: Params) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline: Pipeline = params.shader_pipeline_name.parse()?;
    let model = Arc::new(Model::load(&params.asset_path)?);

    let mut config = RenderConfig::new(params.width, params.height);
    if let Some(threads) = params.threads {
        config.threads = threads;
    }
    let renderer = Renderer::new(config)?;
    info!("Rendering with {} threads, {:?} pipeline", config.threads, pipeline);

    let camera = Camera {
        viewport: config.frame(),
        ..Camera::default()
    };
    let scene = Scene {
        model,
        renderer,
        transform: Transform::from_camera(&camera)?,
        pipeline,
        show_depth: params.show_depth,
    };

    if let Some(output) = params.output {
        scene.render_frame()?.save(&output)?;
        info!("Saved frame to {}", output);
        return Ok(());
    }

    let window_options: WindowOptions = WindowOptions {
        size: Some([params.width, params.height]),
        ..Default::default()
    };
    let window = create_window("output", window_options)?;
    let event_channel = window.event_channel()?;

    let mut exit = false;
    let mut frame_counter_time_begin = time::Instant::now();
    let mut frame_counter: u32 = 0;
    while !exit {
        let image = scene.render_frame()?;
        let image_data = ImageView::new(ImageInfo::rgb8(params.width, params.height), image.as_raw());
        window.set_image("image", image_data)?;

        // Unloading all the garbage from event channel, that has piled up, looking for exit event.
        exit = event_channel.try_iter().fold(false, |was_exit, window_event| {
            is_exit_event(window_event) || was_exit
        });

        if params.print_fps {
            // Counting frames to printout stats every second.
            frame_counter += 1;
            if frame_counter_time_begin.elapsed().as_secs_f32() > 1.0 {
                info!("FPS --- {}", frame_counter);
                frame_counter_time_begin = time::Instant::now();
                frame_counter = 0;
            }
        }
    }

    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_names() {
        assert_eq!("default".parse::<Pipeline>(), Ok(Pipeline::Texture));
        assert_eq!("gouraud".parse::<Pipeline>(), Ok(Pipeline::Gouraud));
        assert_eq!("wireframe".parse::<Pipeline>(), Ok(Pipeline::Wireframe));
        assert!("phong".parse::<Pipeline>().is_err());
    }
}
