mod app;

use std::env;

const WIDTH: u32  = 800;
const HEIGHT: u32 = 800;

fn usage() -> String {
    return String::from(
        "usage: tiny_gl [-p model.obj] [-s texture|gouraud|flat|wireframe] [-o out.tga] [-t threads] [-d] [--fps]",
    );
}

#[show_image::main]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Default values.
    let mut params = app::Params {
        width: WIDTH,
        height: HEIGHT,
        print_fps: false,
        asset_path: String::from("assets/diablo3_pose.obj"),
        shader_pipeline_name: String::from("default"),
        output: None,
        show_depth: false,
        threads: None,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-p" => { params.asset_path = args.next().ok_or_else(usage)?; }
            "-s" => { params.shader_pipeline_name = args.next().ok_or_else(usage)?; }
            "-o" => { params.output = Some(args.next().ok_or_else(usage)?); }
            "-t" => { params.threads = Some(args.next().ok_or_else(usage)?.parse()?); }
            "-d" => { params.show_depth = true; }
            "--fps" => { params.print_fps = true; }
            _ => return Err(usage().into()),
        }
    }

    app::run(params)?;

    return Ok(());
}
