use clap::{Parser, ValueEnum};
use log::{error, info};
use marker_based_ar::capture::open_source;
use marker_based_ar::display::{Display, NullDisplay};
use marker_based_ar::io::{object_from_json, object_to_json};
use marker_based_ar::pose::IntrinsicsMode;
use marker_based_ar::{ArApp, ArConfig, ArError};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IntrinsicsArg {
    /// re-calibrate on every frame
    PerFrame,
    /// calibrate once on the first detection
    FirstDetection,
}

#[derive(Parser)]
#[command(version, about, author)]
struct MarkerArCli {
    /// json configuration, cli flags override its fields
    #[arg(long)]
    config: Option<String>,

    /// replay .png/.jpg images from this folder instead of the camera
    #[arg(long)]
    images: Option<String>,

    /// camera device index
    #[arg(long)]
    camera: Option<u32>,

    /// obj model to render
    #[arg(long)]
    mesh: Option<String>,

    /// diffuse texture of the model, .dds or any common image format
    #[arg(long)]
    texture: Option<String>,

    /// glsl vertex stage of the lighting program
    #[arg(long)]
    vertex_shader: Option<String>,

    /// glsl fragment stage of the lighting program
    #[arg(long)]
    fragment_shader: Option<String>,

    #[arg(long, value_enum)]
    intrinsics: Option<IntrinsicsArg>,

    /// draw detected corners and board axes
    #[arg(long)]
    overlay: bool,

    /// run without a window
    #[arg(long)]
    headless: bool,

    /// print the effective configuration as json and exit
    #[arg(long)]
    dump_config: bool,

    /// write the effective configuration to this path and exit
    #[arg(long)]
    save_config: Option<String>,

    /// save a rerun recording of the run
    #[cfg(feature = "visualization")]
    #[arg(long)]
    record: Option<String>,
}

fn effective_config(cli: &MarkerArCli) -> Result<ArConfig, ArError> {
    let mut config: ArConfig = match &cli.config {
        Some(path) => object_from_json(path)?,
        None => ArConfig::default(),
    };
    if let Some(images) = &cli.images {
        config.image_folder = Some(images.clone());
    }
    if let Some(camera) = cli.camera {
        config.camera_index = camera;
    }
    if let Some(mesh) = &cli.mesh {
        config.mesh_path = mesh.clone();
    }
    if let Some(texture) = &cli.texture {
        config.texture_path = texture.clone();
    }
    if let Some(path) = &cli.vertex_shader {
        config.vertex_shader_path = path.clone();
    }
    if let Some(path) = &cli.fragment_shader {
        config.fragment_shader_path = path.clone();
    }
    match cli.intrinsics {
        Some(IntrinsicsArg::PerFrame) => config.intrinsics = IntrinsicsMode::PerFrame,
        Some(IntrinsicsArg::FirstDetection) => config.intrinsics = IntrinsicsMode::FirstDetection,
        None => {}
    }
    config.overlay |= cli.overlay;
    Ok(config)
}

#[cfg(feature = "window")]
fn open_display(config: &ArConfig, headless: bool) -> Result<Box<dyn Display>, ArError> {
    if headless {
        return Ok(Box::new(NullDisplay::new()));
    }
    Ok(Box::new(marker_based_ar::display::WindowDisplay::new(
        &config.window_title,
        config.window_width as usize,
        config.window_height as usize,
    )?))
}

#[cfg(not(feature = "window"))]
fn open_display(_config: &ArConfig, headless: bool) -> Result<Box<dyn Display>, ArError> {
    if !headless {
        log::warn!("built without window support, running headless");
    }
    Ok(Box::new(NullDisplay::new()))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = MarkerArCli::parse();

    let config = match effective_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(-1);
        }
    };
    if cli.dump_config {
        match serde_json::to_string_pretty(&config) {
            Ok(j) => println!("{}", j),
            Err(e) => {
                error!("{}", e);
                std::process::exit(-1);
            }
        }
        return;
    }
    if let Some(path) = &cli.save_config {
        if let Err(e) = object_to_json(path, &config) {
            error!("{}", e);
            std::process::exit(-1);
        }
        info!("wrote {}", path);
        return;
    }

    let init = || -> Result<_, ArError> {
        let source = open_source(config.image_folder.as_deref(), config.camera_index)?;
        let app = ArApp::from_config(config.clone())?;
        let display = open_display(&config, cli.headless)?;
        Ok((source, app, display))
    };
    let (mut source, mut app, mut display) = match init() {
        Ok(parts) => parts,
        Err(e) => {
            error!("initialization failed: {}", e);
            std::process::exit(-1);
        }
    };

    #[cfg(feature = "visualization")]
    if let Some(path) = &cli.record {
        match rerun::RecordingStreamBuilder::new("marker-based-ar").save(path) {
            Ok(recording) => app = app.with_recording(recording),
            Err(e) => log::warn!("recording disabled: {}", e),
        }
    }

    let result = app.run(source.as_mut(), display.as_mut());
    drop(app);
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(-1);
    }
}
