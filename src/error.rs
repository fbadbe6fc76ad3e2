use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open camera device {index}: {reason}")]
    OpenDevice { index: u32, reason: String },

    #[error("failed to read a frame: {0}")]
    Read(String),

    #[error("no images found under {0}")]
    NoImages(String),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("camera support is not compiled in (enable the `camera` feature or pass --images)")]
    CameraUnavailable,
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to load mesh {path}: {source}")]
    MeshLoad {
        path: String,
        #[source]
        source: tobj::LoadError,
    },

    #[error("mesh {0} has no triangles")]
    EmptyMesh(String),

    #[error("failed to load texture {path}: {source}")]
    TextureLoad {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to decode texture {path}: {reason}")]
    TextureDecode { path: String, reason: String },

    #[error("failed to read shader {path}: {source}")]
    ShaderLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("shader program rejected: {0}")]
    Shader(String),

    #[error("no graphics adapter available: {0}")]
    NoAdapter(String),

    #[error("failed to create graphics device: {0}")]
    RequestDevice(String),

    #[error("invalid viewport size {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("unsupported sample count {0}, expected 1 or 4")]
    InvalidSampleCount(u32),

    #[error("failed to read back the frame: {0}")]
    ReadBack(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("{object} object points but {image} image points")]
    PointCountMismatch { object: usize, image: usize },

    #[error("need at least {required} correspondences, got {got}")]
    TooFewPoints { required: usize, got: usize },

    #[error("invalid frame size {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },

    #[error("perspective-n-point solver failed")]
    PnpFailed,

    #[error("estimate is not finite")]
    NonFinite,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositeError {
    #[error(
        "region ({x}, {y}, {width}x{height}) exceeds frame {frame_width}x{frame_height}"
    )]
    RoiOutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("cannot composite an empty image")]
    EmptyImage,
}

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("failed to create window: {0}")]
    Create(String),

    #[error("failed to present frame: {0}")]
    Present(String),
}

/// Top level error for the demo.
#[derive(Error, Debug)]
pub enum ArError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Pose(#[from] PoseError),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error(transparent)]
    Display(#[from] DisplayError),
}
