use serde::{Deserialize, Serialize};

use crate::board::BoardConfig;
use crate::detector::DetectorParams;
use crate::error::ConfigError;
use crate::pose::IntrinsicsMode;
use crate::render::RenderConfig;

/// Everything the demo needs at start-up. `Default` reproduces the stock setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArConfig {
    pub camera_index: u32,
    /// Replay images from this folder instead of opening the camera.
    pub image_folder: Option<String>,
    pub mesh_path: String,
    /// `.dds` or any format `image` decodes.
    pub texture_path: String,
    pub vertex_shader_path: String,
    pub fragment_shader_path: String,
    pub board: BoardConfig,
    pub render: RenderConfig,
    pub detector: DetectorParams,
    pub intrinsics: IntrinsicsMode,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Draw detected corners and board axes on top of the output.
    pub overlay: bool,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            image_folder: None,
            mesh_path: "suzanne.obj".to_string(),
            texture_path: "uvmap.DDS".to_string(),
            vertex_shader_path: "StandardShading.vertexshader".to_string(),
            fragment_shader_path: "StandardShading.fragmentshader".to_string(),
            board: BoardConfig::default(),
            render: RenderConfig::default(),
            detector: DetectorParams::default(),
            intrinsics: IntrinsicsMode::default(),
            window_title: "marker-based-AR".to_string(),
            window_width: 256,
            window_height: 197,
            overlay: false,
        }
    }
}

impl ArConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board.cols < 2 || self.board.rows < 2 {
            return Err(ConfigError::Invalid(format!(
                "board needs at least 2x2 corners, got {}x{}",
                self.board.cols, self.board.rows
            )));
        }
        if self.board.square_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "square size must be positive, got {}",
                self.board.square_size
            )));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "render size {}x{}",
                self.render.width, self.render.height
            )));
        }
        if !matches!(self.render.samples, 1 | 4) {
            return Err(ConfigError::Invalid(format!(
                "sample count {}, expected 1 or 4",
                self.render.samples
            )));
        }
        if !(self.render.z_near > 0.0 && self.render.z_far > self.render.z_near) {
            return Err(ConfigError::Invalid(format!(
                "clip planes near {} far {}",
                self.render.z_near, self.render.z_far
            )));
        }
        Ok(())
    }
}
