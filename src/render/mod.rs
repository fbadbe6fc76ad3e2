//! Offscreen GPU rendering of the virtual object.
//!
//! The scene uses a fixed camera, the estimated board pose never reaches it.

pub mod gpu;
pub mod mesh;
pub mod shading;
pub mod texture;

use glam::{Mat4, Vec3};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
pub use gpu::RenderContext;
pub use mesh::Mesh;
pub use shading::{ShaderSources, Uniforms};
pub use texture::Texture;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Multisample count of the colour and depth targets, 1 or 4.
    pub samples: u32,
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub eye: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    pub light_position: [f32; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 394,
            samples: 4,
            fov_y_deg: 45.0,
            z_near: 0.1,
            z_far: 100.0,
            eye: [0.0, 0.0, 5.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            light_position: [4.0, 4.0, 4.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneMatrices {
    pub projection: Mat4,
    pub view: Mat4,
    pub model: Mat4,
}

impl SceneMatrices {
    pub fn from_config(config: &RenderConfig) -> SceneMatrices {
        SceneMatrices {
            projection: Mat4::perspective_rh_gl(
                config.fov_y_deg.to_radians(),
                config.width as f32 / config.height as f32,
                config.z_near,
                config.z_far,
            ),
            view: Mat4::look_at_rh(
                Vec3::from_array(config.eye),
                Vec3::from_array(config.target),
                Vec3::from_array(config.up),
            ),
            model: Mat4::IDENTITY,
        }
    }

    pub fn mvp(&self) -> Mat4 {
        self.projection * self.view * self.model
    }
}

/// Draws the virtual object and hands back the finished frame.
pub trait Renderer {
    /// Clears, draws into the back buffer and swaps it to the front.
    fn draw_frame(&mut self, light_position: Vec3);

    fn swap_buffers(&mut self);

    /// Front buffer contents with a bottom-left origin: row 0 is the bottom of the view.
    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError>;

    fn frames_drawn(&self) -> u64;

    fn size(&self) -> (u32, u32);
}
