//! "StandardShading": GLSL sources of the lighting program and its uniform block.

use std::path::Path;

use glam::{Mat4, Vec3};

use crate::error::RenderError;

/// Size of the `Scene` uniform block under std140: three mat4 and a padded vec3.
pub const UNIFORM_SIZE: u64 = 3 * 64 + 16;

/// Vertex and fragment stages of the lighting program.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        vertex_path: P,
        fragment_path: Q,
    ) -> Result<ShaderSources, RenderError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|source| RenderError::ShaderLoad {
                path: path.display().to_string(),
                source,
            })
        };
        Ok(ShaderSources {
            vertex: read(vertex_path.as_ref())?,
            fragment: read(fragment_path.as_ref())?,
        })
    }

    /// The program shipped under `assets/`, compiled into the binary.
    pub fn standard() -> ShaderSources {
        ShaderSources {
            vertex: include_str!("../../assets/StandardShading.vertexshader").to_string(),
            fragment: include_str!("../../assets/StandardShading.fragmentshader").to_string(),
        }
    }
}

/// Uniform state, matrices stored column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniforms {
    pub mvp: [f32; 16],
    pub view: [f32; 16],
    pub model: [f32; 16],
    pub light_position_worldspace: Vec3,
}

impl Default for Uniforms {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array();
        Self {
            mvp: identity,
            view: identity,
            model: identity,
            light_position_worldspace: Vec3::ZERO,
        }
    }
}

impl Uniforms {
    /// Little-endian bytes in `Scene` block order: MVP, V, M, light position.
    pub fn std140_bytes(&self) -> Vec<u8> {
        let light = self.light_position_worldspace.to_array();
        self.mvp
            .iter()
            .chain(&self.view)
            .chain(&self.model)
            .chain(&light)
            .chain(&[0.0f32])
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }
}
