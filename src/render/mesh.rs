use std::path::Path;

use glam::{Vec2, Vec3};
use log::debug;

use super::texture::texel_coords;
use crate::error::RenderError;

/// Non-indexed triangle list, three consecutive vertices per triangle.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
}

impl Mesh {
    /// Loads every model of an OBJ file, triangulated and flattened.
    ///
    /// Missing texture coordinates default to zero, missing normals to the face normal.
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, RenderError> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| RenderError::MeshLoad {
            path: path.display().to_string(),
            source,
        })?;

        let mut mesh = Mesh::default();
        for model in &models {
            let m = &model.mesh;
            let has_uv = m.texcoords.len() * 3 >= m.positions.len() * 2;
            let has_normal = m.normals.len() >= m.positions.len();
            for tri in m.indices.chunks_exact(3) {
                let mut p = [Vec3::ZERO; 3];
                for (k, &idx) in tri.iter().enumerate() {
                    let i = idx as usize;
                    p[k] = Vec3::from_slice(&m.positions[3 * i..3 * i + 3]);
                    mesh.uvs.push(if has_uv {
                        Vec2::from_slice(&m.texcoords[2 * i..2 * i + 2])
                    } else {
                        Vec2::ZERO
                    });
                }
                let face_normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero();
                for (k, &idx) in tri.iter().enumerate() {
                    let i = idx as usize;
                    mesh.positions.push(p[k]);
                    mesh.normals.push(if has_normal {
                        Vec3::from_slice(&m.normals[3 * i..3 * i + 3])
                    } else {
                        face_normal
                    });
                }
            }
        }
        debug!(
            "loaded {} with {} models, {} triangles",
            path.display(),
            models.len(),
            mesh.triangle_count()
        );
        if mesh.positions.is_empty() {
            return Err(RenderError::EmptyMesh(path.display().to_string()));
        }
        Ok(mesh)
    }

    /// Builds a mesh from already flattened attribute arrays.
    pub fn from_triangles(
        positions: Vec<Vec3>,
        uvs: Vec<Vec2>,
        normals: Vec<Vec3>,
    ) -> Result<Mesh, RenderError> {
        if positions.is_empty()
            || positions.len() % 3 != 0
            || uvs.len() != positions.len()
            || normals.len() != positions.len()
        {
            return Err(RenderError::EmptyMesh(format!(
                "{} positions, {} uvs, {} normals",
                positions.len(),
                uvs.len(),
                normals.len()
            )));
        }
        Ok(Mesh {
            positions,
            uvs,
            normals,
        })
    }

    /// Axis-aligned square in the z=0 plane facing +z, two CCW triangles.
    pub fn quad(half_size: f32) -> Mesh {
        let h = half_size;
        let corners = [
            (Vec3::new(-h, -h, 0.0), Vec2::new(0.0, 0.0)),
            (Vec3::new(h, -h, 0.0), Vec2::new(1.0, 0.0)),
            (Vec3::new(h, h, 0.0), Vec2::new(1.0, 1.0)),
            (Vec3::new(-h, h, 0.0), Vec2::new(0.0, 1.0)),
        ];
        let order = [0usize, 1, 2, 0, 2, 3];
        Mesh {
            positions: order.iter().map(|&i| corners[i].0).collect(),
            uvs: order.iter().map(|&i| corners[i].1).collect(),
            normals: vec![Vec3::Z; order.len()],
        }
    }

    /// Interleaved `position, uv, normal` floats, eight per vertex, UVs in sampler space.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.positions.len() * 8);
        for ((p, uv), n) in self.positions.iter().zip(&self.uvs).zip(&self.normals) {
            out.extend_from_slice(&p.to_array());
            out.extend_from_slice(&texel_coords(*uv));
            out.extend_from_slice(&n.to_array());
        }
        out
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }
}
