//! Conversion between the row-major 4x4 layout used on the vision side and the
//! column-major layout `glam` (and OpenGL style uniforms) expects.
//!
//! Both directions copy 16 contiguous floats and transpose; the represented
//! matrix never changes, only its memory layout.

use nalgebra as na;

/// 4x4 `f32` matrix stored row by row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowMajorMat4(pub [f32; 16]);

impl RowMajorMat4 {
    pub const IDENTITY: RowMajorMat4 = RowMajorMat4([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub fn from_rows(rows: [[f32; 4]; 4]) -> RowMajorMat4 {
        let mut data = [0.0f32; 16];
        for (r, row) in rows.iter().enumerate() {
            data[r * 4..r * 4 + 4].copy_from_slice(row);
        }
        RowMajorMat4(data)
    }

    /// Homogeneous transform of a rigid pose.
    pub fn from_isometry(iso: &na::Isometry3<f64>) -> RowMajorMat4 {
        let m = iso.to_homogeneous();
        let mut data = [0.0f32; 16];
        for r in 0..4 {
            for c in 0..4 {
                data[r * 4 + c] = m[(r, c)] as f32;
            }
        }
        RowMajorMat4(data)
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.0[row * 4 + col]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Row-major data to a column-major `glam::Mat4`.
pub fn to_column_major(row_major: &RowMajorMat4) -> glam::Mat4 {
    glam::Mat4::from_cols_array(&row_major.0).transpose()
}

/// Column-major `glam::Mat4` to row-major data.
pub fn to_row_major(col_major: &glam::Mat4) -> RowMajorMat4 {
    RowMajorMat4(col_major.transpose().to_cols_array())
}

/// Same as [`to_row_major`] but writes into a caller owned buffer, resizing it
/// to 16 floats when it does not already hold a 4x4 matrix.
pub fn to_row_major_into(col_major: &glam::Mat4, out: &mut Vec<f32>) {
    if out.len() != 16 {
        out.resize(16, 0.0);
    }
    out.copy_from_slice(&to_row_major(col_major).0);
}
