use nalgebra as na;

use crate::convert::RowMajorMat4;

/// Rotation vector (axis * angle) and translation of the board in camera space.
#[derive(Debug, Clone, PartialEq)]
pub struct RvecTvec {
    rvec: na::Vector3<f64>,
    tvec: na::Vector3<f64>,
}

impl RvecTvec {
    pub fn new(rvec: &[f64], tvec: &[f64]) -> RvecTvec {
        RvecTvec {
            rvec: na::Vector3::new(rvec[0], rvec[1], rvec[2]),
            tvec: na::Vector3::new(tvec[0], tvec[1], tvec[2]),
        }
    }

    pub fn from_tuples(r: (f64, f64, f64), t: (f64, f64, f64)) -> RvecTvec {
        RvecTvec {
            rvec: na::Vector3::new(r.0, r.1, r.2),
            tvec: na::Vector3::new(t.0, t.1, t.2),
        }
    }

    pub fn na_rvec(&self) -> na::Vector3<f64> {
        self.rvec
    }

    pub fn na_tvec(&self) -> na::Vector3<f64> {
        self.tvec
    }

    pub fn to_dvec(&self) -> (na::DVector<f64>, na::DVector<f64>) {
        (
            na::DVector::from_column_slice(self.rvec.as_slice()),
            na::DVector::from_column_slice(self.tvec.as_slice()),
        )
    }

    pub fn to_na_isometry3(&self) -> na::Isometry3<f64> {
        na::Isometry3::new(self.tvec, self.rvec)
    }

    /// Board-to-camera transform in the vision side (row-major) layout.
    pub fn to_row_major(&self) -> RowMajorMat4 {
        RowMajorMat4::from_isometry(&self.to_na_isometry3())
    }

    pub fn is_finite(&self) -> bool {
        self.rvec.iter().chain(self.tvec.iter()).all(|v| v.is_finite())
    }
}
