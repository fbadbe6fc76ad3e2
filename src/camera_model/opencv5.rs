use super::generic::CameraModel;
use nalgebra as na;
use serde::{Deserialize, Serialize};

const UNDISTORT_ITERATIONS: usize = 20;

/// Pinhole camera with OpenCV's five coefficient Brown-Conrady distortion.
///
/// Parameter order is `[fx, fy, cx, cy, k1, k2, p1, p2, k3]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenCVModel5<T: na::RealField + Clone> {
    pub fx: T,
    pub fy: T,
    pub cx: T,
    pub cy: T,
    pub k1: T,
    pub k2: T,
    pub p1: T,
    pub p2: T,
    pub k3: T,
    pub width: u32,
    pub height: u32,
}

impl<T: na::RealField + Clone> OpenCVModel5<T> {
    pub fn new(params: &na::DVector<T>, width: u32, height: u32) -> OpenCVModel5<T> {
        OpenCVModel5 {
            fx: params[0].clone(),
            fy: params[1].clone(),
            cx: params[2].clone(),
            cy: params[3].clone(),
            k1: params[4].clone(),
            k2: params[5].clone(),
            p1: params[6].clone(),
            p2: params[7].clone(),
            k3: params[8].clone(),
            width,
            height,
        }
    }

    /// Undistorted pinhole camera.
    pub fn pinhole(fx: T, fy: T, cx: T, cy: T, width: u32, height: u32) -> OpenCVModel5<T> {
        OpenCVModel5 {
            fx,
            fy,
            cx,
            cy,
            k1: T::zero(),
            k2: T::zero(),
            p1: T::zero(),
            p2: T::zero(),
            k3: T::zero(),
            width,
            height,
        }
    }

    pub fn camera_matrix(&self) -> na::Matrix3<T> {
        let zero = T::zero();
        na::Matrix3::new(
            self.fx.clone(),
            zero.clone(),
            self.cx.clone(),
            zero.clone(),
            self.fy.clone(),
            self.cy.clone(),
            zero.clone(),
            zero,
            T::one(),
        )
    }

    /// `[k1, k2, p1, p2, k3]`
    pub fn distortion(&self) -> [T; 5] {
        [
            self.k1.clone(),
            self.k2.clone(),
            self.p1.clone(),
            self.p2.clone(),
            self.k3.clone(),
        ]
    }

    /// Projects a camera-space point with intrinsics `[fx, fy, cx, cy]` and
    /// distortion `[k1, k2, p1, p2, k3]`.
    pub fn project_one_impl(intr: &[T], dist: &[T], pt: &na::Vector3<T>) -> na::Vector2<T> {
        let two: T = na::convert(2.0);
        let xn = pt[0].clone() / pt[2].clone();
        let yn = pt[1].clone() / pt[2].clone();

        let (xd, yd) = distort(
            xn,
            yn,
            &dist[0],
            &dist[1],
            &dist[2],
            &dist[3],
            &dist[4],
            &two,
        );
        na::Vector2::new(
            intr[0].clone() * xd + intr[2].clone(),
            intr[1].clone() * yd + intr[3].clone(),
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn distort<T: na::RealField + Clone>(
    x: T,
    y: T,
    k1: &T,
    k2: &T,
    p1: &T,
    p2: &T,
    k3: &T,
    two: &T,
) -> (T, T) {
    let r2 = x.clone() * x.clone() + y.clone() * y.clone();
    let r4 = r2.clone() * r2.clone();
    let r6 = r4.clone() * r2.clone();
    let radial = T::one() + k1.clone() * r2.clone() + k2.clone() * r4 + k3.clone() * r6;
    let xy = x.clone() * y.clone();
    let xd = x.clone() * radial.clone()
        + two.clone() * p1.clone() * xy.clone()
        + p2.clone() * (r2.clone() + two.clone() * x.clone() * x);
    let yd = y.clone() * radial
        + p1.clone() * (r2 + two.clone() * y.clone() * y)
        + two.clone() * p2.clone() * xy;
    (xd, yd)
}

impl OpenCVModel5<f64> {
    pub fn is_finite(&self) -> bool {
        self.params().iter().all(|v| v.is_finite())
    }

    pub fn intrinsics_dvec(&self) -> na::DVector<f64> {
        na::dvector![self.fx, self.fy, self.cx, self.cy]
    }

    pub fn distortion_dvec(&self) -> na::DVector<f64> {
        na::DVector::from_column_slice(&self.distortion())
    }

    pub fn from_blocks(intr: &na::DVector<f64>, dist: &na::DVector<f64>, width: u32, height: u32) -> Self {
        let params = na::DVector::from_iterator(9, intr.iter().chain(dist.iter()).cloned());
        OpenCVModel5::new(&params, width, height)
    }
}

impl CameraModel<f64> for OpenCVModel5<f64> {
    fn params(&self) -> na::DVector<f64> {
        na::dvector![
            self.fx, self.fy, self.cx, self.cy, self.k1, self.k2, self.p1, self.p2, self.k3
        ]
    }

    fn width(&self) -> f64 {
        self.width as f64
    }

    fn height(&self) -> f64 {
        self.height as f64
    }

    fn project_one(&self, pt: &na::Vector3<f64>) -> na::Vector2<f64> {
        Self::project_one_impl(
            &[self.fx, self.fy, self.cx, self.cy],
            &self.distortion(),
            pt,
        )
    }

    /// Fixed point iteration, same scheme as OpenCV's `undistortPoints`.
    fn unproject_one(&self, pt: &na::Vector2<f64>) -> na::Vector3<f64> {
        let x0 = (pt[0] - self.cx) / self.fx;
        let y0 = (pt[1] - self.cy) / self.fy;
        let (mut x, mut y) = (x0, y0);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let icdist = 1.0 / (1.0 + ((self.k3 * r2 + self.k2) * r2 + self.k1) * r2);
            let delta_x = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let delta_y = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            x = (x0 - delta_x) * icdist;
            y = (y0 - delta_y) * icdist;
        }
        na::Vector3::new(x, y, 1.0)
    }
}
