use nalgebra as na;
use tiny_solver::factors::Factor;

use crate::camera_model::OpenCVModel5;

fn transform_point<T: na::RealField>(rvec: &na::DVector<T>, tvec: &na::DVector<T>, p3d: &[f64; 3]) -> na::Vector3<T> {
    let rvec = na::Vector3::new(rvec[0].clone(), rvec[1].clone(), rvec[2].clone());
    let tvec = na::Vector3::new(tvec[0].clone(), tvec[1].clone(), tvec[2].clone());
    let transform = na::Isometry3::new(tvec, rvec);
    let p = na::Point3::new(
        na::convert::<f64, T>(p3d[0]),
        na::convert::<f64, T>(p3d[1]),
        na::convert::<f64, T>(p3d[2]),
    );
    (transform * p).coords
}

/// Reprojection residual of one board corner.
///
/// Parameter blocks: `[intrinsics(4), distortion(5), rvec(3), tvec(3)]`.
#[derive(Debug, Clone)]
pub struct ReprojectionFactor {
    pub p3d: [f64; 3],
    pub p2d: [f64; 2],
}

impl ReprojectionFactor {
    pub fn new(p3d: &glam::Vec3, p2d: &glam::Vec2) -> ReprojectionFactor {
        ReprojectionFactor {
            p3d: [p3d.x as f64, p3d.y as f64, p3d.z as f64],
            p2d: [p2d.x as f64, p2d.y as f64],
        }
    }
}

impl<T: na::RealField> Factor<T> for ReprojectionFactor {
    fn residual_func(&self, params: &[na::DVector<T>]) -> na::DVector<T> {
        let p3d_t = transform_point(&params[2], &params[3], &self.p3d);
        let p2d_p = OpenCVModel5::<T>::project_one_impl(params[0].as_slice(), params[1].as_slice(), &p3d_t);
        na::dvector![
            p2d_p[0].clone() - na::convert::<f64, T>(self.p2d[0]),
            p2d_p[1].clone() - na::convert::<f64, T>(self.p2d[1])
        ]
    }
}

/// Reprojection residual with the camera held fixed.
///
/// Parameter blocks: `[rvec(3), tvec(3)]`.
#[derive(Debug, Clone)]
pub struct PoseOnlyFactor {
    pub intr: [f64; 4],
    pub dist: [f64; 5],
    pub p3d: [f64; 3],
    pub p2d: [f64; 2],
}

impl PoseOnlyFactor {
    pub fn new(model: &OpenCVModel5<f64>, p3d: &glam::Vec3, p2d: &glam::Vec2) -> PoseOnlyFactor {
        PoseOnlyFactor {
            intr: [model.fx, model.fy, model.cx, model.cy],
            dist: model.distortion(),
            p3d: [p3d.x as f64, p3d.y as f64, p3d.z as f64],
            p2d: [p2d.x as f64, p2d.y as f64],
        }
    }
}

impl<T: na::RealField> Factor<T> for PoseOnlyFactor {
    fn residual_func(&self, params: &[na::DVector<T>]) -> na::DVector<T> {
        let p3d_t = transform_point(&params[0], &params[1], &self.p3d);
        let intr = self.intr.map(na::convert::<f64, T>);
        let dist = self.dist.map(na::convert::<f64, T>);
        let p2d_p = OpenCVModel5::<T>::project_one_impl(&intr, &dist, &p3d_t);
        na::dvector![
            p2d_p[0].clone() - na::convert::<f64, T>(self.p2d[0]),
            p2d_p[1].clone() - na::convert::<f64, T>(self.p2d[1])
        ]
    }
}
