use nalgebra as na;
use sqpnp_simple::sqpnp_solve_glam;

use crate::camera_model::{CameraModel, OpenCVModel5};
use crate::detected_points::FrameFeature;
use crate::types::RvecTvec;

/// Closed-form pose from undistorted, normalized image points.
pub fn init_pose(frame_feature: &FrameFeature, model: &OpenCVModel5<f64>) -> Option<RvecTvec> {
    let (p2ds_z, p3ds): (Vec<_>, Vec<_>) = frame_feature
        .features
        .iter()
        .map(|f| {
            let ray = model.unproject_one(&na::Vector2::new(f.p2d.x as f64, f.p2d.y as f64));
            (glam::Vec2::new(ray.x as f32, ray.y as f32), f.p3d)
        })
        .unzip();

    let (r, t) = sqpnp_solve_glam(&p3ds, &p2ds_z)?;
    Some(RvecTvec::from_tuples(r, t))
}
