//! Per-frame camera calibration and pose estimation from one chessboard view.

use std::collections::HashMap;

use log::{debug, trace, warn};
use nalgebra as na;
use serde::{Deserialize, Serialize};
use tiny_solver::optimizer::{Optimizer, OptimizerOptions};

use crate::camera_model::{CameraModel, OpenCVModel5};
use crate::detected_points::FrameFeature;
use crate::error::PoseError;
use crate::optimization::factors::{PoseOnlyFactor, ReprojectionFactor};
use crate::optimization::{find_homography, homography_to_focal_xy, init_pose};
use crate::types::RvecTvec;

const MIN_CORRESPONDENCES: usize = 6;
const LM_MAX_ITERATIONS: usize = 50;
/// Closed-form focal lengths outside this range of `max(w, h)` are treated
/// as a degenerate (near fronto-parallel) view.
const MIN_FOCAL_RATIO: f64 = 0.1;
const MAX_FOCAL_RATIO: f64 = 10.0;

/// Where the camera intrinsics come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IntrinsicsMode {
    /// Re-calibrate from the current view on every frame.
    #[default]
    PerFrame,
    /// Calibrate on the first detection, then keep those intrinsics.
    FirstDetection,
    /// Intrinsics supplied up front.
    Fixed { camera: OpenCVModel5<f64> },
}

#[derive(Debug, Clone)]
pub struct PoseEstimate {
    pub camera: OpenCVModel5<f64>,
    pub pose: RvecTvec,
    /// Board center projected into the image.
    pub center_2d: glam::Vec2,
    /// RMS reprojection error of the board corners, in pixels.
    pub rms: f64,
}

pub struct PoseEstimator {
    mode: IntrinsicsMode,
    center_3d: glam::Vec3,
    cached_camera: Option<OpenCVModel5<f64>>,
}

impl PoseEstimator {
    pub fn new(mode: IntrinsicsMode, center_3d: glam::Vec3) -> PoseEstimator {
        let cached_camera = match &mode {
            IntrinsicsMode::Fixed { camera } => Some(camera.clone()),
            _ => None,
        };
        PoseEstimator {
            mode,
            center_3d,
            cached_camera,
        }
    }

    pub fn mode(&self) -> &IntrinsicsMode {
        &self.mode
    }

    /// Camera intrinsics used for the latest frame.
    pub fn camera(&self) -> Option<&OpenCVModel5<f64>> {
        self.cached_camera.as_ref()
    }

    /// Calibrate (depending on the mode), solve the pose and project the board center.
    pub fn estimate(&mut self, frame_feature: &FrameFeature) -> Result<PoseEstimate, PoseError> {
        let camera = match (&self.mode, &self.cached_camera) {
            (IntrinsicsMode::PerFrame, _) | (IntrinsicsMode::FirstDetection, None) => {
                let (camera, _) = calibrate_single_view(frame_feature)?;
                trace!(
                    "calibrated fx {:.2} fy {:.2} cx {:.2} cy {:.2}",
                    camera.fx, camera.fy, camera.cx, camera.cy
                );
                camera
            }
            (_, Some(camera)) => camera.clone(),
            (IntrinsicsMode::Fixed { camera }, None) => camera.clone(),
        };
        self.cached_camera = Some(camera.clone());

        let pose = solve_pnp(frame_feature, &camera)?;
        let center_2d = project_points(&[self.center_3d], &pose, &camera)
            .pop()
            .ok_or(PoseError::NonFinite)?;
        if !center_2d.is_finite() {
            return Err(PoseError::NonFinite);
        }
        let rms = reprojection_rms(frame_feature, &pose, &camera);
        debug!("pose {:?} center {:?} rms {:.4}", pose, center_2d, rms);

        Ok(PoseEstimate {
            camera,
            pose,
            center_2d,
            rms,
        })
    }
}

fn validate(frame_feature: &FrameFeature) -> Result<(), PoseError> {
    let (w, h) = frame_feature.img_w_h;
    if w == 0 || h == 0 {
        return Err(PoseError::InvalidFrameSize {
            width: w,
            height: h,
        });
    }
    if frame_feature.len() < MIN_CORRESPONDENCES {
        return Err(PoseError::TooFewPoints {
            required: MIN_CORRESPONDENCES,
            got: frame_feature.len(),
        });
    }
    Ok(())
}

fn lm_options() -> OptimizerOptions {
    OptimizerOptions {
        max_iteration: LM_MAX_ITERATIONS,
        ..OptimizerOptions::default()
    }
}

/// Treats one view as the whole calibration set.
///
/// The principal point is pinned to the image center and k3 to zero; a single
/// planar view cannot separate them from the pose. Returns the refined camera
/// and the pose of the board in that view.
pub fn calibrate_single_view(
    frame_feature: &FrameFeature,
) -> Result<(OpenCVModel5<f64>, RvecTvec), PoseError> {
    validate(frame_feature)?;
    let (w, h) = frame_feature.img_w_h;
    let cx = (w as f64 - 1.0) / 2.0;
    let cy = (h as f64 - 1.0) / 2.0;

    let board_xy: Vec<glam::DVec2> = frame_feature
        .features
        .iter()
        .map(|f| glam::DVec2::new(f.p3d.x as f64, f.p3d.y as f64))
        .collect();
    let img_pts: Vec<glam::DVec2> = frame_feature.features.iter().map(|f| f.p2d.as_dvec2()).collect();

    let fallback = w.max(h) as f64;
    let plausible = |f: f64| f > fallback * MIN_FOCAL_RATIO && f < fallback * MAX_FOCAL_RATIO;
    let (fx, fy) = find_homography(&board_xy, &img_pts)
        .and_then(|hm| homography_to_focal_xy(&hm, cx, cy))
        .filter(|(fx, fy)| plausible(*fx) && plausible(*fy))
        .unwrap_or_else(|| {
            debug!("falling back to focal {}", fallback);
            (fallback, fallback)
        });
    let init_camera = OpenCVModel5::pinhole(fx, fy, cx, cy, w, h);
    let init_rt = init_pose(frame_feature, &init_camera).ok_or(PoseError::PnpFailed)?;

    let mut problem = tiny_solver::Problem::new();
    for f in &frame_feature.features {
        problem.add_residual_block(
            2,
            &["intr", "dist", "rvec", "tvec"],
            Box::new(ReprojectionFactor::new(&f.p3d, &f.p2d)),
            None,
        );
    }
    // cx, cy
    problem.fix_variable("intr", 2);
    problem.fix_variable("intr", 3);
    // k3
    problem.fix_variable("dist", 4);

    let (rvec, tvec) = init_rt.to_dvec();
    let initial_values = HashMap::<String, na::DVector<f64>>::from([
        ("intr".to_string(), init_camera.intrinsics_dvec()),
        ("dist".to_string(), init_camera.distortion_dvec()),
        ("rvec".to_string(), rvec),
        ("tvec".to_string(), tvec),
    ]);

    let optimizer = tiny_solver::LevenbergMarquardtOptimizer::default();
    let Some(result) = optimizer.optimize(&problem, &initial_values, Some(lm_options())) else {
        warn!("calibration refinement did not converge, keeping the closed-form estimate");
        return Ok((init_camera, init_rt));
    };
    let (Some(intr), Some(dist), Some(rvec), Some(tvec)) = (
        result.get("intr"),
        result.get("dist"),
        result.get("rvec"),
        result.get("tvec"),
    ) else {
        return Ok((init_camera, init_rt));
    };

    let camera = OpenCVModel5::from_blocks(intr, dist, w, h);
    let rt = RvecTvec::new(rvec.as_slice(), tvec.as_slice());
    if !camera.is_finite() || !rt.is_finite() || camera.fx <= 0.0 || camera.fy <= 0.0 {
        warn!("calibration refinement diverged, keeping the closed-form estimate");
        return Ok((init_camera, init_rt));
    }
    let init_rms = reprojection_rms(frame_feature, &init_rt, &init_camera);
    let rms = reprojection_rms(frame_feature, &rt, &camera);
    if rms > init_rms {
        debug!("refinement rms {:.4} worse than initial {:.4}", rms, init_rms);
        return Ok((init_camera, init_rt));
    }
    Ok((camera, rt))
}

/// Pose of the board relative to a known camera.
pub fn solve_pnp(frame_feature: &FrameFeature, camera: &OpenCVModel5<f64>) -> Result<RvecTvec, PoseError> {
    validate(frame_feature)?;
    let init_rt = init_pose(frame_feature, camera).ok_or(PoseError::PnpFailed)?;
    if !init_rt.is_finite() {
        return Err(PoseError::NonFinite);
    }

    let mut problem = tiny_solver::Problem::new();
    for f in &frame_feature.features {
        problem.add_residual_block(
            2,
            &["rvec", "tvec"],
            Box::new(PoseOnlyFactor::new(camera, &f.p3d, &f.p2d)),
            None,
        );
    }
    let (rvec, tvec) = init_rt.to_dvec();
    let initial_values = HashMap::<String, na::DVector<f64>>::from([
        ("rvec".to_string(), rvec),
        ("tvec".to_string(), tvec),
    ]);
    let optimizer = tiny_solver::LevenbergMarquardtOptimizer::default();
    let refined = optimizer
        .optimize(&problem, &initial_values, Some(lm_options()))
        .and_then(|result| match (result.get("rvec"), result.get("tvec")) {
            (Some(r), Some(t)) => Some(RvecTvec::new(r.as_slice(), t.as_slice())),
            _ => None,
        })
        .filter(RvecTvec::is_finite);

    Ok(refined.unwrap_or(init_rt))
}

/// Projects board points through a pose and camera.
pub fn project_points(
    p3ds: &[glam::Vec3],
    pose: &RvecTvec,
    camera: &OpenCVModel5<f64>,
) -> Vec<glam::Vec2> {
    let iso = pose.to_na_isometry3();
    p3ds.iter()
        .map(|p| {
            let pc = iso * na::Point3::new(p.x as f64, p.y as f64, p.z as f64);
            let uv = camera.project_one(&pc.coords);
            glam::Vec2::new(uv[0] as f32, uv[1] as f32)
        })
        .collect()
}

pub fn reprojection_rms(frame_feature: &FrameFeature, pose: &RvecTvec, camera: &OpenCVModel5<f64>) -> f64 {
    if frame_feature.is_empty() {
        return 0.0;
    }
    let projected = project_points(&frame_feature.p3ds(), pose, camera);
    let sum_sq: f64 = projected
        .iter()
        .zip(&frame_feature.features)
        .map(|(p, f)| (*p - f.p2d).length_squared() as f64)
        .sum();
    (sum_sq / frame_feature.len() as f64).sqrt()
}
