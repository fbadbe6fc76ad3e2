use approx::assert_relative_eq;
use glam::{Vec2, Vec3};
use marker_based_ar::board::create_default_7x7_board;
use marker_based_ar::camera_model::{CameraModel, OpenCVModel5};
use marker_based_ar::detected_points::FrameFeature;
use marker_based_ar::error::PoseError;
use marker_based_ar::pose::{
    calibrate_single_view, project_points, solve_pnp, IntrinsicsMode, PoseEstimator,
};
use marker_based_ar::types::RvecTvec;

fn synthetic_feature(camera: &OpenCVModel5<f64>, pose: &RvecTvec) -> FrameFeature {
    let board = create_default_7x7_board();
    let p2ds = project_points(&board.points_3d, pose, camera);
    FrameFeature::from_correspondences((camera.width, camera.height), &board.points_3d, &p2ds)
        .unwrap()
}

#[test]
fn test_center_projection_with_known_intrinsics() {
    let camera = OpenCVModel5::pinhole(500.0, 500.0, 320.0, 240.0, 640, 480);
    let truth = RvecTvec::new(&[0.0, 0.0, 0.0], &[0.0, 0.0, 5.0]);
    let feature = synthetic_feature(&camera, &truth);

    let pose = solve_pnp(&feature, &camera).unwrap();
    let center = project_points(&[Vec3::new(3.0, 3.0, 0.0)], &pose, &camera)[0];
    assert_relative_eq!(center.x as f64, 500.0 * 3.0 / 5.0 + 320.0, epsilon = 1e-3);
    assert_relative_eq!(center.y as f64, 500.0 * 3.0 / 5.0 + 240.0, epsilon = 1e-3);
    assert_relative_eq!(pose.na_tvec()[2], 5.0, epsilon = 1e-4);
}

#[test]
fn test_estimator_with_fixed_intrinsics() {
    let camera = OpenCVModel5::pinhole(500.0, 500.0, 320.0, 240.0, 640, 480);
    let truth = RvecTvec::new(&[0.0, 0.0, 0.0], &[0.0, 0.0, 5.0]);
    let feature = synthetic_feature(&camera, &truth);

    let mut estimator = PoseEstimator::new(
        IntrinsicsMode::Fixed {
            camera: camera.clone(),
        },
        Vec3::new(3.0, 3.0, 0.0),
    );
    let estimate = estimator.estimate(&feature).unwrap();
    assert_eq!(estimate.camera, camera);
    assert!((estimate.center_2d - Vec2::new(620.0, 540.0)).length() < 1e-3);
    assert!(estimate.rms < 1e-3);
}

#[test]
fn test_single_view_calibration_recovers_focal() {
    let camera = OpenCVModel5::pinhole(600.0, 600.0, 319.5, 239.5, 640, 480);
    let truth = RvecTvec::new(&[0.35, -0.25, 0.05], &[-3.0, -3.0, 14.0]);
    let feature = synthetic_feature(&camera, &truth);

    let (calibrated, pose) = calibrate_single_view(&feature).unwrap();
    assert_relative_eq!(calibrated.fx, 600.0, max_relative = 1e-2);
    assert_relative_eq!(calibrated.fy, 600.0, max_relative = 1e-2);
    assert_relative_eq!(calibrated.cx, 319.5);
    assert_relative_eq!(calibrated.cy, 239.5);

    let center = Vec3::new(3.0, 3.0, 0.0);
    let expected = project_points(&[center], &truth, &camera)[0];
    let got = project_points(&[center], &pose, &calibrated)[0];
    assert!((expected - got).length() < 0.05, "{:?} vs {:?}", expected, got);
}

#[test]
fn test_per_frame_estimator_projects_center() {
    let camera = OpenCVModel5::pinhole(600.0, 600.0, 319.5, 239.5, 640, 480);
    let truth = RvecTvec::new(&[0.35, -0.25, 0.05], &[-3.0, -3.0, 14.0]);
    let feature = synthetic_feature(&camera, &truth);
    let center = Vec3::new(3.0, 3.0, 0.0);
    let expected = project_points(&[center], &truth, &camera)[0];

    let mut estimator = PoseEstimator::new(IntrinsicsMode::PerFrame, center);
    let estimate = estimator.estimate(&feature).unwrap();
    assert!((estimate.center_2d - expected).length() < 0.05);
    assert!(estimator.camera().is_some());
}

#[test]
fn test_first_detection_reuses_intrinsics() {
    let camera = OpenCVModel5::pinhole(600.0, 600.0, 319.5, 239.5, 640, 480);
    let first = synthetic_feature(&camera, &RvecTvec::new(&[0.35, -0.25, 0.05], &[-3.0, -3.0, 14.0]));
    let second = synthetic_feature(&camera, &RvecTvec::new(&[-0.2, 0.3, 0.0], &[-2.0, -3.5, 16.0]));

    let mut estimator = PoseEstimator::new(IntrinsicsMode::FirstDetection, Vec3::new(3.0, 3.0, 0.0));
    let a = estimator.estimate(&first).unwrap();
    let b = estimator.estimate(&second).unwrap();
    assert_eq!(a.camera, b.camera);
}

#[test]
fn test_mismatched_points_are_rejected() {
    let board = create_default_7x7_board();
    let p2ds = vec![Vec2::ZERO; 48];
    let err = FrameFeature::from_correspondences((640, 480), &board.points_3d, &p2ds).unwrap_err();
    assert_eq!(err, PoseError::PointCountMismatch { object: 49, image: 48 });
}

#[test]
fn test_too_few_points_and_empty_frame() {
    let board = create_default_7x7_board();
    let few = FrameFeature::from_correspondences(
        (640, 480),
        &board.points_3d[..3],
        &[Vec2::ZERO, Vec2::X, Vec2::Y],
    )
    .unwrap();
    assert!(matches!(
        calibrate_single_view(&few),
        Err(PoseError::TooFewPoints { .. })
    ));

    let camera = OpenCVModel5::pinhole(500.0, 500.0, 320.0, 240.0, 640, 480);
    let mut zero = synthetic_feature(&camera, &RvecTvec::new(&[0.0; 3], &[0.0, 0.0, 5.0]));
    zero.img_w_h = (0, 480);
    assert!(matches!(
        solve_pnp(&zero, &camera),
        Err(PoseError::InvalidFrameSize { .. })
    ));
}

#[test]
fn test_unproject_inverts_distortion() {
    let mut camera = OpenCVModel5::pinhole(500.0, 510.0, 320.0, 240.0, 640, 480);
    camera.k1 = -0.1;
    camera.k2 = 0.01;
    camera.p1 = 0.001;
    camera.p2 = -0.0005;
    let p = nalgebra::Vector3::new(0.2, -0.15, 1.0);
    let uv = camera.project_one(&p);
    let ray = camera.unproject_one(&uv);
    assert_relative_eq!(ray[0], 0.2, epsilon = 1e-6);
    assert_relative_eq!(ray[1], -0.15, epsilon = 1e-6);
}
