mod common;

use common::SyntheticBoard;
use image::{Rgb, RgbImage};
use marker_based_ar::detector::{find_chessboard_corners, ChessboardDetector, DetectorParams};

#[test]
fn test_detects_synthetic_board_in_row_major_order() {
    let board = SyntheticBoard::seven_by_seven();
    let img = board.render(640, 480);
    let corners = find_chessboard_corners(&img, 7, 7).expect("board should be found");
    assert_eq!(corners.len(), 49);
    for (i, (got, truth)) in corners.iter().zip(board.corners_row_major()).enumerate() {
        let err = got.distance(truth);
        assert!(err < 1.0, "corner {} off by {} px: {:?} vs {:?}", i, err, got, truth);
    }
}

#[test]
fn test_subpixel_refinement_is_accurate() {
    let board = SyntheticBoard::seven_by_seven();
    let img = board.render(640, 480);
    let corners = find_chessboard_corners(&img, 7, 7).unwrap();
    let mean_err = corners
        .iter()
        .zip(board.corners_row_major())
        .map(|(a, b)| a.distance(b))
        .sum::<f32>()
        / corners.len() as f32;
    assert!(mean_err < 0.25, "mean error {}", mean_err);
}

#[test]
fn test_solid_image_has_no_board() {
    let img = RgbImage::from_pixel(320, 240, Rgb([90, 90, 90]));
    assert!(find_chessboard_corners(&img, 7, 7).is_none());
}

#[test]
fn test_wrong_pattern_size_is_rejected() {
    let board = SyntheticBoard::seven_by_seven();
    let img = board.render(640, 480);
    let detector = ChessboardDetector::new(9, 6, DetectorParams::default());
    assert!(detector.detect(&img).is_none());
}

#[test]
fn test_low_contrast_board_with_flags() {
    let board = SyntheticBoard::seven_by_seven();
    let img = board.render(640, 480);
    // squeeze the gray levels into 100..140
    let dim = RgbImage::from_fn(640, 480, |x, y| {
        let v = img.get_pixel(x, y)[0] as u32;
        let s = (100 + v * 40 / 255) as u8;
        Rgb([s, s, s])
    });
    let params = DetectorParams {
        adaptive_threshold: true,
        normalize_image: true,
        ..DetectorParams::default()
    };
    let detector = ChessboardDetector::new(7, 7, params);
    let corners = detector.detect(&dim).expect("normalized board should be found");
    assert_eq!(corners.len(), 49);
    assert!(corners[0].distance(board.corner(0, 0)) < 1.0);
}
