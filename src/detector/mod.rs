//! Chessboard corner detection: ChESS candidates, grid assembly, sub-pixel refinement.

pub mod candidates;
pub mod grid;
pub mod subpix;

use image::{GrayImage, RgbImage};
use log::trace;
use serde::{Deserialize, Serialize};

pub use grid::assemble_grid;
pub use candidates::{chess_candidates, CandidateParams};
pub use subpix::{corner_sub_pix, TermCriteria};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Threshold relative to the strongest response instead of `threshold_abs`.
    pub adaptive_threshold: bool,
    /// Give up early when there are fewer candidates than corners.
    pub fast_check: bool,
    /// Stretch the gray levels to 0..255 before the response.
    pub normalize_image: bool,
    pub threshold_rel: f32,
    pub threshold_abs: f32,
    pub nms_radius: u32,
    pub min_cluster_size: u32,
    pub subpix_half_window: u32,
    pub subpix_max_iterations: usize,
    pub subpix_epsilon: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            adaptive_threshold: true,
            fast_check: true,
            normalize_image: true,
            threshold_rel: 0.2,
            threshold_abs: 100.0,
            nms_radius: 2,
            min_cluster_size: 2,
            subpix_half_window: 5,
            subpix_max_iterations: 40,
            subpix_epsilon: 0.001,
        }
    }
}

pub struct ChessboardDetector {
    cols: usize,
    rows: usize,
    params: DetectorParams,
}

impl ChessboardDetector {
    pub fn new(cols: usize, rows: usize, params: DetectorParams) -> ChessboardDetector {
        ChessboardDetector { cols, rows, params }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn pattern_size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    fn candidate_params(&self) -> CandidateParams {
        CandidateParams {
            threshold_abs: (!self.params.adaptive_threshold).then_some(self.params.threshold_abs),
            threshold_rel: self.params.threshold_rel,
            nms_radius: self.params.nms_radius,
            min_cluster_size: self.params.min_cluster_size,
        }
    }

    /// Interior corners in row-major order, or `None` when the full pattern is not found.
    pub fn detect(&self, frame: &RgbImage) -> Option<Vec<glam::Vec2>> {
        let gray = image::imageops::grayscale(frame);
        self.detect_gray(&gray)
    }

    pub fn detect_gray(&self, gray: &GrayImage) -> Option<Vec<glam::Vec2>> {
        let expected = self.cols * self.rows;
        if expected == 0 {
            return None;
        }
        let candidate_params = self.candidate_params();
        let candidates = if self.params.normalize_image {
            chess_candidates(&normalize(gray), &candidate_params)
        } else {
            chess_candidates(gray, &candidate_params)
        };
        trace!("{} corner candidates", candidates.len());
        if self.params.fast_check && candidates.len() < expected {
            return None;
        }

        let mut corners = assemble_grid(&candidates, self.cols, self.rows)?;
        corner_sub_pix(
            gray,
            &mut corners,
            self.params.subpix_half_window,
            TermCriteria {
                max_iterations: self.params.subpix_max_iterations,
                epsilon: self.params.subpix_epsilon,
            },
        );
        Some(corners)
    }
}

/// One-shot detection with default parameters.
pub fn find_chessboard_corners(frame: &RgbImage, cols: usize, rows: usize) -> Option<Vec<glam::Vec2>> {
    ChessboardDetector::new(cols, rows, DetectorParams::default()).detect(frame)
}

/// Linear stretch of the gray levels to the full range.
pub fn normalize(gray: &GrayImage) -> GrayImage {
    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if hi <= lo {
        return gray.clone();
    }
    let scale = 255.0 / (hi - lo) as f32;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        image::Luma([((v - lo) as f32 * scale).round() as u8])
    })
}
