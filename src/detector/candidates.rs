//! X-junction candidates from the `chess-corners` ChESS detector.

use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor};
use glam::Vec2;
use image::GrayImage;

/// Thresholding and suppression settings handed to `chess-corners`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateParams {
    /// `Some` overrides the threshold relative to the strongest response.
    pub threshold_abs: Option<f32>,
    pub threshold_rel: f32,
    pub nms_radius: u32,
    pub min_cluster_size: u32,
}

pub fn chess_config(params: &CandidateParams) -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.params.threshold_rel = params.threshold_rel;
    cfg.params.threshold_abs = params.threshold_abs;
    cfg.params.nms_radius = params.nms_radius;
    cfg.params.min_cluster_size = params.min_cluster_size;
    cfg
}

fn to_point(c: &CornerDescriptor) -> Vec2 {
    Vec2::new(c.x, c.y)
}

/// Corner candidates, strongest response first.
pub fn chess_candidates(gray: &GrayImage, params: &CandidateParams) -> Vec<Vec2> {
    let mut corners = find_chess_corners_image(gray, &chess_config(params));
    corners.sort_by(|a, b| b.response.total_cmp(&a.response));
    corners.iter().map(to_point).collect()
}
