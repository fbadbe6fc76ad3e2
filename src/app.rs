//! Per-frame pipeline: detect, estimate pose, render, composite, display.

use glam::{Vec2, Vec3};
use image::{DynamicImage, RgbImage, RgbaImage};
use log::{debug, error, info, trace, warn};

use crate::board::Board;
use crate::capture::FrameSource;
use crate::composite::{composite, flip_vertical, Roi};
use crate::config::ArConfig;
use crate::detected_points::FrameFeature;
use crate::detector::ChessboardDetector;
use crate::display::Display;
use crate::error::{ArError, CaptureError};
use crate::overlay;
use crate::pose::{PoseEstimate, PoseEstimator};
use crate::render::{RenderContext, Renderer};

/// Last stage a frame reached before it was displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameStage {
    Captured,
    Detected,
    Posed,
    Rendered,
    Composited,
}

#[derive(Debug, Clone)]
pub struct FrameReport {
    pub index: u64,
    pub stage: FrameStage,
    pub corners: Option<Vec<Vec2>>,
    pub estimate: Option<PoseEstimate>,
    pub roi: Option<Roi>,
    /// Why the chain stopped early, if it did after detection.
    pub skip_reason: Option<String>,
    /// Frame as it should be displayed.
    pub output: RgbaImage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub detected: u64,
    pub composited: u64,
}

pub struct ArApp {
    config: ArConfig,
    board: Board,
    detector: ChessboardDetector,
    estimator: PoseEstimator,
    renderer: Box<dyn Renderer>,
    frame_idx: u64,
    #[cfg(feature = "visualization")]
    recording: Option<rerun::RecordingStream>,
}

impl ArApp {
    pub fn new(config: ArConfig, renderer: Box<dyn Renderer>) -> ArApp {
        let board = Board::from_config(&config.board);
        let detector = ChessboardDetector::new(board.cols, board.rows, config.detector.clone());
        let estimator = PoseEstimator::new(config.intrinsics.clone(), board.center);
        ArApp {
            config,
            board,
            detector,
            estimator,
            renderer,
            frame_idx: 0,
            #[cfg(feature = "visualization")]
            recording: None,
        }
    }

    /// Validates the configuration and builds the GPU renderer from the assets it names.
    pub fn from_config(config: ArConfig) -> Result<ArApp, ArError> {
        config.validate()?;
        let renderer = RenderContext::from_files(
            config.render.clone(),
            &config.mesh_path,
            &config.texture_path,
            &config.vertex_shader_path,
            &config.fragment_shader_path,
        )?;
        Ok(ArApp::new(config, Box::new(renderer)))
    }

    #[cfg(feature = "visualization")]
    pub fn with_recording(mut self, recording: rerun::RecordingStream) -> ArApp {
        self.recording = Some(recording);
        self
    }

    pub fn config(&self) -> &ArConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    pub fn process_frame(&mut self, frame: RgbImage) -> FrameReport {
        let index = self.frame_idx;
        self.frame_idx += 1;
        let (w, h) = frame.dimensions();

        let corners = self.detector.detect(&frame);
        let mut report = FrameReport {
            index,
            stage: FrameStage::Captured,
            corners: None,
            estimate: None,
            roi: None,
            skip_reason: None,
            output: DynamicImage::ImageRgb8(frame).to_rgba8(),
        };
        let Some(corners) = corners else {
            trace!("frame {}: no chessboard", index);
            self.log_visualization(&report);
            return report;
        };
        report.stage = FrameStage::Detected;
        report.corners = Some(corners.clone());

        let estimate = FrameFeature::from_correspondences((w, h), &self.board.points_3d, &corners)
            .and_then(|frame_feature| self.estimator.estimate(&frame_feature));
        let estimate = match estimate {
            Ok(estimate) => estimate,
            Err(e) => {
                warn!("frame {}: pose skipped: {}", index, e);
                report.skip_reason = Some(e.to_string());
                self.finish(&mut report);
                return report;
            }
        };
        report.stage = FrameStage::Posed;
        debug!(
            "frame {}: center {:.2?} rms {:.3} px",
            index, estimate.center_2d, estimate.rms
        );

        self.renderer
            .draw_frame(Vec3::from_array(self.config.render.light_position));
        let rendered = match self.renderer.read_pixels() {
            Ok(pixels) => flip_vertical(&pixels),
            Err(e) => {
                warn!("frame {}: render skipped: {}", index, e);
                report.skip_reason = Some(e.to_string());
                report.estimate = Some(estimate);
                self.finish(&mut report);
                return report;
            }
        };
        report.stage = FrameStage::Rendered;

        match composite(&mut report.output, &rendered, estimate.center_2d) {
            Ok(roi) => {
                report.stage = FrameStage::Composited;
                report.roi = Some(roi);
            }
            Err(e) => {
                warn!("frame {}: composite skipped: {}", index, e);
                report.skip_reason = Some(e.to_string());
            }
        }
        report.estimate = Some(estimate);
        self.finish(&mut report);
        report
    }

    fn finish(&self, report: &mut FrameReport) {
        if self.config.overlay {
            if let Some(corners) = &report.corners {
                overlay::draw_corners(&mut report.output, corners, self.board.cols);
            }
            if let Some(estimate) = &report.estimate {
                let length = self.board.cols.min(self.board.rows) as f32 * 0.5;
                overlay::draw_axes(&mut report.output, &estimate.pose, &estimate.camera, length);
            }
        }
        self.log_visualization(report);
    }

    #[cfg(feature = "visualization")]
    fn log_visualization(&self, report: &FrameReport) {
        use crate::visualization::{log_center, log_corners, log_frame, set_frame};
        let Some(recording) = &self.recording else {
            return;
        };
        set_frame(recording, report.index);
        log_frame(recording, "/cam0", &report.output);
        if let Some(corners) = &report.corners {
            log_corners(recording, "/cam0", corners, self.board.cols);
        }
        if let Some(estimate) = &report.estimate {
            log_center(recording, "/cam0", estimate.center_2d);
        }
    }

    #[cfg(not(feature = "visualization"))]
    fn log_visualization(&self, _report: &FrameReport) {}

    /// Runs until the display asks to exit or the source runs dry.
    ///
    /// Undecodable images are skipped, any other capture failure ends the run with an error.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        display: &mut dyn Display,
    ) -> Result<RunSummary, ArError> {
        info!("running on {}", source.describe());
        let mut summary = RunSummary::default();
        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("end of stream");
                    break;
                }
                Err(CaptureError::Decode { path, source }) => {
                    warn!("skipping {}: {}", path, source);
                    continue;
                }
                Err(e) => {
                    error!("capture failed: {}", e);
                    return Err(e.into());
                }
            };
            if display.exit_requested() {
                info!("exit requested");
                break;
            }

            let report = self.process_frame(frame);
            summary.frames += 1;
            if report.stage >= FrameStage::Detected {
                summary.detected += 1;
            }
            if report.stage == FrameStage::Composited {
                summary.composited += 1;
            }
            display.show(&report.output)?;
        }
        info!(
            "{} frames, {} detected, {} composited",
            summary.frames, summary.detected, summary.composited
        );
        Ok(summary)
    }
}
