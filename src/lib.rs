pub mod app;
pub mod board;
pub mod camera_model;
pub mod capture;
pub mod composite;
pub mod config;
pub mod convert;
pub mod detected_points;
pub mod detector;
pub mod display;
pub mod error;
pub mod io;
pub mod optimization;
pub mod overlay;
pub mod pose;
pub mod render;
pub mod types;

#[cfg(feature = "visualization")]
pub mod visualization;

pub use app::{ArApp, FrameReport, FrameStage, RunSummary};
pub use config::ArConfig;
pub use error::ArError;
