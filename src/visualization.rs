use std::io::Cursor;

use image::RgbaImage;
use log::warn;
use rerun::RecordingStream;

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[glam::Vec2]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|p| (p.x + 0.5, p.y + 0.5)).collect()
}

fn report(result: rerun::RecordingStreamResult<()>, what: &str) {
    if let Err(e) = result {
        warn!("failed to log {}: {}", what, e);
    }
}

pub fn set_frame(recording: &RecordingStream, frame_idx: u64) {
    recording.set_time("frame", rerun::TimeCell::from_sequence(frame_idx as i64));
}

/// Logs a frame as a PNG compressed image.
pub fn log_frame(recording: &RecordingStream, topic: &str, img: &RgbaImage) {
    let mut bytes: Vec<u8> = Vec::new();
    if let Err(e) = img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png) {
        warn!("failed to encode {}: {}", topic, e);
        return;
    }
    match rerun::Image::from_file_contents(bytes, None) {
        Ok(image) => report(recording.log(format!("{}/image", topic), &image), topic),
        Err(e) => warn!("failed to wrap {}: {}", topic, e),
    }
}

/// Detected corners colored by row, labelled by index.
pub fn log_corners(recording: &RecordingStream, topic: &str, corners: &[glam::Vec2], cols: usize) {
    let rows = corners.len().div_ceil(cols.max(1)).max(1);
    let (colors, labels): (Vec<_>, Vec<_>) = (0..corners.len())
        .map(|i| {
            let c = colorous::TURBO.eval_continuous((i / cols.max(1)) as f64 / rows as f64);
            ((c.r, c.g, c.b, 255u8), format!("{}", i))
        })
        .unzip();
    report(
        recording.log(
            format!("{}/pts", topic),
            &rerun::Points2D::new(rerun_shift(corners))
                .with_colors(colors)
                .with_labels(labels)
                .with_radii([rerun::Radius::new_ui_points(5.0)]),
        ),
        topic,
    );
}

pub fn log_center(recording: &RecordingStream, topic: &str, center: glam::Vec2) {
    report(
        recording.log(
            format!("{}/center", topic),
            &rerun::Points2D::new(rerun_shift(&[center]))
                .with_colors([(255u8, 0u8, 255u8, 255u8)])
                .with_radii([rerun::Radius::new_ui_points(8.0)]),
        ),
        topic,
    );
}
