//! Debug drawing on the output frame: detected corners and board axes.

use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};

use crate::camera_model::OpenCVModel5;
use crate::pose::project_points;
use crate::types::RvecTvec;

const AXIS_COLORS: [Rgba<u8>; 3] = [
    Rgba([255, 0, 0, 255]),
    Rgba([0, 255, 0, 255]),
    Rgba([0, 0, 255, 255]),
];

fn put_disk(img: &mut RgbaImage, center: Vec2, radius: f32, color: Rgba<u8>) {
    let r = radius.max(0.5);
    let x0 = (center.x - r).floor().max(0.0) as i64;
    let y0 = (center.y - r).floor().max(0.0) as i64;
    let x1 = ((center.x + r).ceil() as i64).min(img.width() as i64 - 1);
    let y1 = ((center.y + r).ceil() as i64).min(img.height() as i64 - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            if Vec2::new(x as f32, y as f32).distance_squared(center) <= r * r {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Thick line, clipped to the image.
pub fn draw_line(img: &mut RgbaImage, a: Vec2, b: Vec2, color: Rgba<u8>, thickness: f32) {
    if !a.is_finite() || !b.is_finite() {
        return;
    }
    let steps = a.distance(b).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let p = a.lerp(b, i as f32 / steps as f32);
        put_disk(img, p, thickness / 2.0, color);
    }
}

pub fn draw_arrow(img: &mut RgbaImage, from: Vec2, to: Vec2, color: Rgba<u8>, thickness: f32) {
    draw_line(img, from, to, color, thickness);
    let d = from - to;
    let len = d.length();
    if len <= f32::EPSILON {
        return;
    }
    let tip = d / len * (len * 0.2).min(20.0);
    for angle in [0.4f32, -0.4] {
        let wing = Vec2::from_angle(angle).rotate(tip);
        draw_line(img, to, to + wing, color, thickness);
    }
}

/// Row-major corners, one color per row, consecutive corners joined.
pub fn draw_corners(img: &mut RgbaImage, corners: &[Vec2], cols: usize) {
    if cols == 0 {
        return;
    }
    let rows = corners.len().div_ceil(cols);
    let row_color = |i: usize| {
        let c = colorous::TURBO.eval_continuous((i / cols) as f64 / rows as f64);
        Rgba([c.r, c.g, c.b, 255])
    };
    for (i, pair) in corners.windows(2).enumerate() {
        draw_line(img, pair[0], pair[1], row_color(i + 1), 1.0);
    }
    for (i, p) in corners.iter().enumerate() {
        put_disk(img, *p, 4.0, row_color(i));
    }
}

/// Projected x, y, z axes of the board, `length` in board units.
pub fn draw_axes(img: &mut RgbaImage, pose: &RvecTvec, camera: &OpenCVModel5<f64>, length: f32) {
    let pts = [
        Vec3::ZERO,
        Vec3::X * length,
        Vec3::Y * length,
        Vec3::Z * length,
    ];
    let projected = project_points(&pts, pose, camera);
    let Some((origin, ends)) = projected.split_first() else {
        return;
    };
    for (end, color) in ends.iter().zip(AXIS_COLORS) {
        draw_arrow(img, *origin, *end, color, 3.0);
    }
}
