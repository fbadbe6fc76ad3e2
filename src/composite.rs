//! Masked copy of the rendered object onto the camera frame.

use glam::Vec2;
use image::{GrayImage, RgbaImage};
use log::trace;

use crate::error::CompositeError;

/// Region of the frame covered by the rendered image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Places a `width x height` rectangle centered on `center` and checks it fits the frame.
pub fn roi(
    center: Vec2,
    width: u32,
    height: u32,
    frame_width: u32,
    frame_height: u32,
) -> Result<Roi, CompositeError> {
    let x = (center.x - width as f32 / 2.0).round() as i64;
    let y = (center.y - height as f32 / 2.0).round() as i64;
    let out_of_bounds = || CompositeError::RoiOutOfBounds {
        x,
        y,
        width,
        height,
        frame_width,
        frame_height,
    };
    if !center.is_finite()
        || x < 0
        || y < 0
        || x + width as i64 > frame_width as i64
        || y + height as i64 > frame_height as i64
    {
        return Err(out_of_bounds());
    }
    Ok(Roi {
        x: x as u32,
        y: y as u32,
        width,
        height,
    })
}

/// Saturating sum of the four channels; nonzero where anything was drawn.
pub fn channel_sum_mask(rendered: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(rendered.width(), rendered.height(), |x, y| {
        let p = rendered.get_pixel(x, y);
        image::Luma([p[0]
            .saturating_add(p[1])
            .saturating_add(p[2])
            .saturating_add(p[3])])
    })
}

/// Turns a bottom-left origin read-back into top-left origin.
pub fn flip_vertical(img: &RgbaImage) -> RgbaImage {
    image::imageops::flip_vertical(img)
}

/// Copies `rendered` onto `frame` wherever its mask is nonzero.
///
/// An out-of-bounds region leaves the frame untouched.
pub fn composite(frame: &mut RgbaImage, rendered: &RgbaImage, center: Vec2) -> Result<Roi, CompositeError> {
    if rendered.width() == 0 || rendered.height() == 0 || frame.width() == 0 || frame.height() == 0 {
        return Err(CompositeError::EmptyImage);
    }
    let roi = roi(center, rendered.width(), rendered.height(), frame.width(), frame.height())?;
    let mask = channel_sum_mask(rendered);

    let mut copied = 0usize;
    for (x, y, m) in mask.enumerate_pixels() {
        if m[0] != 0 {
            frame.put_pixel(roi.x + x, roi.y + y, *rendered.get_pixel(x, y));
            copied += 1;
        }
    }
    trace!("composited {} pixels at {:?}", copied, roi);
    Ok(roi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roi_is_centered() {
        let r = roi(Vec2::new(320.0, 240.0), 100, 50, 640, 480).unwrap();
        assert_eq!(r, Roi { x: 270, y: 215, width: 100, height: 50 });
    }

    #[test]
    fn mask_saturates() {
        let img = RgbaImage::from_pixel(1, 1, image::Rgba([200, 200, 0, 0]));
        assert_eq!(channel_sum_mask(&img).get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn roi_touching_the_far_edge_fits() {
        assert!(roi(Vec2::new(590.0, 455.0), 100, 50, 640, 480).is_ok());
        assert!(roi(Vec2::new(590.6, 455.0), 100, 50, 640, 480).is_err());
    }
}
