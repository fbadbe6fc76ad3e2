use image::GrayImage;

/// Stop condition of the iterative refinement, both limits apply.
#[derive(Debug, Clone, Copy)]
pub struct TermCriteria {
    pub max_iterations: usize,
    pub epsilon: f32,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 40,
            epsilon: 0.001,
        }
    }
}

#[inline]
fn sample_bilinear(img: &GrayImage, x: f32, y: f32) -> f32 {
    let w = img.width() as i32;
    let h = img.height() as i32;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let clamp = |v: i32, hi: i32| v.clamp(0, hi - 1) as u32;
    let (xi, yi) = (x0 as i32, y0 as i32);
    let p = |xx: i32, yy: i32| img.get_pixel(clamp(xx, w), clamp(yy, h))[0] as f32;
    let top = p(xi, yi) * (1.0 - fx) + p(xi + 1, yi) * fx;
    let bottom = p(xi, yi + 1) * (1.0 - fx) + p(xi + 1, yi + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Refines corner locations so that the image gradient in a window around
/// each corner is orthogonal to the vector from the corner.
///
/// `half_window` of 5 means an 11x11 window. Corners that drift further than
/// the half window from their start keep the start position.
pub fn corner_sub_pix(
    img: &GrayImage,
    corners: &mut [glam::Vec2],
    half_window: u32,
    criteria: TermCriteria,
) {
    if img.width() == 0 || img.height() == 0 {
        return;
    }
    let win = half_window as i32;
    let side = (2 * win + 1) as usize;
    let mask: Vec<f32> = {
        let weights: Vec<f32> = (-win..=win)
            .map(|i| {
                let t = i as f32 / win.max(1) as f32;
                (-t * t).exp()
            })
            .collect();
        let mut m = Vec::with_capacity(side * side);
        for wy in &weights {
            for wx in &weights {
                m.push(wy * wx);
            }
        }
        m
    };
    let eps2 = criteria.epsilon * criteria.epsilon;
    let patch_side = side + 2;

    for corner in corners.iter_mut() {
        let start = *corner;
        let mut c = start;
        let mut patch = vec![0.0f32; patch_side * patch_side];

        for _ in 0..criteria.max_iterations.max(1) {
            for (i, row) in patch.chunks_mut(patch_side).enumerate() {
                let y = c.y + i as f32 - (win + 1) as f32;
                for (j, v) in row.iter_mut().enumerate() {
                    let x = c.x + j as f32 - (win + 1) as f32;
                    *v = sample_bilinear(img, x, y);
                }
            }

            let (mut a, mut b, mut cc, mut bb1, mut bb2) = (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
            for i in 0..side {
                let py = (i as i32 - win) as f64;
                for j in 0..side {
                    let px = (j as i32 - win) as f64;
                    let m = mask[i * side + j] as f64;
                    let (pi, pj) = (i + 1, j + 1);
                    let tgx = (patch[pi * patch_side + pj + 1] - patch[pi * patch_side + pj - 1]) as f64;
                    let tgy = (patch[(pi + 1) * patch_side + pj] - patch[(pi - 1) * patch_side + pj]) as f64;
                    let gxx = tgx * tgx * m;
                    let gxy = tgx * tgy * m;
                    let gyy = tgy * tgy * m;
                    a += gxx;
                    b += gxy;
                    cc += gyy;
                    bb1 += gxx * px + gxy * py;
                    bb2 += gxy * px + gyy * py;
                }
            }

            let det = a * cc - b * b;
            if det.abs() <= f64::EPSILON {
                break;
            }
            let scale = 1.0 / det;
            let dx = (cc * scale * bb1 - b * scale * bb2) as f32;
            let dy = (-b * scale * bb1 + a * scale * bb2) as f32;
            c += glam::Vec2::new(dx, dy);

            let outside = c.x < 0.0
                || c.y < 0.0
                || c.x >= img.width() as f32
                || c.y >= img.height() as f32;
            if outside || dx * dx + dy * dy <= eps2 {
                break;
            }
        }

        if (c - start).abs().max_element() <= win as f32 && c.is_finite() {
            *corner = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supersampled_x_corner(size: u32, corner: glam::Vec2) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let mut acc = 0.0;
            for sy in 0..4 {
                for sx in 0..4 {
                    let px = x as f32 - 0.5 + (sx as f32 + 0.5) / 4.0;
                    let py = y as f32 - 0.5 + (sy as f32 + 0.5) / 4.0;
                    if (px < corner.x) == (py < corner.y) {
                        acc += 255.0;
                    }
                }
            }
            image::Luma([(acc / 16.0f32).round() as u8])
        })
    }

    #[test]
    fn converges_to_true_corner() {
        let truth = glam::Vec2::new(15.3, 16.7);
        let img = supersampled_x_corner(32, truth);
        let mut corners = [glam::Vec2::new(16.0, 16.0)];
        corner_sub_pix(&img, &mut corners, 5, TermCriteria::default());
        assert!((corners[0] - truth).length() < 0.1, "{:?}", corners[0]);
    }
}
