use log::debug;
use nalgebra as na;

fn hartley_normalization(pts: &[glam::DVec2]) -> (Vec<glam::DVec2>, na::Matrix3<f64>) {
    let n = pts.len() as f64;
    let centroid = pts.iter().fold(glam::DVec2::ZERO, |acc, p| acc + *p) / n;
    let mean_dist = pts.iter().map(|p| p.distance(centroid)).sum::<f64>() / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = na::Matrix3::new(
        s,
        0.0,
        -s * centroid.x,
        0.0,
        s,
        -s * centroid.y,
        0.0,
        0.0,
        1.0,
    );
    let normalized = pts.iter().map(|p| (*p - centroid) * s).collect();
    (normalized, t)
}

/// Normalized DLT estimate of `H` with `img ~ H * [x, y, 1]` for board points on z = 0.
pub fn find_homography(board_xy: &[glam::DVec2], img_pts: &[glam::DVec2]) -> Option<na::Matrix3<f64>> {
    if board_xy.len() != img_pts.len() || board_xy.len() < 4 {
        return None;
    }
    let (src, t_src) = hartley_normalization(board_xy);
    let (dst, t_dst) = hartley_normalization(img_pts);

    let n = src.len();
    let mut a = na::DMatrix::<f64>::zeros(2 * n, 9);
    for (k, (s, d)) in src.iter().zip(&dst).enumerate() {
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let vt = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = vt.row(min_idx);
    let hn = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let h_den = t_dst.try_inverse()? * hn * t_src;
    let s = h_den[(2, 2)];
    if s.abs() < 1e-12 {
        debug!("homography is degenerate");
        return None;
    }
    Some(h_den / s)
}

/// Focal lengths from one plane homography with a known principal point.
///
/// Uses the orthogonality and equal-norm constraints of the first two
/// rotation columns, as OpenCV's `initCameraMatrix2D` does. Returns `None`
/// for fronto-parallel views where the constraints vanish.
pub fn homography_to_focal_xy(h_mat: &na::Matrix3<f64>, cx: f64, cy: f64) -> Option<(f64, f64)> {
    let t = na::Matrix3::new(1.0, 0.0, -cx, 0.0, 1.0, -cy, 0.0, 0.0, 1.0);
    let h = t * h_mat;
    let c0 = h.column(0).into_owned();
    let c1 = h.column(1).into_owned();
    let d1 = (c0 + c1) * 0.5;
    let d2 = (c0 - c1) * 0.5;
    let n = [c0, c1, d1, d2].map(|v| {
        let norm = v.norm();
        if norm > 1e-12 { v / norm } else { v }
    });

    let a = na::Matrix2::new(
        n[0][0] * n[1][0],
        n[0][1] * n[1][1],
        n[2][0] * n[3][0],
        n[2][1] * n[3][1],
    );
    let b = na::Vector2::new(-n[0][2] * n[1][2], -n[2][2] * n[3][2]);
    let f = a.lu().solve(&b)?;
    if !(f[0] > 1e-12 && f[1] > 1e-12) {
        debug!("focal constraints are degenerate: {:?}", f);
        return None;
    }
    let fx = (1.0 / f[0]).sqrt();
    let fy = (1.0 / f[1]).sqrt();
    if fx.is_finite() && fy.is_finite() {
        Some((fx, fy))
    } else {
        None
    }
}
