//! Assembles loose corner candidates into a labelled `cols x rows` grid.

use std::collections::{HashMap, VecDeque};

use glam::Vec2;
use log::trace;

const K_NEAREST: usize = 8;
const AXIS_BINS: usize = 180;
const MIN_AXIS_SEPARATION_DEG: f32 = 30.0;
const DIRECTION_TOLERANCE_DEG: f32 = 30.0;
const MAX_SPACING_RATIO: f32 = 2.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    PlusU,
    MinusU,
    PlusV,
    MinusV,
}

impl Direction {
    const ALL: [Direction; 4] = [
        Direction::PlusU,
        Direction::MinusU,
        Direction::PlusV,
        Direction::MinusV,
    ];

    fn opposite(self) -> Direction {
        match self {
            Direction::PlusU => Direction::MinusU,
            Direction::MinusU => Direction::PlusU,
            Direction::PlusV => Direction::MinusV,
            Direction::MinusV => Direction::PlusV,
        }
    }

    fn step(self) -> (i32, i32) {
        match self {
            Direction::PlusU => (1, 0),
            Direction::MinusU => (-1, 0),
            Direction::PlusV => (0, 1),
            Direction::MinusV => (0, -1),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

fn k_nearest(points: &[Vec2]) -> Vec<Vec<(usize, f32)>> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut dists: Vec<(usize, f32)> = points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, q)| (j, p.distance(*q)))
                .collect();
            dists.sort_by(|a, b| a.1.total_cmp(&b.1));
            dists.truncate(K_NEAREST);
            dists
        })
        .collect()
}

fn bin_distance(a: usize, b: usize) -> usize {
    let d = a.abs_diff(b);
    d.min(AXIS_BINS - d)
}

/// Dominant undirected edge directions, in radians.
fn estimate_axes(points: &[Vec2], neighbors: &[Vec<(usize, f32)>]) -> Option<(f32, f32)> {
    let mut hist = [0.0f32; AXIS_BINS];
    for (i, nbs) in neighbors.iter().enumerate() {
        for (j, _) in nbs.iter().take(4) {
            let d = points[*j] - points[i];
            let angle = d.y.atan2(d.x).rem_euclid(std::f32::consts::PI).to_degrees();
            hist[(angle as usize).min(AXIS_BINS - 1)] += 1.0;
        }
    }
    let smoothed: Vec<f32> = (0..AXIS_BINS)
        .map(|b| {
            (-2i32..=2)
                .map(|o| hist[(b as i32 + o).rem_euclid(AXIS_BINS as i32) as usize])
                .sum()
        })
        .collect();

    let argmax = |allowed: &dyn Fn(usize) -> bool| {
        (0..AXIS_BINS)
            .filter(|b| allowed(*b))
            .max_by(|a, b| smoothed[*a].total_cmp(&smoothed[*b]))
            .filter(|b| smoothed[*b] > 0.0)
    };
    let u = argmax(&|_| true)?;
    let v = argmax(&|b| bin_distance(b, u) as f32 >= MIN_AXIS_SEPARATION_DEG)?;
    let to_rad = |b: usize| (b as f32 + 0.5).to_radians();
    Some((to_rad(u), to_rad(v)))
}

/// Closest neighbour along each of +u, -u, +v, -v.
fn directional_links(
    points: &[Vec2],
    neighbors: &[Vec<(usize, f32)>],
    axis_u: f32,
    axis_v: f32,
) -> Vec<[Option<usize>; 4]> {
    let cos_tol = DIRECTION_TOLERANCE_DEG.to_radians().cos();
    let u = Vec2::from_angle(axis_u);
    let v = Vec2::from_angle(axis_v);

    neighbors
        .iter()
        .enumerate()
        .map(|(i, nbs)| {
            let mut links = [None; 4];
            let Some(&(_, nearest)) = nbs.first() else {
                return links;
            };
            for dir in Direction::ALL {
                let axis = match dir {
                    Direction::PlusU => u,
                    Direction::MinusU => -u,
                    Direction::PlusV => v,
                    Direction::MinusV => -v,
                };
                links[dir.index()] = nbs
                    .iter()
                    .filter(|(_, d)| *d > 0.0 && *d <= MAX_SPACING_RATIO * nearest)
                    .find(|(j, d)| (points[*j] - points[i]).dot(axis) / d >= cos_tol)
                    .map(|(j, _)| *j);
            }
            links
        })
        .collect()
}

/// Integer labels of one connected component, or `None` on conflicting labels.
fn label_component(
    start: usize,
    links: &[[Option<usize>; 4]],
    visited: &mut [bool],
) -> Option<HashMap<usize, (i32, i32)>> {
    let mut labels = HashMap::from([(start, (0, 0))]);
    let mut cells = HashMap::from([((0, 0), start)]);
    let mut queue = VecDeque::from([start]);
    let mut consistent = true;
    visited[start] = true;

    while let Some(i) = queue.pop_front() {
        let (c, r) = labels[&i];
        for dir in Direction::ALL {
            let Some(j) = links[i][dir.index()] else {
                continue;
            };
            if links[j][dir.opposite().index()] != Some(i) {
                continue;
            }
            let (dc, dr) = dir.step();
            let label = (c + dc, r + dr);
            match labels.get(&j) {
                Some(existing) if *existing != label => consistent = false,
                Some(_) => {}
                None => {
                    if cells.insert(label, j).is_some() {
                        consistent = false;
                    }
                    labels.insert(j, label);
                    visited[j] = true;
                    queue.push_back(j);
                }
            }
        }
    }
    consistent.then_some(labels)
}

/// Picks the symmetry of the grid whose origin is the top-left-most corner
/// and whose column direction runs more to the right than the row direction.
fn canonical_order(grid: &[Vec2], cols: usize, rows: usize) -> Vec<Vec2> {
    let at = |c: usize, r: usize| grid[r * cols + c];
    let transposes: &[bool] = if cols == rows { &[false, true] } else { &[false] };

    let mut best: Option<((f32, f32), Vec<Vec2>)> = None;
    for &transpose in transposes {
        for flip_c in [false, true] {
            for flip_r in [false, true] {
                let mapped: Vec<Vec2> = (0..rows)
                    .flat_map(|r| (0..cols).map(move |c| (c, r)))
                    .map(|(c, r)| {
                        let (c, r) = if transpose { (r, c) } else { (c, r) };
                        let c = if flip_c { cols - 1 - c } else { c };
                        let r = if flip_r { rows - 1 - r } else { r };
                        at(c, r)
                    })
                    .collect();
                let origin = mapped[0];
                let col_step = mapped[1.min(mapped.len() - 1)] - origin;
                let row_step = mapped[cols.min(mapped.len() - 1)] - origin;
                let key = (origin.x + origin.y, row_step.x - col_step.x);
                let better = match &best {
                    None => true,
                    Some((k, _)) => {
                        key.0 < k.0 - 1e-3 || ((key.0 - k.0).abs() <= 1e-3 && key.1 < k.1)
                    }
                };
                if better {
                    best = Some((key, mapped));
                }
            }
        }
    }
    best.map(|(_, g)| g).unwrap_or_else(|| grid.to_vec())
}

/// Orders `points` into a row-major `cols x rows` grid, if they contain one.
pub fn assemble_grid(points: &[Vec2], cols: usize, rows: usize) -> Option<Vec<Vec2>> {
    let expected = cols * rows;
    if cols < 2 || rows < 2 || points.len() < expected {
        return None;
    }
    let neighbors = k_nearest(points);
    let (axis_u, axis_v) = estimate_axes(points, &neighbors)?;
    trace!(
        "grid axes {:.1} {:.1} deg",
        axis_u.to_degrees(),
        axis_v.to_degrees()
    );
    let links = directional_links(points, &neighbors, axis_u, axis_v);

    let mut visited = vec![false; points.len()];
    for start in 0..points.len() {
        if visited[start] {
            continue;
        }
        let Some(labels) = label_component(start, &links, &mut visited) else {
            continue;
        };
        if labels.len() != expected {
            continue;
        }
        let min_c = labels.values().map(|l| l.0).min()?;
        let max_c = labels.values().map(|l| l.0).max()?;
        let min_r = labels.values().map(|l| l.1).min()?;
        let max_r = labels.values().map(|l| l.1).max()?;
        let span = ((max_c - min_c + 1) as usize, (max_r - min_r + 1) as usize);
        let transposed = if span == (cols, rows) {
            false
        } else if span == (rows, cols) {
            true
        } else {
            continue;
        };

        let mut grid = vec![Vec2::ZERO; expected];
        for (idx, (c, r)) in &labels {
            let (c, r) = ((c - min_c) as usize, (r - min_r) as usize);
            let (c, r) = if transposed { (r, c) } else { (c, r) };
            grid[r * cols + c] = points[*idx];
        }
        return Some(canonical_order(&grid, cols, rows));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(cols: usize, rows: usize, origin: Vec2, angle_deg: f32, step: f32) -> Vec<Vec2> {
        let u = Vec2::from_angle(angle_deg.to_radians()) * step;
        let v = u.perp();
        (0..rows)
            .flat_map(|r| (0..cols).map(move |c| origin + u * c as f32 + v * r as f32))
            .collect()
    }

    #[test]
    fn shuffled_lattice_comes_back_row_major() {
        let truth = lattice(7, 7, Vec2::new(40.0, 50.0), 5.0, 20.0);
        let mut shuffled = truth.clone();
        shuffled.reverse();
        shuffled.swap(3, 30);
        let ordered = assemble_grid(&shuffled, 7, 7).unwrap();
        for (a, b) in ordered.iter().zip(&truth) {
            assert!(a.distance(*b) < 1e-4);
        }
    }

    #[test]
    fn non_square_grid_is_transposed_back() {
        // 5 columns along v, 3 rows along u
        let truth = lattice(3, 5, Vec2::new(30.0, 30.0), 90.0, 15.0);
        let ordered = assemble_grid(&truth, 5, 3).unwrap();
        assert_eq!(ordered.len(), 15);
        assert!(ordered[1].x - ordered[0].x > 10.0);
        assert!(ordered[5].y - ordered[0].y > 10.0);
    }

    #[test]
    fn incomplete_grid_is_rejected() {
        let mut pts = lattice(7, 7, Vec2::new(40.0, 50.0), 0.0, 20.0);
        pts[24] = Vec2::new(500.0, 500.0);
        assert!(assemble_grid(&pts, 7, 7).is_none());
    }
}
