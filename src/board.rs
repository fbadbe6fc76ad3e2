use serde::{Deserialize, Serialize};

/// Geometry of the printed chessboard, counted in interior corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub cols: usize,
    pub rows: usize,
    pub square_size: f32,
    /// Board point the composite is anchored on, in square units.
    pub center: [f32; 3],
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            cols: 7,
            rows: 7,
            square_size: 1.0,
            center: [3.0, 3.0, 0.0],
        }
    }
}

pub struct Board {
    pub cols: usize,
    pub rows: usize,
    /// Row-major: index `r * cols + c` is the corner at column `c`, row `r`.
    pub points_3d: Vec<glam::Vec3>,
    pub center: glam::Vec3,
}

impl Board {
    pub fn from_config(board_config: &BoardConfig) -> Board {
        let center = glam::Vec3::from_array(board_config.center) * board_config.square_size;
        Self::init_chessboard(
            board_config.cols,
            board_config.rows,
            board_config.square_size,
            center,
        )
    }

    pub fn init_chessboard(cols: usize, rows: usize, square_size: f32, center: glam::Vec3) -> Board {
        let mut points_3d = Vec::with_capacity(cols * rows);
        for r in 0..rows {
            for c in 0..cols {
                points_3d.push(glam::Vec3 {
                    x: c as f32 * square_size,
                    y: r as f32 * square_size,
                    z: 0.0,
                });
            }
        }
        Board {
            cols,
            rows,
            points_3d,
            center,
        }
    }

    pub fn corner_count(&self) -> usize {
        self.cols * self.rows
    }
}

pub fn create_default_7x7_board() -> Board {
    Board::from_config(&BoardConfig::default())
}
