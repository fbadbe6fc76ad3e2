#![allow(dead_code)]

use std::path::Path;

use glam::{Vec2, Vec3};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use marker_based_ar::display::Display;
use marker_based_ar::error::{DisplayError, RenderError};
use marker_based_ar::render::{Mesh, RenderConfig, RenderContext, Renderer, ShaderSources, Texture};

/// Printed chessboard placed by an affine map into a white image.
pub struct SyntheticBoard {
    pub cols: usize,
    pub rows: usize,
    pub square_px: f32,
    pub origin: Vec2,
    pub angle_deg: f32,
}

impl SyntheticBoard {
    pub fn seven_by_seven() -> SyntheticBoard {
        SyntheticBoard {
            cols: 7,
            rows: 7,
            square_px: 30.0,
            origin: Vec2::new(150.3, 100.7),
            angle_deg: 3.0,
        }
    }

    fn axes(&self) -> (Vec2, Vec2) {
        let u = Vec2::from_angle(self.angle_deg.to_radians());
        (u, u.perp())
    }

    /// Interior corner at column `c`, row `r`.
    pub fn corner(&self, c: usize, r: usize) -> Vec2 {
        let (u, v) = self.axes();
        self.origin + (u * (c + 1) as f32 + v * (r + 1) as f32) * self.square_px
    }

    pub fn corners_row_major(&self) -> Vec<Vec2> {
        (0..self.rows)
            .flat_map(|r| (0..self.cols).map(move |c| (c, r)))
            .map(|(c, r)| self.corner(c, r))
            .collect()
    }

    fn is_black(&self, p: Vec2) -> bool {
        let (u, v) = self.axes();
        let d = p - self.origin;
        let q = Vec2::new(d.dot(u), d.dot(v)) / self.square_px;
        let squares_x = (self.cols + 1) as f32;
        let squares_y = (self.rows + 1) as f32;
        if q.x < 0.0 || q.y < 0.0 || q.x >= squares_x || q.y >= squares_y {
            return false;
        }
        (q.x.floor() as i64 + q.y.floor() as i64) % 2 == 0
    }

    /// Anti-aliased with 4x4 supersampling, pixel centers on integer coordinates.
    pub fn render(&self, width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let mut white = 0u32;
            for sy in 0..4 {
                for sx in 0..4 {
                    let p = Vec2::new(
                        x as f32 - 0.5 + (sx as f32 + 0.5) / 4.0,
                        y as f32 - 0.5 + (sy as f32 + 0.5) / 4.0,
                    );
                    if !self.is_black(p) {
                        white += 1;
                    }
                }
            }
            let v = (white * 255 / 16) as u8;
            Rgb([v, v, v])
        })
    }
}

/// Renderer stand-in: an opaque white square centred in a transparent view,
/// rows stored bottom-up like the GPU read-back.
pub struct StubRenderer {
    pub width: u32,
    pub height: u32,
    pub half_square: u32,
    pub fail_read: bool,
    frames: u64,
}

impl StubRenderer {
    pub fn new(config: &RenderConfig) -> StubRenderer {
        StubRenderer {
            width: config.width,
            height: config.height,
            half_square: 40,
            fail_read: false,
            frames: 0,
        }
    }
}

impl Renderer for StubRenderer {
    fn draw_frame(&mut self, _light_position: Vec3) {
        self.frames += 1;
    }

    fn swap_buffers(&mut self) {}

    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError> {
        if self.fail_read {
            return Err(RenderError::ReadBack("device lost".to_string()));
        }
        let (cx, cy, r) = (self.width / 2, self.height / 2, self.half_square);
        Ok(RgbaImage::from_fn(self.width, self.height, |x, y| {
            if x.abs_diff(cx) < r && y.abs_diff(cy) < r {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        }))
    }

    fn frames_drawn(&self) -> u64 {
        self.frames
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Display that asks to exit once `exit_after` frames were shown.
pub struct ScriptedDisplay {
    pub exit_after: usize,
    pub shown: usize,
    pub polls: usize,
}

impl ScriptedDisplay {
    pub fn new(exit_after: usize) -> ScriptedDisplay {
        ScriptedDisplay {
            exit_after,
            shown: 0,
            polls: 0,
        }
    }
}

impl Display for ScriptedDisplay {
    fn show(&mut self, _frame: &RgbaImage) -> Result<(), DisplayError> {
        self.shown += 1;
        Ok(())
    }

    fn exit_requested(&mut self) -> bool {
        self.polls += 1;
        self.shown >= self.exit_after
    }
}

/// GPU context for the stock shaders, `None` on machines without a usable adapter.
pub fn gpu_context(config: RenderConfig, mesh: Mesh, texture: Texture) -> Option<RenderContext> {
    match RenderContext::new(config, &ShaderSources::standard(), mesh, texture) {
        Ok(ctx) => Some(ctx),
        Err(e @ (RenderError::NoAdapter(_) | RenderError::RequestDevice(_))) => {
            eprintln!("skipping gpu test: {}", e);
            None
        }
        Err(e) => panic!("{}", e),
    }
}

/// Uncompressed R8G8B8A8_UNORM texture behind a DX10 DDS header.
pub fn write_rgba_dds(path: &Path, img: &RgbaImage) {
    let (w, h) = img.dimensions();
    let mut bytes = Vec::new();
    let mut put = |v: u32| bytes.extend_from_slice(&v.to_le_bytes());
    put(u32::from_le_bytes(*b"DDS "));
    put(124); // header size
    put(0x1 | 0x2 | 0x4 | 0x8 | 0x1000 | 0x20000); // caps, height, width, pitch, pixel format, mip count
    put(h);
    put(w);
    put(w * 4);
    put(0); // depth
    put(1); // mip levels
    for _ in 0..11 {
        put(0);
    }
    put(32); // pixel format size
    put(0x4); // fourcc
    put(u32::from_le_bytes(*b"DX10"));
    for _ in 0..5 {
        put(0);
    }
    put(0x1000); // texture
    for _ in 0..4 {
        put(0);
    }
    put(28); // DXGI_FORMAT_R8G8B8A8_UNORM
    put(3); // texture 2d
    put(0);
    put(1); // array size
    put(0);
    bytes.extend_from_slice(img.as_raw());
    std::fs::write(path, bytes).unwrap();
}
