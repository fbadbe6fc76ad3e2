use image::RgbaImage;

use crate::error::DisplayError;

pub trait Display {
    fn show(&mut self, frame: &RgbaImage) -> Result<(), DisplayError>;

    /// Polled once per loop iteration; true once ESC was pressed or the window closed.
    fn exit_requested(&mut self) -> bool;
}

/// Headless display, only counts frames.
#[derive(Debug, Default)]
pub struct NullDisplay {
    frames_shown: usize,
    last_size: Option<(u32, u32)>,
}

impl NullDisplay {
    pub fn new() -> NullDisplay {
        NullDisplay::default()
    }

    pub fn frames_shown(&self) -> usize {
        self.frames_shown
    }

    pub fn last_size(&self) -> Option<(u32, u32)> {
        self.last_size
    }
}

impl Display for NullDisplay {
    fn show(&mut self, frame: &RgbaImage) -> Result<(), DisplayError> {
        self.frames_shown += 1;
        self.last_size = Some(frame.dimensions());
        Ok(())
    }

    fn exit_requested(&mut self) -> bool {
        false
    }
}

#[cfg(feature = "window")]
pub use window::WindowDisplay;

#[cfg(feature = "window")]
mod window {
    use image::RgbaImage;
    use log::info;
    use minifb::{Key, ScaleMode, Window, WindowOptions};

    use super::Display;
    use crate::error::DisplayError;

    pub struct WindowDisplay {
        window: Window,
        buffer: Vec<u32>,
    }

    impl WindowDisplay {
        pub fn new(title: &str, width: usize, height: usize) -> Result<WindowDisplay, DisplayError> {
            let window = Window::new(
                title,
                width,
                height,
                WindowOptions {
                    resize: true,
                    scale_mode: ScaleMode::AspectRatioStretch,
                    ..WindowOptions::default()
                },
            )
            .map_err(|e| DisplayError::Create(e.to_string()))?;
            info!("opened window \"{}\" {}x{}", title, width, height);
            Ok(WindowDisplay {
                window,
                buffer: Vec::new(),
            })
        }
    }

    impl Display for WindowDisplay {
        fn show(&mut self, frame: &RgbaImage) -> Result<(), DisplayError> {
            self.buffer.clear();
            self.buffer.extend(
                frame
                    .pixels()
                    .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32),
            );
            self.window
                .update_with_buffer(&self.buffer, frame.width() as usize, frame.height() as usize)
                .map_err(|e| DisplayError::Present(e.to_string()))
        }

        fn exit_requested(&mut self) -> bool {
            !self.window.is_open() || self.window.is_key_down(Key::Escape)
        }
    }
}
