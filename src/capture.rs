//! Frame sources: a camera device or a folder of still images.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use glob::glob;
use image::{ImageReader, RgbImage};
use log::{debug, info};

use crate::error::CaptureError;

pub trait FrameSource {
    /// Next frame, `Ok(None)` at the end of the stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, CaptureError>;

    fn describe(&self) -> String;
}

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    let p = rp.ok()?;
    let name = p.as_os_str().to_string_lossy().to_lowercase();
    [".png", ".jpg", ".jpeg"]
        .iter()
        .any(|ext| name.ends_with(ext))
        .then_some(p)
}

/// Replays the images of a folder in sorted path order.
pub struct ImageFolderSource {
    folder: String,
    paths: VecDeque<PathBuf>,
}

impl ImageFolderSource {
    pub fn open<P: AsRef<Path>>(folder: P) -> Result<ImageFolderSource, CaptureError> {
        let folder = folder.as_ref().display().to_string();
        let pattern = format!("{}/*", folder);
        let img_paths = glob(&pattern).map_err(|e| CaptureError::Read(e.to_string()))?;
        let mut sorted_path: Vec<PathBuf> = img_paths.filter_map(img_filter).collect();
        sorted_path.sort();
        if sorted_path.is_empty() {
            return Err(CaptureError::NoImages(folder));
        }
        info!("replaying {} images from {}", sorted_path.len(), folder);
        Ok(ImageFolderSource {
            folder,
            paths: sorted_path.into(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageFolderSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        debug!("reading {}", path.display());
        let decode_err = |source| CaptureError::Decode {
            path: path.display().to_string(),
            source,
        };
        let img = ImageReader::open(&path)
            .map_err(|e| CaptureError::Read(format!("{}: {}", path.display(), e)))?
            .decode()
            .map_err(decode_err)?;
        Ok(Some(img.to_rgb8()))
    }

    fn describe(&self) -> String {
        format!("image folder {}", self.folder)
    }
}

/// In-memory frames, handy for headless runs.
#[derive(Default)]
pub struct FrameQueue {
    frames: VecDeque<RgbImage>,
}

impl FrameQueue {
    pub fn new<I: IntoIterator<Item = RgbImage>>(frames: I) -> FrameQueue {
        FrameQueue {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn push(&mut self, frame: RgbImage) {
        self.frames.push_back(frame);
    }
}

impl FrameSource for FrameQueue {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        Ok(self.frames.pop_front())
    }

    fn describe(&self) -> String {
        format!("{} queued frames", self.frames.len())
    }
}

#[cfg(feature = "camera")]
pub use camera::CameraSource;

#[cfg(feature = "camera")]
mod camera {
    use image::RgbImage;
    use log::info;
    use nokhwa::Camera;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};

    use super::FrameSource;
    use crate::error::CaptureError;

    pub struct CameraSource {
        index: u32,
        camera: Camera,
    }

    impl CameraSource {
        pub fn open(index: u32) -> Result<CameraSource, CaptureError> {
            let open_err = |e: nokhwa::NokhwaError| CaptureError::OpenDevice {
                index,
                reason: e.to_string(),
            };
            let requested =
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
            let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(open_err)?;
            camera.open_stream().map_err(open_err)?;
            info!("opened camera {} at {}", index, camera.resolution());
            Ok(CameraSource { index, camera })
        }
    }

    impl FrameSource for CameraSource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>, CaptureError> {
            let buffer = self
                .camera
                .frame()
                .map_err(|e| CaptureError::Read(e.to_string()))?;
            let decoded = buffer
                .decode_image::<RgbFormat>()
                .map_err(|e| CaptureError::Read(e.to_string()))?;
            let (w, h) = (decoded.width(), decoded.height());
            let frame = RgbImage::from_raw(w, h, decoded.into_raw())
                .ok_or_else(|| CaptureError::Read(format!("bad frame buffer {}x{}", w, h)))?;
            Ok(Some(frame))
        }

        fn describe(&self) -> String {
            format!("camera {}", self.index)
        }
    }

    impl Drop for CameraSource {
        fn drop(&mut self) {
            if let Err(e) = self.camera.stop_stream() {
                log::warn!("failed to stop camera {}: {}", self.index, e);
            }
        }
    }
}

/// Image folder when given, otherwise the camera device.
pub fn open_source(
    image_folder: Option<&str>,
    camera_index: u32,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    if let Some(folder) = image_folder {
        return Ok(Box::new(ImageFolderSource::open(folder)?));
    }
    open_camera(camera_index)
}

#[cfg(feature = "camera")]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>, CaptureError> {
    Ok(Box::new(CameraSource::open(index)?))
}

#[cfg(not(feature = "camera"))]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>, CaptureError> {
    debug!("camera {} requested without camera support", index);
    Err(CaptureError::CameraUnavailable)
}
