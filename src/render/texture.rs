use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::Vec2;
use image::RgbaImage;
use log::debug;

use crate::error::RenderError;

/// Diffuse texture, first row of `image` is the top of the picture.
#[derive(Debug, Clone)]
pub struct Texture {
    image: RgbaImage,
}

fn is_dds(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dds"))
}

impl Texture {
    /// `.dds` files are decoded with `image_dds` (base mip level), anything else with `image`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Texture, RenderError> {
        let path = path.as_ref();
        let image = if is_dds(path) {
            load_dds(path)?
        } else {
            image::open(path)
                .map_err(|source| RenderError::TextureLoad {
                    path: path.display().to_string(),
                    source,
                })?
                .to_rgba8()
        };
        debug!("loaded texture {} {:?}", path.display(), image.dimensions());
        Ok(Texture::from_image(image))
    }

    pub fn from_image(image: RgbaImage) -> Texture {
        Texture { image }
    }

    pub fn solid(rgba: [u8; 4]) -> Texture {
        Texture {
            image: RgbaImage::from_pixel(1, 1, image::Rgba(rgba)),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

fn load_dds(path: &Path) -> Result<RgbaImage, RenderError> {
    let decode_err = |reason: String| RenderError::TextureDecode {
        path: path.display().to_string(),
        reason,
    };
    let file = File::open(path).map_err(|e| decode_err(e.to_string()))?;
    let dds = image_dds::ddsfile::Dds::read(&mut BufReader::new(file))
        .map_err(|e| decode_err(e.to_string()))?;
    image_dds::image_from_dds(&dds, 0).map_err(|e| decode_err(e.to_string()))
}

/// Mesh UV to sampler coordinates. `v = 0` addresses the bottom row of the
/// image while the sampler origin is the top row, so V is mirrored.
pub fn texel_coords(uv: Vec2) -> [f32; 2] {
    [uv.x, 1.0 - uv.y]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v_is_mirrored() {
        assert_eq!(texel_coords(Vec2::new(0.25, 0.0)), [0.25, 1.0]);
        assert_eq!(texel_coords(Vec2::new(0.75, 1.0)), [0.75, 0.0]);
        assert_eq!(texel_coords(Vec2::new(0.5, 0.9))[1], 1.0 - 0.9);
    }

    #[test]
    fn dds_extension_is_case_insensitive() {
        assert!(is_dds(Path::new("uvmap.DDS")));
        assert!(is_dds(Path::new("a/b/uvmap.dds")));
        assert!(!is_dds(Path::new("uvmap.png")));
        assert!(!is_dds(Path::new("dds")));
    }
}
