use crate::error::PoseError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeaturePoint {
    pub p2d: glam::Vec2,
    pub p3d: glam::Vec3,
}

/// Ordered 2D-3D correspondences of one frame.
#[derive(Debug, Clone)]
pub struct FrameFeature {
    pub img_w_h: (u32, u32),
    pub features: Vec<FeaturePoint>,
}

impl FrameFeature {
    /// Pairs detected corners with the board points by index.
    pub fn from_correspondences(
        img_w_h: (u32, u32),
        p3ds: &[glam::Vec3],
        p2ds: &[glam::Vec2],
    ) -> Result<FrameFeature, PoseError> {
        if p3ds.len() != p2ds.len() {
            return Err(PoseError::PointCountMismatch {
                object: p3ds.len(),
                image: p2ds.len(),
            });
        }
        let features = p3ds
            .iter()
            .zip(p2ds)
            .map(|(p3d, p2d)| FeaturePoint {
                p2d: *p2d,
                p3d: *p3d,
            })
            .collect();
        Ok(FrameFeature { img_w_h, features })
    }

    pub fn p2ds(&self) -> Vec<glam::Vec2> {
        self.features.iter().map(|f| f.p2d).collect()
    }

    pub fn p3ds(&self) -> Vec<glam::Vec3> {
        self.features.iter().map(|f| f.p3d).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
