use nalgebra as na;

pub trait CameraModel<T: na::RealField + Clone>
where
    Self: Sync,
{
    fn params(&self) -> na::DVector<T>;
    fn width(&self) -> T;
    fn height(&self) -> T;
    fn project_one(&self, pt: &na::Vector3<T>) -> na::Vector2<T>;
    /// Projects camera-space points, `None` for points behind the camera.
    fn project(&self, p3d: &[na::Vector3<T>]) -> Vec<Option<na::Vector2<T>>> {
        p3d.iter()
            .map(|pt| {
                if pt[2] <= T::zero() {
                    None
                } else {
                    Some(self.project_one(pt))
                }
            })
            .collect()
    }
    /// Pixel to a ray on the z = 1 plane.
    fn unproject_one(&self, pt: &na::Vector2<T>) -> na::Vector3<T>;
    fn unproject(&self, p2d: &[na::Vector2<T>]) -> Vec<na::Vector3<T>> {
        p2d.iter().map(|p| self.unproject_one(p)).collect()
    }
}
