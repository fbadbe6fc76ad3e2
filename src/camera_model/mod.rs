pub mod generic;
pub mod opencv5;

pub use generic::CameraModel;
pub use opencv5::OpenCVModel5;
