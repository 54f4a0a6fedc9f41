pub mod pxfusion;
pub mod pxpost;

pub use pxfusion::PxFusion;
pub use pxpost::PxPost;
