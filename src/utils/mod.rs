pub mod error;
pub mod math;

pub use error::RenderError;
pub use math::{Aabb, Plane, ViewFrustum};
