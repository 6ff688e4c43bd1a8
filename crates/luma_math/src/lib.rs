//! Luma math - shared numeric types for the path tracer.
//!
//! Everything in the renderer works in double precision, so this crate
//! re-exports glam and adds the few ray tracing types glam does not have:
//!
//! - [`Ray`]: origin + direction
//! - [`Aabb`]: axis-aligned bounding box with a slab test
//! - [`Mat4Ext`]: bounds and normal transforms for `DMat4`
//! - [`Random`]: xoshiro256+ generator threaded through all sampling code

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod random;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use random::Random;
pub use ray::Ray;
pub use transform::Mat4Ext;
