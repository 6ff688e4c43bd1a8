//! Geometry trait for ray-primitive intersection.

use luma_math::{Aabb, DMat4, Random, Ray};

use crate::surface::SurfaceSpec;

/// Shapes an object node can hold, in their own local space.
///
/// `preprocess` must run before the first query; intersection is read-only
/// afterwards so one geometry can serve every thread and every instance.
pub trait Geometry: Send + Sync {
    /// Bounds of the shape after `transform`.
    fn compute_world_bounds(&self, transform: &DMat4) -> Aabb;

    /// Build acceleration structures and cached per-primitive data.
    /// Idempotent.
    fn preprocess(&mut self, rng: &mut Random);

    /// Nearest hit in `(near, far)` as `(distance, primitive_id)`.
    fn intersect(&self, ray: &Ray, near: f64, far: f64) -> Option<(f64, usize)>;

    /// Surface details for a primitive already known to be hit.
    fn intersect_detail(&self, ray: &Ray, primitive_id: usize, near: f64, far: f64) -> SurfaceSpec;

    /// Short name for logs.
    fn kind(&self) -> &'static str;
}
