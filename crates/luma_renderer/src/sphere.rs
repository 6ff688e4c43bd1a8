//! Sphere primitive for ray tracing.

use std::f64::consts::PI;

use luma_math::{Aabb, DMat4, DVec2, DVec3, Mat4Ext, Random, Ray};

use crate::geometry::Geometry;
use crate::surface::SurfaceSpec;

/// An analytic sphere. Always uses material slot 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: DVec3,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn bounds(&self) -> Aabb {
        let r = DVec3::splat(self.radius);
        Aabb::new(self.center - r, self.center + r)
    }

    /// Distance to the nearer root inside `(near, far)`.
    fn intersect_distance(&self, ray: &Ray, near: f64, far: f64) -> Option<f64> {
        let op = self.center - ray.origin;
        let b = op.dot(ray.direction);
        let det = b * b - op.dot(op) + self.radius * self.radius;
        if det < 0.0 {
            return None;
        }

        let det_sqrt = det.sqrt();
        [b - det_sqrt, b + det_sqrt]
            .into_iter()
            .find(|&t| near < t && t < far)
    }

    /// UV of a unit normal.
    ///
    /// Uses `acos(n.z)` for v, so the poles sit on the z axis.
    fn uv(n: DVec3) -> DVec2 {
        DVec2::new(
            n.x.atan2(n.z) / PI * 0.5 + 0.5,
            n.z.clamp(-1.0, 1.0).acos() / PI * 0.5 + 0.5,
        )
    }
}

impl Geometry for Sphere {
    fn compute_world_bounds(&self, transform: &DMat4) -> Aabb {
        transform.transform_aabb(&self.bounds())
    }

    fn preprocess(&mut self, _rng: &mut Random) {}

    fn intersect(&self, ray: &Ray, near: f64, far: f64) -> Option<(f64, usize)> {
        self.intersect_distance(ray, near, far).map(|t| (t, 0))
    }

    fn intersect_detail(&self, ray: &Ray, _primitive_id: usize, near: f64, far: f64) -> SurfaceSpec {
        let t = self.intersect_distance(ray, near, far).unwrap_or(0.0);
        let position = ray.at(t);
        let n = (position - self.center).normalize();

        SurfaceSpec {
            position,
            geometry_normal: n,
            shading_normal: n,
            uv: Self::uv(n),
            material_index: 0,
            ..Default::default()
        }
    }

    fn kind(&self) -> &'static str {
        "sphere"
    }
}
