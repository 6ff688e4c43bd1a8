//! Axis-aligned box geometry.

use std::sync::Arc;

use luma_core::Mesh;
use luma_math::{Aabb, DMat4, DVec3, Mat4Ext, Random, Ray};

use crate::geometry::Geometry;
use crate::mesh::TriangleMesh;
use crate::surface::SurfaceSpec;

/// A 12-triangle box. World bounds come from the 8 transformed corners.
#[derive(Debug, Clone)]
pub struct Cube {
    mesh: TriangleMesh,
    bounds: Aabb,
}

impl Cube {
    pub fn new(center: DVec3, size: DVec3) -> Self {
        let mesh = Mesh::cube(center, size);
        let bounds = mesh.bounds;
        Self {
            mesh: TriangleMesh::new(Arc::new(mesh)),
            bounds,
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

impl Geometry for Cube {
    fn compute_world_bounds(&self, transform: &DMat4) -> Aabb {
        transform.transform_aabb(&self.bounds)
    }

    fn preprocess(&mut self, rng: &mut Random) {
        self.mesh.preprocess(rng);
    }

    fn intersect(&self, ray: &Ray, near: f64, far: f64) -> Option<(f64, usize)> {
        self.mesh.intersect(ray, near, far)
    }

    fn intersect_detail(&self, ray: &Ray, primitive_id: usize, near: f64, far: f64) -> SurfaceSpec {
        self.mesh.intersect_detail(ray, primitive_id, near, far)
    }

    fn kind(&self) -> &'static str {
        "cube"
    }
}
