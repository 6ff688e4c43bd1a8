//! Object nodes: a geometry placed in the world with its materials.
//!
//! Rays are moved into the geometry's local space with the cached inverse
//! transform. The local direction is renormalized, so distances are scaled
//! by its pre-normalization length on the way in and back out. This keeps
//! non-uniformly scaled objects correct.

use std::sync::Arc;

use luma_math::{Aabb, DMat4, Mat4Ext, Random, Ray};

use crate::geometry::Geometry;
use crate::material::Material;
use crate::surface::SurfaceSpec;

/// Derived transform data, valid after `preprocess`.
#[derive(Debug, Clone, Copy)]
struct PreparedObject {
    world_bounds: Aabb,
    inverse: DMat4,
    normal_matrix: DMat4,
}

/// An instance of a geometry.
///
/// The geometry itself lives in the scene's geometry table so several
/// nodes can share it; the node keeps its index.
pub struct ObjectNode {
    pub geometry_id: usize,

    /// Indexed by the geometry's material ids
    pub materials: Vec<Arc<dyn Material>>,

    pub transform: DMat4,

    /// Marks emitters for bookkeeping
    pub is_light: bool,

    prepared: Option<PreparedObject>,
}

impl ObjectNode {
    pub fn new(geometry_id: usize, transform: DMat4) -> Self {
        Self {
            geometry_id,
            materials: Vec::new(),
            transform,
            is_light: false,
            prepared: None,
        }
    }

    pub fn with_material(mut self, material: Arc<dyn Material>) -> Self {
        self.materials.push(material);
        self
    }

    /// Append a material and return its slot.
    pub fn add_material(&mut self, material: Arc<dyn Material>) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Material bound to a geometry material id.
    pub fn material(&self, index: usize) -> &dyn Material {
        self.materials[index].as_ref()
    }

    /// World bounds, empty until preprocessed.
    pub fn world_bounds(&self) -> Aabb {
        self.prepared.map_or(Aabb::EMPTY, |p| p.world_bounds)
    }

    /// Cache world bounds and the inverse transforms.
    ///
    /// `geometry` must already be preprocessed; the scene does that once
    /// per shared geometry before visiting its nodes.
    pub fn preprocess(&mut self, geometry: &dyn Geometry, _rng: &mut Random) {
        let inverse = self.transform.inverse();
        self.prepared = Some(PreparedObject {
            world_bounds: geometry.compute_world_bounds(&self.transform),
            inverse,
            normal_matrix: inverse.transpose(),
        });
    }

    /// Local ray and the length of the untransformed local direction.
    fn local_ray(&self, inverse: &DMat4, ray: &Ray) -> (Ray, f64) {
        let origin = inverse.transform_point3(ray.origin);
        let direction = inverse.transform_vector3(ray.direction);
        let scale = direction.length();
        (Ray::new(origin, direction / scale), scale)
    }

    /// Nearest hit in world distance as `(distance, primitive_id)`.
    pub fn intersect(
        &self,
        geometry: &dyn Geometry,
        ray: &Ray,
        near: f64,
        far: f64,
    ) -> Option<(f64, usize)> {
        let Some(prepared) = &self.prepared else {
            debug_assert!(false, "object intersected before preprocess");
            return None;
        };

        let (local, scale) = self.local_ray(&prepared.inverse, ray);
        geometry
            .intersect(&local, near * scale, far * scale)
            .map(|(distance, primitive)| (distance / scale, primitive))
    }

    /// World-space surface at a known hit.
    pub fn intersect_detail(
        &self,
        geometry: &dyn Geometry,
        ray: &Ray,
        primitive_id: usize,
        near: f64,
        far: f64,
    ) -> SurfaceSpec {
        let Some(prepared) = &self.prepared else {
            debug_assert!(false, "object intersected before preprocess");
            return SurfaceSpec::default();
        };

        let (local, scale) = self.local_ray(&prepared.inverse, ray);
        let mut surf = geometry.intersect_detail(&local, primitive_id, near * scale, far * scale);
        surf.apply_transform(&self.transform, &prepared.normal_matrix);
        surf
    }
}

impl std::fmt::Debug for ObjectNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectNode")
            .field("geometry_id", &self.geometry_id)
            .field("materials", &self.materials.len())
            .field("transform", &self.transform)
            .field("is_light", &self.is_light)
            .finish()
    }
}
