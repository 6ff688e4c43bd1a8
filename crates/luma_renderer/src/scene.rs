//! The render scene: geometry table, object nodes and the top-level BVH.

use std::time::Instant;

use luma_math::{Aabb, Random, Ray};

use crate::background::Background;
use crate::bvh::Bvh;
use crate::camera::CameraNode;
use crate::geometry::Geometry;
use crate::material::Material;
use crate::object::ObjectNode;
use crate::surface::{Hit, PathVertex};

/// Everything a path needs to find its way.
///
/// Geometry lives in a table shared by index, so many object nodes can
/// instance one mesh. After `preprocess` the scene is only read.
pub struct Scene {
    geometries: Vec<Box<dyn Geometry>>,
    objects: Vec<ObjectNode>,
    pub camera: CameraNode,
    pub background: Background,
    bvh: Bvh,
    world_bounds: Aabb,
}

impl Scene {
    pub fn new(camera: CameraNode, background: Background) -> Self {
        Self {
            geometries: Vec::new(),
            objects: Vec::new(),
            camera,
            background,
            bvh: Bvh::new(),
            world_bounds: Aabb::EMPTY,
        }
    }

    /// Register a geometry and return its id.
    pub fn add_geometry(&mut self, geometry: Box<dyn Geometry>) -> usize {
        self.geometries.push(geometry);
        self.geometries.len() - 1
    }

    /// Add an object node and return its index.
    ///
    /// Panics if the node refers to a geometry that was not added.
    pub fn add_object(&mut self, object: ObjectNode) -> usize {
        assert!(
            object.geometry_id < self.geometries.len(),
            "object refers to missing geometry {}",
            object.geometry_id
        );
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn geometry(&self, id: usize) -> &dyn Geometry {
        self.geometries[id].as_ref()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn objects(&self) -> &[ObjectNode] {
        &self.objects
    }

    pub fn object(&self, index: usize) -> &ObjectNode {
        &self.objects[index]
    }

    pub fn light_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_light).count()
    }

    /// Union of the object bounds, empty until preprocessed.
    pub fn world_bounds(&self) -> Aabb {
        self.world_bounds
    }

    /// Build all derived data: camera, each shared geometry once, the
    /// object transforms and finally the top-level BVH over objects.
    pub fn preprocess(&mut self, rng: &mut Random) {
        let start = Instant::now();

        self.camera.preprocess(rng);
        for geometry in &mut self.geometries {
            geometry.preprocess(rng);
        }

        self.bvh.clear();
        self.world_bounds = Aabb::EMPTY;
        for (index, object) in self.objects.iter_mut().enumerate() {
            object.preprocess(self.geometries[object.geometry_id].as_ref(), rng);
            let bounds = object.world_bounds();
            self.world_bounds.expand_box(&bounds);
            self.bvh.append_leaf(bounds, index);
        }

        if self.objects.is_empty() {
            log::warn!("Scene has no objects; every ray goes to the background");
            return;
        }

        let depth = self.bvh.build_tree();
        log::info!(
            "Scene: {} objects over {} geometries, BVH depth {}, preprocessed in {:.2?}",
            self.objects.len(),
            self.geometries.len(),
            depth,
            start.elapsed()
        );
    }

    /// Nearest surface along `ray` within `(near, far)`.
    pub fn raytrace(&self, ray: &Ray, near: f64, far: f64) -> Option<PathVertex> {
        let hit = self.bvh.intersect(ray, near, far, |index, ray, near, far| {
            let object = &self.objects[index];
            object.intersect(self.geometries[object.geometry_id].as_ref(), ray, near, far)
        })?;

        let object = &self.objects[hit.data_id];
        let surface = object.intersect_detail(
            self.geometries[object.geometry_id].as_ref(),
            ray,
            hit.payload,
            near,
            far,
        );

        Some(PathVertex {
            incident: -ray.direction,
            hit: Hit {
                distance: hit.distance,
                object_index: hit.data_id,
                primitive_index: hit.payload,
            },
            surface,
        })
    }

    /// Material at a path vertex.
    pub fn material(&self, vertex: &PathVertex) -> &dyn Material {
        self.objects[vertex.hit.object_index].material(vertex.surface.material_index)
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("geometries", &self.geometries.len())
            .field("objects", &self.objects)
            .field("camera", &self.camera)
            .field("world_bounds", &self.world_bounds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::SimpleMaterial;
    use crate::sphere::Sphere;
    use luma_math::{DMat4, DVec3};
    use std::sync::Arc;

    fn two_ball_scene() -> Scene {
        let mut scene = Scene::new(CameraNode::default(), Background::default());
        let ball = scene.add_geometry(Box::new(Sphere::new(DVec3::ZERO, 1.0)));
        let red = Arc::new(SimpleMaterial::lambert(DVec3::X));
        let green = Arc::new(SimpleMaterial::lambert(DVec3::Y));

        scene.add_object(ObjectNode::new(ball, DMat4::from_translation(DVec3::new(0.0, 0.0, -5.0))).with_material(red));
        scene.add_object(ObjectNode::new(ball, DMat4::from_translation(DVec3::new(0.0, 0.0, -10.0))).with_material(green));
        scene.preprocess(&mut Random::new(1));
        scene
    }

    #[test]
    fn test_raytrace_finds_nearest_instance() {
        let scene = two_ball_scene();
        let ray = Ray::new(DVec3::ZERO, DVec3::NEG_Z);

        let vertex = scene.raytrace(&ray, 1e-4, 1e10).expect("should hit the near ball");
        assert_eq!(vertex.hit.object_index, 0);
        assert!((vertex.hit.distance - 4.0).abs() < 1e-9);
        assert_eq!(vertex.incident, DVec3::Z);
        assert!((vertex.surface.position - DVec3::new(0.0, 0.0, -4.0)).length() < 1e-9);
        assert!((vertex.surface.shading_normal - DVec3::Z).length() < 1e-9);

        // Near bound skips the first ball
        let vertex = scene.raytrace(&ray, 6.5, 1e10).expect("should hit the far ball");
        assert_eq!(vertex.hit.object_index, 1);
        assert!((vertex.hit.distance - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_raytrace_miss() {
        let scene = two_ball_scene();
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);
        assert!(scene.raytrace(&ray, 1e-4, 1e10).is_none());
    }

    #[test]
    fn test_geometry_is_shared() {
        let scene = two_ball_scene();
        assert_eq!(scene.geometry_count(), 1);
        assert_eq!(scene.objects().len(), 2);

        let bounds = scene.world_bounds();
        assert!(bounds.is_inside(DVec3::new(0.0, 0.0, -5.0)));
        assert!(bounds.is_inside(DVec3::new(0.0, 0.0, -10.0)));
    }

    #[test]
    fn test_empty_scene_misses() {
        let mut scene = Scene::new(CameraNode::default(), Background::default());
        scene.preprocess(&mut Random::new(1));
        assert!(scene.raytrace(&Ray::default(), 1e-4, 1e10).is_none());
    }
}
