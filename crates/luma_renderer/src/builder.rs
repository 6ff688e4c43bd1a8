//! Turns a `SceneDesc` into a render `Scene`.

use std::path::PathBuf;
use std::sync::Arc;

use luma_core::{
    CameraDesc, GeometryDesc, MaterialDesc, SceneDesc, SceneError, Shading, Texture, TextureCache,
    TextureError,
};
use luma_math::DMat4;
use thiserror::Error;

use crate::background::Background;
use crate::camera::CameraNode;
use crate::cube::Cube;
use crate::geometry::Geometry;
use crate::material::{Material, MetallicRoughnessMaterial, SimpleKind, SimpleMaterial};
use crate::mesh::TriangleMesh;
use crate::object::ObjectNode;
use crate::scene::Scene;
use crate::sphere::Sphere;

/// Errors that stop a scene from being built.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Builds render scenes, sharing loaded textures between builds.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    textures: TextureCache,
    environment: Option<PathBuf>,
    environment_transform: Option<DMat4>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_texture_cache(mut self, textures: TextureCache) -> Self {
        self.textures = textures;
        self
    }

    /// Replace the scene background with a lat-long image.
    pub fn with_environment(mut self, path: impl Into<PathBuf>) -> Self {
        self.environment = Some(path.into());
        self
    }

    pub fn with_environment_transform(mut self, transform: DMat4) -> Self {
        self.environment_transform = Some(transform);
        self
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    /// Validate `desc` and build the scene. The result still needs
    /// `Scene::preprocess`.
    ///
    /// Every prototype becomes one geometry shared by all its instances.
    pub fn build(&mut self, desc: &SceneDesc) -> BuildResult<Scene> {
        desc.validate()?;

        let camera = build_camera(&desc.camera);
        let background = self.build_background(desc)?;
        let mut scene = Scene::new(camera, background);

        let materials: Vec<Arc<dyn Material>> = desc.materials.iter().map(build_material).collect();

        let geometry_ids: Vec<usize> = desc
            .prototypes
            .iter()
            .map(|proto| scene.add_geometry(build_geometry(&proto.geometry)))
            .collect();

        for instance in &desc.instances {
            let mut object = ObjectNode::new(geometry_ids[instance.prototype_id], instance.model_matrix());
            for &m in &instance.materials {
                object.add_material(Arc::clone(&materials[m]));
            }
            object.is_light = instance.is_light
                || instance.materials.iter().any(|&m| desc.materials[m].is_emissive());
            scene.add_object(object);
        }

        log::info!(
            "Built scene '{}': {} objects, {} geometries, {} triangles, {} lights",
            desc.name,
            scene.objects().len(),
            scene.geometry_count(),
            desc.total_triangle_count(),
            scene.light_count()
        );

        Ok(scene)
    }

    fn build_background(&mut self, desc: &SceneDesc) -> BuildResult<Background> {
        let mut background = Background::new(desc.background.texture.clone(), desc.background.transform);

        if let Some(path) = &self.environment {
            let texture = self.textures.load(&path.to_string_lossy())?;
            log::info!(
                "Environment {} ({}x{})",
                path.display(),
                texture.width,
                texture.height
            );
            background.texture = Texture::Buffer(texture);
        }
        if let Some(transform) = self.environment_transform {
            background.transform = transform;
        }

        Ok(background)
    }
}

fn build_camera(desc: &CameraDesc) -> CameraNode {
    let mut camera = CameraNode::new(desc.position, desc.target, desc.up);
    let aspect = camera.sensor_aspect_ratio();
    camera.set_sensor_size_with_aspect_ratio(desc.sensor_width, aspect);
    camera.set_focal_length_with_fov(desc.fov_degrees);
    camera
}

fn build_material(desc: &MaterialDesc) -> Arc<dyn Material> {
    let simple = |kind| -> Arc<dyn Material> {
        Arc::new(SimpleMaterial {
            kind,
            color: desc.color.clone(),
            emission: desc.emission.clone(),
        })
    };

    match &desc.shading {
        Shading::Lambert => simple(SimpleKind::Lambert),
        Shading::Mirror => simple(SimpleKind::PerfectSpecular),
        Shading::Glass { ior } => simple(SimpleKind::FineGlass { ior: *ior }),
        Shading::MetallicRoughness(mr) => Arc::new(MetallicRoughnessMaterial {
            base_color: desc.color.clone(),
            emission: desc.emission.clone(),
            metallic_factor: mr.metallic_factor,
            roughness_factor: mr.roughness_factor,
            metallic_roughness: mr.metallic_roughness.clone(),
            occlusion: mr.occlusion.clone(),
            occlusion_strength: mr.occlusion_strength,
        }),
    }
}

fn build_geometry(desc: &GeometryDesc) -> Box<dyn Geometry> {
    match desc {
        GeometryDesc::Sphere { center, radius } => Box::new(Sphere::new(*center, *radius)),
        GeometryDesc::Mesh(mesh) => Box::new(TriangleMesh::new(Arc::clone(mesh))),
        GeometryDesc::Cube { center, size } => Box::new(Cube::new(*center, *size)),
    }
}
