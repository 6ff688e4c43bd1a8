//! Scene description types for Luma.
//!
//! A `SceneDesc` is the renderer-agnostic input to a render: prototypes
//! (shared geometry), instances placing prototypes in the world with their
//! own material bindings, a material table, a camera and a background.
//! The renderer turns a validated description into its own scene graph.

use std::sync::Arc;

use luma_math::{Aabb, DMat4, DQuat, DVec3, Mat4Ext};

use crate::error::{SceneError, SceneResult};
use crate::mesh::Mesh;
use crate::texture::Texture;

/// How a material scatters light.
#[derive(Clone, Debug)]
pub enum Shading {
    /// Ideal diffuse reflection
    Lambert,

    /// Ideal mirror reflection
    Mirror,

    /// Smooth dielectric with Fresnel-weighted reflection and refraction
    Glass { ior: f64 },

    /// glTF metallic-roughness model
    MetallicRoughness(MetallicRoughness),
}

/// Parameters of the metallic-roughness model.
///
/// Metalness is read from the blue channel and roughness from the green
/// channel of `metallic_roughness`, each scaled by its factor.
#[derive(Clone, Debug)]
pub struct MetallicRoughness {
    pub metallic_factor: f64,
    pub roughness_factor: f64,
    pub metallic_roughness: Texture,

    /// Ambient occlusion, red channel
    pub occlusion: Texture,
    pub occlusion_strength: f64,
}

impl Default for MetallicRoughness {
    fn default() -> Self {
        Self {
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness: Texture::Constant(DVec3::ONE),
            occlusion: Texture::Constant(DVec3::ONE),
            occlusion_strength: 1.0,
        }
    }
}

/// A material definition.
#[derive(Clone, Debug)]
pub struct MaterialDesc {
    pub name: String,

    pub shading: Shading,

    /// Albedo, base color for metallic-roughness
    pub color: Texture,

    /// Emitted radiance
    pub emission: Texture,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            shading: Shading::Lambert,
            color: Texture::Constant(DVec3::splat(0.5)), // Grey default
            emission: Texture::Constant(DVec3::ZERO),
        }
    }
}

impl MaterialDesc {
    pub fn new(name: impl Into<String>, shading: Shading, color: DVec3) -> Self {
        Self {
            name: name.into(),
            shading,
            color: Texture::Constant(color),
            ..Default::default()
        }
    }

    pub fn lambert(name: impl Into<String>, color: DVec3) -> Self {
        Self::new(name, Shading::Lambert, color)
    }

    pub fn mirror(name: impl Into<String>, color: DVec3) -> Self {
        Self::new(name, Shading::Mirror, color)
    }

    pub fn glass(name: impl Into<String>, color: DVec3, ior: f64) -> Self {
        Self::new(name, Shading::Glass { ior }, color)
    }

    /// Set a constant emission.
    pub fn with_emission(mut self, emission: DVec3) -> Self {
        self.emission = Texture::Constant(emission);
        self
    }

    pub fn with_color_texture(mut self, texture: Texture) -> Self {
        self.color = texture;
        self
    }

    pub fn with_emission_texture(mut self, texture: Texture) -> Self {
        self.emission = texture;
        self
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        !self.emission.is_black()
    }

    fn validate(&self, index: usize) -> SceneResult<()> {
        let invalid = |reason: String| SceneError::InvalidMaterial {
            material: index,
            name: self.name.clone(),
            reason,
        };

        match &self.shading {
            Shading::Glass { ior } if !(ior.is_finite() && *ior > 0.0) => {
                Err(invalid(format!("index of refraction must be positive, got {}", ior)))
            }
            Shading::MetallicRoughness(mr) => {
                for (label, value) in [
                    ("metallic factor", mr.metallic_factor),
                    ("roughness factor", mr.roughness_factor),
                    ("occlusion strength", mr.occlusion_strength),
                ] {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(invalid(format!("{} {} outside [0, 1]", label, value)));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Shape of a prototype, in its local space.
#[derive(Clone, Debug)]
pub enum GeometryDesc {
    Sphere { center: DVec3, radius: f64 },
    Mesh(Arc<Mesh>),
    /// Axis-aligned box mesh
    Cube { center: DVec3, size: DVec3 },
}

impl GeometryDesc {
    /// Local-space bounding box.
    pub fn bounds(&self) -> Aabb {
        match self {
            GeometryDesc::Sphere { center, radius } => {
                Aabb::new(*center - DVec3::splat(*radius), *center + DVec3::splat(*radius))
            }
            GeometryDesc::Mesh(mesh) => mesh.bounds,
            GeometryDesc::Cube { center, size } => {
                Aabb::new(*center - *size * 0.5, *center + *size * 0.5)
            }
        }
    }

    /// Number of material slots the geometry addresses.
    pub fn material_slots(&self) -> usize {
        match self {
            GeometryDesc::Mesh(mesh) => mesh.max_material_id().map_or(1, |m| m + 1),
            _ => 1,
        }
    }

    pub fn triangle_count(&self) -> usize {
        match self {
            GeometryDesc::Sphere { .. } => 0,
            GeometryDesc::Mesh(mesh) => mesh.triangle_count(),
            GeometryDesc::Cube { .. } => 12,
        }
    }
}

/// A prototype is shared geometry that can be instanced.
#[derive(Clone, Debug)]
pub struct Prototype {
    /// Unique identifier within the scene
    pub id: usize,

    pub name: String,

    pub geometry: GeometryDesc,
}

impl Prototype {
    pub fn new(id: usize, name: String, geometry: GeometryDesc) -> Self {
        Self { id, name, geometry }
    }

    fn validate(&self) -> SceneResult<()> {
        let invalid = |reason: String| SceneError::InvalidGeometry {
            prototype: self.id,
            name: self.name.clone(),
            reason,
        };

        match &self.geometry {
            GeometryDesc::Sphere { radius, .. } if !(radius.is_finite() && *radius > 0.0) => {
                Err(invalid(format!("sphere radius must be positive, got {}", radius)))
            }
            GeometryDesc::Cube { size, .. } if !size.cmpgt(DVec3::ZERO).all() => {
                Err(invalid(format!("cube size must be positive, got {}", size)))
            }
            GeometryDesc::Mesh(mesh) => {
                if mesh.faces.is_empty() {
                    return Err(invalid("mesh has no faces".to_string()));
                }
                mesh.validate()
            }
            _ => Ok(()),
        }
    }
}

/// Transform components that can be composed into a matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Create a new transform from a 4x4 matrix.
    ///
    /// Decomposes the matrix into translation, rotation, and scale.
    pub fn from_matrix(matrix: DMat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn with_rotation(mut self, rotation: DQuat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: DVec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A placed prototype with its own material bindings.
#[derive(Clone, Debug)]
pub struct Instance {
    /// Index of the prototype this instance references
    pub prototype_id: usize,

    pub transform: Transform,

    /// Indices into the scene material table. Slot `i` serves geometry
    /// material id `i`.
    pub materials: Vec<usize>,

    /// Marks emitters for bookkeeping
    pub is_light: bool,
}

impl Instance {
    pub fn new(prototype_id: usize, transform: Transform, materials: Vec<usize>) -> Self {
        Self {
            prototype_id,
            transform,
            materials,
            is_light: false,
        }
    }

    pub fn as_light(mut self) -> Self {
        self.is_light = true;
        self
    }

    /// Get the 4x4 model matrix for this instance.
    pub fn model_matrix(&self) -> DMat4 {
        self.transform.to_matrix()
    }
}

/// Pinhole camera placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraDesc {
    pub position: DVec3,
    pub target: DVec3,
    pub up: DVec3,

    /// Vertical field of view in degrees
    pub fov_degrees: f64,

    /// Sensor width in millimetres; height follows the image aspect
    pub sensor_width: f64,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            position: DVec3::new(0.0, 0.0, 5.0),
            target: DVec3::ZERO,
            up: DVec3::Y,
            fov_degrees: 30.0,
            sensor_width: 36.0,
        }
    }
}

/// Environment seen by rays that leave the scene.
#[derive(Clone, Debug)]
pub struct BackgroundDesc {
    /// Lat-long texture
    pub texture: Texture,

    /// Applied to ray directions before the lookup
    pub transform: DMat4,
}

impl Default for BackgroundDesc {
    fn default() -> Self {
        Self {
            texture: Texture::Constant(DVec3::splat(0.2)),
            transform: DMat4::IDENTITY,
        }
    }
}

/// A complete scene description.
#[derive(Clone, Debug, Default)]
pub struct SceneDesc {
    pub name: String,

    /// Shared geometry definitions
    pub prototypes: Vec<Prototype>,

    /// Instances referencing prototypes
    pub instances: Vec<Instance>,

    /// Materials used in the scene
    pub materials: Vec<MaterialDesc>,

    pub camera: CameraDesc,

    pub background: BackgroundDesc,
}

impl SceneDesc {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a prototype to the scene and return its ID.
    pub fn add_prototype(&mut self, name: impl Into<String>, geometry: GeometryDesc) -> usize {
        let id = self.prototypes.len();
        self.prototypes.push(Prototype::new(id, name.into(), geometry));
        id
    }

    /// Add a material to the scene and return its ID.
    pub fn add_material(&mut self, material: MaterialDesc) -> usize {
        let id = self.materials.len();
        self.materials.push(material);
        id
    }

    /// Add an instance of a prototype and return its index.
    pub fn add_instance(&mut self, instance: Instance) -> usize {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    /// Shorthand for a prototype placed once with a single material.
    pub fn add_object(
        &mut self,
        name: impl Into<String>,
        geometry: GeometryDesc,
        transform: Transform,
        materials: Vec<usize>,
    ) -> usize {
        let prototype = self.add_prototype(name, geometry);
        self.add_instance(Instance::new(prototype, transform, materials))
    }

    pub fn get_material(&self, id: usize) -> Option<&MaterialDesc> {
        self.materials.get(id)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn prototype_count(&self) -> usize {
        self.prototypes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Get total triangle count across all instances.
    pub fn total_triangle_count(&self) -> usize {
        self.instances
            .iter()
            .filter_map(|instance| self.prototypes.get(instance.prototype_id))
            .map(|proto| proto.geometry.triangle_count())
            .sum()
    }

    /// Compute the world-space bounding box of all instances.
    pub fn world_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for instance in &self.instances {
            if let Some(proto) = self.prototypes.get(instance.prototype_id) {
                let world = instance
                    .model_matrix()
                    .transform_aabb(&proto.geometry.bounds());
                bounds.expand_box(&world);
            }
        }
        bounds
    }

    /// Check that every index resolves and every parameter is usable.
    ///
    /// Returns the first problem found, in the order materials,
    /// prototypes, instances.
    pub fn validate(&self) -> SceneResult<()> {
        if self.instances.is_empty() {
            return Err(SceneError::EmptyScene);
        }

        for (i, material) in self.materials.iter().enumerate() {
            material.validate(i)?;
        }

        for prototype in &self.prototypes {
            prototype.validate()?;
        }

        for (i, instance) in self.instances.iter().enumerate() {
            let proto = self
                .prototypes
                .get(instance.prototype_id)
                .ok_or(SceneError::MissingPrototype {
                    instance: i,
                    prototype: instance.prototype_id,
                })?;

            if instance.materials.is_empty() {
                return Err(SceneError::NoMaterials { instance: i });
            }
            if let Some(&missing) = instance
                .materials
                .iter()
                .find(|&&m| m >= self.materials.len())
            {
                return Err(SceneError::MissingMaterial {
                    instance: i,
                    material: missing,
                });
            }

            if let GeometryDesc::Mesh(mesh) = &proto.geometry {
                let available = instance.materials.len();
                if let Some((face, f)) = mesh
                    .faces
                    .iter()
                    .enumerate()
                    .find(|(_, f)| f.material_id >= available)
                {
                    return Err(SceneError::MaterialSlotOutOfRange {
                        instance: i,
                        face,
                        material_id: f.material_id,
                        available,
                    });
                }
            }

            let det = instance.model_matrix().determinant();
            if !det.is_finite() || det.abs() < f64::EPSILON {
                return Err(SceneError::DegenerateTransform { instance: i });
            }
        }

        log::debug!(
            "Validated scene '{}': {} prototypes, {} instances, {} materials",
            self.name,
            self.prototype_count(),
            self.instance_count(),
            self.material_count()
        );

        Ok(())
    }
}
