//! Errors raised while assembling a scene description.
//!
//! All of these surface before rendering starts. Once a scene has been
//! validated and built, nothing on the render path returns an error.

use thiserror::Error;

/// Errors that can occur when validating a scene description.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Scene has no instances")]
    EmptyScene,

    #[error("Instance {instance} references missing prototype {prototype}")]
    MissingPrototype { instance: usize, prototype: usize },

    #[error("Instance {instance} has no materials")]
    NoMaterials { instance: usize },

    #[error("Instance {instance} references missing material {material}")]
    MissingMaterial { instance: usize, material: usize },

    #[error("Instance {instance}: face {face} uses material slot {material_id} but only {available} are bound")]
    MaterialSlotOutOfRange {
        instance: usize,
        face: usize,
        material_id: usize,
        available: usize,
    },

    #[error("Instance {instance} has a non-invertible transform")]
    DegenerateTransform { instance: usize },

    #[error("Face {face}: {attribute} index {index} out of range (len {len})")]
    FaceIndexOutOfRange {
        face: usize,
        attribute: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Prototype {prototype} ({name}): {reason}")]
    InvalidGeometry {
        prototype: usize,
        name: String,
        reason: String,
    },

    #[error("Material {material} ({name}): {reason}")]
    InvalidMaterial {
        material: usize,
        name: String,
        reason: String,
    },
}

pub type SceneResult<T> = Result<T, SceneError>;
