//! Luma Core - renderer-agnostic scene description.
//!
//! This crate provides:
//!
//! - **Scene description types**: `SceneDesc`, `Prototype`, `Instance`, `MaterialDesc`
//! - **Mesh data**: separately indexed positions, normals, tangents and UVs
//! - **Textures**: constant, gradient and bilinear image textures
//!
//! # Example
//!
//! ```ignore
//! use luma_core::{GeometryDesc, MaterialDesc, SceneDesc, Transform};
//!
//! let mut scene = SceneDesc::new("ball");
//! let white = scene.add_material(MaterialDesc::lambert("white", DVec3::ONE));
//! scene.add_object(
//!     "sphere",
//!     GeometryDesc::Sphere { center: DVec3::ZERO, radius: 1.0 },
//!     Transform::default(),
//!     vec![white],
//! );
//! scene.validate()?;
//! ```

pub mod error;
pub mod mesh;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use error::{SceneError, SceneResult};
pub use mesh::{Face, FaceIndices, Mesh};
pub use scene::{
    BackgroundDesc, CameraDesc, GeometryDesc, Instance, MaterialDesc, MetallicRoughness,
    Prototype, SceneDesc, Shading, Transform,
};
pub use texture::{
    BufferTexture, GradientAxis, Texture, TextureCache, TextureError, TextureResult, WrapMode,
};
