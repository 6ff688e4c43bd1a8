//! Luma renderer - CPU path tracing.
//!
//! A unidirectional Monte Carlo path tracer:
//! - Two-level BVH: one over the triangles of each mesh, one over objects
//! - Spheres, triangle meshes and boxes, instanced through object nodes
//! - Lambert, mirror, Fresnel glass and glTF metallic-roughness materials
//! - Russian roulette path termination
//! - Progressive tile rendering on rayon with per-tile seeded generators
//!
//! Scenes come in as `luma_core::SceneDesc` and are turned into a render
//! [`Scene`] by [`SceneBuilder`].

mod background;
mod bsdf;
mod builder;
mod bvh;
mod camera;
mod cube;
mod film;
mod geometry;
mod material;
mod mesh;
mod object;
mod path_tracer;
mod renderer;
mod sample_scenes;
mod scene;
mod sphere;
mod surface;
mod tile;

pub use background::Background;
pub use bsdf::{cosine_weighted_hemisphere, fresnel_schlick, reflect, refract, tangent_space};
pub use builder::{BuildError, BuildResult, SceneBuilder};
pub use bvh::{Bvh, BvhHit, BvhNode, Leaf};
pub use camera::CameraNode;
pub use cube::Cube;
pub use film::{to_display, Film, Pixel, GAMMA};
pub use geometry::Geometry;
pub use material::{
    BsdfEval, BsdfSample, BsdfTag, Color, Material, MetallicRoughnessMaterial, SimpleKind,
    SimpleMaterial,
};
pub use mesh::{Triangle, TriangleMesh};
pub use object::ObjectNode;
pub use path_tracer::PathTracer;
pub use renderer::{
    render_tile, DepthStats, PassStats, RenderConfig, RenderStats, Renderer, TileResult,
};
pub use sample_scenes::{cornell_box, mesh_cornell_box, test_scene, SampleScene};
pub use scene::Scene;
pub use sphere::Sphere;
pub use surface::{Hit, PathVertex, SurfaceSpec};
pub use tile::{
    make_scrambled_array, make_tile_array, tile_count, Tile, TileState, DEFAULT_TILE_SIZE,
};

/// Re-export math types from luma_math
pub use luma_math::{Aabb, DMat4, DVec2, DVec3, Random, Ray};

/// Near bound for rays leaving a surface, keeps them from hitting it again.
pub const RAY_OFFSET: f64 = 1e-4;

/// Far bound meaning "anywhere in the scene".
pub const FAR_AWAY: f64 = 1e10;

/// Tolerance for matching specular directions.
pub const EPS: f64 = 1e-4;
