//! Intersection records passed from geometry to materials.

use luma_math::{DMat4, DVec2, DVec3, Mat4Ext};

/// Differential geometry at a hit point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSpec {
    pub position: DVec3,
    pub geometry_normal: DVec3,
    pub shading_normal: DVec3,

    /// Zero when the geometry carries no tangents
    pub shading_tangent: DVec3,

    pub uv: DVec2,

    /// Barycentric weights `(a, b, c)` with `a = 1 - b - c`
    pub barycentric: DVec3,

    /// Slot in the hit object's material list
    pub material_index: usize,
}

impl Default for SurfaceSpec {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            geometry_normal: DVec3::Z,
            shading_normal: DVec3::Z,
            shading_tangent: DVec3::ZERO,
            uv: DVec2::ZERO,
            barycentric: DVec3::ZERO,
            material_index: 0,
        }
    }
}

impl SurfaceSpec {
    /// Carry a local-space surface into world space.
    ///
    /// `normal_matrix` must be the inverse-transpose of `transform`.
    pub fn apply_transform(&mut self, transform: &DMat4, normal_matrix: &DMat4) {
        self.position = transform.transform_point3(self.position);
        self.geometry_normal = normal_matrix.transform_normal3(self.geometry_normal);
        self.shading_normal = normal_matrix.transform_normal3(self.shading_normal);
        self.shading_tangent = transform
            .transform_vector3(self.shading_tangent)
            .normalize_or_zero();
    }
}

/// Which object and primitive a ray hit, and how far away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub distance: f64,
    pub object_index: usize,
    pub primitive_index: usize,
}

/// One vertex of a light path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathVertex {
    /// Unit direction back toward the previous vertex
    pub incident: DVec3,
    pub hit: Hit,
    pub surface: SurfaceSpec,
}
