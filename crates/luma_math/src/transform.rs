// Transform utilities for DMat4
//
// Extends glam::DMat4 with the few helpers the instance layer needs.
// Note: glam::DMat4 already provides transform_point3(), transform_vector3()
// and inverse()

use crate::Aabb;
use glam::{DMat4, DVec3};

/// Extension trait for DMat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Inverse-transpose, used to carry normals through non-uniform scale.
    fn normal_matrix(&self) -> DMat4;

    /// Transform a normal by this matrix, which must already be a normal
    /// matrix, and renormalize.
    fn transform_normal3(&self, normal: DVec3) -> DVec3;
}

impl Mat4Ext for DMat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }

        let (lo, hi) = (aabb.min, aabb.max);
        let corners = [
            DVec3::new(lo.x, lo.y, lo.z),
            DVec3::new(hi.x, lo.y, lo.z),
            DVec3::new(lo.x, hi.y, lo.z),
            DVec3::new(hi.x, hi.y, lo.z),
            DVec3::new(lo.x, lo.y, hi.z),
            DVec3::new(hi.x, lo.y, hi.z),
            DVec3::new(lo.x, hi.y, hi.z),
            DVec3::new(hi.x, hi.y, hi.z),
        ];

        let mut result = Aabb::EMPTY;
        for corner in corners {
            result.expand(self.transform_point3(corner));
        }
        result
    }

    fn normal_matrix(&self) -> DMat4 {
        self.inverse().transpose()
    }

    fn transform_normal3(&self, normal: DVec3) -> DVec3 {
        self.transform_vector3(normal).normalize()
    }
}
