use crate::{DVec3, Ray};

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// The empty box is `min = +inf, max = -inf`, so the first `expand` always
/// establishes correct bounds and an empty box never reports a hit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Box that contains nothing.
    pub const EMPTY: Aabb = Aabb {
        min: DVec3::INFINITY,
        max: DVec3::NEG_INFINITY,
    };

    /// Create an AABB from two corner points in any order.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Reset to the empty box.
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }

    /// True if no point has been added yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to contain a point.
    pub fn expand(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow the box to contain another box.
    pub fn expand_box(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn surface_area(&self) -> f64 {
        let d = self.size();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    ///
    /// Ties go to the first axis in X, Y, Z order.
    pub fn longest_axis(&self) -> usize {
        let d = self.size();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Strict containment: points on the boundary are outside.
    pub fn is_inside(&self, p: DVec3) -> bool {
        p.x > self.min.x
            && p.y > self.min.y
            && p.z > self.min.z
            && p.x < self.max.x
            && p.y < self.max.y
            && p.z < self.max.z
    }

    /// Test if a ray intersects this AABB within `[near, far]`.
    ///
    /// Slab method. A zero direction component divides to a signed infinity,
    /// which keeps axis-aligned rays correct without special cases.
    pub fn is_intersect(&self, ray: &Ray, near: f64, far: f64) -> bool {
        let mut largest_min = near;
        let mut smallest_max = far;

        for axis in 0..3 {
            let inv_d = 1.0 / ray.direction[axis];
            let mut t0 = (self.min[axis] - ray.origin[axis]) * inv_d;
            let mut t1 = (self.max[axis] - ray.origin[axis]) * inv_d;
            if inv_d < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }

            largest_min = largest_min.max(t0);
            smallest_max = smallest_max.min(t1);

            if smallest_max < largest_min {
                return false;
            }
        }

        true
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_new_sorts_corners() {
        let aabb = Aabb::new(DVec3::new(10.0, 0.0, 5.0), DVec3::new(0.0, 10.0, -5.0));

        assert_eq!(aabb.min, DVec3::new(0.0, 0.0, -5.0));
        assert_eq!(aabb.max, DVec3::new(10.0, 10.0, 5.0));
    }

    #[test]
    fn test_aabb_empty_never_hits() {
        let aabb = Aabb::EMPTY;
        assert!(aabb.is_empty());

        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::new(0.0, 0.0, -1.0));
        assert!(!aabb.is_intersect(&ray, 0.0, 1e10));
    }

    #[test]
    fn test_aabb_expand_is_idempotent() {
        let mut aabb = Aabb::EMPTY;
        let p = DVec3::new(1.0, -2.0, 3.0);
        aabb.expand(p);
        let once = aabb;
        aabb.expand(p);

        assert_eq!(aabb, once);
        assert_eq!(aabb.min, p);
        assert_eq!(aabb.max, p);
    }

    #[test]
    fn test_aabb_containment_after_expand() {
        let points = [
            DVec3::new(-1.0, -2.0, -3.0),
            DVec3::new(4.0, 5.0, 6.0),
            DVec3::new(0.5, 0.5, 0.5),
        ];
        let mut aabb = Aabb::EMPTY;
        for p in points {
            aabb.expand(p);
        }

        // Interior point is inside, corner points sit on the boundary
        assert!(aabb.is_inside(points[2]));
        assert!(!aabb.is_inside(points[0]));
        assert!(!aabb.is_inside(points[1]));

        // A ray through every added point hits the box
        for p in points {
            let origin = p + DVec3::new(0.0, 0.0, 20.0);
            let ray = Ray::new(origin, DVec3::new(0.0, 0.0, -1.0));
            assert!(aabb.is_intersect(&ray, 0.0, 1e10), "ray through {:?} missed", p);
        }
    }

    #[test]
    fn test_aabb_expand_box() {
        let mut box1 = Aabb::new(DVec3::ZERO, DVec3::splat(5.0));
        let box2 = Aabb::new(DVec3::splat(3.0), DVec3::splat(10.0));
        box1.expand_box(&box2);

        assert_eq!(box1.min, DVec3::ZERO);
        assert_eq!(box1.max, DVec3::splat(10.0));
        assert_eq!(Aabb::surrounding(&box2, &Aabb::EMPTY), box2);
    }

    #[test]
    fn test_aabb_intersect() {
        let aabb = Aabb::new(DVec3::splat(-0.5), DVec3::splat(0.5));

        // Ray pointing at center
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::new(0.0, 0.0, -1.0));
        assert!(aabb.is_intersect(&ray, 1e-4, 1e10));

        // Origin on the face
        let ray = Ray::new(DVec3::new(0.0, 0.0, 0.5), DVec3::new(0.0, 0.0, -1.0));
        assert!(aabb.is_intersect(&ray, 1e-4, 1e10));

        // Ray pointing away
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::new(0.0, 0.0, 1.0));
        assert!(!aabb.is_intersect(&ray, 1e-4, 1e10));

        // Ray missing the box
        let ray = Ray::new(DVec3::new(10.0, 0.0, 5.0), DVec3::new(0.0, 0.0, -1.0));
        assert!(!aabb.is_intersect(&ray, 1e-4, 1e10));

        // Box lies beyond far
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::new(0.0, 0.0, -1.0));
        assert!(!aabb.is_intersect(&ray, 1e-4, 4.0));
    }

    #[test]
    fn test_aabb_thin_intersection() {
        let aabb = Aabb::new(DVec3::new(-0.5, -0.5, 0.5), DVec3::new(0.5, 0.5, 0.5));
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::new(0.0, 0.0, -1.0));

        assert!(aabb.is_intersect(&ray, 1e-4, 1e10));
    }

    #[test]
    fn test_aabb_diagonal_ray() {
        let aabb = Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        let dir = DVec3::new(1.0, 1.0, 1.0).normalize();

        let ray = Ray::new(DVec3::splat(-5.0), dir);
        assert!(aabb.is_intersect(&ray, 0.0, 100.0));

        let ray = Ray::new(DVec3::new(-5.0, 3.0, -5.0), dir);
        assert!(!aabb.is_intersect(&ray, 0.0, 100.0));
    }

    #[test]
    fn test_aabb_centroid_and_area() {
        let aabb = Aabb::new(DVec3::ZERO, DVec3::new(10.0, 10.0, 10.0));

        assert_eq!(aabb.centroid(), DVec3::splat(5.0));
        assert_eq!(aabb.surface_area(), 600.0);
    }

    #[test]
    fn test_aabb_longest_axis() {
        let aabb_x = Aabb::new(DVec3::ZERO, DVec3::new(10.0, 1.0, 1.0));
        assert_eq!(aabb_x.longest_axis(), 0);

        let aabb_y = Aabb::new(DVec3::ZERO, DVec3::new(1.0, 10.0, 1.0));
        assert_eq!(aabb_y.longest_axis(), 1);

        let aabb_z = Aabb::new(DVec3::ZERO, DVec3::new(1.0, 1.0, 10.0));
        assert_eq!(aabb_z.longest_axis(), 2);

        // Ties resolve in X, Y, Z order
        let cube = Aabb::new(DVec3::ZERO, DVec3::ONE);
        assert_eq!(cube.longest_axis(), 0);
        let yz = Aabb::new(DVec3::ZERO, DVec3::new(1.0, 3.0, 3.0));
        assert_eq!(yz.longest_axis(), 1);
    }
}
