//! Triangle mesh geometry.
//!
//! Wraps shared `luma_core::Mesh` data with the per-face data the tracer
//! needs (base vertex, edges, face normal, area) and a BVH over the faces.
//! Both are built by `preprocess`; before that the mesh reports no hits.

use std::sync::Arc;

use luma_core::Mesh;
use luma_math::{Aabb, DMat4, DVec2, DVec3, Random, Ray};

use crate::bvh::Bvh;
use crate::geometry::Geometry;
use crate::surface::SurfaceSpec;

/// Cached per-face data.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub p0: DVec3,
    pub edge01: DVec3,
    pub edge02: DVec3,

    /// Unit face normal, from the winding
    pub normal: DVec3,

    /// Length of `edge01 x edge02` (twice the geometric area)
    pub area: f64,

    /// Running total of `area` up to and including this face
    pub area_sample_border: f64,

    pub bounds: Aabb,
}

impl Triangle {
    pub fn new(p0: DVec3, p1: DVec3, p2: DVec3) -> Self {
        let edge01 = p1 - p0;
        let edge02 = p2 - p0;
        let n = edge01.cross(edge02);
        let area = n.length();

        let mut bounds = Aabb::EMPTY;
        bounds.expand(p0);
        bounds.expand(p1);
        bounds.expand(p2);

        Self {
            p0,
            edge01,
            edge02,
            normal: n / area,
            area,
            area_sample_border: area,
            bounds,
        }
    }

    /// Raw solve for `(t, b, c)` without range checks.
    #[inline]
    pub fn solve(&self, ray: &Ray) -> (f64, f64, f64) {
        let r = ray.origin - self.p0;
        let u = ray.direction.cross(self.edge02);
        let v = r.cross(self.edge01);

        let div = 1.0 / u.dot(self.edge01);
        let t = v.dot(self.edge02) * div;
        let b = u.dot(r) * div;
        let c = v.dot(ray.direction) * div;
        (t, b, c)
    }

    /// Hit distance and barycentric `(b, c)` inside `[near, far]`.
    ///
    /// A ray parallel to the face produces NaN, which fails every test.
    #[inline]
    pub fn intersect(&self, ray: &Ray, near: f64, far: f64) -> Option<(f64, f64, f64)> {
        let (t, b, c) = self.solve(ray);
        let inside = b >= 0.0 && c >= 0.0 && b + c <= 1.0 && t >= near && t <= far;
        inside.then_some((t, b, c))
    }
}

#[derive(Debug, Clone)]
struct PreparedMesh {
    triangles: Vec<Triangle>,
    bvh: Bvh,
    total_area: f64,
}

/// Geometry over a shared triangle mesh.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    mesh: Arc<Mesh>,
    prepared: Option<PreparedMesh>,
}

impl TriangleMesh {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            prepared: None,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    /// Cached face data, once preprocessed.
    pub fn triangles(&self) -> &[Triangle] {
        self.prepared
            .as_ref()
            .map_or(&[], |p| p.triangles.as_slice())
    }

    /// Sum of face areas, once preprocessed.
    pub fn total_area(&self) -> f64 {
        self.prepared.as_ref().map_or(0.0, |p| p.total_area)
    }
}

impl Geometry for TriangleMesh {
    fn compute_world_bounds(&self, transform: &DMat4) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for p in &self.mesh.positions {
            bounds.expand(transform.transform_point3(*p));
        }
        bounds
    }

    fn preprocess(&mut self, _rng: &mut Random) {
        let positions = &self.mesh.positions;
        let mut triangles = Vec::with_capacity(self.mesh.faces.len());
        let mut bvh = Bvh::new();
        let mut total_area = 0.0;

        for (i, face) in self.mesh.faces.iter().enumerate() {
            let [a, b, c] = face.vertices.to_array();
            let mut tri = Triangle::new(positions[a], positions[b], positions[c]);
            total_area += tri.area;
            tri.area_sample_border = total_area;

            bvh.append_leaf(tri.bounds, i);
            triangles.push(tri);
        }

        let depth = bvh.build_tree();
        log::debug!(
            "Mesh BVH: {} faces, depth {}",
            triangles.len(),
            depth
        );

        self.prepared = Some(PreparedMesh {
            triangles,
            bvh,
            total_area,
        });
    }

    fn intersect(&self, ray: &Ray, near: f64, far: f64) -> Option<(f64, usize)> {
        let Some(prepared) = &self.prepared else {
            debug_assert!(false, "mesh intersected before preprocess");
            return None;
        };

        prepared
            .bvh
            .intersect(ray, near, far, |face, ray, near, far| {
                prepared.triangles[face]
                    .intersect(ray, near, far)
                    .map(|(t, _, _)| (t, 0))
            })
            .map(|hit| (hit.distance, hit.data_id))
    }

    fn intersect_detail(&self, ray: &Ray, primitive_id: usize, _near: f64, _far: f64) -> SurfaceSpec {
        let Some(prepared) = &self.prepared else {
            debug_assert!(false, "mesh intersected before preprocess");
            return SurfaceSpec::default();
        };

        let mesh = &self.mesh;
        let tri = &prepared.triangles[primitive_id];
        let face = &mesh.faces[primitive_id];

        let (_, vb, vc) = tri.solve(ray);
        let va = 1.0 - vb - vc;
        let lerp3 = |values: &[DVec3], [a, b, c]: [usize; 3]| values[a] * va + values[b] * vb + values[c] * vc;

        let [a, b, c] = face.vertices.to_array();
        let position = mesh.positions[a] * va + mesh.positions[b] * vb + mesh.positions[c] * vc;

        let (shading_normal, shading_tangent) = match face.normals {
            Some(nid) => {
                let normal = lerp3(&mesh.normals, nid.to_array());
                let tangent = if mesh.tangents.is_empty() {
                    DVec3::ZERO
                } else {
                    lerp3(&mesh.tangents, nid.to_array())
                };
                (normal, tangent)
            }
            None => (tri.normal, DVec3::ZERO),
        };

        let uv = match face.texcoords {
            Some(uvid) => {
                let t = &mesh.texcoords;
                t[uvid.a] * va + t[uvid.b] * vb + t[uvid.c] * vc
            }
            None => DVec2::ZERO,
        };

        SurfaceSpec {
            position,
            geometry_normal: tri.normal,
            shading_normal,
            shading_tangent,
            uv,
            barycentric: DVec3::new(va, vb, vc),
            material_index: face.material_id,
        }
    }

    fn kind(&self) -> &'static str {
        "mesh"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luma_core::FaceIndices;

    fn reference_triangle() -> Triangle {
        Triangle::new(
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(-0.866, -0.5, 0.0),
            DVec3::new(0.866, -0.5, 0.0),
        )
    }

    fn prepared(mesh: Mesh) -> TriangleMesh {
        let mut geometry = TriangleMesh::new(Arc::new(mesh));
        geometry.preprocess(&mut Random::new(1));
        geometry
    }

    #[test]
    fn test_triangle_hit() {
        let tri = reference_triangle();
        let ray = Ray::new(DVec3::new(0.0, 0.0, 1.0), DVec3::NEG_Z);

        let (t, b, c) = tri.intersect(&ray, 1e-4, 1e10).expect("should hit");
        let a = 1.0 - b - c;
        assert!((t - 1.0).abs() < 1e-12);
        assert!((a + b + c - 1.0).abs() < 1e-12);
        assert!(a >= 0.0 && b >= 0.0 && c >= 0.0);
    }

    #[test]
    fn test_triangle_rejects() {
        let tri = reference_triangle();

        // Outside the edges
        let ray = Ray::new(DVec3::new(2.0, 0.0, 1.0), DVec3::NEG_Z);
        assert!(tri.intersect(&ray, 1e-4, 1e10).is_none());

        // Beyond far
        let ray = Ray::new(DVec3::new(0.0, 0.0, 1.0), DVec3::NEG_Z);
        assert!(tri.intersect(&ray, 1e-4, 0.5).is_none());

        // Parallel to the face
        let ray = Ray::new(DVec3::new(0.0, 0.0, 0.0), DVec3::X);
        assert!(tri.intersect(&ray, 1e-4, 1e10).is_none());
    }

    #[test]
    fn test_triangle_area_and_normal() {
        let tri = Triangle::new(DVec3::ZERO, DVec3::X, DVec3::Y);
        assert!((tri.area - 1.0).abs() < 1e-12);
        assert_eq!(tri.normal, DVec3::Z);
        assert_eq!(tri.bounds.min, DVec3::ZERO);
        assert_eq!(tri.bounds.max, DVec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_mesh_detail_interpolates() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::new(-1.0, -1.0, 0.0));
        mesh.add_vertex(DVec3::new(1.0, -1.0, 0.0));
        mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0));
        mesh.add_normal(DVec3::new(0.0, 0.0, 1.0));
        mesh.add_normal(DVec3::new(0.0, 0.0, 1.0));
        mesh.add_normal(DVec3::new(0.0, 1.0, 1.0).normalize());
        mesh.add_texcoord(DVec2::new(0.0, 0.0));
        mesh.add_texcoord(DVec2::new(1.0, 0.0));
        mesh.add_texcoord(DVec2::new(0.5, 1.0));
        mesh.add_triangle(0, 1, 2, 3);
        let geometry = prepared(mesh);

        let ray = Ray::new(DVec3::new(0.0, 1.0, 2.0), DVec3::NEG_Z);
        let (t, prim) = geometry.intersect(&ray, 1e-4, 1e10).expect("apex hit");
        assert!((t - 2.0).abs() < 1e-12);

        let surf = geometry.intersect_detail(&ray, prim, 1e-4, 1e10);
        assert!((surf.barycentric - DVec3::new(0.0, 0.0, 1.0)).length() < 1e-12);
        assert!((surf.uv - DVec2::new(0.5, 1.0)).length() < 1e-12);
        assert!((surf.shading_normal - DVec3::new(0.0, 1.0, 1.0).normalize()).length() < 1e-12);
        assert_eq!(surf.geometry_normal, DVec3::Z);
        assert_eq!(surf.shading_tangent, DVec3::ZERO);
        assert_eq!(surf.material_index, 3);
    }

    #[test]
    fn test_mesh_without_normals_uses_face_normal() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::ZERO);
        mesh.add_vertex(DVec3::Z);
        mesh.add_vertex(DVec3::X);
        mesh.add_face(FaceIndices::new(0, 1, 2), None, None, 0);
        let geometry = prepared(mesh);

        let ray = Ray::new(DVec3::new(0.2, 1.0, 0.2), DVec3::NEG_Y);
        let (_, prim) = geometry.intersect(&ray, 1e-4, 1e10).unwrap();
        let surf = geometry.intersect_detail(&ray, prim, 1e-4, 1e10);

        assert_eq!(surf.shading_normal, DVec3::Y);
        assert_eq!(surf.uv, DVec2::ZERO);
    }

    #[test]
    fn test_mesh_picks_nearest_face() {
        let mut mesh = Mesh::new();
        for z in [0.0, -1.0, -2.0] {
            let base = mesh.add_vertex(DVec3::new(-1.0, -1.0, z));
            mesh.add_vertex(DVec3::new(1.0, -1.0, z));
            mesh.add_vertex(DVec3::new(0.0, 1.0, z));
            mesh.add_triangle(base, base + 1, base + 2, 0);
        }
        let geometry = prepared(mesh);

        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), DVec3::NEG_Z);
        let (t, prim) = geometry.intersect(&ray, 1e-4, 1e10).unwrap();
        assert_eq!(prim, 0);
        assert!((t - 5.0).abs() < 1e-12);

        let ray = Ray::new(DVec3::new(0.0, 0.0, -5.0), DVec3::Z);
        let (_, prim) = geometry.intersect(&ray, 1e-4, 1e10).unwrap();
        assert_eq!(prim, 2);
    }

    #[test]
    fn test_mesh_area_borders_accumulate() {
        let geometry = prepared(Mesh::cube(DVec3::ZERO, DVec3::ONE));
        let tris = geometry.triangles();

        assert_eq!(tris.len(), 12);
        for pair in tris.windows(2) {
            assert!((pair[1].area_sample_border - pair[0].area_sample_border - pair[1].area).abs() < 1e-12);
        }
        // Twice the surface area of a unit cube
        assert!((geometry.total_area() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_mesh_world_bounds_from_vertices() {
        let geometry = TriangleMesh::new(Arc::new(Mesh::cube(DVec3::ZERO, DVec3::splat(2.0))));
        let bounds = geometry.compute_world_bounds(&DMat4::from_rotation_y(std::f64::consts::FRAC_PI_4));

        let r = 2.0_f64.sqrt();
        assert!((bounds.max.x - r).abs() < 1e-12);
        assert!((bounds.max.y - 1.0).abs() < 1e-12);
        assert!(!geometry.is_prepared());
    }
}
