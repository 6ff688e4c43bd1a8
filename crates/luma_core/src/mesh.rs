//! Mesh geometry representation for the Luma scene description.
//!
//! Attribute arrays are flat and insertion-ordered. Faces index into them
//! separately (vertex, normal, texcoord), so a cube can share 8 positions
//! between 6 flat-shaded sides. Tangents, when present, share the normal
//! indices.

use luma_math::{Aabb, DVec2, DVec3};

use crate::error::{SceneError, SceneResult};

/// Three indices into one of the mesh attribute arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceIndices {
    pub a: usize,
    pub b: usize,
    pub c: usize,
}

impl FaceIndices {
    pub const fn new(a: usize, b: usize, c: usize) -> Self {
        Self { a, b, c }
    }

    pub fn to_array(self) -> [usize; 3] {
        [self.a, self.b, self.c]
    }
}

/// A triangle of the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Indices into `positions`
    pub vertices: FaceIndices,

    /// Indices into `normals` (and `tangents`). `None` shades with the face normal.
    pub normals: Option<FaceIndices>,

    /// Indices into `texcoords`
    pub texcoords: Option<FaceIndices>,

    /// Slot in the owning object's material list
    pub material_id: usize,
}

/// A triangle mesh with separately indexed attributes.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    /// Vertex positions
    pub positions: Vec<DVec3>,

    /// Shading normals
    pub normals: Vec<DVec3>,

    /// Shading tangents, indexed like `normals`
    pub tangents: Vec<DVec3>,

    /// UV coordinates
    pub texcoords: Vec<DVec2>,

    /// Triangles
    pub faces: Vec<Face>,

    /// Axis-aligned bounding box of `positions`
    pub bounds: Aabb,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mesh with reserved storage.
    pub fn with_capacity(vertices: usize, faces: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(vertices),
            faces: Vec::with_capacity(faces),
            ..Default::default()
        }
    }

    /// Add a vertex position and return its index.
    pub fn add_vertex(&mut self, p: DVec3) -> usize {
        self.positions.push(p);
        self.bounds.expand(p);
        self.positions.len() - 1
    }

    /// Add a shading normal and return its index.
    pub fn add_normal(&mut self, n: DVec3) -> usize {
        self.normals.push(n);
        self.normals.len() - 1
    }

    /// Add a vertex and a normal sharing the same index.
    pub fn add_vertex_and_normal(&mut self, p: DVec3, n: DVec3) -> usize {
        let index = self.add_vertex(p);
        self.normals.push(n);
        index
    }

    pub fn add_tangent(&mut self, t: DVec3) -> usize {
        self.tangents.push(t);
        self.tangents.len() - 1
    }

    pub fn add_texcoord(&mut self, uv: DVec2) -> usize {
        self.texcoords.push(uv);
        self.texcoords.len() - 1
    }

    /// Add a face with explicit attribute indices and return its index.
    pub fn add_face(
        &mut self,
        vertices: FaceIndices,
        normals: Option<FaceIndices>,
        texcoords: Option<FaceIndices>,
        material_id: usize,
    ) -> usize {
        self.faces.push(Face {
            vertices,
            normals,
            texcoords,
            material_id,
        });
        self.faces.len() - 1
    }

    /// Add a face whose normals and UVs share the vertex indices.
    pub fn add_triangle(&mut self, a: usize, b: usize, c: usize, material_id: usize) -> usize {
        let indices = FaceIndices::new(a, b, c);
        let normals = (!self.normals.is_empty()).then_some(indices);
        let texcoords = (!self.texcoords.is_empty()).then_some(indices);
        self.add_face(indices, normals, texcoords, material_id)
    }

    /// Axis-aligned box mesh centred at `center`: 8 positions, 6 normals,
    /// 4 UVs and 12 outward-facing triangles.
    pub fn cube(center: DVec3, size: DVec3) -> Self {
        let lo = center - size * 0.5;
        let hi = center + size * 0.5;
        let mut mesh = Self::with_capacity(8, 12);

        // Bottom
        mesh.add_vertex(DVec3::new(lo.x, lo.y, lo.z)); // 0
        mesh.add_vertex(DVec3::new(lo.x, lo.y, hi.z)); // 1
        mesh.add_vertex(DVec3::new(hi.x, lo.y, hi.z)); // 2
        mesh.add_vertex(DVec3::new(hi.x, lo.y, lo.z)); // 3
        // Top
        mesh.add_vertex(DVec3::new(lo.x, hi.y, lo.z)); // 4
        mesh.add_vertex(DVec3::new(lo.x, hi.y, hi.z)); // 5
        mesh.add_vertex(DVec3::new(hi.x, hi.y, hi.z)); // 6
        mesh.add_vertex(DVec3::new(hi.x, hi.y, lo.z)); // 7

        mesh.add_normal(DVec3::X);
        mesh.add_normal(DVec3::NEG_X);
        mesh.add_normal(DVec3::Y);
        mesh.add_normal(DVec3::NEG_Y);
        mesh.add_normal(DVec3::Z);
        mesh.add_normal(DVec3::NEG_Z);

        mesh.add_texcoord(DVec2::new(0.0, 0.0));
        mesh.add_texcoord(DVec2::new(1.0, 0.0));
        mesh.add_texcoord(DVec2::new(1.0, 1.0));
        mesh.add_texcoord(DVec2::new(0.0, 1.0));

        // (first triangle, second triangle, normal) per side: +X, -X, +Y, -Y, +Z, -Z
        let sides = [
            ([6, 2, 3], [3, 7, 6], 0),
            ([4, 0, 1], [1, 5, 4], 1),
            ([4, 5, 6], [6, 7, 4], 2),
            ([2, 1, 0], [0, 3, 2], 3),
            ([1, 2, 6], [6, 5, 1], 4),
            ([3, 0, 4], [4, 7, 3], 5),
        ];
        for (first, second, n) in sides {
            let normals = Some(FaceIndices::new(n, n, n));
            mesh.add_face(
                FaceIndices::new(first[0], first[1], first[2]),
                normals,
                Some(FaceIndices::new(0, 1, 2)),
                0,
            );
            mesh.add_face(
                FaceIndices::new(second[0], second[1], second[2]),
                normals,
                Some(FaceIndices::new(2, 3, 0)),
                0,
            );
        }

        mesh
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Replaces any existing normals and points every face's normal
    /// indices at its vertex indices. Faces are wound counter-clockwise.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![DVec3::ZERO; vertex_count];

        for face in &self.faces {
            let [i0, i1, i2] = face.vertices.to_array();
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let edge1 = self.positions[i1] - p0;
            let edge2 = self.positions[i2] - p0;
            let face_normal = edge1.cross(edge2);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            let len = normal.length();
            if len > 0.0 {
                *normal /= len;
            } else {
                *normal = DVec3::Y; // Default up normal for degenerate cases
            }
        }

        self.normals = normals;
        self.tangents.clear();
        for face in &mut self.faces {
            face.normals = Some(face.vertices);
        }
    }

    /// Largest material slot referenced by any face.
    pub fn max_material_id(&self) -> Option<usize> {
        self.faces.iter().map(|f| f.material_id).max()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Check every face index against the attribute arrays.
    pub fn validate(&self) -> SceneResult<()> {
        fn check(
            face: usize,
            attribute: &'static str,
            indices: FaceIndices,
            len: usize,
        ) -> SceneResult<()> {
            match indices.to_array().into_iter().find(|&i| i >= len) {
                Some(index) => Err(SceneError::FaceIndexOutOfRange {
                    face,
                    attribute,
                    index,
                    len,
                }),
                None => Ok(()),
            }
        }

        for (i, face) in self.faces.iter().enumerate() {
            check(i, "vertex", face.vertices, self.positions.len())?;
            if let Some(normals) = face.normals {
                check(i, "normal", normals, self.normals.len())?;
                if !self.tangents.is_empty() {
                    check(i, "tangent", normals, self.tangents.len())?;
                }
            }
            if let Some(texcoords) = face.texcoords {
                check(i, "texcoord", texcoords, self.texcoords.len())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(DVec3::new(0.0, 1.0, 0.0));
        mesh.add_triangle(0, 1, 2, 0);
        mesh
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = unit_triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.faces[0].normals.is_none());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_compute_normals() {
        let mut mesh = unit_triangle();
        mesh.compute_normals();

        assert_eq!(mesh.normals.len(), 3);
        assert_eq!(mesh.faces[0].normals, Some(FaceIndices::new(0, 1, 2)));

        // CCW triangle in the XY plane faces +Z
        for normal in &mesh.normals {
            assert!((normal.z - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_bounds_follow_vertices() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(DVec3::new(-1.0, -2.0, -3.0));
        mesh.add_vertex(DVec3::new(4.0, 5.0, 6.0));
        mesh.add_vertex(DVec3::ZERO);

        assert_eq!(mesh.bounds.min, DVec3::new(-1.0, -2.0, -3.0));
        assert_eq!(mesh.bounds.max, DVec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_cube_layout() {
        let cube = Mesh::cube(DVec3::new(1.0, 2.0, 3.0), DVec3::splat(2.0));

        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.normals.len(), 6);
        assert_eq!(cube.texcoords.len(), 4);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.bounds.min, DVec3::new(0.0, 1.0, 2.0));
        assert_eq!(cube.bounds.max, DVec3::new(2.0, 3.0, 4.0));
        assert!(cube.validate().is_ok());

        // Winding agrees with the stored normal on every face
        for face in &cube.faces {
            let [a, b, c] = face.vertices.to_array();
            let p0 = cube.positions[a];
            let geometric = (cube.positions[b] - p0).cross(cube.positions[c] - p0);
            let shading = cube.normals[face.normals.unwrap().a];
            assert!(geometric.dot(shading) > 0.0, "face winding disagrees with {:?}", shading);
        }
    }

    #[test]
    fn test_validate_reports_bad_index() {
        let mut mesh = unit_triangle();
        mesh.add_triangle(0, 1, 7, 0);

        let err = mesh.validate().unwrap_err();
        assert_eq!(
            err,
            SceneError::FaceIndexOutOfRange {
                face: 1,
                attribute: "vertex",
                index: 7,
                len: 3,
            }
        );
    }

    #[test]
    fn test_validate_checks_tangents_with_normal_indices() {
        let mut mesh = unit_triangle();
        mesh.compute_normals();
        mesh.add_tangent(DVec3::X);

        assert!(matches!(
            mesh.validate(),
            Err(SceneError::FaceIndexOutOfRange { attribute: "tangent", .. })
        ));
    }
}
