//! Built-in scenes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use luma_core::{
    CameraDesc, FaceIndices, GeometryDesc, Instance, MaterialDesc, Mesh, SceneDesc, Transform,
};
use luma_math::{DQuat, DVec3};

/// Scenes the renderer ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleScene {
    /// Classic Cornell box made of huge spheres
    Cornell,
    /// Cornell box with mesh walls, an area light and two cubes
    #[default]
    MeshCornell,
    /// A cube next to a glowing ball
    Test,
}

impl SampleScene {
    pub const ALL: [SampleScene; 3] = [SampleScene::Cornell, SampleScene::MeshCornell, SampleScene::Test];

    pub fn name(self) -> &'static str {
        match self {
            SampleScene::Cornell => "cornell",
            SampleScene::MeshCornell => "mesh-cornell",
            SampleScene::Test => "test",
        }
    }

    pub fn build(self) -> SceneDesc {
        match self {
            SampleScene::Cornell => cornell_box(),
            SampleScene::MeshCornell => mesh_cornell_box(),
            SampleScene::Test => test_scene(),
        }
    }
}

impl fmt::Display for SampleScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleScene {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SampleScene::ALL
            .into_iter()
            .find(|scene| scene.name() == s)
            .ok_or_else(|| format!("unknown scene '{}'", s))
    }
}

fn cornell_camera() -> CameraDesc {
    let position = DVec3::new(50.0, 52.0, 295.6);
    CameraDesc {
        position,
        target: position + DVec3::new(0.0, -0.042612, -1.0),
        up: DVec3::Y,
        fov_degrees: 30.0,
        ..Default::default()
    }
}

/// Cornell box built from spheres; the walls are spheres of radius 1e5.
pub fn cornell_box() -> SceneDesc {
    let mut scene = SceneDesc::new("cornell");
    scene.camera = cornell_camera();

    let red = scene.add_material(MaterialDesc::lambert("red", DVec3::new(0.75, 0.25, 0.25)));
    let blue = scene.add_material(MaterialDesc::lambert("blue", DVec3::new(0.25, 0.25, 0.75)));
    let white = scene.add_material(MaterialDesc::lambert("white", DVec3::splat(0.75)));
    let mirror = scene.add_material(MaterialDesc::mirror("mirror", DVec3::splat(0.99)));
    let glass = scene.add_material(MaterialDesc::glass("glass", DVec3::splat(0.99), 1.5));
    let light = scene.add_material(MaterialDesc::lambert("light", DVec3::ZERO).with_emission(DVec3::splat(12.0)));

    let balls = [
        ("left", DVec3::new(1e5 + 1.0, 40.8, 81.6), 1e5, red),
        ("right", DVec3::new(-1e5 + 99.0, 40.8, 81.6), 1e5, blue),
        ("back", DVec3::new(50.0, 40.8, 1e5), 1e5, white),
        ("floor", DVec3::new(50.0, 1e5, 81.6), 1e5, white),
        ("ceiling", DVec3::new(50.0, -1e5 + 81.6, 81.6), 1e5, white),
        ("mirror", DVec3::new(27.0, 16.5, 47.0), 16.5, mirror),
        ("glass", DVec3::new(73.0, 16.5, 78.0), 16.5, glass),
        ("light", DVec3::new(50.0, 681.6 - 0.27, 81.6), 600.0, light),
    ];
    for (name, center, radius, material) in balls {
        scene.add_object(
            name,
            GeometryDesc::Sphere { center, radius },
            Transform::default(),
            vec![material],
        );
    }

    scene
}

/// Five walls open toward the camera. Slots: 0 red, 1 blue, 2 white.
fn cornell_walls() -> Mesh {
    let mut mesh = Mesh::with_capacity(8, 10);

    // Bottom
    mesh.add_vertex(DVec3::new(0.0, 0.0, 0.0));
    mesh.add_vertex(DVec3::new(0.0, 0.0, 300.0));
    mesh.add_vertex(DVec3::new(100.0, 0.0, 300.0));
    mesh.add_vertex(DVec3::new(100.0, 0.0, 0.0));
    // Top
    mesh.add_vertex(DVec3::new(0.0, 80.0, 0.0));
    mesh.add_vertex(DVec3::new(0.0, 80.0, 300.0));
    mesh.add_vertex(DVec3::new(100.0, 80.0, 300.0));
    mesh.add_vertex(DVec3::new(100.0, 80.0, 0.0));

    for n in [DVec3::X, DVec3::NEG_X, DVec3::Y, DVec3::NEG_Y, DVec3::Z, DVec3::NEG_Z] {
        mesh.add_normal(n);
    }

    // (vertices, inward normal, material slot)
    let faces = [
        ([6, 7, 3], 1, 0), // x = 100
        ([3, 2, 6], 1, 0),
        ([4, 5, 1], 0, 1), // x = 0
        ([1, 0, 4], 0, 1),
        ([4, 7, 6], 3, 2), // ceiling
        ([6, 5, 4], 3, 2),
        ([0, 1, 2], 2, 2), // floor
        ([2, 3, 0], 2, 2),
        ([7, 4, 0], 4, 2), // back
        ([0, 3, 7], 4, 2),
    ];
    for ([a, b, c], n, material) in faces {
        mesh.add_face(FaceIndices::new(a, b, c), Some(FaceIndices::new(n, n, n)), None, material);
    }

    mesh
}

/// Cornell box with mesh walls, a quad light and two rotated cubes.
pub fn mesh_cornell_box() -> SceneDesc {
    let mut scene = SceneDesc::new("mesh-cornell");
    scene.camera = cornell_camera();

    let red = scene.add_material(MaterialDesc::lambert("red", DVec3::new(0.75, 0.25, 0.25)));
    let blue = scene.add_material(MaterialDesc::lambert("blue", DVec3::new(0.25, 0.25, 0.75)));
    let white = scene.add_material(MaterialDesc::lambert("white", DVec3::splat(0.75)));
    let mirror = scene.add_material(MaterialDesc::mirror("mirror", DVec3::splat(0.99)));
    let glass = scene.add_material(MaterialDesc::glass("glass", DVec3::splat(0.99), 1.5));
    let light = scene.add_material(MaterialDesc::lambert("light", DVec3::ZERO).with_emission(DVec3::splat(12.0)));

    scene.add_object(
        "walls",
        GeometryDesc::Mesh(Arc::new(cornell_walls())),
        Transform::default(),
        vec![red, blue, white],
    );

    // 40 x 40 quad just below the ceiling, facing down
    let mut lamp = Mesh::with_capacity(4, 2);
    let center = DVec3::new(50.0, 79.5, 80.0);
    for (dx, dz) in [(-20.0, -20.0), (-20.0, 20.0), (20.0, 20.0), (20.0, -20.0)] {
        lamp.add_vertex(center + DVec3::new(dx, 0.0, dz));
    }
    lamp.add_normal(DVec3::NEG_Y);
    let down = Some(FaceIndices::new(0, 0, 0));
    lamp.add_face(FaceIndices::new(0, 1, 2), down, None, 0);
    lamp.add_face(FaceIndices::new(2, 3, 0), down, None, 0);
    let lamp = scene.add_prototype("light", GeometryDesc::Mesh(Arc::new(lamp)));
    scene.add_instance(Instance::new(lamp, Transform::default(), vec![light]).as_light());

    // One cube shared by both instances
    let cube = scene.add_prototype(
        "cube",
        GeometryDesc::Cube {
            center: DVec3::ZERO,
            size: DVec3::splat(33.0),
        },
    );
    scene.add_instance(Instance::new(
        cube,
        Transform::from_translation(DVec3::new(27.0, 16.5, 47.0))
            .with_rotation(DQuat::from_rotation_y(20f64.to_radians())),
        vec![mirror],
    ));
    scene.add_instance(Instance::new(
        cube,
        Transform::from_translation(DVec3::new(73.0, 16.51, 78.0))
            .with_rotation(DQuat::from_rotation_y((-25f64).to_radians())),
        vec![glass],
    ));

    scene
}

/// Unit cube lit by a small glowing sphere.
pub fn test_scene() -> SceneDesc {
    let mut scene = SceneDesc::new("test");
    scene.camera = CameraDesc {
        position: DVec3::new(2.0, 1.0, 4.0),
        target: DVec3::ZERO,
        up: DVec3::Y,
        fov_degrees: 30.0,
        ..Default::default()
    };

    let grey = scene.add_material(MaterialDesc::lambert("grey", DVec3::splat(0.75)));
    let glow = scene.add_material(MaterialDesc::lambert("glow", DVec3::splat(0.75)).with_emission(DVec3::splat(4.0)));

    scene.add_object(
        "cube",
        GeometryDesc::Cube {
            center: DVec3::ZERO,
            size: DVec3::ONE,
        },
        Transform::default(),
        vec![grey],
    );
    scene.add_object(
        "ball",
        GeometryDesc::Sphere {
            center: DVec3::new(1.0, 1.0, -1.0),
            radius: 0.5,
        },
        Transform::default(),
        vec![glow],
    );

    scene
}
