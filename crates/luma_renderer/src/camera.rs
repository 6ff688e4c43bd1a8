//! Camera for ray generation.
//!
//! The camera models a 35mm-style sensor behind a thin lens. In camera
//! space the lens sits at the origin looking down -Z and the sensor lies
//! behind it at `z = focal_length`, so the image arrives mirrored: screen
//! `u = 1` looks toward -X and `v = 1` looks down. The film flips x back
//! when writing images; row 0 (v = -1) is the top of the frame.

use luma_math::{DMat4, DVec2, DVec3, Random, Ray};

/// Sensor, lens and placement of the viewpoint.
#[derive(Debug, Clone, Copy)]
pub struct CameraNode {
    pub position: DVec3,

    /// Camera space to world space
    ray_transform: DMat4,

    // Sensor size in millimetres
    sensor_width: f64,
    sensor_height: f64,

    focal_length: f64,

    /// Zero for a pinhole
    f_number: f64,
    focus_distance: f64,
}

impl Default for CameraNode {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            ray_transform: DMat4::IDENTITY,
            sensor_width: 36.0,
            sensor_height: 24.0,
            focal_length: 28.0,
            f_number: 0.0,
            focus_distance: 1.0,
        }
    }
}

impl CameraNode {
    /// A default camera at `position` looking at `target`.
    pub fn new(position: DVec3, target: DVec3, up: DVec3) -> Self {
        let mut camera = Self {
            position,
            ..Default::default()
        };
        camera.look_at(target, up);
        camera
    }

    /// Orient the camera toward `target`.
    pub fn look_at(&mut self, target: DVec3, up: DVec3) {
        self.ray_transform = DMat4::look_at_rh(self.position, target, up).inverse();
    }

    pub fn set_sensor_size(&mut self, width: f64, height: f64) {
        self.sensor_width = width;
        self.sensor_height = height;
    }

    pub fn set_sensor_size_with_aspect_ratio(&mut self, width: f64, aspect: f64) {
        self.set_sensor_size(width, width / aspect);
    }

    /// Keep the sensor width, fit the height to `aspect`.
    pub fn resize_sensor_with_aspect_ratio(&mut self, aspect: f64) {
        self.set_sensor_size_with_aspect_ratio(self.sensor_width, aspect);
    }

    pub fn sensor_size(&self) -> DVec2 {
        DVec2::new(self.sensor_width, self.sensor_height)
    }

    pub fn sensor_aspect_ratio(&self) -> f64 {
        self.sensor_width / self.sensor_height
    }

    pub fn set_focal_length(&mut self, focal_length: f64) {
        self.focal_length = focal_length;
    }

    /// Focal length giving a vertical field of view of `fov` degrees
    /// on the current sensor.
    pub fn set_focal_length_with_fov(&mut self, fov: f64) {
        self.focal_length = self.sensor_height * 0.5 / (fov.to_radians() * 0.5).tan();
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn set_lens(&mut self, f_number: f64, focus_distance: f64) {
        self.f_number = f_number;
        self.focus_distance = focus_distance;
    }

    /// Aperture radius in scene units, zero for a pinhole.
    fn lens_radius(&self) -> f64 {
        if self.f_number > 0.0 {
            // Millimetres to scene metres
            0.5 * self.focal_length / self.f_number * 1e-3
        } else {
            0.0
        }
    }

    pub fn preprocess(&mut self, _rng: &mut Random) {
        log::debug!(
            "Camera: sensor {}x{} mm, focal {:.2} mm, f/{}",
            self.sensor_width,
            self.sensor_height,
            self.focal_length,
            self.f_number
        );
    }

    /// World ray through screen coordinates `u, v` in `[-1, 1]`.
    pub fn ray(&self, u: f64, v: f64, rng: &mut Random) -> Ray {
        let sensor_point = DVec3::new(
            self.sensor_width * 0.5 * u,
            self.sensor_height * 0.5 * v,
            self.focal_length,
        );
        let mut direction = (-sensor_point).normalize();
        let mut aperture_point = DVec3::ZERO;

        let lens_radius = self.lens_radius();
        if lens_radius > 0.0 {
            let focus_point = direction * (self.focus_distance / -direction.z);
            aperture_point = random_in_unit_disk(rng).extend(0.0) * lens_radius;
            direction = (focus_point - aperture_point).normalize();
        }

        Ray::new(
            self.ray_transform.transform_point3(aperture_point),
            self.ray_transform.transform_vector3(direction).normalize(),
        )
    }
}

/// Sample a random point in the unit disk.
fn random_in_unit_disk(rng: &mut Random) -> DVec2 {
    loop {
        let p = DVec2::new(rng.next_f64_signed_cc(), rng.next_f64_signed_cc());
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}
