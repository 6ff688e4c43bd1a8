//! Environment lookup for rays that leave the scene.

use std::f64::consts::PI;

use luma_core::Texture;
use luma_math::{DMat4, DVec2, DVec3, Ray};

use crate::material::Color;

/// Lat-long environment texture.
#[derive(Debug, Clone)]
pub struct Background {
    pub texture: Texture,

    /// Applied to ray directions before the lookup
    pub transform: DMat4,
}

impl Default for Background {
    fn default() -> Self {
        Self::constant(DVec3::splat(0.2))
    }
}

impl Background {
    pub fn new(texture: Texture, transform: DMat4) -> Self {
        Self { texture, transform }
    }

    pub fn constant(color: Color) -> Self {
        Self::new(Texture::Constant(color), DMat4::IDENTITY)
    }

    /// Texture coordinates for a world direction.
    ///
    /// `u` wraps around the vertical axis starting at -Z, `v` runs from
    /// straight down (0) to straight up (1).
    pub fn direction_to_uv(&self, direction: DVec3) -> DVec2 {
        let d = self.transform.transform_vector3(direction).normalize();
        let t = (-d.x).atan2(-d.z) / (2.0 * PI);
        let u = if t >= 0.0 { t } else { 1.0 + t };
        let v = (-d.y).clamp(-1.0, 1.0).acos() / PI;
        DVec2::new(u, v)
    }

    pub fn sample(&self, ray: &Ray) -> Color {
        self.texture.sample(self.direction_to_uv(ray.direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luma_core::{BufferTexture, GradientAxis};
    use std::sync::Arc;

    #[test]
    fn test_default_is_grey() {
        let bg = Background::default();
        let ray = Ray::new(DVec3::ZERO, DVec3::new(0.3, 0.4, -0.5).normalize());
        assert_eq!(bg.sample(&ray), DVec3::splat(0.2));
    }

    #[test]
    fn test_direction_to_uv() {
        let bg = Background::default();

        let up = bg.direction_to_uv(DVec3::Y);
        assert!((up.y - 1.0).abs() < 1e-12);
        let down = bg.direction_to_uv(DVec3::NEG_Y);
        assert!(down.y.abs() < 1e-12);

        // Looking down -Z lands on the seam at u = 0
        let front = bg.direction_to_uv(DVec3::NEG_Z);
        assert!(front.x.abs() < 1e-12);
        assert!((front.y - 0.5).abs() < 1e-12);

        let side = bg.direction_to_uv(DVec3::X);
        assert!((side.x - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_sky() {
        let bg = Background::new(
            Texture::LinearGradient {
                color0: DVec3::ZERO,
                color1: DVec3::ONE,
                axis: GradientAxis::V,
            },
            DMat4::IDENTITY,
        );
        let up = bg.sample(&Ray::new(DVec3::ZERO, DVec3::Y));
        let horizon = bg.sample(&Ray::new(DVec3::ZERO, DVec3::X));
        assert!((up - DVec3::ONE).length() < 1e-12);
        assert!((horizon - DVec3::splat(0.5)).length() < 1e-12);
    }

    #[test]
    fn test_transform_rotates_lookup() {
        let texture = BufferTexture::from_fn(4, 2, |x, _| DVec3::splat(x as f64));
        let plain = Background::new(Texture::Buffer(Arc::new(texture)), DMat4::IDENTITY);
        let rotated = Background::new(plain.texture.clone(), DMat4::from_rotation_y(PI * 0.5));

        let dir = DVec3::NEG_Z;
        let expected = plain.direction_to_uv(DMat4::from_rotation_y(PI * 0.5).transform_vector3(dir));
        assert!((rotated.direction_to_uv(dir) - expected).length() < 1e-12);
    }
}
