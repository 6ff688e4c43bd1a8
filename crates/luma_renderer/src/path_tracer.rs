//! Unidirectional path tracing.
//!
//! Light sources are found only when a path happens to hit them: emission
//! is added at every vertex and there is no explicit light sampling.
//! Paths end on a miss or through Russian roulette.

use luma_math::{DVec3, Random, Ray};

use crate::material::Color;
use crate::scene::Scene;
use crate::{FAR_AWAY, RAY_OFFSET};

/// Integrator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathTracer {
    /// Bounces before Russian roulette may end a path
    pub min_depth: usize,

    /// Lower bound of the termination probability
    pub min_rr_cutoff: f64,

    /// Hard bounce limit; `None` leaves path length to the roulette
    pub max_depth: Option<usize>,

    pub russian_roulette: bool,
}

impl Default for PathTracer {
    fn default() -> Self {
        Self {
            min_depth: 2,
            min_rr_cutoff: 5e-3,
            max_depth: None,
            russian_roulette: true,
        }
    }
}

impl PathTracer {
    pub fn new(min_depth: usize, min_rr_cutoff: f64) -> Self {
        Self {
            min_depth,
            min_rr_cutoff,
            ..Default::default()
        }
    }

    /// Cut every path after `max_depth` bounces.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Turn the roulette off. Needs a max depth to terminate.
    pub fn without_russian_roulette(mut self) -> Self {
        self.russian_roulette = false;
        self
    }

    /// Radiance through normalized screen coordinates, and the path depth.
    pub fn trace(&self, nx: f64, ny: f64, scene: &Scene, rng: &mut Random) -> (Color, usize) {
        let ray = scene.camera.ray(nx, ny, rng);
        self.trace_ray(ray, scene, rng)
    }

    /// Radiance arriving along `ray`, and the path depth.
    pub fn trace_ray(&self, mut ray: Ray, scene: &Scene, rng: &mut Random) -> (Color, usize) {
        debug_assert!(
            self.russian_roulette || self.max_depth.is_some(),
            "paths need a way to terminate"
        );

        let mut radiance = DVec3::ZERO;
        let mut throughput = DVec3::ONE;
        let mut depth = 0;

        loop {
            let Some(vertex) = scene.raytrace(&ray, RAY_OFFSET, FAR_AWAY) else {
                radiance += throughput * scene.background.sample(&ray);
                break;
            };

            let material = scene.material(&vertex);
            radiance += throughput * material.emission(&vertex);

            let sample = material.sample_next(&vertex, rng);
            let cos = vertex.surface.shading_normal.dot(sample.ray.direction).abs();
            throughput *= sample.weight * cos / sample.pdf;

            if self.russian_roulette && depth > self.min_depth {
                let mean = (throughput.x + throughput.y + throughput.z) / 3.0;
                let q = self.min_rr_cutoff.max(1.0 - mean);
                if rng.next_f64_co() < q {
                    break;
                }
                throughput /= 1.0 - q;
            }

            depth += 1;
            if self.max_depth.is_some_and(|max| depth >= max) {
                break;
            }
            ray = sample.ray;
        }

        (radiance, depth)
    }
}
