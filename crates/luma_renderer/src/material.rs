//! Material trait for surface scattering.
//!
//! A material samples the next direction of a path and reports the BSDF
//! value and pdf for it; the integrator multiplies its throughput by
//! `weight * |cos| / pdf`. Each sample carries a [`BsdfTag`] naming the lobe
//! that produced it so that `evaluate` can be asked about the same lobe.

use std::f64::consts::PI;

use luma_core::Texture;
use luma_math::{DVec2, DVec3, Random, Ray};

use crate::bsdf::{cosine_weighted_hemisphere, fresnel_schlick, reflect, refract};
use crate::surface::PathVertex;
use crate::EPS;

/// Color type alias (linear RGB)
pub type Color = DVec3;

/// The scattering lobe a sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsdfTag {
    Lambert,
    PerfectSpecular,
    FresnelSpecular,
    FresnelRefraction,
    MicrofacetSpecular,
}

impl BsdfTag {
    pub fn is_specular(self) -> bool {
        !matches!(self, BsdfTag::Lambert)
    }
}

/// A sampled continuation of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfSample {
    pub ray: Ray,

    /// BSDF value for the sampled direction, albedo included
    pub weight: Color,

    pub pdf: f64,
    pub tag: BsdfTag,
}

/// BSDF value and pdf for a given direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfEval {
    pub f: Color,
    pub pdf: f64,
}

impl BsdfEval {
    const ZERO: BsdfEval = BsdfEval {
        f: DVec3::ZERO,
        pdf: 0.0,
    };
}

/// Trait for materials that describe how light interacts with surfaces.
pub trait Material: Send + Sync {
    /// Radiance emitted toward `vertex.incident`.
    fn emission(&self, vertex: &PathVertex) -> Color;

    fn is_specular(&self, tag: BsdfTag) -> bool {
        tag.is_specular()
    }

    /// Sample the next direction of the path.
    fn sample_next(&self, vertex: &PathVertex, rng: &mut Random) -> BsdfSample;

    /// BSDF and pdf of lobe `tag` for the direction of `outgoing`.
    fn evaluate(&self, tag: BsdfTag, vertex: &PathVertex, outgoing: &Ray) -> BsdfEval;
}

/// Scattering model of a [`SimpleMaterial`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimpleKind {
    Lambert,
    PerfectSpecular,
    /// Smooth dielectric
    FineGlass { ior: f64 },
}

/// Textured albedo and emission over one of the classic lobes.
#[derive(Debug, Clone)]
pub struct SimpleMaterial {
    pub kind: SimpleKind,
    pub color: Texture,
    pub emission: Texture,
}

impl SimpleMaterial {
    pub fn new(color: Color, emission: Color, kind: SimpleKind) -> Self {
        Self {
            kind,
            color: Texture::Constant(color),
            emission: Texture::Constant(emission),
        }
    }

    pub fn lambert(color: Color) -> Self {
        Self::new(color, DVec3::ZERO, SimpleKind::Lambert)
    }

    pub fn mirror(color: Color) -> Self {
        Self::new(color, DVec3::ZERO, SimpleKind::PerfectSpecular)
    }

    pub fn glass(color: Color, ior: f64) -> Self {
        Self::new(color, DVec3::ZERO, SimpleKind::FineGlass { ior })
    }

    pub fn with_emission(mut self, emission: Texture) -> Self {
        self.emission = emission;
        self
    }

    pub fn with_color(mut self, color: Texture) -> Self {
        self.color = color;
        self
    }

    fn ior(&self) -> f64 {
        match self.kind {
            SimpleKind::FineGlass { ior } => ior,
            _ => 1.0,
        }
    }

    fn mirror_sample(vertex: &PathVertex, color: Color, tag: BsdfTag) -> BsdfSample {
        let surf = &vertex.surface;
        let n = surf.shading_normal;
        let dir = reflect(vertex.incident, n);
        BsdfSample {
            ray: Ray::new(surf.position, dir),
            weight: color / n.dot(dir).abs(),
            pdf: 1.0,
            tag,
        }
    }

    fn sample_glass(&self, vertex: &PathVertex, color: Color, rng: &mut Random) -> BsdfSample {
        let surf = &vertex.surface;
        let wi = vertex.incident;
        let n = surf.shading_normal;
        let ior = self.ior();

        let Some((dt, eta2)) = refract(wi, n, ior) else {
            // Total internal reflection
            return Self::mirror_sample(vertex, color, BsdfTag::PerfectSpecular);
        };

        let fr = fresnel_schlick(wi, dt, n, ior);
        if rng.next_f64_co() < fr {
            let dr = reflect(wi, n);
            BsdfSample {
                ray: Ray::new(surf.position, dr),
                weight: color * fr / dr.dot(n).abs(),
                pdf: fr,
                tag: BsdfTag::FresnelSpecular,
            }
        } else {
            BsdfSample {
                ray: Ray::new(surf.position, dt),
                weight: color * (1.0 - fr) * eta2 / dt.dot(n).abs(),
                pdf: 1.0 - fr,
                tag: BsdfTag::FresnelRefraction,
            }
        }
    }
}

impl Material for SimpleMaterial {
    fn emission(&self, vertex: &PathVertex) -> Color {
        self.emission.sample(vertex.surface.uv)
    }

    fn sample_next(&self, vertex: &PathVertex, rng: &mut Random) -> BsdfSample {
        let surf = &vertex.surface;
        let color = self.color.sample(surf.uv);

        match self.kind {
            SimpleKind::Lambert => {
                let n = if vertex.incident.dot(surf.shading_normal) > 0.0 {
                    surf.shading_normal
                } else {
                    -surf.shading_normal
                };
                let (dir, pdf) = cosine_weighted_hemisphere(n, rng);
                BsdfSample {
                    ray: Ray::new(surf.position, dir),
                    weight: color / PI,
                    pdf,
                    tag: BsdfTag::Lambert,
                }
            }
            SimpleKind::PerfectSpecular => {
                Self::mirror_sample(vertex, color, BsdfTag::PerfectSpecular)
            }
            SimpleKind::FineGlass { .. } => self.sample_glass(vertex, color, rng),
        }
    }

    fn evaluate(&self, tag: BsdfTag, vertex: &PathVertex, outgoing: &Ray) -> BsdfEval {
        let surf = &vertex.surface;
        let color = self.color.sample(surf.uv);
        let wi = vertex.incident;
        let wo = outgoing.direction;
        let n = surf.shading_normal;
        let idotn = wi.dot(n);
        let odotn = wo.dot(n);

        let specular = || {
            if (idotn - odotn).abs() <= EPS {
                BsdfEval {
                    f: color / odotn.abs(),
                    pdf: 1.0,
                }
            } else {
                BsdfEval::ZERO
            }
        };

        match tag {
            BsdfTag::Lambert => {
                if idotn * odotn > 0.0 {
                    BsdfEval {
                        f: color / PI,
                        pdf: odotn.abs() / PI,
                    }
                } else {
                    BsdfEval::ZERO
                }
            }
            BsdfTag::PerfectSpecular => specular(),
            BsdfTag::FresnelSpecular => {
                let ior = self.ior();
                let Some((dt, _)) = refract(wi, n, ior) else {
                    return specular();
                };
                let fr = fresnel_schlick(wi, dt, n, ior);
                let eval = specular();
                BsdfEval {
                    f: eval.f * fr,
                    pdf: eval.pdf * fr,
                }
            }
            BsdfTag::FresnelRefraction => {
                let ior = self.ior();
                let eta = if idotn > 0.0 { 1.0 / ior } else { ior };
                let snell = (1.0 - odotn * odotn) / (1.0 - idotn * idotn);
                if (snell - eta * eta).abs() < EPS && idotn * odotn < 0.0 {
                    let fr = fresnel_schlick(wi, wo, n, ior);
                    BsdfEval {
                        f: color * eta * eta * (1.0 - fr) / odotn.abs(),
                        pdf: 1.0 - fr,
                    }
                } else {
                    BsdfEval::ZERO
                }
            }
            BsdfTag::MicrofacetSpecular => BsdfEval::ZERO,
        }
    }
}

/// glTF metallic-roughness BRDF: a GGX specular lobe over a Lambert lobe.
///
/// Both lobes are sampled from the cosine distribution; the lobe is chosen
/// with probability equal to the largest channel of the Fresnel term.
///
/// Follows glTF 2.0, Appendix B.
#[derive(Debug, Clone)]
pub struct MetallicRoughnessMaterial {
    pub base_color: Texture,
    pub emission: Texture,
    pub metallic_factor: f64,
    pub roughness_factor: f64,

    /// Metalness in blue, roughness in green
    pub metallic_roughness: Texture,

    /// Occlusion in red
    pub occlusion: Texture,
    pub occlusion_strength: f64,
}

impl Default for MetallicRoughnessMaterial {
    fn default() -> Self {
        Self {
            base_color: Texture::Constant(DVec3::ONE),
            emission: Texture::Constant(DVec3::ZERO),
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness: Texture::Constant(DVec3::ONE),
            occlusion: Texture::Constant(DVec3::ONE),
            occlusion_strength: 1.0,
        }
    }
}

const DIELECTRIC_SPECULAR: f64 = 0.04;

/// Both lobes evaluated for one pair of directions.
struct Lobes {
    diffuse: Color,
    specular: Color,
    /// Probability of picking the specular lobe
    specular_chance: f64,
}

impl MetallicRoughnessMaterial {
    pub fn new(base_color: Color, metallic: f64, roughness: f64) -> Self {
        Self {
            base_color: Texture::Constant(base_color),
            metallic_factor: metallic,
            roughness_factor: roughness,
            ..Default::default()
        }
    }

    /// Normals flipped toward `wi`, shading first.
    fn facing_normals(vertex: &PathVertex) -> (DVec3, DVec3) {
        let surf = &vertex.surface;
        let wi = vertex.incident;
        let flip = |n: DVec3| if wi.dot(n) > 0.0 { n } else { -n };
        (flip(surf.shading_normal), flip(surf.geometry_normal))
    }

    fn lobes(&self, uv: DVec2, wi: DVec3, wo: DVec3, ns: DVec3) -> Lobes {
        let color = self.base_color.sample(uv);
        let mr = self.metallic_roughness.sample(uv);
        let metalness = mr.z * self.metallic_factor;
        let roughness = mr.y * self.roughness_factor;
        let occlusion = 1.0 + self.occlusion_strength * (self.occlusion.sample_component(uv, 0) - 1.0);

        let c_diff = (color * (1.0 - DIELECTRIC_SPECULAR)).lerp(DVec3::ZERO, metalness);
        let f0 = DVec3::splat(DIELECTRIC_SPECULAR).lerp(color, metalness);
        let alpha = roughness * roughness;

        let wh = (wi + wo).normalize();
        let fresnel = f0 + (DVec3::ONE - f0) * (1.0 - wi.dot(wh)).powi(5);

        // Schlick-GGX geometry term, k = roughness * sqrt(2 / pi)
        let k = roughness * 0.797_884_560_802_865_4;
        let g1 = |ndotv: f64| ndotv / (ndotv * (1.0 - k) + k);

        let ndoth = ns.dot(wh);
        let a2 = alpha * alpha;
        let x = ndoth * ndoth * (a2 - 1.0) + 1.0;
        let d = a2 / (PI * x * x);

        let idotn = wi.dot(ns);
        let odotn = wo.dot(ns);
        let specular = fresnel * g1(odotn) * g1(idotn) * d / (4.0 * odotn * idotn) * occlusion;
        let diffuse = c_diff / PI * (DVec3::ONE - fresnel) * occlusion;

        Lobes {
            diffuse,
            specular,
            specular_chance: fresnel.max_element(),
        }
    }
}

impl Material for MetallicRoughnessMaterial {
    fn emission(&self, vertex: &PathVertex) -> Color {
        self.emission.sample(vertex.surface.uv)
    }

    fn sample_next(&self, vertex: &PathVertex, rng: &mut Random) -> BsdfSample {
        let surf = &vertex.surface;
        let wi = vertex.incident;
        let (ns, ng) = Self::facing_normals(vertex);

        let (wo, pdf) = cosine_weighted_hemisphere(ns, rng);
        let ray = Ray::new(surf.position, wo);

        // Sampled below the actual surface
        if wo.dot(ng) <= 0.0 {
            return BsdfSample {
                ray,
                weight: DVec3::ZERO,
                pdf: 1.0,
                tag: BsdfTag::Lambert,
            };
        }

        let lobes = self.lobes(surf.uv, wi, wo, ns);
        if rng.next_f64_co() < lobes.specular_chance {
            BsdfSample {
                ray,
                weight: lobes.specular,
                pdf: pdf * lobes.specular_chance,
                tag: BsdfTag::MicrofacetSpecular,
            }
        } else {
            BsdfSample {
                ray,
                weight: lobes.diffuse,
                pdf: pdf * (1.0 - lobes.specular_chance),
                tag: BsdfTag::Lambert,
            }
        }
    }

    fn evaluate(&self, tag: BsdfTag, vertex: &PathVertex, outgoing: &Ray) -> BsdfEval {
        let wi = vertex.incident;
        let wo = outgoing.direction;
        let (ns, ng) = Self::facing_normals(vertex);
        if wo.dot(ng) <= 0.0 || wo.dot(ns) <= 0.0 {
            return BsdfEval::ZERO;
        }

        let pdf = wo.dot(ns) / PI;
        let lobes = self.lobes(vertex.surface.uv, wi, wo, ns);
        match tag {
            BsdfTag::MicrofacetSpecular => BsdfEval {
                f: lobes.specular,
                pdf: pdf * lobes.specular_chance,
            },
            BsdfTag::Lambert => BsdfEval {
                f: lobes.diffuse,
                pdf: pdf * (1.0 - lobes.specular_chance),
            },
            _ => BsdfEval::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Hit, SurfaceSpec};

    fn vertex(incident: DVec3, normal: DVec3) -> PathVertex {
        PathVertex {
            incident: incident.normalize(),
            hit: Hit {
                distance: 1.0,
                object_index: 0,
                primitive_index: 0,
            },
            surface: SurfaceSpec {
                position: DVec3::ZERO,
                geometry_normal: normal,
                shading_normal: normal,
                ..Default::default()
            },
        }
    }

    fn throughput(sample: &BsdfSample, n: DVec3) -> Color {
        sample.weight * n.dot(sample.ray.direction).abs() / sample.pdf
    }

    #[test]
    fn test_lambert_sample() {
        let mat = SimpleMaterial::lambert(DVec3::new(0.8, 0.5, 0.2));
        let mut rng = Random::new(1);

        // Hit from below: samples go to the incident side
        let v = vertex(DVec3::new(0.2, -1.0, 0.0), DVec3::Y);
        for _ in 0..100 {
            let s = mat.sample_next(&v, &mut rng);
            assert_eq!(s.tag, BsdfTag::Lambert);
            assert!(s.ray.direction.y <= 0.0);
            assert!((throughput(&s, DVec3::Y) - DVec3::new(0.8, 0.5, 0.2)).length() < 1e-9);

            let eval = mat.evaluate(s.tag, &v, &s.ray);
            assert!((eval.f - s.weight).length() < 1e-12);
            assert!((eval.pdf - s.pdf).abs() < 1e-12);
        }

        // Opposite side evaluates to zero
        let above = Ray::new(DVec3::ZERO, DVec3::Y);
        assert_eq!(mat.evaluate(BsdfTag::Lambert, &v, &above).f, DVec3::ZERO);
        assert!(!mat.is_specular(BsdfTag::Lambert));
    }

    #[test]
    fn test_mirror_sample_and_evaluate() {
        let mat = SimpleMaterial::mirror(DVec3::ONE);
        let mut rng = Random::new(2);
        let v = vertex(DVec3::new(1.0, 1.0, 0.0), DVec3::Y);

        let s = mat.sample_next(&v, &mut rng);
        assert_eq!(s.tag, BsdfTag::PerfectSpecular);
        assert!((s.ray.direction - DVec3::new(-1.0, 1.0, 0.0).normalize()).length() < 1e-12);
        assert!((throughput(&s, DVec3::Y) - DVec3::ONE).length() < 1e-12);
        assert!(mat.is_specular(s.tag));

        let eval = mat.evaluate(s.tag, &v, &s.ray);
        assert!((eval.f - s.weight).length() < 1e-12);

        let off = Ray::new(DVec3::ZERO, DVec3::Y);
        assert_eq!(mat.evaluate(BsdfTag::PerfectSpecular, &v, &off).f, DVec3::ZERO);
    }

    #[test]
    fn test_glass_branches_conserve_throughput() {
        let ior = 1.5;
        let mat = SimpleMaterial::glass(DVec3::ONE, ior);
        let mut rng = Random::new(3);
        let v = vertex(DVec3::new(0.3, 1.0, 0.0), DVec3::Y);

        let mut seen_reflect = false;
        let mut seen_refract = false;
        for _ in 0..200 {
            let s = mat.sample_next(&v, &mut rng);
            let t = throughput(&s, DVec3::Y);
            match s.tag {
                BsdfTag::FresnelSpecular => {
                    seen_reflect = true;
                    assert!(s.ray.direction.y > 0.0);
                    assert!((t - DVec3::ONE).length() < 1e-9);
                }
                BsdfTag::FresnelRefraction => {
                    seen_refract = true;
                    assert!(s.ray.direction.y < 0.0);
                    // Radiance is compressed by eta^2 entering the denser medium
                    assert!((t - DVec3::splat(1.0 / (ior * ior))).length() < 1e-9);
                }
                other => panic!("unexpected lobe {:?}", other),
            }

            let eval = mat.evaluate(s.tag, &v, &s.ray);
            assert!((eval.f - s.weight).length() < 1e-6, "{:?}: {:?} vs {:?}", s.tag, eval.f, s.weight);
            assert!((eval.pdf - s.pdf).abs() < 1e-9);
        }
        assert!(seen_reflect && seen_refract);
    }

    #[test]
    fn test_glass_total_internal_reflection() {
        let mat = SimpleMaterial::glass(DVec3::ONE, 1.5);
        let mut rng = Random::new(4);

        // Grazing from inside the medium
        let v = vertex(DVec3::new(1.0, -0.2, 0.0), DVec3::Y);
        let s = mat.sample_next(&v, &mut rng);
        assert_eq!(s.tag, BsdfTag::PerfectSpecular);
        assert_eq!(s.pdf, 1.0);
        assert!(s.ray.direction.y < 0.0);
        assert!((throughput(&s, DVec3::Y) - DVec3::ONE).length() < 1e-9);
    }

    #[test]
    fn test_emission_uses_texture() {
        let mat = SimpleMaterial::lambert(DVec3::ZERO).with_emission(Texture::Constant(DVec3::splat(12.0)));
        let v = vertex(DVec3::Y, DVec3::Y);
        assert_eq!(mat.emission(&v), DVec3::splat(12.0));
    }

    #[test]
    fn test_metallic_roughness_invalid_reflection() {
        let mat = MetallicRoughnessMaterial::new(DVec3::ONE, 0.0, 0.5);
        let mut rng = Random::new(5);

        // Shading normal tilted far from the geometric one
        let mut v = vertex(DVec3::new(0.0, 1.0, 0.0), DVec3::Y);
        v.surface.shading_normal = DVec3::new(1.0, 0.05, 0.0).normalize();

        let mut saw_invalid = false;
        for _ in 0..200 {
            let s = mat.sample_next(&v, &mut rng);
            if s.ray.direction.dot(DVec3::Y) <= 0.0 {
                saw_invalid = true;
                assert_eq!(s.weight, DVec3::ZERO);
                assert_eq!(s.pdf, 1.0);
            }
        }
        assert!(saw_invalid);
    }

    #[test]
    fn test_metallic_roughness_energy() {
        let mut rng = Random::new(6);
        let v = vertex(DVec3::new(0.3, 1.0, 0.1), DVec3::Y);

        for (metallic, roughness) in [(0.0, 1.0), (1.0, 0.5), (0.5, 0.3)] {
            let mat = MetallicRoughnessMaterial::new(DVec3::splat(0.9), metallic, roughness);
            let count = 20_000;
            let mut mean = DVec3::ZERO;
            for _ in 0..count {
                let s = mat.sample_next(&v, &mut rng);
                assert!(s.weight.min_element() >= 0.0);
                mean += throughput(&s, DVec3::Y);

                let eval = mat.evaluate(s.tag, &v, &s.ray);
                if s.weight != DVec3::ZERO {
                    assert!((eval.f - s.weight).length() < 1e-9);
                    assert!((eval.pdf - s.pdf).abs() < 1e-9);
                }
            }
            mean /= count as f64;
            // Reflects something, never creates energy beyond noise
            assert!(mean.max_element() < 1.05, "m={} r={}: {:?}", metallic, roughness, mean);
            assert!(mean.min_element() > 0.05, "m={} r={}: {:?}", metallic, roughness, mean);
        }
    }
}
