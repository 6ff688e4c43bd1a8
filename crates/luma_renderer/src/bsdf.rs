//! Sampling and scattering helpers shared by the materials.
//!
//! Directions follow the tracer's convention: `wi` points away from the
//! surface, back along the incoming ray.

use std::f64::consts::PI;

use luma_math::{DVec3, Random};

/// Orthonormal tangent pair for a unit normal.
///
/// Branchless construction from Duff et al., "Building an Orthonormal
/// Basis, Revisited" (JCGT 2017).
pub fn tangent_space(n: DVec3) -> (DVec3, DVec3) {
    let s = 1.0_f64.copysign(n.z);
    let a = -1.0 / (s + n.z);
    let b = n.x * n.y * a;
    (
        DVec3::new(1.0 + s * n.x * n.x * a, s * b, -s * n.x),
        DVec3::new(b, s + n.y * n.y * a, -n.y),
    )
}

/// Cosine-weighted direction about `n` and its solid-angle pdf.
pub fn cosine_weighted_hemisphere(n: DVec3, rng: &mut Random) -> (DVec3, f64) {
    let (u, v) = tangent_space(n);
    let r = rng.next_f64_co().sqrt();
    let t = 2.0 * PI * rng.next_f64_co();
    let x = r * t.cos();
    let y = r * t.sin();
    let z = (1.0 - x * x - y * y).max(0.0).sqrt();

    let wo = u * x + v * y + n * z;
    let pdf = n.dot(wo).abs() / PI;
    (wo, pdf)
}

/// Schlick's approximation of dielectric reflectance.
///
/// The cosine is taken on the outside of the interface: `wi` when it
/// arrives from the outside, otherwise the transmitted `wo`.
pub fn fresnel_schlick(wi: DVec3, wo: DVec3, n: DVec3, ior: f64) -> f64 {
    let f0 = ((1.0 - ior) * (1.0 - ior)) / ((1.0 + ior) * (1.0 + ior));
    let idotn = wi.dot(n);
    let cos = if idotn > 0.0 { idotn } else { wo.dot(n) };
    let cos = cos.abs().min(1.0);
    f0 + (1.0 - f0) * (1.0 - cos).powi(5)
}

/// Mirror `wi` about `n`.
#[inline]
pub fn reflect(wi: DVec3, n: DVec3) -> DVec3 {
    2.0 * wi.dot(n) * n - wi
}

/// Refract `wi` through an interface with relative index `ior`.
///
/// `n` may face either side; a positive `wi . n` means entering. Returns
/// the transmitted direction and the radiance scale `eta^2`, or `None` on
/// total internal reflection.
pub fn refract(wi: DVec3, n: DVec3, ior: f64) -> Option<(DVec3, f64)> {
    let idotn = wi.dot(n);
    let (eta, facing_n) = if idotn > 0.0 {
        (1.0 / ior, n)
    } else {
        (ior, -n)
    };

    let cos2t = 1.0 - eta * eta * (1.0 - idotn * idotn);
    if cos2t < 0.0 {
        return None;
    }

    let wt = (eta * idotn.abs() - cos2t.sqrt()) * facing_n - eta * wi;
    Some((wt, eta * eta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tangent_space_orthonormal() {
        let mut rng = Random::new(11);
        for _ in 0..1000 {
            let n = DVec3::new(
                rng.next_f64_signed_cc(),
                rng.next_f64_signed_cc(),
                rng.next_f64_signed_cc(),
            )
            .normalize();
            let (u, v) = tangent_space(n);

            assert!((u.length() - 1.0).abs() < 1e-9);
            assert!((v.length() - 1.0).abs() < 1e-9);
            assert!(u.dot(v).abs() < 1e-9);
            assert!(u.dot(n).abs() < 1e-9);
            assert!(v.dot(n).abs() < 1e-9);
        }

        // Pole handled by the sign switch
        let (u, v) = tangent_space(DVec3::NEG_Z);
        assert!(u.is_finite() && v.is_finite());
    }

    #[test]
    fn test_cosine_hemisphere_stays_above() {
        let mut rng = Random::new(4);
        let n = DVec3::new(0.3, -0.5, 0.8).normalize();
        let mut mean_cos = 0.0;
        let count = 20_000;
        for _ in 0..count {
            let (wo, pdf) = cosine_weighted_hemisphere(n, &mut rng);
            assert!((wo.length() - 1.0).abs() < 1e-9);
            assert!(wo.dot(n) >= 0.0);
            assert!((pdf - wo.dot(n) / PI).abs() < 1e-12);
            mean_cos += wo.dot(n);
        }

        // E[cos] under a cosine-weighted density is 2/3
        mean_cos /= count as f64;
        assert!((mean_cos - 2.0 / 3.0).abs() < 0.01, "mean cos = {}", mean_cos);
    }

    #[test]
    fn test_fresnel_bounds() {
        let mut rng = Random::new(8);
        let n = DVec3::Z;
        for _ in 0..1000 {
            let ior = 1.0 + 2.0 * rng.next_f64_co();
            let wi = DVec3::new(rng.next_f64_signed_cc(), rng.next_f64_signed_cc(), rng.next_f64_signed_cc())
                .normalize();
            if let Some((wt, _)) = refract(wi, n, ior) {
                let fr = fresnel_schlick(wi, wt.normalize(), n, ior);
                assert!((0.0..=1.0).contains(&fr), "Fr = {} for ior {}", fr, ior);
            }
        }

        // Normal incidence gives F0
        let fr = fresnel_schlick(DVec3::Z, DVec3::NEG_Z, n, 1.5);
        assert!((fr - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_reflect() {
        let wi = DVec3::new(1.0, 1.0, 0.0).normalize();
        let wo = reflect(wi, DVec3::Y);
        assert!((wo - DVec3::new(-1.0, 1.0, 0.0).normalize()).length() < 1e-12);
    }

    #[test]
    fn test_refract_snell() {
        let ior = 1.5;
        let wi = DVec3::new(0.5, 0.0, 0.75_f64.sqrt());
        let (wt, eta2) = refract(wi, DVec3::Z, ior).expect("entering never reflects totally");

        // Snell: sin_t = sin_i / ior, continuing through the surface
        assert!((wt.length() - 1.0).abs() < 1e-12);
        assert!((wt.x.abs() - 0.5 / ior).abs() < 1e-12);
        assert!(wt.z < 0.0);
        assert!(wt.x < 0.0);
        assert!((eta2 - 1.0 / (ior * ior)).abs() < 1e-12);
    }

    #[test]
    fn test_total_internal_reflection_threshold() {
        let ior: f64 = 1.5;
        let critical = (1.0 / ior).asin();

        for (angle, expect_tir) in [(critical - 1e-3, false), (critical + 1e-3, true)] {
            // Inside the medium: wi on the -n side
            let wi = DVec3::new(angle.sin(), 0.0, -angle.cos());
            let idotn = wi.dot(DVec3::Z);
            let cos2t = 1.0 - ior * ior * (1.0 - idotn * idotn);

            let result = refract(wi, DVec3::Z, ior);
            assert_eq!(result.is_none(), cos2t < 0.0);
            assert_eq!(result.is_none(), expect_tir, "angle {}", angle);
        }
    }
}
