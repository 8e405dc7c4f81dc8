use std::f32;

use crate::geometry::{Frame, Vec3};
use crate::sampling::{sample_cosine_hemisphere, Sampler};

/// Classification of a point along a light path. Doubles as the literal
/// alphabet of light-path expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Eye,
    Diffuse,
    Specular,
    Light,
}

/// An importance-sampled incoming direction and its solid-angle density.
/// A density of exactly zero is never returned; impossible samples are
/// reported as `None` so no caller ever divides by it.
#[derive(Clone, Copy, Debug)]
pub struct BrdfSample {
    pub wi: Vec3,
    pub pdf: f32,
}

/// One reflectance lobe. Directions are world-space; lobes that need a
/// local frame (sampling, the half-vector terms) go through the shading
/// `Frame` of the hit.
#[derive(Clone, Debug)]
pub enum Brdf {
    Lambert {
        albedo: Vec3,
    },
    /// Trowbridge-Reitz (GGX) normal distribution, Smith-Schlick masking,
    /// Schlick Fresnel from the base reflectance `f0`.
    Microfacet {
        alpha2: f32,
        k: f32,
        f0: f32,
    },
    /// Constant-radiance diffuse emitter; terminates transport and is never
    /// importance-sampled as a bounce.
    Emission {
        irradiance: Vec3,
    },
}

impl Brdf {
    pub fn lambert(albedo: Vec3) -> Brdf {
        Brdf::Lambert { albedo }
    }

    pub fn microfacet(roughness: f32, ior: f32) -> Brdf {
        let alpha = roughness * roughness;
        let k = (roughness + 1.0) * (roughness + 1.0) / 8.0;
        let f0 = (ior - 1.0) / (ior + 1.0);

        Brdf::Microfacet {
            alpha2: alpha * alpha,
            k,
            f0: f0 * f0,
        }
    }

    pub fn emission(irradiance: Vec3) -> Brdf {
        Brdf::Emission { irradiance }
    }

    pub fn event(&self) -> TransportEvent {
        match self {
            Brdf::Lambert { .. } => TransportEvent::Diffuse,
            Brdf::Microfacet { .. } => TransportEvent::Specular,
            Brdf::Emission { .. } => TransportEvent::Light,
        }
    }

    /// BRDF value for the direction pair.
    pub fn f(&self, frame: &Frame, wi: Vec3, wo: Vec3) -> Vec3 {
        match self {
            Brdf::Lambert { albedo } => *albedo / f32::consts::PI,

            Brdf::Microfacet { alpha2, k, f0 } => {
                let (alpha2, k, f0) = (*alpha2, *k, *f0);
                let n = frame.normal;
                let n_dot_wi = Vec3::dot(n, wi);
                let n_dot_wo = Vec3::dot(n, wo);
                if n_dot_wi <= 0.0 || n_dot_wo <= 0.0 {
                    return Vec3::zero();
                }

                let h = wi + wo;
                if h.near_zero() {
                    return Vec3::zero();
                }
                let h = h.unit();

                let n_dot_h = Vec3::dot(n, h);
                let tmp = n_dot_h * n_dot_h * (alpha2 - 1.0) + 1.0;
                let d = alpha2 / (f32::consts::PI * tmp * tmp);

                let g1 = |cos: f32| cos / (cos * (1.0 - k) + k);
                let g = g1(n_dot_wo) * g1(n_dot_wi);
                if g == 0.0 {
                    return Vec3::zero();
                }

                let wo_dot_h = Vec3::dot(wo, h);
                // Schlick approximation with the spherical-gaussian exponent
                let fresnel_exponent = (-5.55473 * wo_dot_h - 6.98316) * wo_dot_h;
                let fresnel = f0 + (1.0 - f0) * f32::powf(2.0, fresnel_exponent);

                Vec3::splat(d * fresnel * g / (4.0 * n_dot_wi * n_dot_wo))
            }

            Brdf::Emission { .. } => Vec3::zero(),
        }
    }

    /// Emitted radiance leaving the surface. The emitter is diffuse, so the
    /// outgoing direction does not matter.
    pub fn emit(&self, _point: Vec3, _wo: Vec3) -> Vec3 {
        match self {
            Brdf::Emission { irradiance } => *irradiance / (2.0 * f32::consts::PI),
            _ => Vec3::zero(),
        }
    }

    /// Importance-samples an incoming direction. `None` means "no usable
    /// sample" (emission lobe, viewer below the surface, sampled direction
    /// under the horizon, vanishing density) and the caller simply omits
    /// that bounce.
    pub fn sample_wi(&self, frame: &Frame, wo: Vec3, sampler: &mut Sampler) -> Option<BrdfSample> {
        match self {
            Brdf::Lambert { .. } => {
                let (local_wi, pdf) = sample_cosine_hemisphere(sampler.sample_uniform2());
                if pdf <= 0.0 {
                    return None;
                }
                Some(BrdfSample {
                    wi: frame.to_world(local_wi),
                    pdf,
                })
            }

            Brdf::Microfacet { alpha2, .. } => {
                let alpha2 = *alpha2;
                let local_wo = frame.to_local(wo);
                if local_wo.z() <= 0.0 {
                    return None;
                }

                // sample the half vector from the distribution term
                let u = sampler.sample_uniform2();
                let cos_theta = f32::sqrt((1.0 - u.0) / ((alpha2 - 1.0) * u.0 + 1.0));
                let sin_theta = f32::sqrt(f32::max(0.0, 1.0 - cos_theta * cos_theta));
                let phi = 2.0 * f32::consts::PI * u.1;

                let wm = Vec3(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
                let local_wi = Vec3::reflect(local_wo, wm);
                if local_wi.z() <= 0.0 {
                    return None; // reflected under the horizon
                }

                let wo_dot_wm = Vec3::dot(local_wo, wm);
                if wo_dot_wm <= 0.0 {
                    return None;
                }

                let tmp = cos_theta * cos_theta * (alpha2 - 1.0) + 1.0;
                let d = alpha2 / (f32::consts::PI * tmp * tmp);
                let pdf = d * cos_theta / (4.0 * wo_dot_wm);
                if pdf <= 0.0 || !pdf.is_finite() {
                    return None;
                }

                Some(BrdfSample {
                    wi: frame.to_world(local_wi),
                    pdf,
                })
            }

            Brdf::Emission { .. } => None,
        }
    }
}

/// A material is an ordered collection of lobes, each contributing
/// independently to direct lighting and to bounce sampling.
#[derive(Debug)]
pub struct Material {
    lobes: Vec<Brdf>,
}

impl Material {
    pub fn new(lobes: Vec<Brdf>) -> Material {
        Material { lobes }
    }

    pub fn matte(albedo: Vec3) -> Material {
        Material {
            lobes: vec![Brdf::lambert(albedo)],
        }
    }

    /// Diffuse base with a microfacet coat.
    pub fn glossy(albedo: Vec3, roughness: f32, ior: f32) -> Material {
        Material {
            lobes: vec![Brdf::lambert(albedo), Brdf::microfacet(roughness, ior)],
        }
    }

    pub fn emissive(irradiance: Vec3) -> Material {
        Material {
            lobes: vec![Brdf::emission(irradiance)],
        }
    }

    pub fn lobes(&self) -> &[Brdf] {
        &self.lobes
    }

    pub fn is_emissive(&self) -> bool {
        self.lobes
            .iter()
            .any(|lobe| matches!(lobe, Brdf::Emission { .. }))
    }

    /// Total emitted radiance of the emission lobes.
    pub fn emitted_radiance(&self, point: Vec3, wo: Vec3) -> Vec3 {
        let mut out = Vec3::zero();
        for lobe in &self.lobes {
            out += lobe.emit(point, wo);
        }
        out
    }
}
