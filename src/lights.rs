use crate::geometry::Vec3;
use crate::materials::Material;
use crate::ray::Ray;
use crate::sampling::Sampler;
use crate::scene::{Scene, Shape};

/// Shadow rays start this far off the surface at both ends.
const SHADOW_EPSILON: f32 = 1e-3;

/// One direct-lighting sample: a direction toward a point on an emitter,
/// the radiance arriving from it, and the solid-angle density with which
/// the point was chosen.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LightSample {
    pub(crate) wi: Vec3,
    pub(crate) radiance: Vec3,
    pub(crate) pdf: f32,
    pub(crate) distance: f32,
}

/// Samples a point on an emissive shape as seen from `point`. The area
/// density of the surface sample is converted to a solid-angle density with
/// the `d^2 / cos` Jacobian. Returns `None` for unusable samples: the
/// back side of the emitter, grazing configurations whose Jacobian blows
/// up, or a degenerate zero-distance pairing.
pub(crate) fn sample_light(
    light: &Shape,
    light_material: &Material,
    point: Vec3,
    sampler: &mut Sampler,
) -> Option<LightSample> {
    const GRAZING_EPSILON: f32 = 1e-6;

    let surface = light.sample_surface(sampler);

    let to_light = surface.point - point;
    let d2 = to_light.square_magnitude();
    if d2 <= 0.0 {
        return None;
    }
    let distance = d2.sqrt();
    let wi = to_light / distance;

    // emitters radiate from their front face only
    let cos_light = Vec3::dot(surface.normal, -wi);
    if cos_light <= GRAZING_EPSILON {
        return None;
    }

    let pdf = surface.pdf_area * d2 / cos_light;
    if pdf <= 0.0 || !pdf.is_finite() {
        return None;
    }

    Some(LightSample {
        wi,
        radiance: light_material.emitted_radiance(surface.point, -wi),
        pdf,
        distance,
    })
}

/// Boolean shadow query from a surface point toward a light sample, with
/// both endpoints pulled in by an epsilon so neither surface shadows
/// itself.
pub(crate) fn occluded(scene: &Scene, point: Vec3, sample: &LightSample) -> bool {
    let tmax = sample.distance - 2.0 * SHADOW_EPSILON;
    if tmax <= 0.0 {
        return false;
    }

    let shadow_ray = Ray::bounded(point + sample.wi * SHADOW_EPSILON, sample.wi, tmax);
    scene.intersect_any(&shadow_ray)
}
