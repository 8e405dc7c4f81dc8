use std::f32;

use crate::geometry::Vec3;
use crate::ray::Ray;
use crate::sampling::{sample_unit_sphere, Sampler};

use super::{LocalHit, SurfaceSample};

#[derive(Clone, Debug)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Sphere {
        Sphere { center, radius }
    }

    fn quadratic_roots(&self, ray: &Ray) -> Option<(f32, f32)> {
        let oc = ray.origin - self.center;
        let a = ray.direction.square_magnitude();
        let b = 2.0 * Vec3::dot(oc, ray.direction);
        let c = oc.square_magnitude() - self.radius * self.radius;

        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }

        let sqdisc = disc.sqrt();
        Some(((-b - sqdisc) / (2.0 * a), (-b + sqdisc) / (2.0 * a)))
    }

    /// Roots are tried in ascending order; the first one inside
    /// `(0, ray.tmax)` wins and shrinks `ray.tmax`.
    pub fn intersect(&self, ray: &mut Ray) -> Option<LocalHit> {
        let (t0, t1) = self.quadratic_roots(ray)?;

        let t = if t0 > 0.0 && t0 < ray.tmax {
            t0
        } else if t1 > 0.0 && t1 < ray.tmax {
            t1
        } else {
            return None;
        };

        ray.tmax = t;
        let point = ray.at(t);
        Some(LocalHit {
            t,
            point,
            normal: (point - self.center) / self.radius,
        })
    }

    pub fn intersect_any(&self, ray: &Ray) -> bool {
        match self.quadratic_roots(ray) {
            Some((t0, t1)) => (t0 > 0.0 && t0 < ray.tmax) || (t1 > 0.0 && t1 < ray.tmax),
            None => false,
        }
    }

    pub fn area(&self) -> f32 {
        4.0 * f32::consts::PI * self.radius * self.radius
    }

    /// Uniform point on the surface with the inverse-area density, for use
    /// as an area light.
    pub fn sample_surface(&self, sampler: &mut Sampler) -> SurfaceSample {
        let dir = sample_unit_sphere(sampler.sample_uniform2());
        SurfaceSample {
            point: self.center + dir * self.radius,
            normal: dir,
            pdf_area: 1.0 / self.area(),
        }
    }
}
