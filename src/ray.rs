use crate::geometry::Vec3;

/// A ray with a mutable search interval. `tmax` is both the "no hits beyond
/// here" limit and the write-back channel that narrows the interval as
/// closer hits are found: every intersection routine that takes `&mut Ray`
/// only accepts hits with `t < tmax` and shrinks `tmax` on acceptance.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub tmax: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Ray {
        Ray {
            origin,
            direction,
            tmax: f32::INFINITY,
        }
    }

    pub fn bounded(origin: Vec3, direction: Vec3, tmax: f32) -> Ray {
        Ray {
            origin,
            direction,
            tmax,
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
