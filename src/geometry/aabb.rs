use super::Vec3;
use crate::ray::Ray;

/// Axis-aligned bounding box. Starts inverted-empty so that the first
/// `include_point` establishes both corners.
#[derive(Clone, Copy, Debug)]
pub struct Aabb {
    pub minimum: Vec3,
    pub maximum: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::empty()
    }
}

impl Aabb {
    pub fn empty() -> Aabb {
        Aabb {
            minimum: Vec3::splat(f32::INFINITY),
            maximum: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn new(minimum: Vec3, maximum: Vec3) -> Aabb {
        Aabb { minimum, maximum }
    }

    pub fn include_point(&mut self, p: Vec3) {
        self.minimum = Vec3::elementwise_min(self.minimum, p);
        self.maximum = Vec3::elementwise_max(self.maximum, p);
    }

    /// Returns a box which surrounds both a and b.
    pub fn surrounding_box(a: Aabb, b: Aabb) -> Aabb {
        Aabb {
            minimum: Vec3::elementwise_min(a.minimum, b.minimum),
            maximum: Vec3::elementwise_max(a.maximum, b.maximum),
        }
    }

    /// Pushes both corners outward; zero-thickness slabs otherwise produce
    /// false misses at grazing angles.
    pub fn widen(&mut self, w: f32) {
        self.minimum = self.minimum - Vec3::splat(w);
        self.maximum = self.maximum + Vec3::splat(w);
    }

    pub fn centroid(&self) -> Vec3 {
        (self.minimum + self.maximum) * 0.5
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.minimum.x() <= other.minimum.x()
            && self.minimum.y() <= other.minimum.y()
            && self.minimum.z() <= other.minimum.z()
            && self.maximum.x() >= other.maximum.x()
            && self.maximum.y() >= other.maximum.y()
            && self.maximum.z() >= other.maximum.z()
    }

    /// Slab test over the three axis pairs, restricted to `(0, ray.tmax)`.
    /// Axis-aligned ray directions produce ±inf slab distances and fall out
    /// of the comparisons without a special case. Boolean only; the caller
    /// never learns the entry distance.
    pub fn ray_intersect(&self, ray: &Ray) -> bool {
        let mut tmin = 0.0_f32;
        let mut tmax = ray.tmax;

        for axis in 0..3 {
            let inv_d = 1.0 / ray.direction.axis(axis);
            let mut t0 = (self.minimum.axis(axis) - ray.origin.axis(axis)) * inv_d;
            let mut t1 = (self.maximum.axis(axis) - ray.origin.axis(axis)) * inv_d;
            if inv_d < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }

            tmin = if t0 > tmin { t0 } else { tmin };
            tmax = if t1 < tmax { t1 } else { tmax };

            if tmax <= tmin {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3(-1.0, -1.0, -1.0), Vec3(1.0, 1.0, 1.0))
    }

    #[test]
    fn ray_through_box_hits() {
        let b = unit_box();
        let ray = Ray::new(Vec3(-5.0, 0.0, 0.0), Vec3(1.0, 0.0, 0.0));
        assert!(b.ray_intersect(&ray));
    }

    #[test]
    fn ray_past_box_misses() {
        let b = unit_box();
        let ray = Ray::new(Vec3(-5.0, 3.0, 0.0), Vec3(1.0, 0.0, 0.0));
        assert!(!b.ray_intersect(&ray));
    }

    #[test]
    fn axis_aligned_ray_inside_slab_hits() {
        // direction has exact zeros in two axes; the slab test must still
        // accept via infinities rather than dividing into NaN
        let b = unit_box();
        let ray = Ray::new(Vec3(0.5, 0.5, -4.0), Vec3(0.0, 0.0, 1.0));
        assert!(b.ray_intersect(&ray));
    }

    #[test]
    fn box_behind_ray_misses() {
        let b = unit_box();
        let ray = Ray::new(Vec3(5.0, 0.0, 0.0), Vec3(1.0, 0.0, 0.0));
        assert!(!b.ray_intersect(&ray));
    }

    #[test]
    fn tmax_limits_reach() {
        let b = unit_box();
        let mut ray = Ray::new(Vec3(-5.0, 0.0, 0.0), Vec3(1.0, 0.0, 0.0));
        ray.tmax = 2.0; // box entry is at t = 4
        assert!(!b.ray_intersect(&ray));
    }

    #[test]
    fn include_point_grows_from_empty() {
        let mut b = Aabb::empty();
        b.include_point(Vec3(1.0, -2.0, 3.0));
        b.include_point(Vec3(-1.0, 2.0, 0.0));
        assert_eq!(b.minimum, Vec3(-1.0, -2.0, 0.0));
        assert_eq!(b.maximum, Vec3(1.0, 2.0, 3.0));
    }
}
