use crate::geometry::{Vec2, Vec3};
use crate::ray::Ray;

/// Pinhole camera defined by an eye point, a look-at target, an up hint,
/// a vertical field of view and the image aspect ratio.
#[derive(Clone, Debug)]
pub struct Camera {
    position: Vec3,
    /// Right / up / backward orthonormal basis.
    frame: [Vec3; 3],
    /// Distance to the virtual screen plane for the given field of view.
    depth: f32,
    aspect_ratio: f32,
}

impl Camera {
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3, fovy: f32, aspect_ratio: f32) -> Camera {
        let backward = (eye - target).unit();
        let right = Vec3::cross(up, backward).unit();
        let true_up = Vec3::cross(backward, right);

        Camera {
            position: eye,
            frame: [right, true_up, backward],
            depth: 1.0 / f32::tan(fovy * 0.5),
            aspect_ratio,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// `screen` is in [-1, 1]^2 with +y up; (0, 0) is the image center.
    pub fn get_ray(&self, screen: Vec2) -> Ray {
        let direction = screen.x() * self.aspect_ratio * self.frame[0]
            + screen.y() * self.frame[1]
            - self.depth * self.frame[2];

        Ray::new(self.position, direction.unit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_ray_points_at_target() {
        let camera = Camera::look_at(
            Vec3(-5.0, 0.0, 0.0),
            Vec3::zero(),
            Vec3(0.0, 1.0, 0.0),
            (45.0_f32).to_radians(),
            1.0,
        );

        let ray = camera.get_ray(Vec2(0.0, 0.0));
        assert_eq!(ray.origin, Vec3(-5.0, 0.0, 0.0));
        assert!((ray.direction - Vec3(1.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn vertical_fov_reaches_screen_edge() {
        let fovy = (60.0_f32).to_radians();
        let camera = Camera::look_at(
            Vec3::zero(),
            Vec3(0.0, 0.0, -1.0),
            Vec3(0.0, 1.0, 0.0),
            fovy,
            2.0,
        );

        // at the top edge the ray makes half the vertical fov with the axis
        let top = camera.get_ray(Vec2(0.0, 1.0));
        let axis = camera.get_ray(Vec2(0.0, 0.0));
        let angle = Vec3::dot(top.direction, axis.direction).acos();
        assert!((angle - fovy * 0.5).abs() < 1e-3);
    }
}
