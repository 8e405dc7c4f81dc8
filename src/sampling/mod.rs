use std::f32;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::geometry::{Vec2, Vec3};

/// Random source for one worker thread. Every worker derives its own stream
/// from the master seed, so renders are reproducible for a fixed
/// (seed, thread count) pair and workers never contend on shared state.
/// Passed by `&mut` through the whole sampling call chain.
pub struct Sampler {
    rng: ChaCha8Rng,
}

impl Sampler {
    pub fn new(seed: u64, stream: u64) -> Sampler {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Sampler { rng }
    }

    pub fn sample_uniform(&mut self) -> f32 {
        self.rng.gen_range(0.0..1.0)
    }

    pub fn sample_uniform2(&mut self) -> Vec2 {
        Vec2(self.sample_uniform(), self.sample_uniform())
    }
}

/// Concentric mapping of the unit square onto the unit disc; preserves
/// stratification better than the polar sqrt mapping.
pub fn sample_unit_disk(u: Vec2) -> Vec2 {
    let ox = 2.0 * u.0 - 1.0;
    let oy = 2.0 * u.1 - 1.0;

    if ox == 0.0 && oy == 0.0 {
        return Vec2(0.0, 0.0);
    }

    let (r, theta) = if ox.abs() > oy.abs() {
        (ox, f32::consts::FRAC_PI_4 * (oy / ox))
    } else {
        (oy, f32::consts::FRAC_PI_2 - f32::consts::FRAC_PI_4 * (ox / oy))
    };

    Vec2(r * theta.cos(), r * theta.sin())
}

/// Cosine-weighted hemisphere direction (local frame, +z up) with its
/// density `cos(theta) / pi`.
pub fn sample_cosine_hemisphere(u: Vec2) -> (Vec3, f32) {
    let d = sample_unit_disk(u);
    let z = f32::sqrt(f32::max(0.0, 1.0 - d.square_magnitude()));
    (Vec3(d.0, d.1, z), z / f32::consts::PI)
}

/// Uniform direction over the full sphere.
pub fn sample_unit_sphere(u: Vec2) -> Vec3 {
    let phi = 2.0 * f32::consts::PI * u.0;
    let cos_theta = 1.0 - 2.0 * u.1;
    let sin_theta = f32::sqrt(f32::max(0.0, 1.0 - cos_theta * cos_theta));

    Vec3(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}
