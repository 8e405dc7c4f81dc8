use super::Vec3;

/// Row-major 4x4 matrix. Only affine transforms are ever constructed, so
/// point application skips the homogeneous divide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix4x4 {
    pub data: [[f32; 4]; 4],
}

impl Matrix4x4 {
    #[rustfmt::skip]
    pub fn create(
        m00: f32, m01: f32, m02: f32, m03: f32,
        m10: f32, m11: f32, m12: f32, m13: f32,
        m20: f32, m21: f32, m22: f32, m23: f32,
        m30: f32, m31: f32, m32: f32, m33: f32,
    ) -> Matrix4x4 {
        Matrix4x4 {
            data: [
                [m00, m01, m02, m03],
                [m10, m11, m12, m13],
                [m20, m21, m22, m23],
                [m30, m31, m32, m33],
            ],
        }
    }

    pub fn identity() -> Matrix4x4 {
        Matrix4x4::create(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn matmul(a: Matrix4x4, b: Matrix4x4) -> Matrix4x4 {
        let mut out = [[0.0_f32; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                for k in 0..4 {
                    *cell += a.data[i][k] * b.data[k][j];
                }
            }
        }
        Matrix4x4 { data: out }
    }

    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        let m = &self.data;
        Vec3(
            m[0][0] * p.0 + m[0][1] * p.1 + m[0][2] * p.2 + m[0][3],
            m[1][0] * p.0 + m[1][1] * p.1 + m[1][2] * p.2 + m[1][3],
            m[2][0] * p.0 + m[2][1] * p.1 + m[2][2] * p.2 + m[2][3],
        )
    }

    pub fn apply_vector(&self, v: Vec3) -> Vec3 {
        let m = &self.data;
        Vec3(
            m[0][0] * v.0 + m[0][1] * v.1 + m[0][2] * v.2,
            m[1][0] * v.0 + m[1][1] * v.1 + m[1][2] * v.2,
            m[2][0] * v.0 + m[2][1] * v.1 + m[2][2] * v.2,
        )
    }

    /// Applies the transpose of the upper-left 3x3 block.
    pub fn apply_vector_transposed(&self, v: Vec3) -> Vec3 {
        let m = &self.data;
        Vec3(
            m[0][0] * v.0 + m[1][0] * v.1 + m[2][0] * v.2,
            m[0][1] * v.0 + m[1][1] * v.1 + m[2][1] * v.2,
            m[0][2] * v.0 + m[1][2] * v.1 + m[2][2] * v.2,
        )
    }
}

/// An invertible affine transform, stored as a forward/inverse matrix pair.
/// All constructors know both directions analytically, so inversion is a
/// swap and composition never requires a general matrix inverse.
#[derive(Clone, Debug)]
pub struct Transform {
    forward: Matrix4x4,
    inverse: Matrix4x4,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

impl Transform {
    pub fn identity() -> Transform {
        Transform {
            forward: Matrix4x4::identity(),
            inverse: Matrix4x4::identity(),
        }
    }

    pub fn translate(offset: Vec3) -> Transform {
        Transform {
            forward: Matrix4x4::create(
                1.0, 0.0, 0.0, offset.0,
                0.0, 1.0, 0.0, offset.1,
                0.0, 0.0, 1.0, offset.2,
                0.0, 0.0, 0.0, 1.0,
            ),
            inverse: Matrix4x4::create(
                1.0, 0.0, 0.0, -offset.0,
                0.0, 1.0, 0.0, -offset.1,
                0.0, 0.0, 1.0, -offset.2,
                0.0, 0.0, 0.0, 1.0,
            ),
        }
    }

    pub fn scale(scale: Vec3) -> Transform {
        Transform {
            forward: Matrix4x4::create(
                scale.0, 0.0, 0.0, 0.0,
                0.0, scale.1, 0.0, 0.0,
                0.0, 0.0, scale.2, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ),
            inverse: Matrix4x4::create(
                1.0 / scale.0, 0.0, 0.0, 0.0,
                0.0, 1.0 / scale.1, 0.0, 0.0,
                0.0, 0.0, 1.0 / scale.2, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ),
        }
    }

    pub fn rotate_y(angle: f32) -> Transform {
        let (s, c) = angle.sin_cos();
        let forward = Matrix4x4::create(
            c, 0.0, s, 0.0,
            0.0, 1.0, 0.0, 0.0,
            -s, 0.0, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let inverse = Matrix4x4::create(
            c, 0.0, -s, 0.0,
            0.0, 1.0, 0.0, 0.0,
            s, 0.0, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        Transform { forward, inverse }
    }

    /// `self` applied first, then `other`.
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform {
            forward: Matrix4x4::matmul(other.forward, self.forward),
            inverse: Matrix4x4::matmul(self.inverse, other.inverse),
        }
    }

    pub fn invert(&self) -> Transform {
        Transform {
            forward: self.inverse,
            inverse: self.forward,
        }
    }

    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        self.forward.apply_point(p)
    }

    pub fn apply_vector(&self, v: Vec3) -> Vec3 {
        self.forward.apply_vector(v)
    }

    /// Normals transform by the inverse transpose of the forward matrix.
    pub fn apply_normal(&self, n: Vec3) -> Vec3 {
        self.inverse.apply_vector_transposed(n)
    }

    pub fn apply_point_inverse(&self, p: Vec3) -> Vec3 {
        self.inverse.apply_point(p)
    }

    pub fn apply_vector_inverse(&self, v: Vec3) -> Vec3 {
        self.inverse.apply_vector(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn translate_round_trips() {
        let t = Transform::translate(Vec3(1.0, 2.0, 3.0));
        let p = Vec3(4.0, 5.0, 6.0);
        assert_close(t.apply_point(p), Vec3(5.0, 7.0, 9.0));
        assert_close(t.apply_point_inverse(t.apply_point(p)), p);
        // vectors are unaffected by translation
        assert_close(t.apply_vector(p), p);
    }

    #[test]
    fn compose_applies_left_to_right() {
        let t = Transform::scale(Vec3(2.0, 2.0, 2.0)).compose(&Transform::translate(Vec3(1.0, 0.0, 0.0)));
        assert_close(t.apply_point(Vec3(1.0, 1.0, 1.0)), Vec3(3.0, 2.0, 2.0));
    }

    #[test]
    fn normals_stay_perpendicular_under_nonuniform_scale() {
        // surface in the xz plane scaled nonuniformly; normal must remain +y
        let t = Transform::scale(Vec3(2.0, 1.0, 0.5));
        let n = t.apply_normal(Vec3(0.0, 1.0, 0.0)).unit();
        assert_close(n, Vec3(0.0, 1.0, 0.0));

        let tangent = t.apply_vector(Vec3(1.0, 0.0, 0.0));
        assert!(Vec3::dot(n, tangent).abs() < 1e-6);
    }

    #[test]
    fn rotate_y_quarter_turn() {
        let t = Transform::rotate_y(std::f32::consts::FRAC_PI_2);
        assert_close(t.apply_vector(Vec3(1.0, 0.0, 0.0)), Vec3(0.0, 0.0, -1.0));
        assert_close(t.apply_vector_inverse(t.apply_vector(Vec3(1.0, 0.0, 0.0))), Vec3(1.0, 0.0, 0.0));
    }
}
