use super::Vec3;

/// Orthonormal shading basis at a hit point, with the surface normal along
/// the local +z axis.
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Frame {
    /// Builds the basis from the shading normal and the outgoing direction:
    /// the tangent is `wo` projected into the surface plane, which keeps
    /// `wo` in the local xz plane. When `wo` is (nearly) parallel to the
    /// normal that projection vanishes, so a fixed axis is substituted
    /// before giving up on the Gram-Schmidt step.
    pub fn from_normal_wo(normal: Vec3, wo: Vec3) -> Frame {
        let mut tangent = wo - Vec3::dot(wo, normal) * normal;
        if tangent.near_zero() {
            let candidate = if normal.x().abs() < 0.9 {
                Vec3(1.0, 0.0, 0.0)
            } else {
                Vec3(0.0, 1.0, 0.0)
            };
            tangent = candidate - Vec3::dot(candidate, normal) * normal;
        }
        let tangent = tangent.unit();
        let bitangent = Vec3::cross(normal, tangent);

        Frame {
            tangent,
            bitangent,
            normal,
        }
    }

    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3(
            Vec3::dot(v, self.tangent),
            Vec3::dot(v, self.bitangent),
            Vec3::dot(v, self.normal),
        )
    }

    pub fn to_world(&self, v: Vec3) -> Vec3 {
        v.x() * self.tangent + v.y() * self.bitangent + v.z() * self.normal
    }
}
