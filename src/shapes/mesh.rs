use crate::accel::Bvh;
use crate::geometry::{Aabb, Vec3, Vec3u};
use crate::ray::Ray;
use crate::sampling::Sampler;

use super::{LocalHit, SurfaceSample};

/// Rejection band for the Moller-Trumbore determinant; rays closer to
/// parallel than this are treated as missing the triangle.
const TRIANGLE_EPSILON: f32 = 1e-8;

/// An indexed triangle mesh with its own BVH and the cumulative-area table
/// used for area-weighted emitter sampling. Vertex normals are taken from
/// the input when provided and computed (area-weighted) otherwise.
#[derive(Debug)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    tris: Vec<Vec3u>,
    normals: Vec<Vec3>,
    cumulative_areas: Vec<f32>,
    total_area: f32,
    bvh: Bvh,
}

fn moller_trumbore(p0: Vec3, p1: Vec3, p2: Vec3, ray: &Ray) -> Option<(f32, f32, f32)> {
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;

    let h = Vec3::cross(ray.direction, edge2);
    let det = Vec3::dot(edge1, h);
    if det.abs() < TRIANGLE_EPSILON {
        return None; // ray parallel to the triangle plane
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - p0;
    let u = inv_det * Vec3::dot(s, h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = Vec3::cross(s, edge1);
    let v = inv_det * Vec3::dot(ray.direction, q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * Vec3::dot(edge2, q);
    if t > 0.0 && t < ray.tmax {
        Some((t, u, v))
    } else {
        None
    }
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Vec3>, tris: Vec<Vec3u>, normals: Option<Vec<Vec3>>) -> TriangleMesh {
        assert!(!tris.is_empty(), "triangle mesh has no triangles");

        let normals = match normals {
            Some(normals) => {
                assert_eq!(normals.len(), vertices.len());
                normals
            }
            None => compute_vertex_normals(&vertices, &tris),
        };

        let mut tri_bounds = Vec::with_capacity(tris.len());
        let mut centroids = Vec::with_capacity(tris.len());
        let mut cumulative_areas = Vec::with_capacity(tris.len());
        let mut total_area = 0.0;

        for tri in &tris {
            let (p0, p1, p2) = (
                vertices[tri.0 as usize],
                vertices[tri.1 as usize],
                vertices[tri.2 as usize],
            );

            let mut bounds = Aabb::empty();
            bounds.include_point(p0);
            bounds.include_point(p1);
            bounds.include_point(p2);
            tri_bounds.push(bounds);
            centroids.push((p0 + p1 + p2) / 3.0);

            total_area += Vec3::cross(p1 - p0, p2 - p0).length() / 2.0;
            cumulative_areas.push(total_area);
        }

        let bvh = Bvh::build(&tri_bounds, &centroids);

        TriangleMesh {
            vertices,
            tris,
            normals,
            cumulative_areas,
            total_area,
            bvh,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.tris.len()
    }

    fn triangle_positions(&self, tri_idx: u32) -> (Vec3, Vec3, Vec3) {
        let tri = self.tris[tri_idx as usize];
        (
            self.vertices[tri.0 as usize],
            self.vertices[tri.1 as usize],
            self.vertices[tri.2 as usize],
        )
    }

    pub fn tri_area(&self, tri_idx: usize) -> f32 {
        let prev = if tri_idx == 0 {
            0.0
        } else {
            self.cumulative_areas[tri_idx - 1]
        };
        self.cumulative_areas[tri_idx] - prev
    }

    pub fn area(&self) -> f32 {
        self.total_area
    }

    fn shading_normal(&self, tri_idx: u32, u: f32, v: f32) -> Vec3 {
        let tri = self.tris[tri_idx as usize];
        let n0 = self.normals[tri.0 as usize];
        let n1 = self.normals[tri.1 as usize];
        let n2 = self.normals[tri.2 as usize];
        ((1.0 - u - v) * n0 + u * n1 + v * n2).unit()
    }

    pub fn intersect(&self, ray: &mut Ray) -> Option<LocalHit> {
        let mut best: Option<LocalHit> = None;

        self.bvh.intersect_nearest(ray, |tri_idx, ray| {
            let (p0, p1, p2) = self.triangle_positions(tri_idx);
            match moller_trumbore(p0, p1, p2, ray) {
                Some((t, u, v)) => {
                    ray.tmax = t;
                    best = Some(LocalHit {
                        t,
                        point: ray.at(t),
                        normal: self.shading_normal(tri_idx, u, v),
                    });
                    true
                }
                None => false,
            }
        });

        best
    }

    pub fn intersect_any(&self, ray: &Ray) -> bool {
        self.bvh.intersect_any(ray, |tri_idx, ray| {
            let (p0, p1, p2) = self.triangle_positions(tri_idx);
            moller_trumbore(p0, p1, p2, ray).is_some()
        })
    }

    /// Area-weighted point on the mesh surface: binary search of the
    /// cumulative-area table picks the triangle, then a uniform barycentric
    /// draw places the point. Density is uniform over the whole surface.
    pub fn sample_surface(&self, sampler: &mut Sampler) -> SurfaceSample {
        let target = sampler.sample_uniform() * self.total_area;
        let tri_idx = self
            .cumulative_areas
            .partition_point(|&cum| cum < target)
            .min(self.tris.len() - 1);

        let s = sampler.sample_uniform2();
        let su = s.0.sqrt();
        let b0 = 1.0 - su;
        let b1 = s.1 * su;

        let (p0, p1, p2) = self.triangle_positions(tri_idx as u32);
        let point = b0 * p0 + b1 * p1 + (1.0 - b0 - b1) * p2;
        let normal = self.shading_normal(tri_idx as u32, b1, 1.0 - b0 - b1);

        SurfaceSample {
            point,
            normal,
            pdf_area: 1.0 / self.total_area,
        }
    }
}

/// Area-weighted vertex normals from the face windings; vertices touching
/// no non-degenerate face fall back to +z.
fn compute_vertex_normals(vertices: &[Vec3], tris: &[Vec3u]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::zero(); vertices.len()];

    for tri in tris {
        let p0 = vertices[tri.0 as usize];
        let p1 = vertices[tri.1 as usize];
        let p2 = vertices[tri.2 as usize];
        // cross product length is twice the face area, so accumulating the
        // unnormalized vector weights by area
        let face = Vec3::cross(p1 - p0, p2 - p0);
        normals[tri.0 as usize] += face;
        normals[tri.1 as usize] += face;
        normals[tri.2 as usize] += face;
    }

    for normal in normals.iter_mut() {
        if normal.near_zero() {
            *normal = Vec3(0.0, 0.0, 1.0);
        } else {
            *normal = normal.unit();
        }
    }

    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles forming the unit square in the z = 0 plane.
    fn quad() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                Vec3(0.0, 0.0, 0.0),
                Vec3(1.0, 0.0, 0.0),
                Vec3(1.0, 1.0, 0.0),
                Vec3(0.0, 1.0, 0.0),
            ],
            vec![Vec3u(0, 1, 2), Vec3u(0, 2, 3)],
            None,
        )
    }

    /// Deterministic soup of disconnected triangles.
    fn soup(n: usize) -> TriangleMesh {
        let mut state = 0x2545f491_u32;
        let mut next = move || {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 8) as f32 / (1 << 24) as f32
        };

        let mut vertices = Vec::new();
        let mut tris = Vec::new();
        for i in 0..n {
            let base = Vec3(
                next() * 10.0 - 5.0,
                next() * 10.0 - 5.0,
                next() * 10.0 - 5.0,
            );
            vertices.push(base);
            vertices.push(base + Vec3(next(), next(), next()));
            vertices.push(base + Vec3(next(), next(), next()));
            let v = (i * 3) as u32;
            tris.push(Vec3u(v, v + 1, v + 2));
        }

        TriangleMesh::new(vertices, tris, None)
    }

    fn brute_force_nearest(mesh: &TriangleMesh, ray: Ray) -> Option<f32> {
        let mut ray = ray;
        let mut best = None;
        for i in 0..mesh.triangle_count() {
            let (p0, p1, p2) = mesh.triangle_positions(i as u32);
            if let Some((t, _, _)) = moller_trumbore(p0, p1, p2, &ray) {
                ray.tmax = t;
                best = Some(t);
            }
        }
        best
    }

    #[test]
    fn quad_center_hit() {
        let mesh = quad();
        let mut ray = Ray::new(Vec3(0.5, 0.5, 3.0), Vec3(0.0, 0.0, -1.0));
        let hit = mesh.intersect(&mut ray).expect("must hit");
        assert!((hit.t - 3.0).abs() < 1e-4);
        assert!((mesh.area() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn bvh_traversal_matches_brute_force() {
        let mesh = soup(300);
        let mut state = 0xdeadbeef_u32;
        let mut next = move || {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 8) as f32 / (1 << 24) as f32
        };

        for _ in 0..200 {
            let origin = Vec3(
                next() * 30.0 - 15.0,
                next() * 30.0 - 15.0,
                next() * 30.0 - 15.0,
            );
            let dir = Vec3(next() - 0.5, next() - 0.5, next() - 0.5);
            if dir.near_zero() {
                continue;
            }
            let dir = dir.unit();

            let mut bvh_ray = Ray::new(origin, dir);
            let bvh_hit = mesh.intersect(&mut bvh_ray).map(|h| h.t);
            let brute_hit = brute_force_nearest(&mesh, Ray::new(origin, dir));

            match (bvh_hit, brute_hit) {
                (Some(a), Some(b)) => assert!((a - b).abs() < 1e-4, "bvh {a} vs brute {b}"),
                (None, None) => {}
                other => panic!("bvh/brute disagree: {other:?}"),
            }
        }
    }

    #[test]
    fn accepted_hit_shrinks_tmax() {
        let mesh = soup(300);
        let origin = Vec3(0.0, 0.0, -20.0);
        let mut hits = 0;

        for i in 0..50 {
            let target = Vec3((i as f32) * 0.2 - 5.0, 0.0, 0.0);
            let mut ray = Ray::new(origin, (target - origin).unit());
            let before = ray.tmax;
            if let Some(hit) = mesh.intersect(&mut ray) {
                assert!(ray.tmax < before);
                assert!(hit.t <= ray.tmax + 1e-6);
                hits += 1;
            } else {
                assert_eq!(ray.tmax, before);
            }
        }
        assert!(hits > 0, "test geometry never hit; soup changed?");
    }

    #[test]
    fn shadow_query_sees_occluder_and_respects_tmax() {
        let mesh = quad();
        let hit = Ray::new(Vec3(0.5, 0.5, 3.0), Vec3(0.0, 0.0, -1.0));
        assert!(mesh.intersect_any(&hit));

        let short = Ray::bounded(Vec3(0.5, 0.5, 3.0), Vec3(0.0, 0.0, -1.0), 2.0);
        assert!(!mesh.intersect_any(&short));
    }

    #[test]
    fn computed_vertex_normals_face_consistently() {
        let mesh = quad();
        for n in &mesh.normals {
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!((*n - Vec3(0.0, 0.0, 1.0)).length() < 1e-5);
        }
    }

    #[test]
    fn surface_samples_lie_on_mesh_with_uniform_density() {
        let mesh = quad();
        let mut sampler = Sampler::new(3, 0);

        for _ in 0..128 {
            let s = mesh.sample_surface(&mut sampler);
            assert!(s.point.z().abs() < 1e-6);
            assert!((0.0..=1.0).contains(&s.point.x()));
            assert!((0.0..=1.0).contains(&s.point.y()));
            assert!((s.pdf_area - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn cumulative_area_table_recovers_per_triangle_areas() {
        let mesh = soup(64);
        let mut sum = 0.0;
        for i in 0..mesh.triangle_count() {
            let (p0, p1, p2) = mesh.triangle_positions(i as u32);
            let direct = Vec3::cross(p1 - p0, p2 - p0).length() / 2.0;
            assert!((mesh.tri_area(i) - direct).abs() < 1e-3);
            sum += direct;
        }
        assert!((sum - mesh.area()).abs() < 1e-2);
    }
}
