mod camera;
pub mod test_scenes;

pub use camera::Camera;

use thiserror::Error;

use crate::geometry::{Frame, Transform, Vec3};
use crate::materials::Material;
use crate::ray::Ray;
use crate::sampling::Sampler;
use crate::shapes::{LocalHit, Primitive, SurfaceSample};

pub type MaterialIndex = u32;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("shape {shape_index} references material {material} but only {count} materials exist")]
    UnknownMaterial {
        shape_index: usize,
        material: MaterialIndex,
        count: usize,
    },
    #[error("scene has no camera")]
    MissingCamera,
    #[error("scene has no shapes")]
    Empty,
}

/// A renderable object: a primitive, the material it is shaded with, and
/// its placement in the world. Rays are intersected in the primitive's
/// local space and hits are lifted back to world space.
#[derive(Debug)]
pub struct Shape {
    primitive: Primitive,
    material: MaterialIndex,
    transform: Transform,
}

impl Shape {
    pub fn new(primitive: Primitive, material: MaterialIndex, transform: Transform) -> Shape {
        Shape {
            primitive,
            material,
            transform,
        }
    }

    pub fn material_index(&self) -> MaterialIndex {
        self.material
    }

    pub fn primitive(&self) -> &Primitive {
        &self.primitive
    }

    /// The local ray keeps the world direction's (scaled) length, so `t`
    /// values and `tmax` agree between the two spaces and the primitive can
    /// shrink `ray.tmax` directly.
    fn local_ray(&self, ray: &Ray) -> Ray {
        Ray::bounded(
            self.transform.apply_point_inverse(ray.origin),
            self.transform.apply_vector_inverse(ray.direction),
            ray.tmax,
        )
    }

    pub fn intersect(&self, ray: &mut Ray) -> Option<LocalHit> {
        let mut local_ray = self.local_ray(ray);
        let hit = self.primitive.intersect(&mut local_ray)?;
        ray.tmax = local_ray.tmax;

        Some(LocalHit {
            t: hit.t,
            point: self.transform.apply_point(hit.point),
            normal: self.transform.apply_normal(hit.normal).unit(),
        })
    }

    pub fn intersect_any(&self, ray: &Ray) -> bool {
        self.primitive.intersect_any(&self.local_ray(ray))
    }

    pub fn sample_surface(&self, sampler: &mut Sampler) -> SurfaceSample {
        let sample = self.primitive.sample_surface(sampler);
        SurfaceSample {
            point: self.transform.apply_point(sample.point),
            normal: self.transform.apply_normal(sample.normal).unit(),
            pdf_area: sample.pdf_area,
        }
    }
}

/// World-space hit record for one scene query. Transient: borrows the hit
/// shape and its material, lives only as long as the query result is used.
#[derive(Debug)]
pub struct Intersection<'a> {
    pub t: f32,
    pub point: Vec3,
    /// Direction back toward the viewer.
    pub wo: Vec3,
    pub normal: Vec3,
    /// Shading basis derived from the normal and `wo`.
    pub frame: Frame,
    pub shape: &'a Shape,
    pub material: &'a Material,
    /// Identity of the hit shape, used for self-light exclusion.
    pub shape_index: usize,
}

/// A flat list of shapes, linearly tested per ray; each triangle mesh is
/// internally BVH-accelerated. Lights are the emissive shapes, stored by
/// index. Built once, read-only while rendering.
#[derive(Debug)]
pub struct Scene {
    shapes: Vec<Shape>,
    materials: Vec<Material>,
    lights: Vec<u32>,
    pub camera: Camera,
}

impl Scene {
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn material(&self, index: MaterialIndex) -> &Material {
        &self.materials[index as usize]
    }

    /// Indices of the emissive shapes.
    pub fn lights(&self) -> &[u32] {
        &self.lights
    }

    /// Nearest hit over all shapes. Accepting shapes shrink `ray.tmax`, so
    /// later shapes in the scan only report closer hits.
    pub fn intersect<'a>(&'a self, ray: &mut Ray) -> Option<Intersection<'a>> {
        let mut best: Option<(usize, LocalHit)> = None;

        for (index, shape) in self.shapes.iter().enumerate() {
            if let Some(hit) = shape.intersect(ray) {
                best = Some((index, hit));
            }
        }

        let (shape_index, hit) = best?;
        let shape = &self.shapes[shape_index];
        let wo = (-ray.direction).unit();

        Some(Intersection {
            t: hit.t,
            point: hit.point,
            wo,
            normal: hit.normal,
            frame: Frame::from_normal_wo(hit.normal, wo),
            shape,
            material: &self.materials[shape.material as usize],
            shape_index,
        })
    }

    /// Boolean occlusion query over all shapes.
    pub fn intersect_any(&self, ray: &Ray) -> bool {
        self.shapes.iter().any(|shape| shape.intersect_any(ray))
    }
}

/// Assembles a scene and validates it before any rendering can start:
/// material references must resolve, and a camera must be present.
/// Shapes with an emissive material are registered as lights automatically.
#[derive(Default)]
pub struct SceneBuilder {
    shapes: Vec<Shape>,
    materials: Vec<Material>,
    camera: Option<Camera>,
}

impl SceneBuilder {
    pub fn new() -> SceneBuilder {
        SceneBuilder::default()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialIndex {
        self.materials.push(material);
        (self.materials.len() - 1) as MaterialIndex
    }

    pub fn add_shape(
        &mut self,
        primitive: Primitive,
        material: MaterialIndex,
        transform: Transform,
    ) -> usize {
        self.shapes.push(Shape::new(primitive, material, transform));
        self.shapes.len() - 1
    }

    pub fn add_shape_at_position(
        &mut self,
        primitive: Primitive,
        material: MaterialIndex,
        position: Vec3,
    ) -> usize {
        self.add_shape(primitive, material, Transform::translate(position))
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn build(self) -> Result<Scene, SceneError> {
        if self.shapes.is_empty() {
            return Err(SceneError::Empty);
        }

        for (shape_index, shape) in self.shapes.iter().enumerate() {
            if shape.material as usize >= self.materials.len() {
                return Err(SceneError::UnknownMaterial {
                    shape_index,
                    material: shape.material,
                    count: self.materials.len(),
                });
            }
        }

        let lights = self
            .shapes
            .iter()
            .enumerate()
            .filter(|(_, shape)| self.materials[shape.material as usize].is_emissive())
            .map(|(index, _)| index as u32)
            .collect();

        Ok(Scene {
            shapes: self.shapes,
            materials: self.materials,
            lights,
            camera: self.camera.ok_or(SceneError::MissingCamera)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use crate::shapes::Sphere;

    fn basic_camera() -> Camera {
        Camera::look_at(
            Vec3(-5.0, 0.0, 0.0),
            Vec3::zero(),
            Vec3(0.0, 1.0, 0.0),
            (45.0_f32).to_radians(),
            1.0,
        )
    }

    #[test]
    fn builder_rejects_unknown_material() {
        let mut builder = SceneBuilder::new();
        builder.add_shape_at_position(
            Primitive::Sphere(Sphere::new(Vec3::zero(), 1.0)),
            3,
            Vec3::zero(),
        );
        builder.set_camera(basic_camera());

        match builder.build() {
            Err(SceneError::UnknownMaterial {
                shape_index,
                material,
                count,
            }) => {
                assert_eq!(shape_index, 0);
                assert_eq!(material, 3);
                assert_eq!(count, 0);
            }
            other => panic!("expected UnknownMaterial, got {other:?}"),
        }
    }

    #[test]
    fn builder_rejects_missing_camera_and_empty_scene() {
        assert!(matches!(SceneBuilder::new().build(), Err(SceneError::Empty)));

        let mut builder = SceneBuilder::new();
        let white = builder.add_material(Material::matte(Vec3::splat(0.8)));
        builder.add_shape_at_position(
            Primitive::Sphere(Sphere::new(Vec3::zero(), 1.0)),
            white,
            Vec3::zero(),
        );
        assert!(matches!(
            builder.build(),
            Err(SceneError::MissingCamera)
        ));
    }

    #[test]
    fn emissive_shapes_become_lights() {
        let mut builder = SceneBuilder::new();
        let white = builder.add_material(Material::matte(Vec3::splat(0.8)));
        let lamp = builder.add_material(Material::emissive(Vec3::splat(10.0)));

        builder.add_shape_at_position(
            Primitive::Sphere(Sphere::new(Vec3::zero(), 1.0)),
            white,
            Vec3::zero(),
        );
        builder.add_shape_at_position(
            Primitive::Sphere(Sphere::new(Vec3::zero(), 0.2)),
            lamp,
            Vec3(0.0, 3.0, 0.0),
        );
        builder.set_camera(basic_camera());

        let scene = builder.build().expect("valid scene");
        assert_eq!(scene.lights(), &[1]);
    }

    #[test]
    fn transformed_shape_reports_world_space_hit() {
        let mut builder = SceneBuilder::new();
        let white = builder.add_material(Material::matte(Vec3::splat(0.8)));
        builder.add_shape_at_position(
            Primitive::Sphere(Sphere::new(Vec3::zero(), 1.0)),
            white,
            Vec3(0.0, 0.0, 10.0),
        );
        builder.set_camera(basic_camera());
        let scene = builder.build().unwrap();

        let mut ray = Ray::new(Vec3(0.0, 0.0, 0.0), Vec3(0.0, 0.0, 1.0));
        let hit = scene.intersect(&mut ray).expect("must hit moved sphere");
        assert!((hit.t - 9.0).abs() < 1e-4);
        assert!((hit.point - Vec3(0.0, 0.0, 9.0)).length() < 1e-4);
        assert!((hit.normal - Vec3(0.0, 0.0, -1.0)).length() < 1e-4);
        assert!((hit.wo - Vec3(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn nearest_of_two_shapes_wins_regardless_of_order() {
        let mut builder = SceneBuilder::new();
        let white = builder.add_material(Material::matte(Vec3::splat(0.8)));
        // farther shape added first
        builder.add_shape_at_position(
            Primitive::Sphere(Sphere::new(Vec3::zero(), 1.0)),
            white,
            Vec3(8.0, 0.0, 0.0),
        );
        builder.add_shape_at_position(
            Primitive::Sphere(Sphere::new(Vec3::zero(), 1.0)),
            white,
            Vec3(4.0, 0.0, 0.0),
        );
        builder.set_camera(basic_camera());
        let scene = builder.build().unwrap();

        let mut ray = Ray::new(Vec3::zero(), Vec3(1.0, 0.0, 0.0));
        let hit = scene.intersect(&mut ray).expect("must hit");
        assert_eq!(hit.shape_index, 1);
        assert!((hit.t - 3.0).abs() < 1e-4);
    }

    #[test]
    fn camera_scenario_unit_sphere_from_minus_five() {
        let scene = test_scenes::sphere_scene(1.0);
        let mut ray = scene.camera.get_ray(Vec2(0.0, 0.0));
        let hit = scene.intersect(&mut ray).expect("center ray must hit");
        assert!((hit.t - 4.0).abs() < 1e-3);
        assert!((hit.normal - Vec3(-1.0, 0.0, 0.0)).length() < 1e-3);
    }
}
