//! Builtin scenes used by the command-line driver and the test suite.
//! Constructed through the validating builder like any external scene.

use crate::geometry::{Vec3, Vec3u};
use crate::materials::Material;
use crate::scene::{Camera, Scene, SceneBuilder};
use crate::shapes::{Primitive, Sphere, TriangleMesh};

/// Two-triangle quad with an explicit shared normal.
fn make_quad(a: Vec3, b: Vec3, c: Vec3, d: Vec3, normal: Vec3) -> TriangleMesh {
    TriangleMesh::new(
        vec![a, b, c, d],
        vec![Vec3u(0, 1, 2), Vec3u(0, 2, 3)],
        Some(vec![normal; 4]),
    )
}

/// Unit sphere at the origin viewed from (-5, 0, 0), with a small emitter
/// off to the side.
pub fn sphere_scene(aspect: f32) -> Scene {
    let mut builder = SceneBuilder::new();

    let white = builder.add_material(Material::matte(Vec3::splat(0.8)));
    let lamp = builder.add_material(Material::emissive(Vec3::splat(40.0)));

    builder.add_shape_at_position(
        Primitive::Sphere(Sphere::new(Vec3::zero(), 1.0)),
        white,
        Vec3::zero(),
    );
    builder.add_shape_at_position(
        Primitive::Sphere(Sphere::new(Vec3::zero(), 0.3)),
        lamp,
        Vec3(-3.0, 3.0, 0.0),
    );

    builder.set_camera(Camera::look_at(
        Vec3(-5.0, 0.0, 0.0),
        Vec3::zero(),
        Vec3(0.0, 1.0, 0.0),
        (45.0_f32).to_radians(),
        aspect,
    ));

    builder.build().expect("builtin scene is valid")
}

/// A single emissive sphere and nothing else: the only radiance reaching
/// the camera comes straight off the emitter.
pub fn emissive_sphere_scene(aspect: f32) -> Scene {
    let mut builder = SceneBuilder::new();

    let lamp = builder.add_material(Material::emissive(Vec3(30.0, 24.0, 18.0)));
    builder.add_shape_at_position(
        Primitive::Sphere(Sphere::new(Vec3::zero(), 1.0)),
        lamp,
        Vec3::zero(),
    );

    builder.set_camera(Camera::look_at(
        Vec3(0.0, 0.0, 4.0),
        Vec3::zero(),
        Vec3(0.0, 1.0, 0.0),
        (40.0_f32).to_radians(),
        aspect,
    ));

    builder.build().expect("builtin scene is valid")
}

/// Cornell-style enclosure: colored side walls, a glossy and a matte
/// sphere, and a spherical emitter below the ceiling.
pub fn cornell_scene(aspect: f32) -> Scene {
    let mut builder = SceneBuilder::new();

    let white = builder.add_material(Material::matte(Vec3::splat(0.7)));
    let red = builder.add_material(Material::matte(Vec3(0.6, 0.15, 0.15)));
    let green = builder.add_material(Material::matte(Vec3(0.15, 0.55, 0.15)));
    let glossy = builder.add_material(Material::glossy(Vec3::splat(0.45), 0.25, 1.5));
    let lamp = builder.add_material(Material::emissive(Vec3::splat(60.0)));

    // box interior: x in [-1, 1], y in [0, 2], z in [-1, 1], open front
    let (l, r) = (-1.0, 1.0);
    let (bottom, top) = (0.0, 2.0);
    let (back, front) = (-1.0, 1.0);

    let floor = make_quad(
        Vec3(l, bottom, back),
        Vec3(r, bottom, back),
        Vec3(r, bottom, front),
        Vec3(l, bottom, front),
        Vec3(0.0, 1.0, 0.0),
    );
    let ceiling = make_quad(
        Vec3(l, top, back),
        Vec3(l, top, front),
        Vec3(r, top, front),
        Vec3(r, top, back),
        Vec3(0.0, -1.0, 0.0),
    );
    let back_wall = make_quad(
        Vec3(l, bottom, back),
        Vec3(l, top, back),
        Vec3(r, top, back),
        Vec3(r, bottom, back),
        Vec3(0.0, 0.0, 1.0),
    );
    let left_wall = make_quad(
        Vec3(l, bottom, back),
        Vec3(l, bottom, front),
        Vec3(l, top, front),
        Vec3(l, top, back),
        Vec3(1.0, 0.0, 0.0),
    );
    let right_wall = make_quad(
        Vec3(r, bottom, back),
        Vec3(r, top, back),
        Vec3(r, top, front),
        Vec3(r, bottom, front),
        Vec3(-1.0, 0.0, 0.0),
    );

    for mesh in [floor, ceiling, back_wall] {
        builder.add_shape_at_position(Primitive::Mesh(mesh), white, Vec3::zero());
    }
    builder.add_shape_at_position(Primitive::Mesh(left_wall), red, Vec3::zero());
    builder.add_shape_at_position(Primitive::Mesh(right_wall), green, Vec3::zero());

    builder.add_shape_at_position(
        Primitive::Sphere(Sphere::new(Vec3::zero(), 0.4)),
        glossy,
        Vec3(-0.4, 0.4, 0.0),
    );
    builder.add_shape_at_position(
        Primitive::Sphere(Sphere::new(Vec3::zero(), 0.3)),
        white,
        Vec3(0.45, 0.3, -0.4),
    );
    builder.add_shape_at_position(
        Primitive::Sphere(Sphere::new(Vec3::zero(), 0.2)),
        lamp,
        Vec3(0.0, 1.7, 0.0),
    );

    builder.set_camera(Camera::look_at(
        Vec3(0.0, 1.0, 3.6),
        Vec3(0.0, 1.0, 0.0),
        Vec3(0.0, 1.0, 0.0),
        (38.0_f32).to_radians(),
        aspect,
    ));

    builder.build().expect("builtin scene is valid")
}

pub struct TestScene {
    pub name: &'static str,
    pub build: fn(aspect: f32) -> Scene,
}

pub const fn all_test_scenes() -> &'static [TestScene] {
    &[
        TestScene {
            name: "sphere",
            build: sphere_scene,
        },
        TestScene {
            name: "emissive_sphere",
            build: emissive_sphere_scene,
        },
        TestScene {
            name: "cornell",
            build: cornell_scene,
        },
    ]
}
