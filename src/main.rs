use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use obj::{load_obj, Obj, Position};
use tracing::info;

use luminaire::geometry::{Aabb, Transform, Vec3, Vec3u};
use luminaire::materials::Material;
use luminaire::renderer::{render, ChannelOutput, RendererSettings};
use luminaire::scene::{test_scenes, Camera, Scene, SceneBuilder};
use luminaire::shapes::{Primitive, Sphere, TriangleMesh};
use luminaire::LightPathExpression;

#[derive(Debug, Parser)]
#[command(
    name = "luminaire",
    about = "Offline path tracer with light-path-expression output channels"
)]
struct CommandLineArguments {
    #[arg(long, default_value_t = 400, help = "Image width in pixels")]
    width: u32,
    #[arg(long, default_value_t = 300, help = "Image height in pixels")]
    height: u32,

    #[arg(short, long, default_value_t = 32, help = "Samples per pixel")]
    spp: u32,
    #[arg(short = 'd', long, default_value_t = 4, help = "Maximum indirect bounce depth")]
    depth: u32,
    #[arg(long, default_value_t = 0.5, help = "Reconstruction filter radius in pixels")]
    filter_radius: f32,
    #[arg(long, default_value_t = 0, help = "Master RNG seed")]
    seed: u64,
    #[arg(short = 't', long, help = "CPU worker threads (defaults to available cores)")]
    num_threads: Option<u32>,

    #[arg(long, default_value = "cornell", help = "Builtin scene name")]
    scene: String,
    #[arg(long, help = "Render an OBJ mesh instead of a builtin scene")]
    obj: Option<PathBuf>,

    #[arg(short, long, default_value = "output.png", help = "Output image path")]
    output: PathBuf,
    #[arg(long, default_value_t = 1.0, help = "Linear exposure applied before encoding")]
    exposure: f32,

    #[arg(help = "Light path expressions, one output channel each (default: L*E)")]
    channels: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = CommandLineArguments::parse();

    let channel_strings = if args.channels.is_empty() {
        vec!["L*E".to_string()]
    } else {
        args.channels.clone()
    };
    let channels = channel_strings
        .iter()
        .map(|s| {
            s.parse::<LightPathExpression>()
                .with_context(|| format!("invalid light path expression '{s}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let settings = RendererSettings {
        width: args.width,
        height: args.height,
        samples_per_pixel: args.spp,
        max_bounces: args.depth,
        seed: args.seed,
        num_threads: args
            .num_threads
            .unwrap_or_else(|| RendererSettings::default().num_threads),
        filter_radius: args.filter_radius,
    };

    let aspect = settings.aspect_ratio();
    let scene = if let Some(obj_path) = &args.obj {
        obj_scene(obj_path, aspect)?
    } else {
        let descriptor = test_scenes::all_test_scenes()
            .iter()
            .find(|s| s.name == args.scene);
        match descriptor {
            Some(descriptor) => (descriptor.build)(aspect),
            None => {
                let known: Vec<&str> = test_scenes::all_test_scenes()
                    .iter()
                    .map(|s| s.name)
                    .collect();
                bail!("unknown scene '{}', available: {}", args.scene, known.join(", "));
            }
        }
    };

    let output = render(&scene, &settings, &channels);

    for (index, channel) in output.channels.iter().enumerate() {
        let path = channel_path(&args.output, channel, index == 0);
        save_png(channel, output.width, output.height, args.exposure, &path)?;
        info!(channel = %channel.expression, path = %path.display(), "wrote channel");
    }

    Ok(())
}

/// First channel takes the requested path; the rest get the expression
/// appended to the file stem (with symbols made filename-safe).
fn channel_path(base: &Path, channel: &ChannelOutput, primary: bool) -> PathBuf {
    if primary {
        return base.to_path_buf();
    }

    let suffix: String = channel
        .expression
        .to_string()
        .chars()
        .map(|c| match c {
            '*' => 'x',
            '.' => 'a',
            other => other,
        })
        .collect();

    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let mut path = base.to_path_buf();
    path.set_file_name(format!("{stem}_{suffix}.png"));
    path
}

fn save_png(
    channel: &ChannelOutput,
    width: u32,
    height: u32,
    exposure: f32,
    path: &Path,
) -> anyhow::Result<()> {
    let mut image = image::RgbImage::new(width, height);

    for (i, pixel) in channel.pixels.iter().enumerate() {
        let encode = |v: f32| {
            let v = (v * exposure).max(0.0);
            (v.powf(1.0 / 2.2).clamp(0.0, 1.0) * 255.0) as u8
        };
        let x = (i as u32) % width;
        let y = (i as u32) / width;
        image.put_pixel(x, y, image::Rgb([encode(pixel.x()), encode(pixel.y()), encode(pixel.z())]));
    }

    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Loads an OBJ file (positions only; vertex normals are recomputed) and
/// stages it on a gray floor under a spherical emitter, with the camera
/// framed from the mesh bounds.
fn obj_scene(path: &Path, aspect: f32) -> anyhow::Result<Scene> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let model: Obj<Position, u32> = load_obj(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))?;

    if model.indices.len() % 3 != 0 {
        bail!("{} is not triangulated", path.display());
    }

    let vertices: Vec<Vec3> = model.vertices.iter().map(|v| v.position.into()).collect();
    let tris: Vec<Vec3u> = model
        .indices
        .chunks_exact(3)
        .map(|tri| Vec3u(tri[0], tri[1], tri[2]))
        .collect();
    if vertices.is_empty() || tris.is_empty() {
        bail!("{} contains no triangles", path.display());
    }

    let mut bounds = Aabb::empty();
    for v in &vertices {
        bounds.include_point(*v);
    }
    let center = bounds.centroid();
    let extent = (bounds.maximum - bounds.minimum).length().max(1e-3);

    let mesh = TriangleMesh::new(vertices, tris, None);
    info!(
        triangles = mesh.triangle_count(),
        extent = %extent,
        "loaded OBJ mesh"
    );

    let mut builder = SceneBuilder::new();
    let gray = builder.add_material(Material::matte(Vec3::splat(0.6)));
    let body = builder.add_material(Material::glossy(Vec3::splat(0.5), 0.35, 1.5));
    let lamp = builder.add_material(Material::emissive(Vec3::splat(40.0) * extent * extent));

    builder.add_shape(Primitive::Mesh(mesh), body, Transform::identity());

    let floor_half = extent * 4.0;
    let floor_y = bounds.minimum.y();
    let floor = TriangleMesh::new(
        vec![
            Vec3(center.x() - floor_half, floor_y, center.z() - floor_half),
            Vec3(center.x() + floor_half, floor_y, center.z() - floor_half),
            Vec3(center.x() + floor_half, floor_y, center.z() + floor_half),
            Vec3(center.x() - floor_half, floor_y, center.z() + floor_half),
        ],
        vec![Vec3u(0, 1, 2), Vec3u(0, 2, 3)],
        Some(vec![Vec3(0.0, 1.0, 0.0); 4]),
    );
    builder.add_shape(Primitive::Mesh(floor), gray, Transform::identity());

    builder.add_shape_at_position(
        Primitive::Sphere(Sphere::new(Vec3::zero(), extent * 0.2)),
        lamp,
        center + Vec3(extent * 0.8, extent * 1.4, extent * 0.6),
    );

    builder.set_camera(Camera::look_at(
        center + Vec3(0.0, extent * 0.4, extent * 1.6),
        center,
        Vec3(0.0, 1.0, 0.0),
        (40.0_f32).to_radians(),
        aspect,
    ));

    Ok(builder.build()?)
}
