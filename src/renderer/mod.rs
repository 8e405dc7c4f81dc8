use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::geometry::{Vec2, Vec3};
use crate::lights::{occluded, sample_light};
use crate::materials::{Brdf, TransportEvent};
use crate::ray::Ray;
use crate::sampling::Sampler;
use crate::scene::{Intersection, Scene};
use crate::transport::{LightPathExpression, LightTree, NodeId};

/// Bounce rays start this far along their direction to avoid re-hitting
/// the surface they leave.
const RAY_OFFSET_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    /// Indirect-bounce budget; direct lighting runs at every hit
    /// regardless.
    pub max_bounces: u32,
    pub seed: u64,
    pub num_threads: u32,
    /// Half-width, in pixels, of the uniform jitter window used for box
    /// reconstruction.
    pub filter_radius: f32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);

        RendererSettings {
            width: 400,
            height: 300,
            samples_per_pixel: 16,
            max_bounces: 4,
            seed: 0,
            num_threads,
            filter_radius: 0.5,
        }
    }
}

impl RendererSettings {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// One radiance image per requested channel expression.
#[derive(Debug)]
pub struct ChannelOutput {
    pub expression: LightPathExpression,
    pub pixels: Vec<Vec3>,
}

#[derive(Debug)]
pub struct RenderOutput {
    pub width: u32,
    pub height: u32,
    pub channels: Vec<ChannelOutput>,
}

/// Traces one camera ray and wraps the per-lobe roots under a single Eye
/// node. `None` means the ray escaped the scene without any transport
/// event.
pub(crate) fn trace_camera_ray(
    scene: &Scene,
    tree: &mut LightTree,
    sampler: &mut Sampler,
    ray: Ray,
    bounces: u32,
) -> Option<NodeId> {
    let roots = trace(scene, tree, sampler, ray, bounces, true);
    if roots.is_empty() {
        return None;
    }

    let eye = tree.add_node(TransportEvent::Eye, Vec3::zero());
    for root in roots {
        tree.add_upstream_unit(eye, root);
    }
    Some(eye)
}

/// Recursive transport walk. Each lobe of the hit material becomes one
/// node of that lobe's event class; direct lighting and one
/// importance-sampled bounce hang their contributions upstream of it.
///
/// `include_emitted` suppresses emission nodes at bounce destinations:
/// light arriving there is already accounted for by the direct-lighting
/// step one level up, and adding it again would double count.
fn trace(
    scene: &Scene,
    tree: &mut LightTree,
    sampler: &mut Sampler,
    mut ray: Ray,
    bounces: u32,
    include_emitted: bool,
) -> Vec<NodeId> {
    let Some(hit) = scene.intersect(&mut ray) else {
        return Vec::new();
    };

    let mut roots = Vec::with_capacity(hit.material.lobes().len());

    for lobe in hit.material.lobes() {
        match lobe.event() {
            TransportEvent::Light => {
                if include_emitted {
                    let emitted = lobe.emit(hit.point, hit.wo);
                    roots.push(tree.add_node(TransportEvent::Light, emitted));
                }
            }
            event => {
                let node = tree.add_node(event, Vec3::zero());
                direct_lighting(scene, tree, sampler, &hit, lobe, node);
                if bounces > 0 {
                    indirect_bounce(scene, tree, sampler, &hit, lobe, node, bounces);
                }
                roots.push(node);
            }
        }
    }

    roots
}

/// Samples every scene light except the surface being shaded, shadow-tests
/// the connection, and attaches visible lights upstream with the
/// `(pdf, brdf, cos)` estimator annotation.
fn direct_lighting(
    scene: &Scene,
    tree: &mut LightTree,
    sampler: &mut Sampler,
    hit: &Intersection<'_>,
    lobe: &Brdf,
    node: NodeId,
) {
    for &light_index in scene.lights() {
        if light_index as usize == hit.shape_index {
            continue; // a surface does not light itself
        }

        let light = &scene.shapes()[light_index as usize];
        let light_material = scene.material(light.material_index());
        let Some(sample) = sample_light(light, light_material, hit.point, sampler) else {
            continue;
        };

        if occluded(scene, hit.point, &sample) {
            continue;
        }

        let cos = f32::max(0.0, Vec3::dot(hit.normal, sample.wi));
        let brdf = lobe.f(&hit.frame, sample.wi, hit.wo);

        let light_node = tree.add_node(TransportEvent::Light, sample.radiance);
        tree.add_upstream(node, light_node, sample.pdf, brdf, cos);
    }
}

/// One importance-sampled bounce for the lobe. Invalid samples (no sample,
/// direction under the horizon) simply add no edge.
fn indirect_bounce(
    scene: &Scene,
    tree: &mut LightTree,
    sampler: &mut Sampler,
    hit: &Intersection<'_>,
    lobe: &Brdf,
    node: NodeId,
    bounces: u32,
) {
    let Some(sample) = lobe.sample_wi(&hit.frame, hit.wo, sampler) else {
        return;
    };

    let cos = Vec3::dot(hit.normal, sample.wi);
    if cos <= 0.0 {
        return;
    }

    let brdf = lobe.f(&hit.frame, sample.wi, hit.wo);
    let bounce_ray = Ray::new(hit.point + sample.wi * RAY_OFFSET_EPSILON, sample.wi);

    let upstream = trace(scene, tree, sampler, bounce_ray, bounces - 1, false);
    for up in upstream {
        tree.add_upstream(node, up, sample.pdf, brdf, cos);
    }
}

fn generate_camera_ray(
    scene: &Scene,
    settings: &RendererSettings,
    x: u32,
    y: u32,
    sampler: &mut Sampler,
) -> Ray {
    let jitter = sampler.sample_uniform2();
    let px = x as f32 + 0.5 + (jitter.0 - 0.5) * 2.0 * settings.filter_radius;
    let py = y as f32 + 0.5 + (jitter.1 - 0.5) * 2.0 * settings.filter_radius;

    let sx = px / settings.width as f32 * 2.0 - 1.0;
    let sy = 1.0 - py / settings.height as f32 * 2.0;

    scene.camera.get_ray(Vec2(sx, sy))
}

pub fn render(
    scene: &Scene,
    settings: &RendererSettings,
    channels: &[LightPathExpression],
) -> RenderOutput {
    let cancel = AtomicBool::new(false);
    render_with_cancel(scene, settings, channels, &cancel)
}

/// Distributes disjoint row bands over a fixed pool of worker threads.
/// Each worker owns its own sampler stream, so a render is deterministic
/// for a fixed (seed, thread count) pair. The cancel flag is checked once
/// per full sample pass; a cancelled band returns the average of the
/// passes it completed.
pub fn render_with_cancel(
    scene: &Scene,
    settings: &RendererSettings,
    channels: &[LightPathExpression],
    cancel: &AtomicBool,
) -> RenderOutput {
    let width = settings.width as usize;
    let height = settings.height as usize;
    let num_threads = settings.num_threads.max(1) as usize;

    let rows_per_band = height.div_ceil(num_threads);
    let bands: Vec<Range<usize>> = (0..num_threads)
        .map(|band| {
            let start = (band * rows_per_band).min(height);
            let end = ((band + 1) * rows_per_band).min(height);
            start..end
        })
        .filter(|range| !range.is_empty())
        .collect();

    info!(
        width,
        height,
        spp = settings.samples_per_pixel,
        workers = bands.len(),
        "starting render"
    );

    let band_results: Vec<Vec<Vec<Vec3>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = bands
            .iter()
            .enumerate()
            .map(|(worker, rows)| {
                let rows = rows.clone();
                scope.spawn(move || render_band(scene, settings, channels, rows, worker as u64, cancel))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("render worker panicked"))
            .collect()
    });

    let mut channel_buffers: Vec<Vec<Vec3>> = channels
        .iter()
        .map(|_| vec![Vec3::zero(); width * height])
        .collect();

    for (band, result) in bands.iter().zip(band_results) {
        for (channel_index, band_pixels) in result.into_iter().enumerate() {
            let offset = band.start * width;
            channel_buffers[channel_index][offset..offset + band_pixels.len()]
                .copy_from_slice(&band_pixels);
        }
    }

    RenderOutput {
        width: settings.width,
        height: settings.height,
        channels: channels
            .iter()
            .cloned()
            .zip(channel_buffers)
            .map(|(expression, pixels)| ChannelOutput { expression, pixels })
            .collect(),
    }
}

/// Renders one worker's rows: accumulates every channel across sample
/// passes, then divides by the number of completed passes.
fn render_band(
    scene: &Scene,
    settings: &RendererSettings,
    channels: &[LightPathExpression],
    rows: Range<usize>,
    worker: u64,
    cancel: &AtomicBool,
) -> Vec<Vec<Vec3>> {
    let width = settings.width as usize;
    let band_pixels = rows.len() * width;

    let mut sampler = Sampler::new(settings.seed, worker);
    let mut accum: Vec<Vec<Vec3>> = channels
        .iter()
        .map(|_| vec![Vec3::zero(); band_pixels])
        .collect();
    let mut tree = LightTree::new();

    let mut completed_passes = 0_u32;
    for _pass in 0..settings.samples_per_pixel {
        for (row_in_band, y) in rows.clone().enumerate() {
            for x in 0..width {
                let ray = generate_camera_ray(scene, settings, x as u32, y as u32, &mut sampler);

                tree.clear();
                let root = trace_camera_ray(scene, &mut tree, &mut sampler, ray, settings.max_bounces);

                let pixel = row_in_band * width + x;
                if let Some(root) = root {
                    for (channel_index, channel) in channels.iter().enumerate() {
                        let radiance = tree.radiance_channel(root, channel);
                        debug_assert!(radiance.is_finite(), "non-finite channel radiance");
                        accum[channel_index][pixel] += radiance;
                    }
                }
            }
        }

        completed_passes += 1;
        if cancel.load(Ordering::Relaxed) {
            debug!(worker, completed_passes, "render cancelled");
            break;
        }
    }

    if completed_passes > 0 {
        let scale = 1.0 / completed_passes as f32;
        for buffer in accum.iter_mut() {
            for pixel in buffer.iter_mut() {
                *pixel *= scale;
            }
        }
    }

    accum
}
