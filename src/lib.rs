//! Offline path-tracer core: a BVH-accelerated scene, a Monte-Carlo
//! integrator that records how radiance arrived along each camera ray (a
//! `LightTree`), and a small light-path-expression language that filters
//! that record into per-transport-class output channels.

pub mod accel;
pub mod geometry;
mod lights;
pub mod materials;
pub mod ray;
pub mod renderer;
pub mod sampling;
pub mod scene;
pub mod shapes;
pub mod transport;

pub use renderer::{render, render_with_cancel, RenderOutput, RendererSettings};
pub use transport::{LightPathExpression, LightTree};
