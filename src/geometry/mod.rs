mod aabb;
mod frame;
mod transform;
mod vec;

pub use aabb::Aabb;
pub use frame::Frame;
pub use transform::{Matrix4x4, Transform};
pub use vec::{Vec2, Vec3, Vec3u};
