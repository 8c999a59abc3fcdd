//! Core types: math re-exports, model poses, camera.

pub use glam::{Mat4, Vec3, vec3};

pub mod camera;
pub mod transform;
