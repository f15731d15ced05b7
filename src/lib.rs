//! A small real-time 3D viewer: a triangle under a cubemap skybox with a fly-through camera.
//!
//! [`abs`] wraps the GPU device behind the [`Backend`](abs::Backend) trait, with an OpenGL
//! implementation and a headless one that records what would have been drawn. [`render`] builds
//! the camera, the skybox, the overlays and the per-frame sequence on top of it. The window itself
//! lives in the `skyview` binary.

pub mod abs;
pub mod config;
pub mod controls;
pub mod logging;
pub mod render;
