//! This module contains the thin GPU object layer: the device seam, vertex buffers and arrays,
//! shader programs, cube textures and the render context that sequences them.

pub mod backend;
pub mod buffer;
pub mod context;
pub mod gl;
pub mod headless;
pub mod shader;
pub mod texture;
pub mod vertex_array;

pub use backend::*;
pub use buffer::*;
pub use context::*;
pub use gl::*;
pub use headless::*;
pub use shader::*;
pub use texture::*;
pub use vertex_array::*;
