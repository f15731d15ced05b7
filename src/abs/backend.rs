//! The GPU device seam.
//!
//! Every GPU object in this crate talks to the device through the [`Backend`] trait. The
//! [`GlBackend`](super::GlBackend) implementation drives OpenGL through `glow`, the
//! [`HeadlessBackend`](super::HeadlessBackend) keeps everything in memory and records what would
//! have been drawn.
//!
//! Backends are shared through [`Gpu`], a reference counted handle, the same way a `glow::Context`
//! is shared by every object created from it.

use std::{num::NonZero, rc::Rc};

use glam::{IVec3, Mat4, Vec2, Vec3, Vec4};
use image::RgbaImage;

/// Shared handle to the device every GPU object was created from.
pub type Gpu = Rc<dyn Backend>;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub NonZero<u32>);
    };
}

handle!(
    /// Handle to a buffer in device memory.
    BufferId
);
handle!(
    /// Handle to a vertex array object.
    VertexArrayId
);
handle!(
    /// Handle to a single compiled shader stage.
    ShaderId
);
handle!(
    /// Handle to a linked shader program.
    ProgramId
);
handle!(
    /// Handle to a texture.
    TextureId
);

/// Location of a uniform inside the program it was resolved from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// A programmable pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// How vertices are assembled into primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    Lines,
}

/// Depth comparison used when depth testing is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthFunc {
    Less,
    LessEqual,
    Always,
}

/// Depth test and depth write configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthState {
    pub test: bool,
    pub func: DepthFunc,
    pub write: bool,
}

impl DepthState {
    /// Regular opaque geometry.
    pub const OPAQUE: DepthState = DepthState {
        test: true,
        func: DepthFunc::Less,
        write: true,
    };

    /// Geometry placed on the far plane that must stay behind everything else.
    pub const SKYBOX: DepthState = DepthState {
        test: true,
        func: DepthFunc::LessEqual,
        write: false,
    };

    /// Screen space geometry composited on top of the frame.
    pub const OVERLAY: DepthState = DepthState {
        test: false,
        func: DepthFunc::Always,
        write: false,
    };
}

impl Default for DepthState {
    fn default() -> Self {
        DepthState::OPAQUE
    }
}

/// Rasterization mode for polygons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

impl PolygonMode {
    /// Returns the other mode.
    pub fn toggled(self) -> Self {
        match self {
            PolygonMode::Fill => PolygonMode::Line,
            PolygonMode::Line => PolygonMode::Fill,
        }
    }
}

/// A float vertex attribute. Stride and offset are counted in `f32` components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub index: u32,
    pub components: i32,
    pub stride: i32,
    pub offset: i32,
}

/// A value that can be uploaded to a uniform.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    IVec3(IVec3),
    Mat4(Mat4),
    Vec3Array(Vec<Vec3>),
}

/// Operations a GPU device offers to the rendering objects.
///
/// All methods take `&self`; devices are single threaded state machines and implementations use
/// interior mutability where they keep state of their own. Calls that bind or activate something
/// change what later calls act on, exactly like the underlying API.
pub trait Backend {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn create_buffer(&self) -> Result<BufferId, String>;
    /// Replaces the whole content of `buffer`.
    fn buffer_data(&self, buffer: BufferId, data: &[u8]);
    /// Reads `len` bytes back from the start of `buffer`.
    fn read_buffer(&self, buffer: BufferId, len: usize) -> Vec<u8>;
    fn delete_buffer(&self, buffer: BufferId);

    fn create_vertex_array(&self) -> Result<VertexArrayId, String>;
    /// Records `attribute` as reading from `buffer` inside `array`. Leaves no array bound.
    fn vertex_attribute(&self, array: VertexArrayId, buffer: BufferId, attribute: Attribute);
    fn bind_vertex_array(&self, array: Option<VertexArrayId>);
    fn delete_vertex_array(&self, array: VertexArrayId);

    /// Compiles one stage. The error is the compiler's info log.
    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;
    fn delete_shader(&self, shader: ShaderId);
    /// Links the given stages. The error is the linker's info log.
    fn link_program(&self, shaders: &[ShaderId]) -> Result<ProgramId, String>;
    fn use_program(&self, program: Option<ProgramId>);
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    /// Uploads `value` to the currently active program.
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue);
    fn delete_program(&self, program: ProgramId);

    /// Uploads six faces, ordered +X, -X, +Y, -Y, +Z, -Z, as one cube texture.
    fn create_cubemap(&self, faces: &[RgbaImage; 6]) -> Result<TextureId, String>;
    fn bind_cubemap(&self, unit: u32, texture: Option<TextureId>);
    fn delete_texture(&self, texture: TextureId);

    fn set_depth(&self, state: DepthState);
    fn set_polygon_mode(&self, mode: PolygonMode);
    fn viewport(&self, width: i32, height: i32);
    /// Clears color and depth.
    fn clear(&self, color: Vec4);
    fn draw_arrays(&self, primitive: Primitive, first: i32, count: i32);
}
