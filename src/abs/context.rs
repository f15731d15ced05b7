//! The render context.
//!
//! A GPU device has one active program, one bound vertex array and one texture per unit at any
//! time, and every call acts on whatever was bound last. [`RenderContext`] owns that state
//! explicitly: a [`DrawCall`] names everything it needs and [`RenderContext::draw`] establishes all
//! of it before drawing, so the order in which objects were bound earlier in the frame never
//! matters.

use std::rc::Rc;

use fxhash::FxHashMap;
use glam::Vec4;

use super::{
    backend::{
        DepthState, Gpu, PolygonMode, Primitive, ProgramId, TextureId, UniformValue,
        VertexArrayId,
    },
    shader::{ShaderProgram, Uniform},
    texture::Cubemap,
    vertex_array::VertexArray,
};

/// Named uniform values uploaded as part of a draw.
#[derive(Clone, Debug, Default)]
pub struct Uniforms<'a> {
    values: Vec<(&'a str, UniformValue)>,
}

impl<'a> Uniforms<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder style.
    pub fn with<T: Uniform>(mut self, name: &'a str, value: T) -> Self {
        self.set(name, value);
        self
    }

    /// Adds a value, replacing an earlier one with the same name.
    pub fn set<T: Uniform>(&mut self, name: &'a str, value: T) {
        let value = value.to_uniform();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'a str, UniformValue)> {
        self.values.iter()
    }
}

/// Everything one draw needs.
pub struct DrawCall<'a> {
    pub array: &'a VertexArray,
    pub program: &'a ShaderProgram,
    pub uniforms: &'a Uniforms<'a>,
    /// Cube textures and the unit each one is bound to.
    pub cubemaps: &'a [(u32, &'a Cubemap)],
    pub primitive: Primitive,
    pub first: i32,
    pub count: i32,
}

impl<'a> DrawCall<'a> {
    /// A triangle list over every vertex of `array`.
    pub fn triangles(
        array: &'a VertexArray,
        program: &'a ShaderProgram,
        uniforms: &'a Uniforms<'a>,
    ) -> Self {
        Self {
            array,
            program,
            uniforms,
            cubemaps: &[],
            primitive: Primitive::Triangles,
            first: 0,
            count: array.vertex_count(),
        }
    }
}

/// Owns the device's "current" state for the frame loop.
pub struct RenderContext {
    gpu: Gpu,
    program: Option<ProgramId>,
    array: Option<VertexArrayId>,
    cubemaps: FxHashMap<u32, TextureId>,
    depth: DepthState,
    polygon_mode: PolygonMode,
    viewport: (u32, u32),
    draw_calls: usize,
}

impl RenderContext {
    /// Creates a context and puts the device into a known state.
    pub fn new(gpu: &Gpu, width: u32, height: u32) -> Self {
        let mut ctx = Self {
            gpu: Rc::clone(gpu),
            program: None,
            array: None,
            cubemaps: FxHashMap::default(),
            depth: DepthState::OPAQUE,
            polygon_mode: PolygonMode::Fill,
            viewport: (width, height),
            draw_calls: 0,
        };
        ctx.gpu.set_depth(ctx.depth);
        ctx.gpu.set_polygon_mode(ctx.polygon_mode);
        ctx.resize(width, height);
        ctx
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    /// Updates the viewport after the window changed size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.gpu.viewport(width as i32, height as i32);
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Width over height of the viewport. A zero height counts as one pixel.
    pub fn aspect_ratio(&self) -> f32 {
        self.viewport.0 as f32 / self.viewport.1.max(1) as f32
    }

    /// Resets the per-frame statistics.
    pub fn begin_frame(&mut self) {
        self.draw_calls = 0;
    }

    /// Returns how many draws were issued since [`begin_frame`](Self::begin_frame).
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Clears color and depth.
    pub fn clear(&mut self, color: Vec4) {
        self.gpu.clear(color);
        // Clearing may touch the depth write mask.
        self.gpu.set_depth(self.depth);
    }

    pub fn set_depth(&mut self, depth: DepthState) {
        self.depth = depth;
        self.gpu.set_depth(depth);
    }

    pub fn depth(&self) -> DepthState {
        self.depth
    }

    pub fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.polygon_mode = mode;
        self.gpu.set_polygon_mode(mode);
    }

    pub fn polygon_mode(&self) -> PolygonMode {
        self.polygon_mode
    }

    /// Makes `program` the active program.
    pub fn use_program(&mut self, program: &ShaderProgram) {
        program.use_program();
        self.program = Some(program.id());
    }

    /// Activates `program` and sets one of its uniforms.
    pub fn set_uniform<T: Uniform>(&mut self, program: &ShaderProgram, name: &str, value: T) {
        self.use_program(program);
        program.set_uniform(name, value);
    }

    /// Returns the program the context activated last.
    pub fn current_program(&self) -> Option<ProgramId> {
        self.program
    }

    /// Returns the vertex array the context bound last.
    pub fn current_array(&self) -> Option<VertexArrayId> {
        self.array
    }

    /// Returns the cube texture the context bound to `unit` last.
    pub fn current_cubemap(&self, unit: u32) -> Option<TextureId> {
        self.cubemaps.get(&unit).copied()
    }

    /// Activates the program, uploads the uniforms, binds textures and the vertex array, then
    /// draws.
    ///
    /// Bindings are re-issued on every call. Objects created in between (or an overlay renderer
    /// that talks to the device directly) may have changed them behind the context's back.
    pub fn draw(&mut self, call: DrawCall<'_>) {
        self.use_program(call.program);
        for (name, value) in call.uniforms.iter() {
            call.program.set_uniform(name, value);
        }
        for (unit, cubemap) in call.cubemaps {
            cubemap.bind(*unit);
            self.cubemaps.insert(*unit, cubemap.id());
        }
        call.array.bind();
        self.array = Some(call.array.id());

        self.gpu.draw_arrays(call.primitive, call.first, call.count);
        self.draw_calls += 1;
    }
}
