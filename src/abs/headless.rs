//! A [`Backend`] that needs no GPU.
//!
//! [`HeadlessBackend`] models the device as an in-memory state machine: buffers keep their bytes,
//! vertex arrays keep their attribute bindings, programs keep the uniform values uploaded to them
//! and every draw call is recorded together with the state it was issued under. Shader sources are
//! not compiled; a stage is accepted when it declares a `main` function and its `uniform`
//! declarations become the program's active uniforms.

use std::{cell::RefCell, num::NonZero};

use fxhash::FxHashMap;
use glam::Vec4;
use image::RgbaImage;

use super::backend::*;

/// A draw call as the device saw it.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub program: Option<ProgramId>,
    pub array: Option<VertexArrayId>,
    /// Cube texture bound to unit 0.
    pub cubemap: Option<TextureId>,
    pub depth: DepthState,
    pub polygon_mode: PolygonMode,
    pub primitive: Primitive,
    pub first: i32,
    pub count: i32,
}

struct CompiledShader {
    stage: ShaderStage,
    uniforms: Vec<String>,
}

/// One uploaded cube face: its size and the color of its top-left pixel.
#[derive(Clone, Copy)]
struct FaceRecord {
    size: (u32, u32),
    first_pixel: [u8; 4],
}

struct LinkedProgram {
    uniforms: Vec<String>,
    values: FxHashMap<u32, UniformValue>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    buffers: FxHashMap<BufferId, Vec<u8>>,
    arrays: FxHashMap<VertexArrayId, FxHashMap<u32, (BufferId, Attribute)>>,
    shaders: FxHashMap<ShaderId, CompiledShader>,
    programs: FxHashMap<ProgramId, LinkedProgram>,
    textures: FxHashMap<TextureId, [FaceRecord; 6]>,
    bound_array: Option<VertexArrayId>,
    current_program: Option<ProgramId>,
    texture_units: FxHashMap<u32, TextureId>,
    depth: DepthState,
    polygon_mode: PolygonMode,
    viewport: (i32, i32),
    clears: Vec<Vec4>,
    draws: Vec<DrawRecord>,
    location_queries: usize,
}

impl State {
    fn next(&mut self) -> NonZero<u32> {
        self.next_id += 1;
        // Ids start at 1, so the counter can only be zero after wrapping.
        NonZero::new(self.next_id).unwrap_or(NonZero::<u32>::MIN)
    }
}

/// Extracts the names declared with the `uniform` qualifier.
fn declared_uniforms(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in source.lines() {
        let line = line.split("//").next().unwrap_or_default();
        let mut tokens = line.split_whitespace();
        if !tokens.any(|t| t == "uniform") {
            continue;
        }
        if let Some(last) = tokens.last() {
            let name = last.trim_end_matches(';');
            let name = name.split('[').next().unwrap_or(name);
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// An in-memory [`Backend`] that records everything it is asked to do.
#[derive(Default)]
pub struct HeadlessBackend {
    state: RefCell<State>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every draw recorded so far.
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    /// Returns and forgets the recorded draws.
    pub fn take_draws(&self) -> Vec<DrawRecord> {
        std::mem::take(&mut self.state.borrow_mut().draws)
    }

    /// Returns how many times the framebuffer was cleared.
    pub fn clear_count(&self) -> usize {
        self.state.borrow().clears.len()
    }

    /// Returns the color of the most recent clear.
    pub fn last_clear_color(&self) -> Option<Vec4> {
        self.state.borrow().clears.last().copied()
    }

    /// Returns the value last uploaded to `name` in `program`.
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let state = self.state.borrow();
        let linked = state.programs.get(&program)?;
        let location = linked.uniforms.iter().position(|u| u == name)?;
        linked.values.get(&(location as u32)).cloned()
    }

    /// Returns how many uniform location lookups reached the device.
    pub fn location_queries(&self) -> usize {
        self.state.borrow().location_queries
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.state.borrow().current_program
    }

    pub fn bound_array(&self) -> Option<VertexArrayId> {
        self.state.borrow().bound_array
    }

    pub fn depth(&self) -> DepthState {
        self.state.borrow().depth
    }

    pub fn polygon_mode(&self) -> PolygonMode {
        self.state.borrow().polygon_mode
    }

    pub fn viewport(&self) -> (i32, i32) {
        self.state.borrow().viewport
    }

    /// Returns the face sizes of a cube texture, in upload order.
    pub fn cubemap_faces(&self, texture: TextureId) -> Option<[(u32, u32); 6]> {
        let state = self.state.borrow();
        let faces = state.textures.get(&texture)?;
        Some(faces.map(|f| f.size))
    }

    /// Returns the top-left pixel of each face of a cube texture, in upload order.
    pub fn cubemap_face_pixels(&self, texture: TextureId) -> Option<[[u8; 4]; 6]> {
        let state = self.state.borrow();
        let faces = state.textures.get(&texture)?;
        Some(faces.map(|f| f.first_pixel))
    }

    /// Returns the number of device objects that have not been deleted.
    pub fn live_objects(&self) -> usize {
        let state = self.state.borrow();
        state.buffers.len()
            + state.arrays.len()
            + state.shaders.len()
            + state.programs.len()
            + state.textures.len()
    }

    /// Fetches attribute `index` of vertices `first..first + count` the way a draw from `array`
    /// would read them.
    pub fn fetch_attribute(
        &self,
        array: VertexArrayId,
        index: u32,
        first: i32,
        count: i32,
    ) -> Vec<Vec<f32>> {
        let state = self.state.borrow();
        let Some((buffer, attribute)) = state
            .arrays
            .get(&array)
            .and_then(|bindings| bindings.get(&index))
        else {
            return Vec::new();
        };
        let Some(bytes) = state.buffers.get(buffer) else {
            return Vec::new();
        };
        let floats: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes[..bytes.len() / 4 * 4]);

        let mut vertices = Vec::with_capacity(count.max(0) as usize);
        for vertex in first..first + count {
            let start = (vertex * attribute.stride + attribute.offset) as usize;
            let end = start + attribute.components as usize;
            match floats.get(start..end) {
                Some(values) => vertices.push(values.to_vec()),
                None => break,
            }
        }
        vertices
    }
}

impl Backend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_buffer(&self) -> Result<BufferId, String> {
        let mut state = self.state.borrow_mut();
        let id = BufferId(state.next());
        state.buffers.insert(id, Vec::new());
        Ok(id)
    }

    fn buffer_data(&self, buffer: BufferId, data: &[u8]) {
        if let Some(bytes) = self.state.borrow_mut().buffers.get_mut(&buffer) {
            *bytes = data.to_vec();
        }
    }

    fn read_buffer(&self, buffer: BufferId, len: usize) -> Vec<u8> {
        let state = self.state.borrow();
        let bytes = state.buffers.get(&buffer).map(Vec::as_slice).unwrap_or_default();
        bytes[..len.min(bytes.len())].to_vec()
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.state.borrow_mut().buffers.remove(&buffer);
    }

    fn create_vertex_array(&self) -> Result<VertexArrayId, String> {
        let mut state = self.state.borrow_mut();
        let id = VertexArrayId(state.next());
        state.arrays.insert(id, FxHashMap::default());
        Ok(id)
    }

    fn vertex_attribute(&self, array: VertexArrayId, buffer: BufferId, attribute: Attribute) {
        let mut state = self.state.borrow_mut();
        if let Some(bindings) = state.arrays.get_mut(&array) {
            bindings.insert(attribute.index, (buffer, attribute));
        }
        state.bound_array = None;
    }

    fn bind_vertex_array(&self, array: Option<VertexArrayId>) {
        self.state.borrow_mut().bound_array = array;
    }

    fn delete_vertex_array(&self, array: VertexArrayId) {
        let mut state = self.state.borrow_mut();
        state.arrays.remove(&array);
        if state.bound_array == Some(array) {
            state.bound_array = None;
        }
    }

    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        if !source.contains("void main") {
            return Err(format!("0:1: {stage} shader has no entry point `main`"));
        }
        let mut state = self.state.borrow_mut();
        let id = ShaderId(state.next());
        state.shaders.insert(
            id,
            CompiledShader {
                stage,
                uniforms: declared_uniforms(source),
            },
        );
        Ok(id)
    }

    fn delete_shader(&self, shader: ShaderId) {
        self.state.borrow_mut().shaders.remove(&shader);
    }

    fn link_program(&self, shaders: &[ShaderId]) -> Result<ProgramId, String> {
        let mut state = self.state.borrow_mut();
        let mut uniforms: Vec<String> = Vec::new();
        let mut vertex = 0;
        let mut fragment = 0;
        for shader in shaders {
            let compiled = state
                .shaders
                .get(shader)
                .ok_or_else(|| format!("shader {:?} is not a compiled shader", shader))?;
            match compiled.stage {
                ShaderStage::Vertex => vertex += 1,
                ShaderStage::Fragment => fragment += 1,
            }
            for name in &compiled.uniforms {
                if !uniforms.contains(name) {
                    uniforms.push(name.clone());
                }
            }
        }
        if vertex != 1 || fragment != 1 {
            return Err(format!(
                "program needs exactly one vertex and one fragment stage, got {vertex} and {fragment}"
            ));
        }

        let id = ProgramId(state.next());
        state.programs.insert(
            id,
            LinkedProgram {
                uniforms,
                values: FxHashMap::default(),
            },
        );
        Ok(id)
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().current_program = program;
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let mut state = self.state.borrow_mut();
        state.location_queries += 1;
        let linked = state.programs.get(&program)?;
        linked
            .uniforms
            .iter()
            .position(|u| u == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let mut state = self.state.borrow_mut();
        let Some(program) = state.current_program else {
            return;
        };
        if let Some(linked) = state.programs.get_mut(&program)
            && (location.0 as usize) < linked.uniforms.len()
        {
            linked.values.insert(location.0, value.clone());
        }
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        if state.current_program == Some(program) {
            state.current_program = None;
        }
    }

    fn create_cubemap(&self, faces: &[RgbaImage; 6]) -> Result<TextureId, String> {
        let mut state = self.state.borrow_mut();
        let id = TextureId(state.next());
        let records = faces.each_ref().map(|face| FaceRecord {
            size: face.dimensions(),
            first_pixel: face.get_pixel_checked(0, 0).map(|p| p.0).unwrap_or_default(),
        });
        state.textures.insert(id, records);
        Ok(id)
    }

    fn bind_cubemap(&self, unit: u32, texture: Option<TextureId>) {
        let mut state = self.state.borrow_mut();
        match texture {
            Some(texture) => state.texture_units.insert(unit, texture),
            None => state.texture_units.remove(&unit),
        };
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&texture);
        state.texture_units.retain(|_, t| *t != texture);
    }

    fn set_depth(&self, depth: DepthState) {
        self.state.borrow_mut().depth = depth;
    }

    fn set_polygon_mode(&self, mode: PolygonMode) {
        self.state.borrow_mut().polygon_mode = mode;
    }

    fn viewport(&self, width: i32, height: i32) {
        self.state.borrow_mut().viewport = (width, height);
    }

    fn clear(&self, color: Vec4) {
        self.state.borrow_mut().clears.push(color);
    }

    fn draw_arrays(&self, primitive: Primitive, first: i32, count: i32) {
        let mut state = self.state.borrow_mut();
        let record = DrawRecord {
            program: state.current_program,
            array: state.bound_array,
            cubemap: state.texture_units.get(&0).copied(),
            depth: state.depth,
            polygon_mode: state.polygon_mode,
            primitive,
            first,
            count,
        };
        state.draws.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_uniforms() {
        let source = "#version 330 core\n\
                      uniform mat4 projection;\n\
                      uniform mat4 view; // camera\n\
                      uniform vec3 lights[4];\n\
                      // uniform float disabled;\n\
                      void main() {}";
        assert_eq!(declared_uniforms(source), vec!["projection", "view", "lights"]);
    }

    #[test]
    fn test_link_requires_both_stages() {
        let gpu = HeadlessBackend::new();
        let vert = gpu
            .create_shader(ShaderStage::Vertex, "void main() {}")
            .unwrap();
        let err = gpu.link_program(&[vert]).unwrap_err();
        assert!(err.contains("exactly one vertex and one fragment"));
    }

    #[test]
    fn test_uniform_without_program_is_ignored() {
        let gpu = HeadlessBackend::new();
        let vert = gpu
            .create_shader(ShaderStage::Vertex, "uniform float t;\nvoid main() {}")
            .unwrap();
        let frag = gpu
            .create_shader(ShaderStage::Fragment, "void main() {}")
            .unwrap();
        let program = gpu.link_program(&[vert, frag]).unwrap();
        let location = gpu.uniform_location(program, "t").unwrap();

        gpu.set_uniform(location, &UniformValue::Float(1.0));
        assert_eq!(gpu.uniform(program, "t"), None);

        gpu.use_program(Some(program));
        gpu.set_uniform(location, &UniformValue::Float(1.0));
        assert_eq!(gpu.uniform(program, "t"), Some(UniformValue::Float(1.0)));
    }
}
