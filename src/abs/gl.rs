//! OpenGL implementation of [`Backend`] on top of `glow`.

use std::sync::Arc;

use glam::Vec4;
use glow::HasContext;
use image::RgbaImage;

use super::backend::*;

/// A [`Backend`] that forwards every call to an OpenGL context.
pub struct GlBackend {
    gl: Arc<glow::Context>,
}

impl GlBackend {
    /// Wraps a context that is already current on this thread.
    pub fn new(gl: &Arc<glow::Context>) -> Self {
        Self { gl: Arc::clone(gl) }
    }

    /// Returns the underlying context.
    pub fn context(&self) -> &Arc<glow::Context> {
        &self.gl
    }
}

fn primitive(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::Lines => glow::LINES,
    }
}

fn depth_func(func: DepthFunc) -> u32 {
    match func {
        DepthFunc::Less => glow::LESS,
        DepthFunc::LessEqual => glow::LEQUAL,
        DepthFunc::Always => glow::ALWAYS,
    }
}

impl Backend for GlBackend {
    fn name(&self) -> &'static str {
        "opengl"
    }

    fn create_buffer(&self) -> Result<BufferId, String> {
        unsafe { self.gl.create_buffer().map(|b| BufferId(b.0)) }
    }

    fn buffer_data(&self, buffer: BufferId, data: &[u8]) {
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(glow::NativeBuffer(buffer.0)));
            self.gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn read_buffer(&self, buffer: BufferId, len: usize) -> Vec<u8> {
        let mut data = vec![0; len];
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(glow::NativeBuffer(buffer.0)));
            self.gl.get_buffer_sub_data(glow::ARRAY_BUFFER, 0, &mut data);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
        data
    }

    fn delete_buffer(&self, buffer: BufferId) {
        unsafe {
            self.gl.delete_buffer(glow::NativeBuffer(buffer.0));
        }
    }

    fn create_vertex_array(&self) -> Result<VertexArrayId, String> {
        unsafe { self.gl.create_vertex_array().map(|a| VertexArrayId(a.0)) }
    }

    fn vertex_attribute(&self, array: VertexArrayId, buffer: BufferId, attribute: Attribute) {
        let float = std::mem::size_of::<f32>() as i32;
        unsafe {
            self.gl.bind_vertex_array(Some(glow::NativeVertexArray(array.0)));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(glow::NativeBuffer(buffer.0)));
            self.gl.enable_vertex_attrib_array(attribute.index);
            self.gl.vertex_attrib_pointer_f32(
                attribute.index,
                attribute.components,
                glow::FLOAT,
                false,
                attribute.stride * float,
                attribute.offset * float,
            );
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn bind_vertex_array(&self, array: Option<VertexArrayId>) {
        unsafe {
            self.gl.bind_vertex_array(array.map(|a| glow::NativeVertexArray(a.0)));
        }
    }

    fn delete_vertex_array(&self, array: VertexArrayId) {
        unsafe {
            self.gl.delete_vertex_array(glow::NativeVertexArray(array.0));
        }
    }

    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        let shader_type = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.gl.create_shader(shader_type)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);

            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(log);
            }

            Ok(ShaderId(shader.0))
        }
    }

    fn delete_shader(&self, shader: ShaderId) {
        unsafe {
            self.gl.delete_shader(glow::NativeShader(shader.0));
        }
    }

    fn link_program(&self, shaders: &[ShaderId]) -> Result<ProgramId, String> {
        unsafe {
            let program = self.gl.create_program()?;

            for shader in shaders {
                self.gl.attach_shader(program, glow::NativeShader(shader.0));
            }

            self.gl.link_program(program);

            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(log);
            }

            for shader in shaders {
                self.gl.detach_shader(program, glow::NativeShader(shader.0));
            }

            Ok(ProgramId(program.0))
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        unsafe {
            self.gl.use_program(program.map(|p| glow::NativeProgram(p.0)));
        }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.gl
                .get_uniform_location(glow::NativeProgram(program.0), name)
                .map(|loc| UniformLocation(loc.0))
        }
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let loc = glow::NativeUniformLocation(location.0);
        let loc = Some(&loc);
        unsafe {
            match value {
                UniformValue::Bool(v) => self.gl.uniform_1_i32(loc, *v as i32),
                UniformValue::Int(v) => self.gl.uniform_1_i32(loc, *v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(loc, *v),
                UniformValue::Vec2(v) => self.gl.uniform_2_f32(loc, v.x, v.y),
                UniformValue::Vec3(v) => self.gl.uniform_3_f32(loc, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.gl.uniform_4_f32(loc, v.x, v.y, v.z, v.w),
                UniformValue::IVec3(v) => self.gl.uniform_3_i32(loc, v.x, v.y, v.z),
                UniformValue::Mat4(m) => self.gl.uniform_matrix_4_f32_slice(loc, false, m.as_ref()),
                UniformValue::Vec3Array(vecs) => {
                    let mut data = Vec::with_capacity(vecs.len() * 3);
                    for vec in vecs {
                        data.extend_from_slice(&[vec.x, vec.y, vec.z]);
                    }
                    self.gl.uniform_3_f32_slice(loc, &data);
                }
            }
        }
    }

    fn delete_program(&self, program: ProgramId) {
        unsafe {
            self.gl.delete_program(glow::NativeProgram(program.0));
        }
    }

    fn create_cubemap(&self, faces: &[RgbaImage; 6]) -> Result<TextureId, String> {
        unsafe {
            let texture = self.gl.create_texture()?;
            self.gl.bind_texture(glow::TEXTURE_CUBE_MAP, Some(texture));
            for (i, face) in faces.iter().enumerate() {
                self.gl.tex_image_2d(
                    glow::TEXTURE_CUBE_MAP_POSITIVE_X + i as u32,
                    0,
                    glow::RGBA as i32,
                    face.width() as i32,
                    face.height() as i32,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(Some(face.as_raw().as_slice())),
                );
            }
            for (param, value) in [
                (glow::TEXTURE_MIN_FILTER, glow::LINEAR),
                (glow::TEXTURE_MAG_FILTER, glow::LINEAR),
                (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
                (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
                (glow::TEXTURE_WRAP_R, glow::CLAMP_TO_EDGE),
            ] {
                self.gl.tex_parameter_i32(glow::TEXTURE_CUBE_MAP, param, value as i32);
            }
            self.gl.bind_texture(glow::TEXTURE_CUBE_MAP, None);

            Ok(TextureId(texture.0))
        }
    }

    fn bind_cubemap(&self, unit: u32, texture: Option<TextureId>) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(
                glow::TEXTURE_CUBE_MAP,
                texture.map(|t| glow::NativeTexture(t.0)),
            );
        }
    }

    fn delete_texture(&self, texture: TextureId) {
        unsafe {
            self.gl.delete_texture(glow::NativeTexture(texture.0));
        }
    }

    fn set_depth(&self, state: DepthState) {
        unsafe {
            if state.test {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
            self.gl.depth_func(depth_func(state.func));
            self.gl.depth_mask(state.write);
        }
    }

    fn set_polygon_mode(&self, mode: PolygonMode) {
        let mode = match mode {
            PolygonMode::Fill => glow::FILL,
            PolygonMode::Line => glow::LINE,
        };
        unsafe {
            self.gl.polygon_mode(glow::FRONT_AND_BACK, mode);
        }
    }

    fn viewport(&self, width: i32, height: i32) {
        unsafe {
            self.gl.viewport(0, 0, width, height);
        }
    }

    fn clear(&self, color: Vec4) {
        unsafe {
            // Depth writes must be on for the depth clear to take effect.
            self.gl.depth_mask(true);
            self.gl.clear_color(color.x, color.y, color.z, color.w);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn draw_arrays(&self, primitive_type: Primitive, first: i32, count: i32) {
        unsafe {
            self.gl.draw_arrays(primitive(primitive_type), first, count);
        }
    }
}
