//! Shaders
//!
//! This module defines the [`Shader`] and [`ShaderProgram`] structs for managing shaders.
//! This module also provides the [`Uniform`] trait for converting values into uniform uploads.
//!
//! Failures are reported as a [`ShaderError`] carrying the stage and the compiler or linker log;
//! whether that aborts the program or falls back to another shader is up to the caller.

use std::{cell::RefCell, path::Path, rc::Rc};

use fxhash::FxHashMap;
use glam::{IVec3, Mat4, Vec2, Vec3, Vec4};

use super::backend::{Gpu, ProgramId, ShaderId, ShaderStage, UniformLocation, UniformValue};

/// Why a shader or program could not be built.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    /// The source file of a stage could not be read.
    Io {
        stage: ShaderStage,
        path: String,
        message: String,
    },
    /// A stage failed to compile.
    Compile { stage: ShaderStage, log: String },
    /// The stages failed to link.
    Link { log: String },
    /// The device refused to create an object the program needs.
    Device(String),
}

impl std::fmt::Display for ShaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderError::Io {
                stage,
                path,
                message,
            } => write!(f, "failed to read {stage} shader {path}: {message}"),
            ShaderError::Compile { stage, log } => {
                write!(f, "{stage} shader failed to compile: {}", log.trim_end())
            }
            ShaderError::Link { log } => {
                write!(f, "shader program failed to link: {}", log.trim_end())
            }
            ShaderError::Device(message) => write!(f, "device error: {message}"),
        }
    }
}

impl std::error::Error for ShaderError {}

/// Represents an individual compiled shader stage.
pub struct Shader {
    gpu: Gpu,
    id: ShaderId,
    stage: ShaderStage,
}

impl Shader {
    /// Compiles a new shader from the given source code.
    pub fn new(gpu: &Gpu, stage: ShaderStage, source: &str) -> Result<Self, ShaderError> {
        let id = gpu
            .create_shader(stage, source)
            .map_err(|log| ShaderError::Compile { stage, log })?;
        Ok(Self {
            gpu: Rc::clone(gpu),
            id,
            stage,
        })
    }

    /// Reads and compiles a shader from a file.
    pub fn from_file(
        gpu: &Gpu,
        stage: ShaderStage,
        path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ShaderError::Io {
            stage,
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::new(gpu, stage, &source)
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.gpu.delete_shader(self.id);
    }
}

/// A value that can be set as a uniform variable.
pub trait Uniform {
    fn to_uniform(&self) -> UniformValue;
}

impl Uniform for bool {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Bool(*self)
    }
}

impl Uniform for f32 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Float(*self)
    }
}

impl Uniform for i32 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Int(*self)
    }
}

impl Uniform for Vec2 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Vec2(*self)
    }
}

impl Uniform for Vec3 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Vec3(*self)
    }
}

impl Uniform for IVec3 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::IVec3(*self)
    }
}

impl Uniform for Vec4 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Vec4(*self)
    }
}

impl Uniform for Mat4 {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Mat4(*self)
    }
}

impl<const N: usize> Uniform for [Vec3; N] {
    fn to_uniform(&self) -> UniformValue {
        UniformValue::Vec3Array(self.to_vec())
    }
}

impl Uniform for UniformValue {
    fn to_uniform(&self) -> UniformValue {
        self.clone()
    }
}

impl<T: Uniform> Uniform for &T {
    fn to_uniform(&self) -> UniformValue {
        (*self).to_uniform()
    }
}

/// Represents a linked shader program composed of a vertex and a fragment stage.
///
/// Uniform locations are looked up on first use and cached by name, including names the program
/// does not have.
pub struct ShaderProgram {
    gpu: Gpu,
    id: ProgramId,
    locations: RefCell<FxHashMap<String, Option<UniformLocation>>>,
}

impl ShaderProgram {
    /// Links a new shader program from the given shaders.
    pub fn new(gpu: &Gpu, shaders: &[&Shader]) -> Result<Self, ShaderError> {
        let ids: Vec<ShaderId> = shaders.iter().map(|s| s.id).collect();
        let id = gpu
            .link_program(&ids)
            .map_err(|log| ShaderError::Link { log })?;
        Ok(Self {
            gpu: Rc::clone(gpu),
            id,
            locations: RefCell::new(FxHashMap::default()),
        })
    }

    /// Compiles both stages and links them.
    pub fn from_sources(gpu: &Gpu, vertex: &str, fragment: &str) -> Result<Self, ShaderError> {
        let vert = Shader::new(gpu, ShaderStage::Vertex, vertex)?;
        let frag = Shader::new(gpu, ShaderStage::Fragment, fragment)?;
        Self::new(gpu, &[&vert, &frag])
    }

    /// Reads both stages from disk, compiles and links them.
    pub fn from_files(
        gpu: &Gpu,
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let vert = Shader::from_file(gpu, ShaderStage::Vertex, vertex)?;
        let frag = Shader::from_file(gpu, ShaderStage::Fragment, fragment)?;
        Self::new(gpu, &[&vert, &frag])
    }

    /// Makes this program the device's active program.
    ///
    /// Prefer going through [`RenderContext`](super::RenderContext), which activates programs for
    /// you.
    pub fn use_program(&self) {
        self.gpu.use_program(Some(self.id));
    }

    /// Returns the location of `name`, asking the device only the first time.
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        if let Some(location) = self.locations.borrow().get(name) {
            return *location;
        }
        let location = self.gpu.uniform_location(self.id, name);
        if location.is_none() {
            log::debug!("program {:?} has no active uniform `{name}`", self.id);
        }
        self.locations
            .borrow_mut()
            .insert(name.to_string(), location);
        location
    }

    /// Sets a uniform variable. The program must be the active one; unknown names are ignored.
    pub fn set_uniform<T: Uniform>(&self, name: &str, value: T) {
        if let Some(location) = self.location(name) {
            self.gpu.set_uniform(location, &value.to_uniform());
        }
    }

    /// Sets a `mat4` uniform. The program must be the active one.
    pub fn set_mat4(&self, name: &str, value: Mat4) {
        self.set_uniform(name, value);
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.gpu.delete_program(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abs::HeadlessBackend;

    const VERT: &str = "#version 330 core\n\
                        layout (location = 0) in vec3 a_pos;\n\
                        uniform mat4 projection;\n\
                        uniform mat4 view;\n\
                        void main() { gl_Position = projection * view * vec4(a_pos, 1.0); }";
    const FRAG: &str = "#version 330 core\n\
                        out vec4 frag_color;\n\
                        uniform vec4 tint;\n\
                        void main() { frag_color = tint; }";

    fn headless() -> (Rc<HeadlessBackend>, Gpu) {
        let headless = Rc::new(HeadlessBackend::new());
        let gpu: Gpu = headless.clone();
        (headless, gpu)
    }

    #[test]
    fn test_compile_error_carries_stage_and_log() {
        let (_, gpu) = headless();
        let err = ShaderProgram::from_sources(&gpu, VERT, "not glsl").err().unwrap();
        match &err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(*stage, ShaderStage::Fragment);
                assert!(log.contains("main"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().starts_with("fragment shader failed to compile"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let (_, gpu) = headless();
        let err = ShaderProgram::from_files(&gpu, "/nonexistent/a.vs", "/nonexistent/a.fs")
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ShaderError::Io {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn test_failed_build_leaks_nothing() {
        let (headless, gpu) = headless();
        let _ = ShaderProgram::from_sources(&gpu, VERT, "broken");
        assert_eq!(headless.live_objects(), 0);
    }

    #[test]
    fn test_locations_are_cached() {
        let (headless, gpu) = headless();
        let program = ShaderProgram::from_sources(&gpu, VERT, FRAG).unwrap();
        program.use_program();

        program.set_mat4("projection", Mat4::IDENTITY);
        program.set_mat4("projection", Mat4::IDENTITY);
        program.set_uniform("missing", 1.0f32);
        program.set_uniform("missing", 2.0f32);

        assert_eq!(headless.location_queries(), 2);
        assert_eq!(
            headless.uniform(program.id(), "projection"),
            Some(UniformValue::Mat4(Mat4::IDENTITY))
        );
    }

    #[test]
    fn test_program_state_isolation() {
        let (headless, gpu) = headless();
        let a = ShaderProgram::from_sources(&gpu, VERT, FRAG).unwrap();
        let b = ShaderProgram::from_sources(&gpu, VERT, FRAG).unwrap();

        a.use_program();
        a.set_uniform("tint", Vec4::new(1.0, 0.0, 0.0, 1.0));
        b.use_program();
        b.set_uniform("tint", Vec4::new(0.0, 0.0, 1.0, 1.0));

        assert_eq!(
            headless.uniform(a.id(), "tint"),
            Some(UniformValue::Vec4(Vec4::new(1.0, 0.0, 0.0, 1.0)))
        );
        assert_eq!(
            headless.uniform(b.id(), "tint"),
            Some(UniformValue::Vec4(Vec4::new(0.0, 0.0, 1.0, 1.0)))
        );
    }
}
