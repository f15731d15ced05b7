//! Module for anything related to rendering.
//!
//! This module contains the camera, the skybox, the overlay collaborators and the frame renderer
//! that sequences them, plus the built-in shaders.

pub mod camera;
pub mod frame;
pub mod overlay;
pub mod skybox;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::abs::{Gpu, ShaderError, ShaderProgram};

/// GLSL sources of a vertex and a fragment stage.
#[derive(Clone, Copy, Debug)]
pub struct ShaderSource {
    pub vertex: &'static str,
    pub fragment: &'static str,
}

macro_rules! builtin_shader {
    ($name:ident) => {
        ShaderSource {
            vertex: include_str!(concat!("shaders/", stringify!($name), "/vert.glsl")),
            fragment: include_str!(concat!("shaders/", stringify!($name), "/frag.glsl")),
        }
    };
}

/// Shader for the scene geometry.
pub const SCENE_SHADER: ShaderSource = builtin_shader!(scene);
/// Shader for the skybox.
pub const SKYBOX_SHADER: ShaderSource = builtin_shader!(skybox);
/// Shader for the crosshair overlay.
pub const CROSSHAIR_SHADER: ShaderSource = builtin_shader!(crosshair);

/// Paths of a vertex and a fragment stage on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

/// Builds a program from `paths` when given, from `builtin` otherwise.
pub fn load_program(
    gpu: &Gpu,
    paths: Option<&ShaderPaths>,
    builtin: ShaderSource,
) -> Result<ShaderProgram, ShaderError> {
    match paths {
        Some(paths) => ShaderProgram::from_files(gpu, &paths.vertex, &paths.fragment),
        None => ShaderProgram::from_sources(gpu, builtin.vertex, builtin.fragment),
    }
}

/// Like [`load_program`], but a program from disk that fails to build is replaced by the built-in
/// one.
pub fn load_program_or_builtin(
    gpu: &Gpu,
    paths: Option<&ShaderPaths>,
    builtin: ShaderSource,
) -> Result<ShaderProgram, ShaderError> {
    match load_program(gpu, paths, builtin) {
        Ok(program) => Ok(program),
        Err(e) if paths.is_some() => {
            log::error!("{e}");
            log::warn!("falling back to the built-in shader");
            load_program(gpu, None, builtin)
        }
        Err(e) => Err(e),
    }
}
