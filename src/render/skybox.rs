//! The skybox.
//!
//! A [`Skybox`] owns a [`Cubemap`] and a unit cube [`VertexArray`]. Its shader program is shared
//! with the caller through an `Rc`, so one program can serve several objects and be swapped when
//! shaders are reloaded.
//!
//! The skybox does not pick its own depth policy. The caller draws it with
//! [`DepthState::SKYBOX`](crate::abs::DepthState::SKYBOX) and a rotation-only view matrix so it
//! stays centred on the camera and behind all other geometry.

use std::{path::Path, rc::Rc};

use image::RgbaImage;

use crate::abs::{
    CubeFace, Cubemap, DrawCall, Gpu, Primitive, RenderContext, ShaderProgram, Uniforms,
    VertexArray,
};

/// Number of vertices in the cube, drawn as a triangle list without indices.
pub const CUBE_VERTEX_COUNT: i32 = 36;

/// Texture unit the cubemap is bound to. The `skybox` sampler reads from it.
pub const CUBEMAP_UNIT: u32 = 0;

#[rustfmt::skip]
const CUBE: [f32; 108] = [
    -1.0,  1.0, -1.0,   -1.0, -1.0, -1.0,    1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,    1.0,  1.0, -1.0,   -1.0,  1.0, -1.0,

    -1.0, -1.0,  1.0,   -1.0, -1.0, -1.0,   -1.0,  1.0, -1.0,
    -1.0,  1.0, -1.0,   -1.0,  1.0,  1.0,   -1.0, -1.0,  1.0,

     1.0, -1.0, -1.0,    1.0, -1.0,  1.0,    1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,    1.0,  1.0, -1.0,    1.0, -1.0, -1.0,

    -1.0, -1.0,  1.0,   -1.0,  1.0,  1.0,    1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,    1.0, -1.0,  1.0,   -1.0, -1.0,  1.0,

    -1.0,  1.0, -1.0,    1.0,  1.0, -1.0,    1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,   -1.0,  1.0,  1.0,   -1.0,  1.0, -1.0,

    -1.0, -1.0, -1.0,   -1.0, -1.0,  1.0,    1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,   -1.0, -1.0,  1.0,    1.0, -1.0,  1.0,
];

/// Why a skybox could not be created.
#[derive(Debug, Clone, PartialEq)]
pub enum SkyboxError {
    /// A face image could not be loaded or decoded.
    Image {
        face: CubeFace,
        path: String,
        message: String,
    },
    /// The device refused to create one of the skybox's objects.
    Device(String),
}

impl std::fmt::Display for SkyboxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkyboxError::Image {
                face,
                path,
                message,
            } => write!(f, "failed to load skybox face {face} from {path}: {message}"),
            SkyboxError::Device(message) => write!(f, "failed to create skybox: {message}"),
        }
    }
}

impl std::error::Error for SkyboxError {}

/// Loads the six face images, ordered +X, -X, +Y, -Y, +Z, -Z.
pub fn load_faces<P: AsRef<Path>>(paths: &[P; 6]) -> Result<[RgbaImage; 6], SkyboxError> {
    let mut faces = Vec::with_capacity(6);
    for (path, face) in paths.iter().zip(CubeFace::ALL) {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| SkyboxError::Image {
            face,
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::debug!(
            "loaded skybox face {face} ({}x{}) from {}",
            image.width(),
            image.height(),
            path.display()
        );
        faces.push(image.to_rgba8());
    }
    faces
        .try_into()
        .map_err(|_| SkyboxError::Device("expected six faces".to_string()))
}

/// Six solid faces with one color per face, for when the real images are unavailable.
///
/// Opposite faces share a hue so a wrong face order is easy to spot.
pub fn placeholder_faces(size: u32) -> [RgbaImage; 6] {
    const COLORS: [[u8; 4]; 6] = [
        [200, 60, 60, 255],
        [120, 30, 30, 255],
        [60, 200, 60, 255],
        [30, 120, 30, 255],
        [60, 60, 200, 255],
        [30, 30, 120, 255],
    ];
    COLORS.map(|color| RgbaImage::from_pixel(size.max(1), size.max(1), image::Rgba(color)))
}

pub struct Skybox {
    cubemap: Cubemap,
    cube: VertexArray,
    shader: Rc<ShaderProgram>,
}

impl Skybox {
    /// Loads six face images and builds the skybox. `shader` is shared, not owned.
    pub fn new<P: AsRef<Path>>(
        gpu: &Gpu,
        faces: &[P; 6],
        shader: Rc<ShaderProgram>,
    ) -> Result<Self, SkyboxError> {
        Self::from_images(gpu, load_faces(faces)?, shader)
    }

    /// Builds the skybox from already decoded faces, ordered +X, -X, +Y, -Y, +Z, -Z.
    pub fn from_images(
        gpu: &Gpu,
        faces: [RgbaImage; 6],
        shader: Rc<ShaderProgram>,
    ) -> Result<Self, SkyboxError> {
        let cubemap = Cubemap::new(gpu, faces).map_err(SkyboxError::Device)?;
        let cube = VertexArray::with_positions(gpu, &CUBE, 3).map_err(SkyboxError::Device)?;
        Ok(Self {
            cubemap,
            cube,
            shader,
        })
    }

    /// Draws the cube with the shared shader. `uniforms` usually carry `projection` and a
    /// rotation-only `view`.
    pub fn draw(&self, ctx: &mut RenderContext, uniforms: &Uniforms<'_>) {
        ctx.draw(DrawCall {
            array: &self.cube,
            program: &self.shader,
            uniforms,
            cubemaps: &[(CUBEMAP_UNIT, &self.cubemap)],
            primitive: Primitive::Triangles,
            first: 0,
            count: CUBE_VERTEX_COUNT,
        });
    }

    pub fn shader(&self) -> &Rc<ShaderProgram> {
        &self.shader
    }

    /// Replaces the shared shader program.
    pub fn set_shader(&mut self, shader: Rc<ShaderProgram>) {
        self.shader = shader;
    }

    pub fn cubemap(&self) -> &Cubemap {
        &self.cubemap
    }

    pub fn cube(&self) -> &VertexArray {
        &self.cube
    }
}
