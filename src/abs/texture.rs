//! Cube textures.
//!
//! The module provides the [`Cubemap`] struct, six square images forming the inside of a cube and
//! sampled by direction.

use std::rc::Rc;

use image::{RgbaImage, imageops::FilterType};

use super::backend::{Gpu, TextureId};

/// One face of a cube texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    /// All faces in upload order. Swapping any two of them produces visibly wrong seams.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];
}

impl std::fmt::Display for CubeFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CubeFace::PositiveX => "+X",
            CubeFace::NegativeX => "-X",
            CubeFace::PositiveY => "+Y",
            CubeFace::NegativeY => "-Y",
            CubeFace::PositiveZ => "+Z",
            CubeFace::NegativeZ => "-Z",
        };
        write!(f, "{name}")
    }
}

/// Represents a cube texture stored on the GPU side.
pub struct Cubemap {
    gpu: Gpu,
    id: TextureId,
    size: (u32, u32),
}

impl Cubemap {
    /// Uploads six faces ordered like [`CubeFace::ALL`].
    ///
    /// Cube faces must be square and share one size. The side is the longer edge of the first
    /// face, and every face of another size is resized to it.
    pub fn new(gpu: &Gpu, faces: [RgbaImage; 6]) -> Result<Self, String> {
        let (width, height) = faces[0].dimensions();
        if width == 0 || height == 0 {
            return Err(format!("cubemap face {} is empty", CubeFace::PositiveX));
        }
        let side = width.max(height);
        let size = (side, side);

        let faces = faces.into_iter().zip(CubeFace::ALL).map(|(image, face)| {
            if image.dimensions() == size {
                image
            } else {
                log::warn!(
                    "resizing cubemap face {face} from {:?} to {:?}",
                    image.dimensions(),
                    size
                );
                image::imageops::resize(&image, size.0, size.1, FilterType::Triangle)
            }
        });
        let faces: [RgbaImage; 6] = faces
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|_| "cubemap needs exactly six faces".to_string())?;

        let id = gpu.create_cubemap(&faces)?;
        Ok(Self {
            gpu: Rc::clone(gpu),
            id,
            size,
        })
    }

    /// Binds the cubemap to the specified texture unit.
    pub fn bind(&self, unit: u32) {
        self.gpu.bind_cubemap(unit, Some(self.id));
    }

    /// Returns the size shared by all faces.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn id(&self) -> TextureId {
        self.id
    }
}

impl Drop for Cubemap {
    fn drop(&mut self) {
        self.gpu.delete_texture(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abs::HeadlessBackend;

    fn faces(sizes: [u32; 6]) -> [RgbaImage; 6] {
        sizes.map(|s| RgbaImage::new(s, s))
    }

    #[test]
    fn test_mismatched_faces_are_resized() {
        let headless = Rc::new(HeadlessBackend::new());
        let gpu: Gpu = headless.clone();
        let cubemap = Cubemap::new(&gpu, faces([4, 4, 8, 4, 2, 4])).unwrap();

        assert_eq!(cubemap.size(), (4, 4));
        assert_eq!(headless.cubemap_faces(cubemap.id()), Some([(4, 4); 6]));
    }

    #[test]
    fn test_non_square_faces_become_square() {
        let headless = Rc::new(HeadlessBackend::new());
        let gpu: Gpu = headless.clone();
        let cubemap = Cubemap::new(&gpu, std::array::from_fn(|_| RgbaImage::new(8, 4))).unwrap();

        assert_eq!(cubemap.size(), (8, 8));
        assert_eq!(headless.cubemap_faces(cubemap.id()), Some([(8, 8); 6]));
    }

    #[test]
    fn test_faces_upload_in_order() {
        let headless = Rc::new(HeadlessBackend::new());
        let gpu: Gpu = headless.clone();
        let faces: [RgbaImage; 6] = std::array::from_fn(|i| {
            RgbaImage::from_pixel(2, 2, image::Rgba([i as u8 * 10, 0, 0, 255]))
        });
        let cubemap = Cubemap::new(&gpu, faces).unwrap();

        let reds = headless
            .cubemap_face_pixels(cubemap.id())
            .unwrap()
            .map(|pixel| pixel[0]);
        assert_eq!(reds, [0, 10, 20, 30, 40, 50]);
    }

    #[test]
    fn test_empty_face_is_rejected() {
        let gpu: Gpu = Rc::new(HeadlessBackend::new());
        assert!(Cubemap::new(&gpu, faces([0, 4, 4, 4, 4, 4])).is_err());
    }

    #[test]
    fn test_face_order() {
        assert_eq!(CubeFace::ALL[0], CubeFace::PositiveX);
        assert_eq!(CubeFace::ALL[5], CubeFace::NegativeZ);
        let names: Vec<String> = CubeFace::ALL.iter().map(|f| f.to_string()).collect();
        assert_eq!(names, vec!["+X", "-X", "+Y", "-Y", "+Z", "-Z"]);
    }
}
