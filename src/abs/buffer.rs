//! Vertex buffers.
//!
//! A [`VertexBuffer`] is raw vertex data in device memory together with the [`VertexLayout`] that
//! says how a vertex shader should read it. The layout is not checked against any shader; a
//! mismatch renders garbage without an error.

use std::rc::Rc;

use super::backend::{Attribute, BufferId, Gpu};

/// Attribute declarations for one buffer, kept sorted by attribute index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexLayout {
    attributes: Vec<Attribute>,
}

impl VertexLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an attribute, replacing an earlier declaration with the same index.
    pub fn set(&mut self, attribute: Attribute) {
        match self
            .attributes
            .binary_search_by_key(&attribute.index, |a| a.index)
        {
            Ok(i) => self.attributes[i] = attribute,
            Err(i) => self.attributes.insert(i, attribute),
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns the stride of the layout in `f32` components, taken from its first attribute.
    pub fn stride(&self) -> Option<i32> {
        self.attributes.first().map(|a| a.stride)
    }
}

/// Represents a buffer of vertex data stored on the GPU side.
pub struct VertexBuffer {
    gpu: Gpu,
    id: BufferId,
    layout: VertexLayout,
    len: usize,
}

impl VertexBuffer {
    /// Creates an empty buffer.
    pub fn new(gpu: &Gpu) -> Result<Self, String> {
        let id = gpu.create_buffer()?;
        Ok(Self {
            gpu: Rc::clone(gpu),
            id,
            layout: VertexLayout::new(),
            len: 0,
        })
    }

    /// Creates a buffer holding `vertices`.
    pub fn with_floats(gpu: &Gpu, vertices: &[f32]) -> Result<Self, String> {
        let mut buffer = Self::new(gpu)?;
        buffer.set_floats(vertices);
        Ok(buffer)
    }

    /// Uploads raw vertex data, replacing any previous content.
    pub fn set_data(&mut self, data: &[u8]) {
        self.gpu.buffer_data(self.id, data);
        self.len = data.len();
    }

    /// Uploads `f32` vertex data, replacing any previous content.
    pub fn set_floats(&mut self, vertices: &[f32]) {
        self.set_data(bytemuck::cast_slice(vertices));
    }

    /// Declares how shader input `index` reads this buffer. `stride` and `offset` are counted in
    /// `f32` components.
    ///
    /// Declarations only take effect inside a [`VertexArray`](super::VertexArray) once the buffer
    /// is attached to it.
    pub fn set_attributes(&mut self, index: u32, components: i32, stride: i32, offset: i32) {
        self.layout.set(Attribute {
            index,
            components,
            stride,
            offset,
        });
    }

    /// Reads the buffer's content back from the device.
    pub fn read_back(&self) -> Vec<u8> {
        self.gpu.read_buffer(self.id, self.len)
    }

    /// Reads the buffer's content back from the device as `f32`s.
    pub fn read_back_floats(&self) -> Vec<f32> {
        let bytes = self.read_back();
        bytemuck::pod_collect_to_vec(&bytes[..bytes.len() / 4 * 4])
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// Returns the size of the uploaded data in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        self.gpu.delete_buffer(self.id);
    }
}
