//! Vertex arrays.
//!
//! A [`VertexArray`] owns the buffers it reads from and binds their attribute layouts into a
//! single drawable handle.

use std::rc::Rc;

use super::{
    backend::{Attribute, Gpu, VertexArrayId},
    buffer::VertexBuffer,
};

/// Represents a vertex array object together with the buffers it reads from.
pub struct VertexArray {
    gpu: Gpu,
    id: VertexArrayId,
    buffers: Vec<VertexBuffer>,
}

impl VertexArray {
    /// Creates an empty vertex array.
    pub fn new(gpu: &Gpu) -> Result<Self, String> {
        let id = gpu.create_vertex_array()?;
        Ok(Self {
            gpu: Rc::clone(gpu),
            id,
            buffers: Vec::new(),
        })
    }

    /// Creates a vertex array reading tightly packed positions with `components` floats each from
    /// attribute 0.
    pub fn with_positions(gpu: &Gpu, positions: &[f32], components: i32) -> Result<Self, String> {
        let mut buffer = VertexBuffer::with_floats(gpu, positions)?;
        buffer.set_attributes(0, components, components, 0);
        let mut array = Self::new(gpu)?;
        array.attach(buffer);
        Ok(array)
    }

    /// Takes ownership of `buffer` and applies every attribute declared on it. Returns the slot
    /// of the buffer inside this array.
    pub fn attach(&mut self, buffer: VertexBuffer) -> usize {
        for attribute in buffer.layout().attributes() {
            self.gpu.vertex_attribute(self.id, buffer.id(), *attribute);
        }
        self.buffers.push(buffer);
        self.buffers.len() - 1
    }

    /// Declares and applies an attribute for the buffer in `slot`. Does nothing for an unknown
    /// slot.
    pub fn set_attributes(
        &mut self,
        slot: usize,
        index: u32,
        components: i32,
        stride: i32,
        offset: i32,
    ) {
        let Some(buffer) = self.buffers.get_mut(slot) else {
            log::warn!("vertex array has no buffer in slot {slot}");
            return;
        };
        buffer.set_attributes(index, components, stride, offset);
        self.gpu.vertex_attribute(
            self.id,
            buffer.id(),
            Attribute {
                index,
                components,
                stride,
                offset,
            },
        );
    }

    /// Makes this array the device's current draw source.
    ///
    /// Prefer [`RenderContext::draw`](super::RenderContext::draw), which binds for you.
    pub fn bind(&self) {
        self.gpu.bind_vertex_array(Some(self.id));
    }

    pub fn buffer(&self, slot: usize) -> Option<&VertexBuffer> {
        self.buffers.get(slot)
    }

    pub fn buffers(&self) -> &[VertexBuffer] {
        &self.buffers
    }

    /// Returns the number of whole vertices in the first buffer according to its layout.
    pub fn vertex_count(&self) -> i32 {
        let Some(buffer) = self.buffers.first() else {
            return 0;
        };
        match buffer.layout().stride() {
            Some(stride) if stride > 0 => {
                (buffer.len() / (stride as usize * std::mem::size_of::<f32>())) as i32
            }
            _ => 0,
        }
    }

    pub fn id(&self) -> VertexArrayId {
        self.id
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        self.gpu.delete_vertex_array(self.id);
    }
}
