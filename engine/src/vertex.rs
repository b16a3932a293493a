use std::fmt;

use bytemuck::Pod;

/// A GPU-side buffer that already holds a previous upload of a stream.
///
/// Creating the buffer the first time is the uploader's job; the engine only
/// refreshes buffers that exist.
pub trait VertexBuffer: Send {
    fn update_data(&mut self, bytes: &[u8]);
}

/// Growable array of plain-old-data vertices.
#[derive(Clone, PartialEq)]
pub struct VertexArray<T> {
    items: Vec<T>,
}

impl<T: Pod> VertexArray<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Drop every vertex while keeping the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn emplace_back(&mut self, vertex: T) {
        self.items.push(vertex);
    }

    pub fn extend_repeat(&mut self, vertex: T, count: usize) {
        self.items.extend(std::iter::repeat_n(vertex, count));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn serialize(&self) -> &[u8] {
        bytemuck::cast_slice(&self.items)
    }
}

impl<T: Pod> Default for VertexArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for VertexArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

/// A vertex array plus the buffer it was uploaded to, if any.
pub struct VertexStream<T> {
    pub array: VertexArray<T>,
    buffer: Option<Box<dyn VertexBuffer>>,
}

impl<T: Pod> VertexStream<T> {
    pub fn new() -> Self {
        Self::from_array(VertexArray::new())
    }

    pub fn from_array(array: VertexArray<T>) -> Self {
        Self {
            array,
            buffer: None,
        }
    }

    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn attach_buffer(&mut self, buffer: Box<dyn VertexBuffer>) {
        self.buffer = Some(buffer);
    }

    /// Push the array to its buffer. Returns false when nothing was uploaded yet.
    pub fn flush(&mut self) -> bool {
        match self.buffer.as_mut() {
            Some(buffer) => {
                buffer.update_data(self.array.serialize());
                true
            }
            None => false,
        }
    }
}

impl<T: Pod> Default for VertexStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for VertexStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexStream")
            .field("len", &self.array.len())
            .field("has_buffer", &self.has_buffer())
            .finish()
    }
}

/// One vertex of the collision debug overlay: 4 bytes, `Uint8x2` + padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CollisionDebugVertex {
    pub placed: u8,
    pub not_used: u8,
    _pad: [u8; 2],
}

impl CollisionDebugVertex {
    pub fn new(placed: bool, not_used: bool) -> Self {
        Self {
            placed: u8::from(placed),
            not_used: u8::from(not_used),
            _pad: [0; 2],
        }
    }
}
