//! wgpu upload path for the packed symbol opacity and collision debug streams.

use std::sync::Arc;

use bytemuck::Pod;
use thiserror::Error;
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use glyphfade_engine::{CollisionDebugVertex, SymbolBucket, VertexBuffer, VertexStream};

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("request_device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// Device and queue shared by every buffer created through this crate.
#[derive(Debug, Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    pub async fn request(backends: wgpu::Backends) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                ..Default::default()
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("glyphfade-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                    ..Default::default()
                },
                None,
            )
            .await?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }
}

/// A vertex buffer that later stream updates are written into.
///
/// Grows to the next power of two when an update no longer fits.
pub struct GpuVertexBuffer {
    label: &'static str,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl GpuVertexBuffer {
    pub fn new(context: &GpuContext, label: &'static str, contents: &[u8]) -> Self {
        let buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        Self {
            label,
            device: Arc::clone(&context.device),
            queue: Arc::clone(&context.queue),
            capacity: buffer.size(),
            buffer,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

impl VertexBuffer for GpuVertexBuffer {
    fn update_data(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let len = bytes.len() as u64;
        if len > self.capacity {
            self.capacity = len.next_power_of_two();
            warn!(label = self.label, capacity = self.capacity, "growing vertex buffer");
            self.buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: self.capacity,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }
        self.queue.write_buffer(&self.buffer, 0, bytes);
    }
}

fn upload_stream<T: Pod>(context: &GpuContext, label: &'static str, stream: Option<&mut VertexStream<T>>) -> bool {
    match stream {
        Some(stream) if !stream.has_buffer() && !stream.array.is_empty() => {
            let buffer = GpuVertexBuffer::new(context, label, stream.array.serialize());
            stream.attach_buffer(Box::new(buffer));
            true
        }
        _ => false,
    }
}

/// Create GPU buffers for every non-empty stream of `bucket` that has none.
///
/// Later frames only flush into these buffers. Returns the number of
/// buffers created.
pub fn upload_bucket(context: &GpuContext, bucket: &mut SymbolBucket) -> usize {
    let uploaded = [
        upload_stream(context, "text-opacity", bucket.text_opacity.as_mut()),
        upload_stream(context, "icon-opacity", bucket.icon_opacity.as_mut()),
        upload_stream::<CollisionDebugVertex>(context, "collision-box-debug", bucket.collision_box_debug.as_mut()),
        upload_stream::<CollisionDebugVertex>(
            context,
            "collision-circle-debug",
            bucket.collision_circle_debug.as_mut(),
        ),
    ]
    .into_iter()
    .filter(|&created| created)
    .count();

    if uploaded > 0 {
        debug!(uploaded, "uploaded bucket streams");
    }
    uploaded
}

static OPACITY_ATTRIBUTES: [[wgpu::VertexAttribute; 1]; 16] = {
    let mut attributes = [[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Uint32,
    }]; 16];
    let mut location = 0;
    while location < 16 {
        attributes[location][0].shader_location = location as u32;
        location += 1;
    }
    attributes
};

static DEBUG_ATTRIBUTES: [[wgpu::VertexAttribute; 1]; 16] = {
    let mut attributes = [[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Uint8x2,
    }]; 16];
    let mut location = 0;
    while location < 16 {
        attributes[location][0].shader_location = location as u32;
        location += 1;
    }
    attributes
};

/// Layout of a packed opacity stream: one `u32` per vertex.
///
/// `location` must be below 16.
pub fn opacity_vertex_layout(location: u32) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<u32>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &OPACITY_ATTRIBUTES[(location as usize).min(15)],
    }
}

/// Layout of a collision debug stream: `(placed, not_used)` bytes plus padding.
pub fn collision_debug_vertex_layout(location: u32) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<CollisionDebugVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &DEBUG_ATTRIBUTES[(location as usize).min(15)],
    }
}
