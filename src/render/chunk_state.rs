//! GPU-side geometry of one chunk.

use super::gpu::{BufferHandle, Gpu, GpuError, VertexArrayHandle, CHUNK_VERTEX_LAYOUT};
use crate::utils::error::RenderError;
use crate::world::ChunkMesh;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePhase {
    /// No driver objects exist yet.
    Unallocated,
    Allocated,
    /// Handles returned to the driver; the state must not be used again.
    Released,
}

#[derive(Debug, Clone, Copy)]
struct MeshBuffers {
    vertex_array: VertexArrayHandle,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
}

impl MeshBuffers {
    fn allocate(gpu: &impl Gpu) -> Result<Self, GpuError> {
        let vertex_array = gpu.create_vertex_array()?;
        let vertex_buffer = match gpu.create_buffer() {
            Ok(buffer) => buffer,
            Err(e) => {
                gpu.delete_vertex_array(vertex_array);
                return Err(e);
            }
        };
        let index_buffer = match gpu.create_buffer() {
            Ok(buffer) => buffer,
            Err(e) => {
                gpu.delete_buffer(vertex_buffer);
                gpu.delete_vertex_array(vertex_array);
                return Err(e);
            }
        };
        Ok(Self {
            vertex_array,
            vertex_buffer,
            index_buffer,
        })
    }

    fn release(self, gpu: &impl Gpu) {
        gpu.delete_vertex_array(self.vertex_array);
        gpu.delete_buffer(self.vertex_buffer);
        gpu.delete_buffer(self.index_buffer);
    }
}

#[derive(Debug)]
pub struct ChunkRenderState {
    buffers: Option<MeshBuffers>,
    index_count: u32,
    uploaded_version: Option<u64>,
    phase: StatePhase,
}

impl Default for ChunkRenderState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkRenderState {
    pub fn new() -> Self {
        Self {
            buffers: None,
            index_count: 0,
            uploaded_version: None,
            phase: StatePhase::Unallocated,
        }
    }

    /// True when `version` differs from the last uploaded one.
    pub fn needs_upload(&self, version: u64) -> bool {
        self.phase != StatePhase::Released && self.uploaded_version != Some(version)
    }

    /// Replaces the GPU copy of the mesh. An empty mesh never allocates; if
    /// buffers already exist they are kept and simply stop drawing.
    pub fn upload_mesh(
        &mut self,
        gpu: &impl Gpu,
        mesh: &ChunkMesh,
        version: u64,
    ) -> Result<(), RenderError> {
        if self.phase == StatePhase::Released {
            return Err(RenderError::ReleasedState);
        }

        if mesh.is_empty() {
            self.index_count = 0;
            self.uploaded_version = Some(version);
            return Ok(());
        }

        let buffers = match self.buffers {
            Some(buffers) => buffers,
            None => {
                let buffers = MeshBuffers::allocate(gpu)?;
                self.buffers = Some(buffers);
                self.phase = StatePhase::Allocated;
                buffers
            }
        };

        gpu.upload_mesh(
            buffers.vertex_array,
            buffers.vertex_buffer,
            buffers.index_buffer,
            &mesh.vertices,
            &mesh.indices,
            &CHUNK_VERTEX_LAYOUT,
        );
        self.index_count = mesh.indices.len() as u32;
        self.uploaded_version = Some(version);
        debug!(
            "Uploaded mesh v{}: {} vertices, {} indices",
            version,
            mesh.vertex_count(),
            self.index_count
        );
        Ok(())
    }

    /// Issues the draw call. Returns whether anything was drawn.
    pub fn render(&self, gpu: &impl Gpu) -> bool {
        match self.buffers {
            Some(buffers) if self.index_count > 0 => {
                gpu.draw_indexed_triangles(buffers.vertex_array, self.index_count);
                true
            }
            _ => false,
        }
    }

    /// Returns every handle to the driver. Safe to call repeatedly.
    pub fn cleanup(&mut self, gpu: &impl Gpu) {
        if let Some(buffers) = self.buffers.take() {
            buffers.release(gpu);
        }
        self.index_count = 0;
        self.phase = StatePhase::Released;
    }

    pub fn phase(&self) -> StatePhase {
        self.phase
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn uploaded_version(&self) -> Option<u64> {
        self.uploaded_version
    }
}
