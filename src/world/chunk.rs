use crate::world::chunk_coord::ChunkPos;
use glam::{Vec2, Vec3};
use parking_lot::RwLock;
use std::sync::Arc;

/// Floats per interleaved vertex: position (3), texcoord (2), normal (3).
pub const FLOATS_PER_VERTEX: usize = 8;

/// Geometry produced by the mesh builder for one chunk, in chunk-local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<f32>, // interleaved, FLOATS_PER_VERTEX per vertex
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn new(vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends one quad; `positions` and `uvs` are in counter-clockwise order.
    pub fn add_face(&mut self, positions: [Vec3; 4], normal: Vec3, uvs: [Vec2; 4]) {
        let base_index = self.vertex_count() as u32;

        for (pos, uv) in positions.iter().zip(uvs) {
            self.vertices.extend_from_slice(&[
                pos.x, pos.y, pos.z, uv.x, uv.y, normal.x, normal.y, normal.z,
            ]);
        }

        // Two triangles per quad face
        self.indices.extend_from_slice(&[
            base_index,
            base_index + 1,
            base_index + 2,
            base_index + 2,
            base_index + 3,
            base_index,
        ]);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_VERTEX
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty() || self.vertices.is_empty()
    }
}

/// A published mesh and the version it was published under. Immutable once
/// handed over; cloning only bumps the reference count.
#[derive(Debug, Clone)]
pub struct MeshSnapshot {
    pub mesh: Arc<ChunkMesh>,
    pub version: u64,
}

/// Hand-off cell between a meshing thread and the render thread.
///
/// Every `publish` bumps the version, so the renderer can compare versions
/// instead of diffing geometry.
#[derive(Debug, Default)]
pub struct MeshSlot {
    inner: RwLock<Option<MeshSnapshot>>,
}

impl MeshSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `mesh` and returns its new version (starting at 1).
    pub fn publish(&self, mesh: ChunkMesh) -> u64 {
        let mut guard = self.inner.write();
        let version = guard.as_ref().map_or(1, |snapshot| snapshot.version + 1);
        *guard = Some(MeshSnapshot {
            mesh: Arc::new(mesh),
            version,
        });
        version
    }

    pub fn snapshot(&self) -> Option<MeshSnapshot> {
        self.inner.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.inner
            .read()
            .as_ref()
            .map_or(0, |snapshot| snapshot.version)
    }
}

/// What the renderer needs from a loaded chunk.
pub trait RenderableChunk {
    fn position(&self) -> ChunkPos;

    /// Current mesh and its version, read together. `None` while the chunk
    /// has never been meshed.
    fn mesh(&self) -> Option<MeshSnapshot>;
}

/// Minimal [`RenderableChunk`]: a position plus a [`MeshSlot`].
#[derive(Debug)]
pub struct Chunk {
    pub position: ChunkPos,
    pub mesh: MeshSlot,
}

impl Chunk {
    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            mesh: MeshSlot::new(),
        }
    }
}

impl RenderableChunk for Chunk {
    fn position(&self) -> ChunkPos {
        self.position
    }

    fn mesh(&self) -> Option<MeshSnapshot> {
        self.mesh.snapshot()
    }
}

impl<T: RenderableChunk + ?Sized> RenderableChunk for Arc<T> {
    fn position(&self) -> ChunkPos {
        (**self).position()
    }

    fn mesh(&self) -> Option<MeshSnapshot> {
        (**self).mesh()
    }
}
