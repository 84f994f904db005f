use crate::utils::math::{Aabb, ViewFrustum};
use crate::world::ChunkPos;
use glam::Mat4;

/// Per-frame visibility test for whole chunk columns.
#[derive(Debug, Clone, Default)]
pub struct ChunkFrustum {
    frustum: ViewFrustum,
}

impl ChunkFrustum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the planes from `projection * view`.
    pub fn update(&mut self, view_projection: &Mat4) {
        self.frustum = ViewFrustum::from_view_projection(view_projection);
    }

    pub fn test_chunk(&self, pos: ChunkPos) -> bool {
        self.test_aabb(&pos.bounds())
    }

    pub fn test_aabb(&self, aabb: &Aabb) -> bool {
        self.frustum.intersects_aabb(aabb)
    }

    pub fn planes(&self) -> &ViewFrustum {
        &self.frustum
    }
}
