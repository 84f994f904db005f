use crate::utils::math::Aabb;
use glam::{IVec2, Vec3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Width and depth of a chunk column, in blocks.
pub const CHUNK_SIZE: i32 = 16;
/// Height of a chunk column, in blocks.
pub const CHUNK_HEIGHT: i32 = 256;

/// Horizontal position of a chunk column, in chunk units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl Serialize for ChunkPos {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (self.x, self.z).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChunkPos {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (x, z) = <(i32, i32)>::deserialize(deserializer)?;
        Ok(ChunkPos::new(x, z))
    }
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn from_world_pos(pos: Vec3) -> Self {
        let x = (pos.x / CHUNK_SIZE as f32).floor() as i32;
        let z = (pos.z / CHUNK_SIZE as f32).floor() as i32;
        Self::new(x, z)
    }

    /// World-space translation of the chunk's local origin; Y is always zero.
    pub fn world_origin(&self) -> Vec3 {
        Vec3::new(
            self.x as f32 * CHUNK_SIZE as f32,
            0.0,
            self.z as f32 * CHUNK_SIZE as f32,
        )
    }

    /// The full column volume used for visibility tests.
    pub fn bounds(&self) -> Aabb {
        let min = self.world_origin();
        let max = min + Vec3::new(CHUNK_SIZE as f32, CHUNK_HEIGHT as f32, CHUNK_SIZE as f32);
        Aabb::new(min, max)
    }

    pub fn manhattan_distance(&self, other: &Self) -> i32 {
        (self.x - other.x).abs() + (self.z - other.z).abs()
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

impl From<IVec2> for ChunkPos {
    fn from(vec: IVec2) -> Self {
        Self::new(vec.x, vec.y)
    }
}

impl From<ChunkPos> for IVec2 {
    fn from(pos: ChunkPos) -> Self {
        IVec2::new(pos.x, pos.z)
    }
}
