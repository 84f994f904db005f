pub mod block;
pub mod chunk;
pub mod chunk_coord;

// Re-export commonly used types
pub use block::{BlockFace, BlockType};
pub use chunk::{Chunk, ChunkMesh, MeshSlot, MeshSnapshot, RenderableChunk};
pub use chunk_coord::{ChunkPos, CHUNK_HEIGHT, CHUNK_SIZE};
