pub mod config;
pub mod render;
pub mod utils;
pub mod world;

// Re-export commonly used types
pub use config::{RenderConfig, RenderSettings};
pub use render::{ChunkRenderer, GlowGpu, Gpu, GpuCapabilities, TextureAtlas, TextureSynthesizer};
pub use utils::error::RenderError;
pub use utils::math::{Aabb, Plane, ViewFrustum};
pub use world::{Chunk, ChunkMesh, ChunkPos, RenderableChunk};
