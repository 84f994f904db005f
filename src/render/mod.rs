pub mod atlas;
pub mod block_faces;
pub mod capabilities;
pub mod chunk_renderer;
pub mod chunk_state;
pub mod frustum;
pub mod glow_backend;
pub mod gpu;
pub mod lighting;
pub mod shaders;
pub mod texgen;
pub mod uniforms;

#[cfg(test)]
pub(crate) mod testing;

pub use atlas::{TextureAtlas, UvRect};
pub use capabilities::{CapabilityCache, Features, GpuCapabilities};
pub use chunk_renderer::{ChunkRenderer, FrameStats, TextureSource};
pub use chunk_state::ChunkRenderState;
pub use frustum::ChunkFrustum;
pub use glow_backend::GlowGpu;
pub use gpu::{DriverQuery, Gpu, GpuError};
pub use lighting::SunLight;
pub use shaders::{ShaderProgram, ShaderVariant};
pub use texgen::TextureSynthesizer;
pub use uniforms::{FrameUniforms, UniformBufferStore};
