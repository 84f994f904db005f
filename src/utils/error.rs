use crate::render::atlas::AtlasError;
use crate::render::gpu::GpuError;
use crate::render::shaders::ShaderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Atlas(#[from] AtlasError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("Core texture '{name}' could not be placed in the atlas: {source}")]
    CoreTexture {
        name: String,
        #[source]
        source: AtlasError,
    },

    #[error("Chunk renderer used before init()")]
    NotInitialized,

    #[error("Uniform buffer store used before init()")]
    UniformStoreUnallocated,

    #[error("Mesh uploaded into a released chunk render state")]
    ReleasedState,
}

pub type Result<T> = std::result::Result<T, RenderError>;
