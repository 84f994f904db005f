//! Graphics-context seam.
//!
//! Everything in the render pipeline talks to the driver through [`Gpu`]. The
//! production implementation is [`GlowGpu`](super::glow_backend::GlowGpu);
//! tests drive the same code through a recording double. All methods take
//! `&self` because every call must happen on the thread that owns the context,
//! so no synchronization is ever layered on top.

use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("Failed to allocate {what}: {reason}")]
    Allocation { what: &'static str, reason: String },
    #[error("Driver query for {what} failed: {reason}")]
    Query { what: &'static str, reason: String },
    #[error("OpenGL error 0x{0:04X}")]
    OpenGl(u32),
}

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub NonZeroU32);
    };
}

gpu_handle!(
    /// Vertex array object (the vertex-layout descriptor of a mesh).
    VertexArrayHandle
);
gpu_handle!(BufferHandle);
gpu_handle!(TextureHandle);
gpu_handle!(ShaderHandle);
gpu_handle!(ProgramHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverString {
    Vendor,
    Renderer,
    Version,
    /// The legacy space-delimited extension list.
    Extensions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverLimit {
    NumExtensions,
    MaxTextureSize,
    MaxUniformBufferBindings,
    MaxUniformBlockSize,
    MaxVertexAttribs,
    MaxVertexAttribStride,
    TotalVideoMemoryNvx,
    AvailableVideoMemoryNvx,
    TextureFreeMemoryAti,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderFlag {
    DepthTest,
    /// Back-face culling.
    CullBackFaces,
    /// `SRC_ALPHA, ONE_MINUS_SRC_ALPHA` blending.
    AlphaBlend,
}

/// One float attribute inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: i32,
    pub offset_floats: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride_floats: i32,
    pub attributes: &'static [VertexAttribute],
}

impl VertexLayout {
    pub fn stride_bytes(&self) -> i32 {
        self.stride_floats * std::mem::size_of::<f32>() as i32
    }
}

/// Position (3) / texcoord (2) / normal (3), matching the block shader's
/// attribute locations.
pub const CHUNK_VERTEX_LAYOUT: VertexLayout = VertexLayout {
    stride_floats: 8,
    attributes: &[
        VertexAttribute {
            location: 0,
            components: 3,
            offset_floats: 0,
        },
        VertexAttribute {
            location: 1,
            components: 2,
            offset_floats: 3,
        },
        VertexAttribute {
            location: 2,
            components: 3,
            offset_floats: 5,
        },
    ],
};

/// Read-only driver introspection used by capability detection.
pub trait DriverQuery {
    fn driver_string(&self, which: DriverString) -> Result<String, GpuError>;
    /// Indexed extension enumeration (GL 3.0+).
    fn extension_at(&self, index: u32) -> Result<String, GpuError>;
    fn driver_limit(&self, limit: DriverLimit) -> Result<i32, GpuError>;
}

pub trait Gpu: DriverQuery {
    fn set_flag(&self, flag: RenderFlag, enabled: bool);

    // Mesh buffers
    fn create_vertex_array(&self) -> Result<VertexArrayHandle, GpuError>;
    fn create_buffer(&self) -> Result<BufferHandle, GpuError>;
    /// Replaces the contents of both buffers wholesale and (re)describes the
    /// vertex layout on `vertex_array`.
    fn upload_mesh(
        &self,
        vertex_array: VertexArrayHandle,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        vertices: &[f32],
        indices: &[u32],
        layout: &VertexLayout,
    );
    fn draw_indexed_triangles(&self, vertex_array: VertexArrayHandle, index_count: u32);
    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle);
    fn delete_buffer(&self, buffer: BufferHandle);

    // Uniform buffers
    fn allocate_uniform_buffer(&self, buffer: BufferHandle, size: usize);
    fn write_uniform_buffer(&self, buffer: BufferHandle, offset: usize, bytes: &[u8]);
    fn bind_uniform_buffer(&self, binding: u32, buffer: BufferHandle);

    // Textures
    fn create_texture_rgba8(
        &self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureHandle, GpuError>;
    fn bind_texture(&self, unit: u32, texture: TextureHandle);
    fn delete_texture(&self, texture: TextureHandle);

    // Shaders
    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderHandle, GpuError>;
    /// Compiles `source` into `shader`; the error carries the compiler log.
    fn compile_shader(&self, shader: ShaderHandle, source: &str) -> Result<(), String>;
    fn delete_shader(&self, shader: ShaderHandle);
    fn create_program(&self) -> Result<ProgramHandle, GpuError>;
    /// Attaches, links and detaches `shaders`; the error carries the linker log.
    fn link_program(&self, program: ProgramHandle, shaders: &[ShaderHandle]) -> Result<(), String>;
    fn use_program(&self, program: Option<ProgramHandle>);
    fn delete_program(&self, program: ProgramHandle);
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;
    fn set_uniform_i32(&self, location: UniformLocation, value: i32);
    fn set_uniform_f32(&self, location: UniformLocation, value: f32);
    fn set_uniform_vec3(&self, location: UniformLocation, value: [f32; 3]);
    fn set_uniform_mat4(&self, location: UniformLocation, value: &[f32; 16]);
    /// Points the named uniform block at `binding`. Returns false when the
    /// program has no such block.
    fn bind_uniform_block(&self, program: ProgramHandle, block: &str, binding: u32) -> bool;
}
