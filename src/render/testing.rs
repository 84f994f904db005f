//! Recording [`Gpu`] double for unit tests.

use super::gpu::*;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::num::NonZeroU32;

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    SetFlag(RenderFlag, bool),
    CreateVertexArray(VertexArrayHandle),
    CreateBuffer(BufferHandle),
    UploadMesh {
        vertex_array: VertexArrayHandle,
        vertices: usize,
        indices: usize,
    },
    Draw {
        vertex_array: VertexArrayHandle,
        index_count: u32,
    },
    DeleteVertexArray(VertexArrayHandle),
    DeleteBuffer(BufferHandle),
    AllocateUniformBuffer { buffer: BufferHandle, size: usize },
    WriteUniformBuffer {
        buffer: BufferHandle,
        offset: usize,
        len: usize,
    },
    BindUniformBuffer { binding: u32, buffer: BufferHandle },
    CreateTexture {
        texture: TextureHandle,
        width: u32,
        height: u32,
    },
    BindTexture { unit: u32, texture: TextureHandle },
    DeleteTexture(TextureHandle),
    CompileShader(ShaderStage),
    DeleteShader(ShaderHandle),
    LinkProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),
    DeleteProgram(ProgramHandle),
    SetUniform(String),
    BindUniformBlock { block: String, binding: u32 },
}

/// Answers driver queries from canned data and records every other call.
pub struct RecordingGpu {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
    pub extensions: Vec<String>,
    pub limits: HashMap<DriverLimit, i32>,
    pub fail_queries: bool,
    pub fail_compile: Option<ShaderStage>,
    pub fail_link: bool,
    pub fail_buffer_creation: Cell<bool>,
    calls: RefCell<Vec<GpuCall>>,
    next_handle: Cell<u32>,
    stages: RefCell<HashMap<ShaderHandle, ShaderStage>>,
    uniform_names: RefCell<Vec<String>>,
    uniform_writes: RefCell<Vec<(usize, Vec<u8>)>>,
    shader_sources: RefCell<Vec<(ShaderStage, String)>>,
}

impl RecordingGpu {
    /// A GL 4.6 core driver exposing every feature the pipeline asks about.
    pub fn modern() -> Self {
        let mut limits = HashMap::new();
        limits.insert(DriverLimit::MaxTextureSize, 16384);
        limits.insert(DriverLimit::MaxUniformBufferBindings, 84);
        limits.insert(DriverLimit::MaxUniformBlockSize, 65536);
        limits.insert(DriverLimit::MaxVertexAttribs, 16);
        limits.insert(DriverLimit::MaxVertexAttribStride, 2048);
        let extensions = vec![
            "GL_ARB_uniform_buffer_object".to_string(),
            "GL_ARB_buffer_storage".to_string(),
            "GL_NVX_gpu_memory_info".to_string(),
        ];
        limits.insert(DriverLimit::NumExtensions, extensions.len() as i32);
        limits.insert(DriverLimit::TotalVideoMemoryNvx, 8_388_608);
        limits.insert(DriverLimit::AvailableVideoMemoryNvx, 7_000_000);
        Self::with_driver(
            "NVIDIA Corporation",
            "GeForce RTX 3070/PCIe/SSE2",
            "4.6.0 NVIDIA 535.54",
            extensions,
            limits,
        )
    }

    /// A GL 2.1 driver with no optional extensions.
    pub fn legacy() -> Self {
        let mut limits = HashMap::new();
        limits.insert(DriverLimit::MaxTextureSize, 2048);
        limits.insert(DriverLimit::MaxVertexAttribs, 16);
        Self::with_driver(
            "Intel",
            "Mesa DRI Intel(R) 945GM",
            "2.1 Mesa 10.1.3",
            Vec::new(),
            limits,
        )
    }

    pub fn with_driver(
        vendor: &str,
        renderer: &str,
        version: &str,
        extensions: Vec<String>,
        limits: HashMap<DriverLimit, i32>,
    ) -> Self {
        Self {
            vendor: vendor.to_string(),
            renderer: renderer.to_string(),
            version: version.to_string(),
            extensions,
            limits,
            fail_queries: false,
            fail_compile: None,
            fail_link: false,
            fail_buffer_creation: Cell::new(false),
            calls: RefCell::new(Vec::new()),
            next_handle: Cell::new(1),
            stages: RefCell::new(HashMap::new()),
            uniform_names: RefCell::new(Vec::new()),
            uniform_writes: RefCell::new(Vec::new()),
            shader_sources: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<GpuCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
        self.uniform_writes.borrow_mut().clear();
    }

    pub fn count(&self, predicate: impl Fn(&GpuCall) -> bool) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    pub fn uploads(&self) -> usize {
        self.count(|call| matches!(call, GpuCall::UploadMesh { .. }))
    }

    pub fn draws(&self) -> usize {
        self.count(|call| matches!(call, GpuCall::Draw { .. }))
    }

    /// Every `write_uniform_buffer` payload, in call order.
    pub fn uniform_writes(&self) -> Vec<(usize, Vec<u8>)> {
        self.uniform_writes.borrow().clone()
    }

    pub fn shader_sources(&self) -> Vec<(ShaderStage, String)> {
        self.shader_sources.borrow().clone()
    }

    pub fn uniforms_set(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                GpuCall::SetUniform(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GpuCall) {
        self.calls.borrow_mut().push(call);
    }

    fn next(&self) -> NonZeroU32 {
        let id = self.next_handle.get();
        self.next_handle.set(id + 1);
        NonZeroU32::new(id).expect("handle counter starts at 1")
    }

    fn query_guard(&self, what: &'static str) -> Result<(), GpuError> {
        if self.fail_queries {
            return Err(GpuError::Query {
                what,
                reason: "driver returned garbage".into(),
            });
        }
        Ok(())
    }

    fn uniform_name(&self, location: UniformLocation) -> String {
        self.uniform_names
            .borrow()
            .get(location.0 as usize)
            .cloned()
            .unwrap_or_default()
    }
}

impl DriverQuery for RecordingGpu {
    fn driver_string(&self, which: DriverString) -> Result<String, GpuError> {
        self.query_guard("driver string")?;
        Ok(match which {
            DriverString::Vendor => self.vendor.clone(),
            DriverString::Renderer => self.renderer.clone(),
            DriverString::Version => self.version.clone(),
            DriverString::Extensions => self.extensions.join(" "),
        })
    }

    fn extension_at(&self, index: u32) -> Result<String, GpuError> {
        self.query_guard("extension")?;
        self.extensions
            .get(index as usize)
            .cloned()
            .ok_or(GpuError::OpenGl(0x0501))
    }

    fn driver_limit(&self, limit: DriverLimit) -> Result<i32, GpuError> {
        self.query_guard("limit")?;
        self.limits
            .get(&limit)
            .copied()
            .ok_or(GpuError::OpenGl(0x0500))
    }
}

impl Gpu for RecordingGpu {
    fn set_flag(&self, flag: RenderFlag, enabled: bool) {
        self.record(GpuCall::SetFlag(flag, enabled));
    }

    fn create_vertex_array(&self) -> Result<VertexArrayHandle, GpuError> {
        let handle = VertexArrayHandle(self.next());
        self.record(GpuCall::CreateVertexArray(handle));
        Ok(handle)
    }

    fn create_buffer(&self) -> Result<BufferHandle, GpuError> {
        if self.fail_buffer_creation.get() {
            return Err(GpuError::Allocation {
                what: "buffer",
                reason: "out of memory".into(),
            });
        }
        let handle = BufferHandle(self.next());
        self.record(GpuCall::CreateBuffer(handle));
        Ok(handle)
    }

    fn upload_mesh(
        &self,
        vertex_array: VertexArrayHandle,
        _vertex_buffer: BufferHandle,
        _index_buffer: BufferHandle,
        vertices: &[f32],
        indices: &[u32],
        _layout: &VertexLayout,
    ) {
        self.record(GpuCall::UploadMesh {
            vertex_array,
            vertices: vertices.len(),
            indices: indices.len(),
        });
    }

    fn draw_indexed_triangles(&self, vertex_array: VertexArrayHandle, index_count: u32) {
        self.record(GpuCall::Draw { vertex_array, index_count });
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        self.record(GpuCall::DeleteVertexArray(vertex_array));
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        self.record(GpuCall::DeleteBuffer(buffer));
    }

    fn allocate_uniform_buffer(&self, buffer: BufferHandle, size: usize) {
        self.record(GpuCall::AllocateUniformBuffer { buffer, size });
    }

    fn write_uniform_buffer(&self, buffer: BufferHandle, offset: usize, bytes: &[u8]) {
        self.uniform_writes
            .borrow_mut()
            .push((offset, bytes.to_vec()));
        self.record(GpuCall::WriteUniformBuffer {
            buffer,
            offset,
            len: bytes.len(),
        });
    }

    fn bind_uniform_buffer(&self, binding: u32, buffer: BufferHandle) {
        self.record(GpuCall::BindUniformBuffer { binding, buffer });
    }

    fn create_texture_rgba8(
        &self,
        width: u32,
        height: u32,
        _pixels: &[u8],
    ) -> Result<TextureHandle, GpuError> {
        let texture = TextureHandle(self.next());
        self.record(GpuCall::CreateTexture { texture, width, height });
        Ok(texture)
    }

    fn bind_texture(&self, unit: u32, texture: TextureHandle) {
        self.record(GpuCall::BindTexture { unit, texture });
    }

    fn delete_texture(&self, texture: TextureHandle) {
        self.record(GpuCall::DeleteTexture(texture));
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderHandle, GpuError> {
        let shader = ShaderHandle(self.next());
        self.stages.borrow_mut().insert(shader, stage);
        Ok(shader)
    }

    fn compile_shader(&self, shader: ShaderHandle, source: &str) -> Result<(), String> {
        let stage = self.stages.borrow()[&shader];
        self.shader_sources
            .borrow_mut()
            .push((stage, source.to_string()));
        self.record(GpuCall::CompileShader(stage));
        if self.fail_compile == Some(stage) {
            return Err("0:12(3): error: syntax error, unexpected IDENTIFIER".into());
        }
        Ok(())
    }

    fn delete_shader(&self, shader: ShaderHandle) {
        self.record(GpuCall::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<ProgramHandle, GpuError> {
        Ok(ProgramHandle(self.next()))
    }

    fn link_program(
        &self,
        program: ProgramHandle,
        _shaders: &[ShaderHandle],
    ) -> Result<(), String> {
        self.record(GpuCall::LinkProgram(program));
        if self.fail_link {
            return Err("error: vertex shader output not read by fragment shader".into());
        }
        Ok(())
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        self.record(GpuCall::UseProgram(program));
    }

    fn delete_program(&self, program: ProgramHandle) {
        self.record(GpuCall::DeleteProgram(program));
    }

    fn uniform_location(&self, _program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let mut names = self.uniform_names.borrow_mut();
        names.push(name.to_string());
        Some(UniformLocation(names.len() as u32 - 1))
    }

    fn set_uniform_i32(&self, location: UniformLocation, _value: i32) {
        self.record(GpuCall::SetUniform(self.uniform_name(location)));
    }

    fn set_uniform_f32(&self, location: UniformLocation, _value: f32) {
        self.record(GpuCall::SetUniform(self.uniform_name(location)));
    }

    fn set_uniform_vec3(&self, location: UniformLocation, _value: [f32; 3]) {
        self.record(GpuCall::SetUniform(self.uniform_name(location)));
    }

    fn set_uniform_mat4(&self, location: UniformLocation, _value: &[f32; 16]) {
        self.record(GpuCall::SetUniform(self.uniform_name(location)));
    }

    fn bind_uniform_block(&self, _program: ProgramHandle, block: &str, binding: u32) -> bool {
        self.record(GpuCall::BindUniformBlock {
            block: block.to_string(),
            binding,
        });
        true
    }
}
