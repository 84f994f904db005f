//! OpenGL implementation of [`Gpu`] on top of `glow`.

use super::gpu::{
    BufferHandle, DriverLimit, DriverQuery, DriverString, Gpu, GpuError, ProgramHandle,
    RenderFlag, ShaderHandle, ShaderStage, TextureHandle, UniformLocation, VertexArrayHandle,
    VertexLayout,
};
use glow::HasContext;
use log::{debug, warn};
use std::ffi::c_void;

const GPU_MEMORY_INFO_TOTAL_AVAILABLE_MEMORY_NVX: u32 = 0x9048;
const GPU_MEMORY_INFO_CURRENT_AVAILABLE_VIDMEM_NVX: u32 = 0x9049;
const TEXTURE_FREE_MEMORY_ATI: u32 = 0x87FC;
const MAX_VERTEX_ATTRIB_STRIDE: u32 = 0x82E5;

/// A `glow` context plus the unsafe plumbing around it.
///
/// Every call goes straight to the driver, so the value must only be used on
/// the thread where the context is current.
pub struct GlowGpu {
    gl: glow::Context,
}

impl GlowGpu {
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// # Safety
    ///
    /// A GL context must be current on this thread and `loader` must return
    /// valid function pointers for it.
    pub unsafe fn from_loader_function<F>(loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        Self::new(glow::Context::from_loader_function(loader))
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    fn check_error(&self, what: &'static str) -> Result<(), GpuError> {
        let error = unsafe { self.gl.get_error() };
        if error == glow::NO_ERROR {
            Ok(())
        } else {
            debug!("{} raised GL error 0x{:04X}", what, error);
            Err(GpuError::OpenGl(error))
        }
    }
}

fn limit_enum(limit: DriverLimit) -> u32 {
    match limit {
        DriverLimit::NumExtensions => glow::NUM_EXTENSIONS,
        DriverLimit::MaxTextureSize => glow::MAX_TEXTURE_SIZE,
        DriverLimit::MaxUniformBufferBindings => glow::MAX_UNIFORM_BUFFER_BINDINGS,
        DriverLimit::MaxUniformBlockSize => glow::MAX_UNIFORM_BLOCK_SIZE,
        DriverLimit::MaxVertexAttribs => glow::MAX_VERTEX_ATTRIBS,
        DriverLimit::MaxVertexAttribStride => MAX_VERTEX_ATTRIB_STRIDE,
        DriverLimit::TotalVideoMemoryNvx => GPU_MEMORY_INFO_TOTAL_AVAILABLE_MEMORY_NVX,
        DriverLimit::AvailableVideoMemoryNvx => GPU_MEMORY_INFO_CURRENT_AVAILABLE_VIDMEM_NVX,
        DriverLimit::TextureFreeMemoryAti => TEXTURE_FREE_MEMORY_ATI,
    }
}

fn vertex_array(handle: VertexArrayHandle) -> glow::NativeVertexArray {
    glow::NativeVertexArray(handle.0)
}

fn buffer(handle: BufferHandle) -> glow::NativeBuffer {
    glow::NativeBuffer(handle.0)
}

fn texture(handle: TextureHandle) -> glow::NativeTexture {
    glow::NativeTexture(handle.0)
}

fn shader(handle: ShaderHandle) -> glow::NativeShader {
    glow::NativeShader(handle.0)
}

fn program(handle: ProgramHandle) -> glow::NativeProgram {
    glow::NativeProgram(handle.0)
}

fn location(location: UniformLocation) -> glow::NativeUniformLocation {
    glow::NativeUniformLocation(location.0)
}

fn allocation(what: &'static str) -> impl FnOnce(String) -> GpuError {
    move |reason| GpuError::Allocation { what, reason }
}

impl DriverQuery for GlowGpu {
    fn driver_string(&self, which: DriverString) -> Result<String, GpuError> {
        let parameter = match which {
            DriverString::Vendor => glow::VENDOR,
            DriverString::Renderer => glow::RENDERER,
            DriverString::Version => glow::VERSION,
            DriverString::Extensions => glow::EXTENSIONS,
        };
        let value = unsafe { self.gl.get_parameter_string(parameter) };
        self.check_error("glGetString")?;
        Ok(value)
    }

    fn extension_at(&self, index: u32) -> Result<String, GpuError> {
        let value = unsafe { self.gl.get_parameter_indexed_string(glow::EXTENSIONS, index) };
        self.check_error("glGetStringi")?;
        Ok(value)
    }

    fn driver_limit(&self, limit: DriverLimit) -> Result<i32, GpuError> {
        // The ATI query writes four values
        let mut values = [0i32; 4];
        unsafe { self.gl.get_parameter_i32_slice(limit_enum(limit), &mut values) };
        self.check_error("glGetIntegerv")?;
        Ok(values[0])
    }
}

impl Gpu for GlowGpu {
    fn set_flag(&self, flag: RenderFlag, enabled: bool) {
        let capability = match flag {
            RenderFlag::DepthTest => glow::DEPTH_TEST,
            RenderFlag::CullBackFaces => glow::CULL_FACE,
            RenderFlag::AlphaBlend => glow::BLEND,
        };
        unsafe {
            if enabled {
                self.gl.enable(capability);
                match flag {
                    RenderFlag::CullBackFaces => self.gl.cull_face(glow::BACK),
                    RenderFlag::AlphaBlend => {
                        self.gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA)
                    }
                    RenderFlag::DepthTest => self.gl.depth_func(glow::LESS),
                }
            } else {
                self.gl.disable(capability);
            }
        }
    }

    fn create_vertex_array(&self) -> Result<VertexArrayHandle, GpuError> {
        let vao = unsafe { self.gl.create_vertex_array() }
            .map_err(allocation("vertex array"))?;
        Ok(VertexArrayHandle(vao.0))
    }

    fn create_buffer(&self) -> Result<BufferHandle, GpuError> {
        let vbo = unsafe { self.gl.create_buffer() }
            .map_err(allocation("buffer"))?;
        Ok(BufferHandle(vbo.0))
    }

    fn upload_mesh(
        &self,
        vertex_array: VertexArrayHandle,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        vertices: &[f32],
        indices: &[u32],
        layout: &VertexLayout,
    ) {
        let float_size = std::mem::size_of::<f32>() as i32;
        unsafe {
            self.gl.bind_vertex_array(Some(self::vertex_array(vertex_array)));

            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer(vertex_buffer)));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(vertices),
                glow::STATIC_DRAW,
            );

            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer(index_buffer)));
            self.gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(indices),
                glow::STATIC_DRAW,
            );

            for attribute in layout.attributes {
                self.gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components,
                    glow::FLOAT,
                    false,
                    layout.stride_bytes(),
                    attribute.offset_floats * float_size,
                );
                self.gl.enable_vertex_attrib_array(attribute.location);
            }

            // The element binding stays recorded in the VAO
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn draw_indexed_triangles(&self, vertex_array: VertexArrayHandle, index_count: u32) {
        unsafe {
            self.gl.bind_vertex_array(Some(self::vertex_array(vertex_array)));
            self.gl.draw_elements(glow::TRIANGLES, index_count as i32, glow::UNSIGNED_INT, 0);
            self.gl.bind_vertex_array(None);
        }
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        unsafe { self.gl.delete_vertex_array(self::vertex_array(vertex_array)) };
    }

    fn delete_buffer(&self, handle: BufferHandle) {
        unsafe { self.gl.delete_buffer(buffer(handle)) };
    }

    fn allocate_uniform_buffer(&self, handle: BufferHandle, size: usize) {
        unsafe {
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer(handle)));
            self.gl.buffer_data_size(glow::UNIFORM_BUFFER, size as i32, glow::DYNAMIC_DRAW);
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, None);
        }
    }

    fn write_uniform_buffer(&self, handle: BufferHandle, offset: usize, bytes: &[u8]) {
        unsafe {
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer(handle)));
            self.gl.buffer_sub_data_u8_slice(glow::UNIFORM_BUFFER, offset as i32, bytes);
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, None);
        }
    }

    fn bind_uniform_buffer(&self, binding: u32, handle: BufferHandle) {
        unsafe {
            self.gl.bind_buffer_base(glow::UNIFORM_BUFFER, binding, Some(buffer(handle)));
        }
    }

    fn create_texture_rgba8(
        &self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureHandle, GpuError> {
        unsafe {
            let handle = self.gl.create_texture().map_err(allocation("texture"))?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(handle));
            // Nearest filtering keeps the 16px tiles crisp and stops
            // neighbouring tiles bleeding into each other
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::NEAREST as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::NEAREST as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            if let Err(e) = self.check_error("glTexImage2D") {
                self.gl.delete_texture(handle);
                return Err(e);
            }
            Ok(TextureHandle(handle.0))
        }
    }

    fn bind_texture(&self, unit: u32, handle: TextureHandle) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture(handle)));
        }
    }

    fn delete_texture(&self, handle: TextureHandle) {
        unsafe { self.gl.delete_texture(texture(handle)) };
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderHandle, GpuError> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let handle = unsafe { self.gl.create_shader(kind) }
            .map_err(allocation("shader"))?;
        Ok(ShaderHandle(handle.0))
    }

    fn compile_shader(&self, handle: ShaderHandle, source: &str) -> Result<(), String> {
        unsafe {
            self.gl.shader_source(shader(handle), source);
            self.gl.compile_shader(shader(handle));
            if self.gl.get_shader_compile_status(shader(handle)) {
                Ok(())
            } else {
                Err(self.gl.get_shader_info_log(shader(handle)))
            }
        }
    }

    fn delete_shader(&self, handle: ShaderHandle) {
        unsafe { self.gl.delete_shader(shader(handle)) };
    }

    fn create_program(&self) -> Result<ProgramHandle, GpuError> {
        let handle = unsafe { self.gl.create_program() }
            .map_err(allocation("program"))?;
        Ok(ProgramHandle(handle.0))
    }

    fn link_program(&self, handle: ProgramHandle, shaders: &[ShaderHandle]) -> Result<(), String> {
        unsafe {
            for &stage in shaders {
                self.gl.attach_shader(program(handle), shader(stage));
            }
            self.gl.link_program(program(handle));
            for &stage in shaders {
                self.gl.detach_shader(program(handle), shader(stage));
            }
            if self.gl.get_program_link_status(program(handle)) {
                Ok(())
            } else {
                Err(self.gl.get_program_info_log(program(handle)))
            }
        }
    }

    fn use_program(&self, handle: Option<ProgramHandle>) {
        unsafe { self.gl.use_program(handle.map(program)) };
    }

    fn delete_program(&self, handle: ProgramHandle) {
        unsafe { self.gl.delete_program(program(handle)) };
    }

    fn uniform_location(&self, handle: ProgramHandle, name: &str) -> Option<UniformLocation> {
        unsafe { self.gl.get_uniform_location(program(handle), name) }
            .map(|loc| UniformLocation(loc.0))
    }

    fn set_uniform_i32(&self, loc: UniformLocation, value: i32) {
        unsafe { self.gl.uniform_1_i32(Some(&location(loc)), value) };
    }

    fn set_uniform_f32(&self, loc: UniformLocation, value: f32) {
        unsafe { self.gl.uniform_1_f32(Some(&location(loc)), value) };
    }

    fn set_uniform_vec3(&self, loc: UniformLocation, value: [f32; 3]) {
        unsafe { self.gl.uniform_3_f32(Some(&location(loc)), value[0], value[1], value[2]) };
    }

    fn set_uniform_mat4(&self, loc: UniformLocation, value: &[f32; 16]) {
        unsafe { self.gl.uniform_matrix_4_f32_slice(Some(&location(loc)), false, value) };
    }

    fn bind_uniform_block(&self, handle: ProgramHandle, block: &str, binding: u32) -> bool {
        unsafe {
            match self.gl.get_uniform_block_index(program(handle), block) {
                Some(index) => {
                    self.gl.uniform_block_binding(program(handle), index, binding);
                    true
                }
                None => {
                    warn!(
                        "Uniform block '{}' not found in program {:?}",
                        block, handle
                    );
                    false
                }
            }
        }
    }
}
