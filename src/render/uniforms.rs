//! Per-frame state shared by every chunk draw: camera matrices, the sun and
//! fog. On drivers with uniform buffers it lives in one std140 block that is
//! written at the top of the frame; otherwise the same values go through
//! plain uniforms (see `ShaderProgram::apply_frame_uniforms`).

use super::gpu::{BufferHandle, Gpu, GpuError};
use crate::config::FogParams;
use crate::utils::error::RenderError;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use log::debug;
use std::ops::Range;

/// Name of the block in the shader sources.
pub const FRAME_BLOCK_NAME: &str = "FrameUniforms";
pub const FRAME_BLOCK_SIZE: usize = 256;

/// Projection and view.
pub const MATRICES_RANGE: Range<usize> = 0..128;
/// Light direction, light color, ambient color and ambient strength.
pub const LIGHTING_RANGE: Range<usize> = 128..192;
/// Fog color, start and end.
pub const FOG_RANGE: Range<usize> = 192..240;

/// CPU mirror of the std140 block. Every vec3 and trailing scalar occupies a
/// full 16-byte slot.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameBlock {
    pub projection: [f32; 16],
    pub view: [f32; 16],
    pub light_direction: [f32; 3],
    pub _pad0: f32,
    pub light_color: [f32; 3],
    pub _pad1: f32,
    pub ambient_color: [f32; 3],
    pub _pad2: f32,
    pub ambient_strength: f32,
    pub _pad3: [f32; 3],
    pub fog_color: [f32; 3],
    pub _pad4: f32,
    pub fog_start: f32,
    pub _pad5: [f32; 3],
    pub fog_end: f32,
    pub _pad6: [f32; 3],
    pub _reserved: [f32; 4],
}

/// Everything the block shader reads once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub projection: Mat4,
    pub view: Mat4,
    pub light_direction: Vec3,
    pub light_color: Vec3,
    pub ambient_color: Vec3,
    pub ambient_strength: f32,
    pub fog: FogParams,
}

impl FrameUniforms {
    pub fn to_block(&self) -> FrameBlock {
        let mut block = FrameBlock::zeroed();
        block.projection = self.projection.to_cols_array();
        block.view = self.view.to_cols_array();
        block.light_direction = self.light_direction.to_array();
        block.light_color = self.light_color.to_array();
        block.ambient_color = self.ambient_color.to_array();
        block.ambient_strength = self.ambient_strength;
        block.fog_color = self.fog.color.to_array();
        block.fog_start = self.fog.start;
        block.fog_end = self.fog.end;
        block
    }
}

pub struct UniformBufferStore {
    binding: u32,
    buffer: Option<BufferHandle>,
    block: FrameBlock,
}

impl UniformBufferStore {
    pub fn new(binding: u32) -> Self {
        Self {
            binding,
            buffer: None,
            block: FrameBlock::zeroed(),
        }
    }

    /// Allocates the buffer and attaches it to the binding point.
    pub fn init(&mut self, gpu: &impl Gpu) -> Result<(), GpuError> {
        if self.buffer.is_some() {
            return Ok(());
        }
        let buffer = gpu.create_buffer()?;
        gpu.allocate_uniform_buffer(buffer, FRAME_BLOCK_SIZE);
        gpu.bind_uniform_buffer(self.binding, buffer);
        self.buffer = Some(buffer);
        debug!(
            "Frame uniform buffer allocated ({} bytes, binding {})",
            FRAME_BLOCK_SIZE, self.binding
        );
        Ok(())
    }

    fn flush(&self, gpu: &impl Gpu, range: Range<usize>) -> Result<(), RenderError> {
        let buffer = self.buffer.ok_or(RenderError::UniformStoreUnallocated)?;
        let bytes = bytemuck::bytes_of(&self.block);
        gpu.write_uniform_buffer(buffer, range.start, &bytes[range]);
        Ok(())
    }

    pub fn update_matrices(
        &mut self,
        gpu: &impl Gpu,
        projection: &Mat4,
        view: &Mat4,
    ) -> Result<(), RenderError> {
        self.block.projection = projection.to_cols_array();
        self.block.view = view.to_cols_array();
        self.flush(gpu, MATRICES_RANGE)
    }

    pub fn update_lighting(
        &mut self,
        gpu: &impl Gpu,
        direction: Vec3,
        color: Vec3,
        ambient_color: Vec3,
        ambient_strength: f32,
    ) -> Result<(), RenderError> {
        self.block.light_direction = direction.to_array();
        self.block.light_color = color.to_array();
        self.block.ambient_color = ambient_color.to_array();
        self.block.ambient_strength = ambient_strength;
        self.flush(gpu, LIGHTING_RANGE)
    }

    pub fn update_fog(&mut self, gpu: &impl Gpu, fog: &FogParams) -> Result<(), RenderError> {
        self.block.fog_color = fog.color.to_array();
        self.block.fog_start = fog.start;
        self.block.fog_end = fog.end;
        self.flush(gpu, FOG_RANGE)
    }

    /// All three ranges in block order.
    pub fn update(&mut self, gpu: &impl Gpu, frame: &FrameUniforms) -> Result<(), RenderError> {
        self.update_matrices(gpu, &frame.projection, &frame.view)?;
        self.update_lighting(
            gpu,
            frame.light_direction,
            frame.light_color,
            frame.ambient_color,
            frame.ambient_strength,
        )?;
        self.update_fog(gpu, &frame.fog)
    }

    pub fn bind(&self, gpu: &impl Gpu) {
        if let Some(buffer) = self.buffer {
            gpu.bind_uniform_buffer(self.binding, buffer);
        }
    }

    pub fn cleanup(&mut self, gpu: &impl Gpu) {
        if let Some(buffer) = self.buffer.take() {
            gpu.delete_buffer(buffer);
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn block(&self) -> &FrameBlock {
        &self.block
    }
}
