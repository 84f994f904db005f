//! Block shader sources and program management.

use super::gpu::{Gpu, GpuError, ProgramHandle, ShaderHandle, ShaderStage, UniformLocation};
use super::uniforms::{FrameUniforms, FRAME_BLOCK_NAME};
use glam::Mat4;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("Failed to compile {stage} shader: {log}")]
    Compilation { stage: ShaderStage, log: String },
    #[error("Program linking failed: {0}")]
    Linking(String),
    #[error("Shader object creation failed: {0}")]
    Gpu(#[from] GpuError),
}

/// How frame-wide values reach the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderVariant {
    /// One std140 block shared by every draw.
    UniformBuffer,
    /// Individual uniforms set per frame.
    Legacy,
}

/// Predefined block shader sources
pub mod block_shaders {
    pub const VERSION: &str = "#version 330 core\n";

    /// Either the std140 block or loose uniforms, behind the same names.
    pub const FRAME_UNIFORMS: &str = r#"
#ifdef USE_UBO
layout(std140) uniform FrameUniforms {
    mat4 frameProjection;
    mat4 frameView;
    vec4 frameLightDirection;
    vec4 frameLightColor;
    vec4 frameAmbientColor;
    vec4 frameAmbientStrength;
    vec4 frameFogColor;
    vec4 frameFogStart;
    vec4 frameFogEnd;
};
#define PROJECTION frameProjection
#define VIEW frameView
#define LIGHT_DIRECTION frameLightDirection.xyz
#define LIGHT_COLOR frameLightColor.xyz
#define AMBIENT_COLOR frameAmbientColor.xyz
#define AMBIENT_STRENGTH frameAmbientStrength.x
#define FOG_COLOR frameFogColor.xyz
#define FOG_START frameFogStart.x
#define FOG_END frameFogEnd.x
#else
uniform mat4 uProjection;
uniform mat4 uView;
uniform vec3 uLightDirection;
uniform vec3 uLightColor;
uniform vec3 uAmbientColor;
uniform float uAmbientStrength;
uniform vec3 uFogColor;
uniform float uFogStart;
uniform float uFogEnd;
#define PROJECTION uProjection
#define VIEW uView
#define LIGHT_DIRECTION uLightDirection
#define LIGHT_COLOR uLightColor
#define AMBIENT_COLOR uAmbientColor
#define AMBIENT_STRENGTH uAmbientStrength
#define FOG_COLOR uFogColor
#define FOG_START uFogStart
#define FOG_END uFogEnd
#endif
"#;

    pub const VERTEX_BODY: &str = r#"
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec2 aTexCoord;
layout (location = 2) in vec3 aNormal;

uniform mat4 uModel;

out vec2 vTexCoord;
out vec3 vNormal;
out float vViewDepth;

void main() {
    vec4 viewPos = VIEW * uModel * vec4(aPos, 1.0);
    vTexCoord = aTexCoord;
    // Chunk offsets are pure translations
    vNormal = aNormal;
    vViewDepth = length(viewPos.xyz);
    gl_Position = PROJECTION * viewPos;
}
"#;

    pub const FRAGMENT_BODY: &str = r#"
in vec2 vTexCoord;
in vec3 vNormal;
in float vViewDepth;

uniform sampler2D uTexture;

out vec4 FragColor;

void main() {
    vec4 texColor = texture(uTexture, vTexCoord);
    if (texColor.a < 0.1) {
        discard;
    }

    float diffuse = max(dot(normalize(vNormal), -normalize(LIGHT_DIRECTION)), 0.0);
    vec3 lighting = AMBIENT_COLOR * AMBIENT_STRENGTH + LIGHT_COLOR * diffuse;
    vec3 color = texColor.rgb * lighting;

    float fog = clamp((FOG_END - vViewDepth) / max(FOG_END - FOG_START, 0.001), 0.0, 1.0);
    FragColor = vec4(mix(FOG_COLOR, color, fog), texColor.a);
}
"#;
}

/// Full source for `stage` in `variant`.
pub fn shader_source(stage: ShaderStage, variant: ShaderVariant) -> String {
    let define = match variant {
        ShaderVariant::UniformBuffer => "#define USE_UBO\n",
        ShaderVariant::Legacy => "",
    };
    let body = match stage {
        ShaderStage::Vertex => block_shaders::VERTEX_BODY,
        ShaderStage::Fragment => block_shaders::FRAGMENT_BODY,
    };
    format!(
        "{}{}{}{}",
        block_shaders::VERSION,
        define,
        block_shaders::FRAME_UNIFORMS,
        body
    )
}

/// Main shader program structure
pub struct ShaderProgram {
    id: ProgramHandle,
    variant: ShaderVariant,
    uniforms: HashMap<String, Option<UniformLocation>>,
}

impl ShaderProgram {
    /// Builds the block shader for `variant`.
    pub fn block_shader(gpu: &impl Gpu, variant: ShaderVariant) -> Result<Self, ShaderError> {
        let vertex = shader_source(ShaderStage::Vertex, variant);
        let fragment = shader_source(ShaderStage::Fragment, variant);
        let program = Self::from_sources(gpu, &vertex, &fragment, variant)?;
        info!("Block shader compiled ({:?})", variant);
        Ok(program)
    }

    pub fn from_sources(
        gpu: &impl Gpu,
        vertex_source: &str,
        fragment_source: &str,
        variant: ShaderVariant,
    ) -> Result<Self, ShaderError> {
        let vertex = Self::compile_stage(gpu, ShaderStage::Vertex, vertex_source)?;
        let fragment = match Self::compile_stage(gpu, ShaderStage::Fragment, fragment_source) {
            Ok(shader) => shader,
            Err(e) => {
                gpu.delete_shader(vertex);
                return Err(e);
            }
        };

        let linked = gpu
            .create_program()
            .map_err(ShaderError::from)
            .and_then(|program| match gpu.link_program(program, &[vertex, fragment]) {
                Ok(()) => Ok(program),
                Err(log) => {
                    gpu.delete_program(program);
                    Err(ShaderError::Linking(log))
                }
            });
        gpu.delete_shader(vertex);
        gpu.delete_shader(fragment);

        let id = linked.map_err(|e| {
            error!("{}", e);
            e
        })?;
        Ok(Self {
            id,
            variant,
            uniforms: HashMap::new(),
        })
    }

    fn compile_stage(
        gpu: &impl Gpu,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderHandle, ShaderError> {
        let shader = gpu.create_shader(stage)?;
        if let Err(log) = gpu.compile_shader(shader, source) {
            gpu.delete_shader(shader);
            error!("Failed to compile {} shader: {}", stage, log);
            error!("{} shader source:\n{}", stage, numbered(source));
            return Err(ShaderError::Compilation { stage, log });
        }
        Ok(shader)
    }

    pub fn id(&self) -> ProgramHandle {
        self.id
    }

    pub fn variant(&self) -> ShaderVariant {
        self.variant
    }

    pub fn bind(&self, gpu: &impl Gpu) {
        gpu.use_program(Some(self.id));
    }

    pub fn unbind(&self, gpu: &impl Gpu) {
        gpu.use_program(None);
    }

    /// Points the frame block at `binding`. False when the program has no
    /// such block (legacy variant or a driver that stripped it).
    pub fn bind_frame_block(&self, gpu: &impl Gpu, binding: u32) -> bool {
        self.variant == ShaderVariant::UniformBuffer
            && gpu.bind_uniform_block(self.id, FRAME_BLOCK_NAME, binding)
    }

    pub fn get_uniform_location(&mut self, gpu: &impl Gpu, name: &str) -> Option<UniformLocation> {
        if let Some(location) = self.uniforms.get(name) {
            return *location;
        }

        let location = gpu.uniform_location(self.id, name);
        if location.is_none() {
            warn!("Uniform '{}' not found in shader", name);
        }
        self.uniforms.insert(name.to_string(), location);
        location
    }

    pub fn set_uniform_1i(&mut self, gpu: &impl Gpu, name: &str, value: i32) {
        if let Some(location) = self.get_uniform_location(gpu, name) {
            gpu.set_uniform_i32(location, value);
        }
    }

    pub fn set_uniform_1f(&mut self, gpu: &impl Gpu, name: &str, value: f32) {
        if let Some(location) = self.get_uniform_location(gpu, name) {
            gpu.set_uniform_f32(location, value);
        }
    }

    pub fn set_uniform_vec3(&mut self, gpu: &impl Gpu, name: &str, value: [f32; 3]) {
        if let Some(location) = self.get_uniform_location(gpu, name) {
            gpu.set_uniform_vec3(location, value);
        }
    }

    pub fn set_uniform_mat4(&mut self, gpu: &impl Gpu, name: &str, mat: &Mat4) {
        if let Some(location) = self.get_uniform_location(gpu, name) {
            gpu.set_uniform_mat4(location, &mat.to_cols_array());
        }
    }

    /// Legacy path: pushes every frame value as its own uniform.
    pub fn apply_frame_uniforms(&mut self, gpu: &impl Gpu, frame: &FrameUniforms) {
        self.set_uniform_mat4(gpu, "uProjection", &frame.projection);
        self.set_uniform_mat4(gpu, "uView", &frame.view);
        self.set_uniform_vec3(gpu, "uLightDirection", frame.light_direction.to_array());
        self.set_uniform_vec3(gpu, "uLightColor", frame.light_color.to_array());
        self.set_uniform_vec3(gpu, "uAmbientColor", frame.ambient_color.to_array());
        self.set_uniform_1f(gpu, "uAmbientStrength", frame.ambient_strength);
        self.set_uniform_vec3(gpu, "uFogColor", frame.fog.color.to_array());
        self.set_uniform_1f(gpu, "uFogStart", frame.fog.start);
        self.set_uniform_1f(gpu, "uFogEnd", frame.fog.end);
    }

    pub fn cleanup(&mut self, gpu: &impl Gpu) {
        debug!("Deleting shader program {:?}", self.id);
        gpu.delete_program(self.id);
        self.uniforms.clear();
    }
}

fn numbered(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:4} | {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}
