//! Per-frame chunk drawing.
//!
//! [`ChunkRenderer`] owns every GPU resource of the world pass: the block
//! shader, the texture atlas, the frame-uniform buffer and one
//! [`ChunkRenderState`] per chunk that has been seen on screen. It must live
//! on the thread that owns the graphics context; other threads talk to it
//! only through meshes published into a [`MeshSlot`](crate::world::MeshSlot)
//! and the unload channel from [`ChunkRenderer::unload_handle`].

use super::atlas::TextureAtlas;
use super::capabilities::GpuCapabilities;
use super::chunk_state::ChunkRenderState;
use super::frustum::ChunkFrustum;
use super::gpu::{Gpu, RenderFlag};
use super::lighting::{SunLight, AMBIENT_COLOR, AMBIENT_STRENGTH};
use super::shaders::{ShaderProgram, ShaderVariant};
use super::texgen::TextureSynthesizer;
use super::uniforms::{FrameUniforms, UniformBufferStore};
use crate::config::{RenderConfig, RenderSettings};
use crate::utils::error::{RenderError, Result};
use crate::world::{ChunkPos, RenderableChunk};
use crossbeam_channel::{Receiver, Sender};
use glam::Mat4;
use image::RgbaImage;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

const ATLAS_TEXTURE_UNIT: u32 = 0;

/// Extra named textures baked into the atlas at `init()`, e.g. from mods.
pub trait TextureSource {
    fn source_name(&self) -> &str;
    fn textures(&self) -> BTreeMap<String, RgbaImage>;
}

impl TextureSource for BTreeMap<String, RgbaImage> {
    fn source_name(&self) -> &str {
        "static textures"
    }

    fn textures(&self) -> BTreeMap<String, RgbaImage> {
        self.clone()
    }
}

/// Counters for the last rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Chunks that passed the frustum test.
    pub visible: usize,
    pub culled: usize,
    /// Chunks that actually issued a draw call.
    pub drawn: usize,
    pub uploads: usize,
    /// Render states released from the unload queue at the top of the frame.
    pub unloaded: usize,
}

pub struct ChunkRenderer<G: Gpu> {
    gpu: Rc<G>,
    capabilities: Arc<GpuCapabilities>,
    config: RenderConfig,
    settings: RenderSettings,
    sun: SunLight,
    synthesizer: TextureSynthesizer,
    texture_sources: Vec<Box<dyn TextureSource>>,
    shader: Option<ShaderProgram>,
    atlas: Option<TextureAtlas>,
    uniform_store: Option<UniformBufferStore>,
    frustum: ChunkFrustum,
    states: HashMap<ChunkPos, ChunkRenderState>,
    unload_tx: Sender<ChunkPos>,
    unload_rx: Receiver<ChunkPos>,
    last_stats: FrameStats,
}

impl<G: Gpu> ChunkRenderer<G> {
    pub fn new(gpu: Rc<G>, capabilities: Arc<GpuCapabilities>, config: RenderConfig) -> Self {
        let (unload_tx, unload_rx) = crossbeam_channel::unbounded();
        Self {
            gpu,
            capabilities,
            settings: config.settings.clone(),
            synthesizer: TextureSynthesizer::from_config(&config),
            config,
            sun: SunLight::default(),
            texture_sources: Vec::new(),
            shader: None,
            atlas: None,
            uniform_store: None,
            frustum: ChunkFrustum::new(),
            states: HashMap::new(),
            unload_tx,
            unload_rx,
            last_stats: FrameStats::default(),
        }
    }

    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }

    pub fn set_sun_light(&mut self, sun: SunLight) {
        self.sun = sun;
    }

    pub fn sun_light(&self) -> &SunLight {
        &self.sun
    }

    pub fn sun_light_mut(&mut self) -> &mut SunLight {
        &mut self.sun
    }

    /// Replaces the default synthesizer built from the config's directories.
    pub fn set_texture_synthesizer(&mut self, synthesizer: TextureSynthesizer) {
        self.synthesizer = synthesizer;
    }

    /// Registers textures to bake in after the built-in ones. Only takes
    /// effect for a subsequent `init()`.
    pub fn add_texture_source(&mut self, source: Box<dyn TextureSource>) {
        self.texture_sources.push(source);
    }

    /// Creates the shader, uniform storage and atlas. Needs a current context.
    pub fn init(&mut self) -> Result<()> {
        if self.is_initialized() {
            warn!("Chunk renderer already initialized");
            return Ok(());
        }
        info!("Initializing chunk renderer...");

        if let Err(e) = self.init_resources() {
            self.release_resources();
            return Err(e);
        }

        self.frustum = ChunkFrustum::new();
        info!(
            "Chunk renderer ready ({:?} uniforms)",
            self.shader.as_ref().map(ShaderProgram::variant)
        );
        Ok(())
    }

    fn init_resources(&mut self) -> Result<()> {
        let gpu = Rc::clone(&self.gpu);
        let gpu = &*gpu;

        if self.config.prefer_uniform_buffers && self.capabilities.supports_uniform_buffers() {
            let mut store = UniformBufferStore::new(self.config.uniform_binding);
            match store.init(gpu) {
                Ok(()) => self.uniform_store = Some(store),
                Err(e) => warn!(
                    "Failed to initialise uniform buffer, falling back to legacy uniforms: {}",
                    e
                ),
            }
        }

        let variant = if self.uniform_store.is_some() {
            ShaderVariant::UniformBuffer
        } else {
            ShaderVariant::Legacy
        };
        let mut shader = ShaderProgram::block_shader(gpu, variant)?;

        if variant == ShaderVariant::UniformBuffer
            && !shader.bind_frame_block(gpu, self.config.uniform_binding)
        {
            warn!("Block shader has no frame uniform block, falling back to legacy uniforms");
            shader.cleanup(gpu);
            if let Some(mut store) = self.uniform_store.take() {
                store.cleanup(gpu);
            }
            shader = ShaderProgram::block_shader(gpu, ShaderVariant::Legacy)?;
        }
        self.shader = Some(shader);

        self.atlas = Some(self.build_atlas(gpu)?);
        Ok(())
    }

    fn build_atlas(&self, gpu: &G) -> Result<TextureAtlas> {
        let mut atlas = TextureAtlas::new();

        let block_textures = self.synthesizer.ensure_block_textures();
        for (name, image) in &block_textures {
            atlas
                .add_image(name, image)
                .map_err(|source| RenderError::CoreTexture {
                    name: name.clone(),
                    source,
                })?;
        }

        let mut extra = 0;
        let auxiliary = self.synthesizer.ensure_auxiliary_textures();
        let sources = std::iter::once(("generated flora", auxiliary)).chain(
            self.texture_sources
                .iter()
                .map(|source| (source.source_name(), source.textures())),
        );
        for (source_name, textures) in sources {
            for (name, image) in &textures {
                match atlas.add_image(name, image) {
                    Ok(_) => extra += 1,
                    Err(e) => warn!("Skipping texture '{}' from {}: {}", name, source_name, e),
                }
            }
        }

        atlas.build(gpu)?;
        info!(
            "Built texture atlas with {} generated textures and {} extra textures",
            block_textures.len(),
            extra
        );
        Ok(atlas)
    }

    pub fn is_initialized(&self) -> bool {
        self.shader.is_some() && self.atlas.is_some()
    }

    /// Draws every visible chunk in `chunks`.
    ///
    /// The input is copied into a snapshot first; pending unloads are applied
    /// before anything is drawn.
    pub fn render<'a, C, I>(
        &mut self,
        chunks: I,
        view: &Mat4,
        projection: &Mat4,
    ) -> Result<FrameStats>
    where
        C: RenderableChunk + ?Sized + 'a,
        I: IntoIterator<Item = &'a C>,
    {
        if !self.is_initialized() {
            return Err(RenderError::NotInitialized);
        }

        let unloaded = self.drain_unload_queue();
        let snapshot: Vec<&C> = chunks.into_iter().collect();
        let frame = self.frame_uniforms(view, projection);
        let gpu = Rc::clone(&self.gpu);
        let gpu = &*gpu;

        let (Some(shader), Some(atlas)) = (self.shader.as_mut(), self.atlas.as_ref()) else {
            return Err(RenderError::NotInitialized);
        };

        gpu.set_flag(RenderFlag::DepthTest, true);
        gpu.set_flag(RenderFlag::CullBackFaces, true);
        // Leaves, ice and snow layers blend
        gpu.set_flag(RenderFlag::AlphaBlend, true);

        shader.bind(gpu);
        match self.uniform_store.as_mut() {
            Some(store) => {
                store.update(gpu, &frame)?;
                store.bind(gpu);
            }
            None => shader.apply_frame_uniforms(gpu, &frame),
        }

        atlas.bind(gpu, ATLAS_TEXTURE_UNIT);
        shader.set_uniform_1i(gpu, "uTexture", ATLAS_TEXTURE_UNIT as i32);

        self.frustum.update(&(*projection * *view));

        let mut stats = FrameStats {
            unloaded,
            ..FrameStats::default()
        };
        for chunk in snapshot {
            let pos = chunk.position();
            if !self.frustum.test_chunk(pos) {
                stats.culled += 1;
                continue;
            }
            stats.visible += 1;

            let state = self.states.entry(pos).or_default();
            if let Some(mesh) = chunk.mesh() {
                if state.needs_upload(mesh.version) {
                    match state.upload_mesh(gpu, &mesh.mesh, mesh.version) {
                        Ok(()) => stats.uploads += 1,
                        Err(e) => {
                            // Retried next frame since the version is unchanged
                            warn!("Mesh upload for chunk {} failed: {}", pos, e);
                            continue;
                        }
                    }
                }
            }

            shader.set_uniform_mat4(gpu, "uModel", &Mat4::from_translation(pos.world_origin()));
            if state.render(gpu) {
                stats.drawn += 1;
            }
        }

        shader.unbind(gpu);
        gpu.set_flag(RenderFlag::AlphaBlend, false);

        self.last_stats = stats;
        Ok(stats)
    }

    fn frame_uniforms(&self, view: &Mat4, projection: &Mat4) -> FrameUniforms {
        FrameUniforms {
            projection: *projection,
            view: *view,
            light_direction: self.sun.direction(),
            light_color: self.sun.effective_color(),
            ambient_color: AMBIENT_COLOR,
            ambient_strength: AMBIENT_STRENGTH,
            fog: self.settings.fog(),
        }
    }

    /// Releases the GPU state of `pos`. Must be called on the render thread;
    /// other threads go through [`unload_handle`](Self::unload_handle).
    pub fn on_chunk_unloaded(&mut self, pos: ChunkPos) {
        if let Some(mut state) = self.states.remove(&pos) {
            state.cleanup(&*self.gpu);
            debug!("Released render state of chunk {}", pos);
        }
    }

    /// Queue for unload notifications from other threads, applied at the top
    /// of the next `render`.
    pub fn unload_handle(&self) -> Sender<ChunkPos> {
        self.unload_tx.clone()
    }

    fn drain_unload_queue(&mut self) -> usize {
        let pending: Vec<ChunkPos> = self.unload_rx.try_iter().collect();
        let before = self.states.len();
        for pos in pending {
            self.on_chunk_unloaded(pos);
        }
        before - self.states.len()
    }

    fn release_resources(&mut self) {
        let gpu = Rc::clone(&self.gpu);
        let gpu = &*gpu;
        if let Some(mut shader) = self.shader.take() {
            shader.cleanup(gpu);
        }
        if let Some(mut store) = self.uniform_store.take() {
            store.cleanup(gpu);
        }
        if let Some(mut atlas) = self.atlas.take() {
            atlas.cleanup(gpu);
        }
    }

    /// Releases the shader, atlas, uniform buffer and every chunk's buffers.
    pub fn cleanup(&mut self) {
        info!("Cleaning up chunk renderer...");
        self.release_resources();
        let gpu = Rc::clone(&self.gpu);
        for (_, mut state) in self.states.drain() {
            state.cleanup(&*gpu);
        }
        self.unload_rx.try_iter().for_each(drop);
    }

    /// Chunks currently holding a render state.
    pub fn rendered_chunk_count(&self) -> usize {
        self.states.len()
    }

    pub fn texture_atlas(&self) -> Option<&TextureAtlas> {
        self.atlas.as_ref()
    }

    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }

    pub fn shader_variant(&self) -> Option<ShaderVariant> {
        self.shader.as_ref().map(ShaderProgram::variant)
    }

    pub fn capabilities(&self) -> &GpuCapabilities {
        &self.capabilities
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }
}

impl<G: Gpu> Drop for ChunkRenderer<G> {
    fn drop(&mut self) {
        if self.is_initialized() || !self.states.is_empty() {
            self.cleanup();
        }
    }
}
