//! One-shot detection of what the driver can do.
//!
//! Detection never fails: a driver that errors while being queried gets the
//! conservative [`GpuCapabilities::fallback`] snapshot, which keeps every
//! optional path switched off.

use super::gpu::{DriverLimit, DriverQuery, DriverString, GpuError};
use bitflags::bitflags;
use log::{debug, error, info, warn};
use once_cell::sync::OnceCell;
use std::collections::BTreeSet;
use std::sync::Arc;

const FALLBACK_MAX_TEXTURE_SIZE: i32 = 1024;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        const UNIFORM_BUFFERS = 1 << 0;
        const BUFFER_STORAGE = 1 << 1;
        const PERSISTENT_MAPPING = 1 << 2;
        const MULTI_DRAW_INDIRECT = 1 << 3;
        const COMPUTE_SHADERS = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Detected,
    /// The driver errored during probing; every value is a safe default.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpuCapabilities {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
    pub major: u32,
    pub minor: u32,
    pub extensions: BTreeSet<String>,
    pub features: Features,
    pub max_texture_size: i32,
    /// Zero when uniform buffers are unsupported.
    pub max_uniform_buffer_bindings: i32,
    pub max_uniform_block_size: i32,
    pub max_vertex_attribs: i32,
    /// Only reported by 4.4+ drivers.
    pub max_vertex_attrib_stride: Option<i32>,
    /// Kilobytes, from `GL_NVX_gpu_memory_info` or `GL_ATI_meminfo`.
    pub total_vram_kb: Option<i32>,
    pub available_vram_kb: Option<i32>,
    pub outcome: ProbeOutcome,
}

impl GpuCapabilities {
    pub fn detect(query: &impl DriverQuery) -> Self {
        match Self::query_all(query) {
            Ok(capabilities) => capabilities,
            Err(e) => {
                error!(
                    "GPU capability detection failed, continuing with fallback capabilities: {}",
                    e
                );
                Self::fallback()
            }
        }
    }

    /// GL 2.0 with nothing optional.
    pub fn fallback() -> Self {
        Self {
            vendor: "unknown".to_string(),
            renderer: "unknown".to_string(),
            version: "2.0".to_string(),
            major: 2,
            minor: 0,
            extensions: BTreeSet::new(),
            features: Features::empty(),
            max_texture_size: FALLBACK_MAX_TEXTURE_SIZE,
            max_uniform_buffer_bindings: 0,
            max_uniform_block_size: 0,
            max_vertex_attribs: 16,
            max_vertex_attrib_stride: None,
            total_vram_kb: None,
            available_vram_kb: None,
            outcome: ProbeOutcome::Fallback,
        }
    }

    fn query_all(query: &impl DriverQuery) -> Result<Self, GpuError> {
        let vendor = query.driver_string(DriverString::Vendor)?;
        let renderer = query.driver_string(DriverString::Renderer)?;
        let version = query.driver_string(DriverString::Version)?;
        let (major, minor) = parse_version(&version);

        let extensions = if major >= 3 {
            let count = query.driver_limit(DriverLimit::NumExtensions)?.max(0) as u32;
            let mut extensions = BTreeSet::new();
            for i in 0..count {
                let name = query.extension_at(i)?;
                if !name.is_empty() {
                    extensions.insert(name);
                }
            }
            extensions
        } else {
            query
                .driver_string(DriverString::Extensions)?
                .split_whitespace()
                .map(str::to_string)
                .collect()
        };

        let at_least = |maj: u32, min: u32| (major, minor) >= (maj, min);
        let has = |name: &str| extensions.contains(name);

        let mut features = Features::empty();
        features.set(
            Features::UNIFORM_BUFFERS,
            at_least(3, 1) || has("GL_ARB_uniform_buffer_object"),
        );
        features.set(
            Features::BUFFER_STORAGE,
            at_least(4, 4) || has("GL_ARB_buffer_storage"),
        );
        features.set(
            Features::PERSISTENT_MAPPING,
            features.contains(Features::BUFFER_STORAGE) && has("GL_ARB_buffer_storage"),
        );
        features.set(
            Features::MULTI_DRAW_INDIRECT,
            at_least(4, 3) || has("GL_ARB_multi_draw_indirect"),
        );
        features.set(
            Features::COMPUTE_SHADERS,
            at_least(4, 3) || has("GL_ARB_compute_shader"),
        );

        for (feature, label) in [
            (Features::UNIFORM_BUFFERS, "uniform buffers"),
            (Features::BUFFER_STORAGE, "buffer storage"),
            (Features::PERSISTENT_MAPPING, "persistent mapping"),
            (Features::MULTI_DRAW_INDIRECT, "multi-draw indirect"),
            (Features::COMPUTE_SHADERS, "compute shaders"),
        ] {
            if !features.contains(feature) {
                debug!("Optional GPU feature not available: {}", label);
            }
        }

        let mut max_texture_size = query.driver_limit(DriverLimit::MaxTextureSize)?;
        if max_texture_size <= 0 {
            warn!(
                "Driver reported max texture size {}, assuming {}",
                max_texture_size, FALLBACK_MAX_TEXTURE_SIZE
            );
            max_texture_size = FALLBACK_MAX_TEXTURE_SIZE;
        }

        let (max_uniform_buffer_bindings, max_uniform_block_size) =
            if features.contains(Features::UNIFORM_BUFFERS) {
                (
                    query.driver_limit(DriverLimit::MaxUniformBufferBindings)?,
                    query.driver_limit(DriverLimit::MaxUniformBlockSize)?,
                )
            } else {
                (0, 0)
            };

        let max_vertex_attribs = query.driver_limit(DriverLimit::MaxVertexAttribs)?;
        let max_vertex_attrib_stride = if at_least(4, 4) {
            Some(query.driver_limit(DriverLimit::MaxVertexAttribStride)?)
        } else {
            None
        };

        // Vendor memory queries are best effort; a driver advertising the
        // extension but rejecting the enum is not worth a fallback.
        let (total_vram_kb, available_vram_kb) = if has("GL_NVX_gpu_memory_info") {
            (
                memory_query(query, DriverLimit::TotalVideoMemoryNvx),
                memory_query(query, DriverLimit::AvailableVideoMemoryNvx),
            )
        } else if has("GL_ATI_meminfo") {
            // ATI only reports free memory, so that is the best known total
            let free = memory_query(query, DriverLimit::TextureFreeMemoryAti);
            (free, free)
        } else {
            (None, None)
        };

        Ok(Self {
            vendor,
            renderer,
            version,
            major,
            minor,
            extensions,
            features,
            max_texture_size,
            max_uniform_buffer_bindings,
            max_uniform_block_size,
            max_vertex_attribs,
            max_vertex_attrib_stride,
            total_vram_kb,
            available_vram_kb,
            outcome: ProbeOutcome::Detected,
        })
    }

    pub fn supports(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }

    pub fn supports_uniform_buffers(&self) -> bool {
        self.supports(Features::UNIFORM_BUFFERS)
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    pub fn is_version_at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    pub fn is_amd(&self) -> bool {
        let vendor = self.vendor.to_lowercase();
        vendor.contains("advanced micro devices")
            || vendor
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|word| word == "amd" || word == "ati")
    }

    pub fn is_nvidia(&self) -> bool {
        self.vendor.to_lowercase().contains("nvidia")
    }

    pub fn is_intel(&self) -> bool {
        self.vendor.to_lowercase().contains("intel")
    }

    pub fn is_mesa(&self) -> bool {
        self.renderer.to_lowercase().contains("mesa")
            || self.version.to_lowercase().contains("mesa")
    }

    pub fn log_summary(&self) {
        info!("GPU: {} ({})", self.renderer, self.vendor);
        info!(
            "OpenGL {} (parsed {}.{})",
            self.version, self.major, self.minor
        );
        info!("Features: {:?}", self.features);
        info!(
            "Limits: max texture {}, vertex attribs {}, UBO bindings {}, UBO block size {}",
            self.max_texture_size,
            self.max_vertex_attribs,
            self.max_uniform_buffer_bindings,
            self.max_uniform_block_size
        );
        if let Some(total) = self.total_vram_kb {
            info!("Video memory: {} MB total", total / 1024);
        }
        if let Some(available) = self.available_vram_kb {
            info!("Video memory: {} MB available", available / 1024);
        }
        if self.outcome == ProbeOutcome::Fallback {
            warn!("Capabilities are fallback values, optional render paths are disabled");
        }
    }
}

fn memory_query(query: &impl DriverQuery, limit: DriverLimit) -> Option<i32> {
    match query.driver_limit(limit) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Video memory query {:?} rejected: {}", limit, e);
            None
        }
    }
}

/// Leading `major.minor` of a GL version string. Vendor suffixes are ignored
/// and anything unparseable reads as zero.
pub fn parse_version(version: &str) -> (u32, u32) {
    let mut tokens = version.split([' ', '.']).filter(|token| !token.is_empty());
    let mut number = || {
        tokens
            .next()
            .map(|token| {
                let digits: String = token.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
            .unwrap_or(0)
    };
    let major = number();
    let minor = number();
    (major, minor)
}

/// Computes the capability snapshot on first use and hands out the same
/// `Arc` afterwards. Owned by whoever owns the context, never global.
#[derive(Debug, Default)]
pub struct CapabilityCache {
    cell: OnceCell<Arc<GpuCapabilities>>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_detect(&self, query: &impl DriverQuery) -> Arc<GpuCapabilities> {
        Arc::clone(self.cell.get_or_init(|| {
            let capabilities = GpuCapabilities::detect(query);
            capabilities.log_summary();
            Arc::new(capabilities)
        }))
    }

    pub fn get(&self) -> Option<Arc<GpuCapabilities>> {
        self.cell.get().cloned()
    }

    /// Forgets the snapshot so the next call detects again.
    pub fn reset(&mut self) {
        self.cell.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::RecordingGpu;
    use std::collections::HashMap;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("4.6.0 NVIDIA 535.54"), (4, 6));
        assert_eq!(parse_version("3.3 (Core Profile) Mesa 23.0"), (3, 3));
        assert_eq!(parse_version("2.1 Mesa 10.1.3"), (2, 1));
        assert_eq!(parse_version("4.5b"), (4, 5));
        assert_eq!(parse_version("OpenGL ES 3.2"), (0, 0));
        assert_eq!(parse_version(""), (0, 0));
    }

    fn ati_driver(extensions: &[&str]) -> RecordingGpu {
        let mut limits = HashMap::new();
        limits.insert(DriverLimit::MaxTextureSize, 16384);
        limits.insert(DriverLimit::MaxUniformBufferBindings, 36);
        limits.insert(DriverLimit::MaxUniformBlockSize, 65536);
        limits.insert(DriverLimit::MaxVertexAttribs, 29);
        limits.insert(DriverLimit::MaxVertexAttribStride, 2048);
        limits.insert(DriverLimit::NumExtensions, extensions.len() as i32);
        limits.insert(DriverLimit::TextureFreeMemoryAti, 3_145_728);
        RecordingGpu::with_driver(
            "ATI Technologies Inc.",
            "AMD Radeon RX 580",
            "4.6.14761 Compatibility Profile Context",
            extensions.iter().map(|name| name.to_string()).collect(),
            limits,
        )
    }

    #[test]
    fn test_empty_extension_names_are_skipped() {
        let gpu = ati_driver(&["GL_ARB_buffer_storage", "", "GL_ATI_meminfo"]);
        let capabilities = GpuCapabilities::detect(&gpu);
        assert_eq!(capabilities.extensions.len(), 2);
        assert!(!capabilities.has_extension(""));
        assert!(capabilities.has_extension("GL_ATI_meminfo"));
    }

    #[test]
    fn test_ati_free_memory_doubles_as_total() {
        let capabilities = GpuCapabilities::detect(&ati_driver(&["GL_ATI_meminfo"]));
        assert!(capabilities.is_amd());
        assert_eq!(capabilities.available_vram_kb, Some(3_145_728));
        assert_eq!(capabilities.total_vram_kb, Some(3_145_728));
    }

    #[test]
    fn test_detect_modern_driver() {
        let capabilities = GpuCapabilities::detect(&RecordingGpu::modern());
        assert_eq!(capabilities.outcome, ProbeOutcome::Detected);
        assert_eq!((capabilities.major, capabilities.minor), (4, 6));
        assert!(capabilities.supports_uniform_buffers());
        assert!(capabilities.supports(Features::PERSISTENT_MAPPING));
        assert!(capabilities.supports(Features::COMPUTE_SHADERS));
        assert_eq!(capabilities.max_texture_size, 16384);
        assert_eq!(capabilities.max_vertex_attrib_stride, Some(2048));
        assert_eq!(capabilities.total_vram_kb, Some(8_388_608));
        assert!(capabilities.is_nvidia());
        assert!(!capabilities.is_amd());
        assert!(capabilities.is_version_at_least(4, 3));
        assert!(!capabilities.is_version_at_least(4, 7));
    }

    #[test]
    fn test_detect_legacy_driver_uses_extension_string() {
        let mut gpu = RecordingGpu::legacy();
        gpu.extensions = vec!["GL_ARB_uniform_buffer_object".to_string()];
        gpu.limits.insert(DriverLimit::MaxUniformBufferBindings, 36);
        gpu.limits.insert(DriverLimit::MaxUniformBlockSize, 16384);

        let capabilities = GpuCapabilities::detect(&gpu);
        assert_eq!(capabilities.outcome, ProbeOutcome::Detected);
        assert_eq!((capabilities.major, capabilities.minor), (2, 1));
        assert!(capabilities.has_extension("GL_ARB_uniform_buffer_object"));
        assert!(capabilities.supports_uniform_buffers());
        assert!(!capabilities.supports(Features::BUFFER_STORAGE));
        assert_eq!(capabilities.max_uniform_buffer_bindings, 36);
        assert_eq!(capabilities.max_vertex_attrib_stride, None);
        assert!(capabilities.is_intel());
        assert!(capabilities.is_mesa());
    }

    #[test]
    fn test_buffer_storage_by_version_without_extension_is_not_persistent() {
        let mut limits = HashMap::new();
        limits.insert(DriverLimit::NumExtensions, 0);
        limits.insert(DriverLimit::MaxTextureSize, 8192);
        limits.insert(DriverLimit::MaxUniformBufferBindings, 72);
        limits.insert(DriverLimit::MaxUniformBlockSize, 65536);
        limits.insert(DriverLimit::MaxVertexAttribs, 29);
        limits.insert(DriverLimit::MaxVertexAttribStride, 2048);
        let gpu = RecordingGpu::with_driver(
            "ATI Technologies Inc.",
            "Radeon",
            "4.6.14761",
            Vec::new(),
            limits,
        );

        let capabilities = GpuCapabilities::detect(&gpu);
        assert!(capabilities.supports(Features::BUFFER_STORAGE));
        assert!(!capabilities.supports(Features::PERSISTENT_MAPPING));
        assert!(capabilities.is_amd());
        assert_eq!(capabilities.available_vram_kb, None);
    }

    #[test]
    fn test_query_failure_falls_back() {
        let mut gpu = RecordingGpu::modern();
        gpu.fail_queries = true;

        let capabilities = GpuCapabilities::detect(&gpu);
        assert_eq!(capabilities.outcome, ProbeOutcome::Fallback);
        assert!(capabilities.features.is_empty());
        assert!(!capabilities.supports_uniform_buffers());
        assert!(capabilities.max_texture_size > 0);
    }

    #[test]
    fn test_missing_required_limit_falls_back() {
        let mut gpu = RecordingGpu::legacy();
        gpu.limits.remove(&DriverLimit::MaxTextureSize);
        assert_eq!(GpuCapabilities::detect(&gpu), GpuCapabilities::fallback());
    }

    #[test]
    fn test_cache_detects_once() {
        let mut cache = CapabilityCache::new();
        assert!(cache.get().is_none());

        let first = cache.get_or_detect(&RecordingGpu::modern());
        let second = cache.get_or_detect(&RecordingGpu::legacy());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.major, 4);

        cache.reset();
        let third = cache.get_or_detect(&RecordingGpu::legacy());
        assert_eq!(third.major, 2);
    }
}
