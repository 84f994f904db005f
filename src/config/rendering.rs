use super::ConfigError;
use directories::ProjectDirs;
use glam::Vec3;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_FOG_COLOR: [f32; 3] = [0.74, 0.84, 0.93];
pub const DEFAULT_FOG_START: f32 = 48.0;
pub const DEFAULT_FOG_END: f32 = 96.0;

/// World-facing knobs the host game may override. Every field is optional;
/// whatever is left unset falls back to the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub fog_color: Option<[f32; 3]>,
    pub fog_start: Option<f32>,
    pub fog_end: Option<f32>,
    /// In chunks.
    pub render_distance: Option<u32>,
}

/// Resolved linear fog for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParams {
    pub color: Vec3,
    pub start: f32,
    pub end: f32,
}

impl Default for FogParams {
    fn default() -> Self {
        Self {
            color: Vec3::from(DEFAULT_FOG_COLOR),
            start: DEFAULT_FOG_START,
            end: DEFAULT_FOG_END,
        }
    }
}

impl RenderSettings {
    /// An explicit fog end wins; otherwise fog tracks the render distance so
    /// the edge of the loaded world is hidden.
    pub fn fog(&self) -> FogParams {
        let color = Vec3::from(self.fog_color.unwrap_or(DEFAULT_FOG_COLOR));

        if let Some(end) = self.fog_end.filter(|end| *end > 0.0) {
            let start = self
                .fog_start
                .filter(|start| *start > 0.0)
                .unwrap_or(end * 0.6);
            return FogParams { color, start, end };
        }

        if let Some(distance) = self.render_distance {
            let end = (distance as f32 * 16.0).max(32.0) * 0.95;
            return FogParams {
                color,
                start: end * 0.55,
                end,
            };
        }

        FogParams {
            color,
            ..FogParams::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Bundled block art, one `<name>.png` per texture.
    pub texture_asset_dir: PathBuf,
    /// Where generated textures are persisted and re-read from.
    pub texture_cache_dir: PathBuf,
    pub uniform_binding: u32,
    /// Use the uniform-buffer path when the driver supports it.
    pub prefer_uniform_buffers: bool,
    pub log_level: String,
    pub settings: RenderSettings,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let texture_cache_dir = ProjectDirs::from("com", "MetroManDevTeam", "Bloksel")
            .map(|dirs| dirs.cache_dir().join("textures"))
            .unwrap_or_else(|| PathBuf::from("cache/textures"));

        Self {
            texture_asset_dir: PathBuf::from("assets/textures/blocks"),
            texture_cache_dir,
            uniform_binding: 0,
            prefer_uniform_buffers: true,
            log_level: "info".to_string(),
            settings: RenderSettings::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reads `path`, writing the defaults there first when it doesn't exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        if !path.exists() {
            let default_config = Self::default();
            std::fs::write(path, default_config.to_toml_string()?).map_err(io_error)?;
            return Ok(default_config);
        }

        let content = std::fs::read_to_string(path).map_err(io_error)?;
        Self::from_toml_str(&content)
    }

    /// Unparseable levels fall back to `Info`.
    pub fn log_level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs = ProjectDirs::from("com", "MetroManDevTeam", "Bloksel")
        .ok_or(ConfigError::NoProjectDirs)?;
    Ok(proj_dirs.config_dir().join("render.toml"))
}
