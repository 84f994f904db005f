//! Places an existing texture can come from, tried in order before anything
//! is generated.

use image::RgbaImage;
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub trait TextureProvider: Send + Sync {
    /// Short label for log messages.
    fn name(&self) -> &str;

    /// The decoded texture, or `None` when this provider doesn't have it or
    /// can't read it. Dimensions are checked by the caller.
    fn load(&self, texture: &str) -> Option<RgbaImage>;
}

/// PNG bytes compiled into the host binary (e.g. via `include_bytes!`).
#[derive(Default)]
pub struct EmbeddedTextures {
    textures: HashMap<String, &'static [u8]>,
}

impl EmbeddedTextures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, png: &'static [u8]) -> Self {
        self.insert(name, png);
        self
    }

    pub fn insert(&mut self, name: &str, png: &'static [u8]) {
        self.textures.insert(name.to_string(), png);
    }
}

impl TextureProvider for EmbeddedTextures {
    fn name(&self) -> &str {
        "embedded"
    }

    fn load(&self, texture: &str) -> Option<RgbaImage> {
        let bytes = self.textures.get(texture)?;
        match image::load_from_memory(bytes) {
            Ok(image) => Some(image.to_rgba8()),
            Err(e) => {
                warn!("Embedded texture '{}' failed to decode: {}", texture, e);
                None
            }
        }
    }
}

/// A folder of `<name>.png` files.
pub struct DirectoryTextures {
    label: String,
    root: PathBuf,
}

impl DirectoryTextures {
    pub fn new(label: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            label: label.to_string(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, texture: &str) -> PathBuf {
        texture_path(&self.root, texture)
    }
}

impl TextureProvider for DirectoryTextures {
    fn name(&self) -> &str {
        &self.label
    }

    fn load(&self, texture: &str) -> Option<RgbaImage> {
        let path = self.path_for(texture);
        if !path.exists() {
            return None;
        }
        match image::open(&path) {
            Ok(image) => {
                debug!("Loaded texture '{}' from {}", texture, path.display());
                Some(image.to_rgba8())
            }
            Err(e) => {
                warn!("Couldn't read texture {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Deterministic on-disk location of a texture inside `dir`.
pub fn texture_path(dir: &Path, texture: &str) -> PathBuf {
    dir.join(format!("{}.png", texture))
}
