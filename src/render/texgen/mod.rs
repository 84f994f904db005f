//! Block textures on demand.
//!
//! [`TextureSynthesizer::ensure`] walks the provider chain (embedded art,
//! the asset folder, the generated-texture cache) and only paints a texture
//! procedurally when none of them has a usable 16×16 image. Freshly painted
//! textures are written to the cache folder so artists can replace them.

pub mod patterns;
pub mod providers;

pub use patterns::{BLOCK_PATTERNS, FLORA_PATTERNS};
pub use providers::{DirectoryTextures, EmbeddedTextures, TextureProvider};

use crate::config::RenderConfig;
use crate::render::atlas::TEXTURE_SIZE;
use image::{ImageFormat, RgbaImage};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SEED_DOMAIN: &str = "bloksel-texgen:";

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("Texture I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to encode texture: {0}")]
    Encode(#[from] image::ImageError),
}

/// Stable per-name seed: the first eight bytes of a SHA-256 digest, read
/// little-endian. Identical on every platform and release.
pub fn seed_for(name: &str) -> u64 {
    let digest = Sha256::digest(format!("{}{}", SEED_DOMAIN, name).as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

pub struct TextureSynthesizer {
    providers: Vec<Box<dyn TextureProvider>>,
    cache_dir: Option<PathBuf>,
    block_textures: OnceCell<BTreeMap<String, RgbaImage>>,
}

impl TextureSynthesizer {
    /// Providers are tried in the given order; generated textures are
    /// persisted to `cache_dir` when one is set.
    pub fn new(providers: Vec<Box<dyn TextureProvider>>, cache_dir: Option<PathBuf>) -> Self {
        Self {
            providers,
            cache_dir,
            block_textures: OnceCell::new(),
        }
    }

    /// Asset folder first, then the cache folder, persisting to the latter.
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            vec![
                Box::new(DirectoryTextures::new("assets", &config.texture_asset_dir)),
                Box::new(DirectoryTextures::new("cache", &config.texture_cache_dir)),
            ],
            Some(config.texture_cache_dir.clone()),
        )
    }

    /// Embedded art takes precedence over everything on disk.
    pub fn with_embedded(mut self, embedded: EmbeddedTextures) -> Self {
        self.providers.insert(0, Box::new(embedded));
        self
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// A 16×16 texture for `name`, or `None` if no provider has one and no
    /// pattern exists for it.
    pub fn ensure(&self, name: &str) -> Option<RgbaImage> {
        for provider in &self.providers {
            let Some(image) = provider.load(name) else {
                continue;
            };
            if image.dimensions() == (TEXTURE_SIZE, TEXTURE_SIZE) {
                return Some(image);
            }
            warn!(
                "Texture '{}' from {} is {}x{} but needs to be {}x{}, ignoring it",
                name,
                provider.name(),
                image.width(),
                image.height(),
                TEXTURE_SIZE,
                TEXTURE_SIZE
            );
        }

        let image = self.generate(name)?;
        match self.persist(name, &image) {
            Ok(true) => debug!("Generated texture '{}'", name),
            Ok(false) => {}
            Err(e) => warn!("Failed to save generated texture '{}': {}", name, e),
        }
        Some(image)
    }

    /// Paints `name` without touching any provider or the disk.
    pub fn generate(&self, name: &str) -> Option<RgbaImage> {
        let Some(pattern) = patterns::pattern_for(name) else {
            debug!("No procedural pattern for '{}'", name);
            return None;
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed_for(name));
        Some(pattern(&mut rng))
    }

    /// Writes `image` into the cache folder unless a file is already there.
    /// Returns whether anything was written.
    fn persist(&self, name: &str, image: &RgbaImage) -> Result<bool, TextureError> {
        let Some(dir) = &self.cache_dir else {
            return Ok(false);
        };
        fs::create_dir_all(dir).map_err(|source| TextureError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = providers::texture_path(dir, name);
        write_new_file(&path, |file| write_png(file, image))
    }

    /// Every block-face texture, resolved once and memoized.
    pub fn ensure_block_textures(&self) -> BTreeMap<String, RgbaImage> {
        self.block_textures
            .get_or_init(|| {
                let textures = self.ensure_set(BLOCK_PATTERNS);
                info!("Resolved {} block textures", textures.len());
                textures
            })
            .clone()
    }

    /// Flora and other decoration textures. Not memoized.
    pub fn ensure_auxiliary_textures(&self) -> BTreeMap<String, RgbaImage> {
        self.ensure_set(FLORA_PATTERNS)
    }

    fn ensure_set(&self, set: &[(&str, patterns::Pattern)]) -> BTreeMap<String, RgbaImage> {
        set.par_iter()
            .filter_map(|(name, _)| self.ensure(name).map(|image| (name.to_string(), image)))
            .collect()
    }
}

/// Creates `path` and fills it with `write`. Never touches an existing file,
/// and removes a half-written one so the next run can try again.
fn write_new_file(
    path: &Path,
    write: impl FnOnce(File) -> Result<(), TextureError>,
) -> Result<bool, TextureError> {
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(source) => {
            return Err(TextureError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if let Err(e) = write(file) {
        if let Err(remove) = fs::remove_file(path) {
            warn!(
                "Failed to remove partial texture {}: {}",
                path.display(),
                remove
            );
        }
        return Err(e);
    }
    Ok(true)
}

fn write_png(file: File, image: &RgbaImage) -> Result<(), TextureError> {
    let mut writer = BufWriter::new(file);
    image.write_to(&mut writer, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn cache_only(dir: &Path) -> TextureSynthesizer {
        TextureSynthesizer::new(
            vec![Box::new(DirectoryTextures::new("cache", dir))],
            Some(dir.to_path_buf()),
        )
    }

    fn save(path: &Path, image: &RgbaImage) {
        image.save_with_format(path, ImageFormat::Png).unwrap();
    }

    #[test]
    fn test_failed_write_leaves_no_partial_file() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dirt.png");
        let result = write_new_file(&path, |mut file| {
            file.write_all(b"\x89PNG\r\n").unwrap();
            Err(TextureError::Io {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::WriteZero, "disk full"),
            })
        });
        assert!(result.is_err());
        assert!(!path.exists());

        let image = RgbaImage::from_pixel(16, 16, Rgba([1, 2, 3, 255]));
        assert!(write_new_file(&path, |file| write_png(file, &image)).unwrap());
        assert!(!write_new_file(&path, |file| write_png(file, &image)).unwrap());
        assert_eq!(image::open(&path).unwrap().to_rgba8(), image);
    }

    #[test]
    fn test_seed_is_stable() {
        assert_eq!(seed_for("dirt"), seed_for("dirt"));
        assert_ne!(seed_for("dirt"), seed_for("stone"));
        let digest = Sha256::digest(b"bloksel-texgen:dirt");
        assert_eq!(seed_for("dirt").to_le_bytes(), digest[..8]);
    }

    #[test]
    fn test_generation_is_deterministic_across_runs() {
        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        let first = cache_only(first_dir.path()).ensure("grass_side").unwrap();
        let second = cache_only(second_dir.path()).ensure("grass_side").unwrap();
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn test_generated_texture_is_persisted_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let synthesizer = cache_only(dir.path());
        let generated = synthesizer.ensure("stone").unwrap();

        let path = dir.path().join("stone.png");
        assert!(path.exists());
        let on_disk = image::open(&path).unwrap().to_rgba8();
        assert_eq!(on_disk, generated);
    }

    #[test]
    fn test_oversized_cache_file_is_regenerated_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dirt.png");
        save(&path, &RgbaImage::from_pixel(32, 32, Rgba([9, 9, 9, 255])));

        let image = cache_only(dir.path()).ensure("dirt").unwrap();
        assert_eq!(image.dimensions(), (16, 16));
        assert_eq!(
            Some(image),
            TextureSynthesizer::new(Vec::new(), None).generate("dirt")
        );

        let untouched = image::open(&path).unwrap().to_rgba8();
        assert_eq!(untouched.dimensions(), (32, 32));
    }

    #[test]
    fn test_existing_art_wins() {
        let dir = tempfile::tempdir().unwrap();
        let custom = RgbaImage::from_pixel(16, 16, Rgba([1, 2, 3, 255]));
        save(&dir.path().join("sand.png"), &custom);

        let resolved = cache_only(dir.path()).ensure("sand").unwrap();
        assert_eq!(resolved, custom);
    }

    #[test]
    fn test_embedded_precedes_directories() {
        let dir = tempfile::tempdir().unwrap();
        let black = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]));
        save(&dir.path().join("ice.png"), &black);

        let mut bytes = std::io::Cursor::new(Vec::new());
        RgbaImage::from_pixel(16, 16, Rgba([200, 0, 0, 255]))
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        let png: &'static [u8] = Box::leak(bytes.into_inner().into_boxed_slice());

        let synthesizer =
            cache_only(dir.path()).with_embedded(EmbeddedTextures::new().with("ice", png));
        assert_eq!(
            synthesizer.ensure("ice").unwrap().get_pixel(0, 0),
            &Rgba([200, 0, 0, 255])
        );
    }

    #[test]
    fn test_unknown_name_without_art() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cache_only(dir.path()).ensure("obsidian").is_none());
        assert!(!dir.path().join("obsidian.png").exists());
    }

    #[test]
    fn test_block_set_is_complete_and_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let synthesizer = cache_only(dir.path());
        let textures = synthesizer.ensure_block_textures();
        assert_eq!(textures.len(), BLOCK_PATTERNS.len());
        for (name, _) in BLOCK_PATTERNS {
            assert!(dir.path().join(format!("{}.png", name)).exists());
        }

        fs::remove_file(dir.path().join("dirt.png")).unwrap();
        let again = synthesizer.ensure_block_textures();
        assert_eq!(again, textures);
        assert!(!dir.path().join("dirt.png").exists());
    }

    #[test]
    fn test_auxiliary_set() {
        let dir = tempfile::tempdir().unwrap();
        let flora = cache_only(dir.path()).ensure_auxiliary_textures();
        let names: Vec<&str> = flora.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["flower_blue", "flower_red", "flower_yellow", "leaves_sparse"]
        );
    }
}
