//! Pre-generates the block and flora textures into the texture cache, so a
//! first launch does not pay for synthesis.
//!
//! Usage: `bloksel-texgen [CONFIG_PATH]`

use anyhow::{Context, Result};
use log::{info, warn};
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::time::Instant;

use bloksel_render::config::rendering::default_config_path;
use bloksel_render::render::block_faces;
use bloksel_render::{RenderConfig, TextureSynthesizer};

fn main() -> Result<()> {
    let config_path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => default_config_path()?,
    };
    let config = RenderConfig::load_or_create(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    SimpleLogger::new()
        .with_level(config.log_level_filter())
        .init()?;
    info!("Using config {}", config_path.display());

    let synthesizer = TextureSynthesizer::from_config(&config);
    let started = Instant::now();

    let blocks = synthesizer.ensure_block_textures();
    let flora = synthesizer.ensure_auxiliary_textures();

    for name in block_faces::referenced_textures() {
        if !blocks.contains_key(name) {
            warn!("No texture resolved for '{}'", name);
        }
    }

    info!(
        "Resolved {} block and {} flora textures into {} in {:.2?}",
        blocks.len(),
        flora.len(),
        config.texture_cache_dir.display(),
        started.elapsed()
    );
    Ok(())
}
