//! Fixed-grid texture atlas shared by every chunk draw.
//!
//! Textures are packed row-major into square slots. Slot assignment is the
//! insertion order, so identical `add_texture` sequences always produce
//! identical UVs. Slot 0 is reserved for the placeholder checkerboard.

use super::block_faces::{self, MISSING_TEXTURE};
use super::gpu::{Gpu, GpuError, TextureHandle};
use crate::world::{BlockFace, BlockType};
use image::RgbaImage;
use log::{debug, info, warn};
use std::collections::HashMap;
use thiserror::Error;

pub const TEXTURE_SIZE: u32 = 16;
pub const ATLAS_SIZE: u32 = 256;
pub const TEXTURES_PER_ROW: u32 = ATLAS_SIZE / TEXTURE_SIZE;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Texture '{name}' is {width}x{height}, expected {expected}x{expected}")]
    Dimensions {
        name: String,
        width: u32,
        height: u32,
        expected: u32,
    },
    #[error("Texture '{name}' has {actual} bytes of pixel data, expected {expected}")]
    ByteLength {
        name: String,
        actual: usize,
        expected: usize,
    },
    #[error("Atlas is full ({capacity} slots), cannot add '{name}'")]
    Full { name: String, capacity: usize },
    #[error("Texture '{0}' is already in the atlas")]
    Duplicate(String),
    #[error("Atlas has already been built")]
    AlreadyBuilt,
    #[error("Atlas upload failed: {0}")]
    Gpu(#[from] GpuError),
}

/// Normalized texture-space rectangle of one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    /// True when the interiors intersect; shared edges don't count.
    pub fn overlaps(&self, other: &UvRect) -> bool {
        self.u0 < other.u1 && other.u0 < self.u1 && self.v0 < other.v1 && other.v0 < self.v1
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.u0, self.v0, self.u1, self.v1]
    }
}

/// Magenta/black checkerboard in 4-pixel cells, used for anything that
/// failed to resolve.
pub fn missing_texture(size: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            if ((x / 4) + (y / 4)) % 2 == 0 {
                pixels.extend_from_slice(&[255, 0, 255, 255]);
            } else {
                pixels.extend_from_slice(&[0, 0, 0, 255]);
            }
        }
    }
    pixels
}

pub struct TextureAtlas {
    texture_size: u32,
    grid_width: u32,
    pixels: Vec<u8>,
    slots: HashMap<String, usize>,
    next_slot: usize,
    built: bool,
    texture: Option<TextureHandle>,
}

impl TextureAtlas {
    pub fn new() -> Self {
        Self::with_layout(TEXTURE_SIZE, TEXTURES_PER_ROW)
    }

    /// `grid_width` × `grid_width` slots of `texture_size` pixels each.
    pub fn with_layout(texture_size: u32, grid_width: u32) -> Self {
        let texture_size = texture_size.max(1);
        let grid_width = grid_width.max(1);
        let atlas_size = (texture_size * grid_width) as usize;

        let mut atlas = Self {
            texture_size,
            grid_width,
            pixels: vec![0; atlas_size * atlas_size * 4],
            slots: HashMap::new(),
            next_slot: 0,
            built: false,
            texture: None,
        };
        atlas.write_slot(0, &missing_texture(texture_size));
        atlas.slots.insert(MISSING_TEXTURE.to_string(), 0);
        atlas.next_slot = 1;
        atlas
    }

    /// Copies `pixels` (tightly packed RGBA8) into the next free slot.
    ///
    /// Nothing is written unless every check passes, so a rejected texture
    /// leaves the atlas exactly as it was.
    pub fn add_texture(
        &mut self,
        name: &str,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<usize, AtlasError> {
        if self.built {
            return Err(AtlasError::AlreadyBuilt);
        }
        if width != self.texture_size || height != self.texture_size {
            return Err(AtlasError::Dimensions {
                name: name.to_string(),
                width,
                height,
                expected: self.texture_size,
            });
        }
        let expected = (self.texture_size * self.texture_size * 4) as usize;
        if pixels.len() != expected {
            return Err(AtlasError::ByteLength {
                name: name.to_string(),
                actual: pixels.len(),
                expected,
            });
        }
        if self.slots.contains_key(name) {
            return Err(AtlasError::Duplicate(name.to_string()));
        }
        if self.next_slot >= self.capacity() {
            return Err(AtlasError::Full {
                name: name.to_string(),
                capacity: self.capacity(),
            });
        }

        let slot = self.next_slot;
        self.write_slot(slot, pixels);
        self.slots.insert(name.to_string(), slot);
        self.next_slot += 1;
        debug!("Atlas slot {} <- '{}'", slot, name);
        Ok(slot)
    }

    pub fn add_image(&mut self, name: &str, image: &RgbaImage) -> Result<usize, AtlasError> {
        self.add_texture(name, image.as_raw(), image.width(), image.height())
    }

    fn write_slot(&mut self, slot: usize, pixels: &[u8]) {
        let size = self.texture_size as usize;
        let atlas_size = self.atlas_size() as usize;
        let column = slot % self.grid_width as usize;
        let row = slot / self.grid_width as usize;

        for y in 0..size {
            let src = y * size * 4;
            let dst = ((row * size + y) * atlas_size + column * size) * 4;
            self.pixels[dst..dst + size * 4].copy_from_slice(&pixels[src..src + size * 4]);
        }
    }

    /// Uploads the packed pixels as one RGBA8 texture. Only allowed once.
    pub fn build(&mut self, gpu: &impl Gpu) -> Result<(), AtlasError> {
        if self.built {
            return Err(AtlasError::AlreadyBuilt);
        }
        let size = self.atlas_size();
        let texture = gpu.create_texture_rgba8(size, size, &self.pixels)?;
        self.texture = Some(texture);
        self.built = true;
        info!(
            "Texture atlas built: {}x{} pixels, {}/{} slots used",
            size,
            size,
            self.len(),
            self.capacity()
        );
        Ok(())
    }

    pub fn bind(&self, gpu: &impl Gpu, unit: u32) {
        if let Some(texture) = self.texture {
            gpu.bind_texture(unit, texture);
        }
    }

    pub fn cleanup(&mut self, gpu: &impl Gpu) {
        if let Some(texture) = self.texture.take() {
            gpu.delete_texture(texture);
        }
    }

    /// UVs of `name`, or of the placeholder when the name is unknown.
    pub fn uvs(&self, name: &str) -> UvRect {
        match self.slots.get(name) {
            Some(&slot) => self.slot_uvs(slot),
            None => {
                warn!("Unknown texture '{}', using placeholder", name);
                self.slot_uvs(0)
            }
        }
    }

    pub fn uvs_for_face(&self, block: BlockType, face: BlockFace) -> UvRect {
        self.uvs(block_faces::texture_name(block, face))
    }

    pub fn slot_uvs(&self, slot: usize) -> UvRect {
        let grid = self.grid_width as f32;
        let column = (slot % self.grid_width as usize) as f32;
        let row = (slot / self.grid_width as usize) as f32;
        UvRect {
            u0: column / grid,
            v0: row / grid,
            u1: (column + 1.0) / grid,
            v1: (row + 1.0) / grid,
        }
    }

    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Occupied slots, placeholder included.
    pub fn len(&self) -> usize {
        self.next_slot
    }

    pub fn is_empty(&self) -> bool {
        self.next_slot == 0
    }

    pub fn capacity(&self) -> usize {
        (self.grid_width * self.grid_width) as usize
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    /// Width (and height) of the packed image in pixels.
    pub fn atlas_size(&self) -> u32 {
        self.texture_size * self.grid_width
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }
}

impl Default for TextureAtlas {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::{GpuCall, RecordingGpu};

    fn solid(size: u32, value: u8) -> Vec<u8> {
        vec![value; (size * size * 4) as usize]
    }

    fn filled_atlas() -> TextureAtlas {
        let mut atlas = TextureAtlas::new();
        for name in ["dirt", "stone", "grass_top", "grass_side", "sand"] {
            atlas.add_texture(name, &solid(16, 7), 16, 16).unwrap();
        }
        atlas
    }

    #[test]
    fn test_missing_texture_pattern() {
        let pixels = missing_texture(16);
        assert_eq!(pixels.len(), 16 * 16 * 4);
        assert_eq!(&pixels[0..4], &[255, 0, 255, 255]);
        // (4, 0) starts the second cell
        assert_eq!(&pixels[16..20], &[0, 0, 0, 255]);
        let at = |x: usize, y: usize| &pixels[(y * 16 + x) * 4..(y * 16 + x) * 4 + 4];
        assert_eq!(at(4, 4), &[255, 0, 255, 255]);
        assert_eq!(at(3, 4), &[0, 0, 0, 255]);
    }

    #[test]
    fn test_slot_zero_is_placeholder() {
        let atlas = TextureAtlas::new();
        assert_eq!(atlas.slot_of(MISSING_TEXTURE), Some(0));
        assert_eq!(atlas.len(), 1);
        assert_eq!(atlas.capacity(), 256);
        assert_eq!(&atlas.pixels()[0..4], &[255, 0, 255, 255]);
    }

    #[test]
    fn test_uvs_are_disjoint() {
        let mut atlas = TextureAtlas::new();
        for i in 1..atlas.capacity() {
            atlas
                .add_texture(&format!("t{}", i), &solid(16, 1), 16, 16)
                .unwrap();
        }
        atlas.build(&RecordingGpu::modern()).unwrap();

        let rects: Vec<UvRect> = (0..atlas.capacity())
            .map(|slot| atlas.slot_uvs(slot))
            .collect();
        for (i, a) in rects.iter().enumerate() {
            assert!(a.u1 <= 1.0 && a.v1 <= 1.0);
            for b in &rects[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_same_sequence_same_uvs() {
        let mut first = filled_atlas();
        let mut second = filled_atlas();
        first.build(&RecordingGpu::modern()).unwrap();
        second.build(&RecordingGpu::modern()).unwrap();
        assert!(first.is_built() && second.is_built());
        for name in ["dirt", "stone", "grass_top", "grass_side", "sand", MISSING_TEXTURE] {
            assert_eq!(first.uvs(name), second.uvs(name));
        }
        assert_eq!(first.pixels(), second.pixels());
    }

    #[test]
    fn test_unknown_name_gets_placeholder() {
        let mut atlas = filled_atlas();
        atlas.build(&RecordingGpu::modern()).unwrap();
        assert_eq!(atlas.uvs("nonexistent_block"), atlas.uvs(MISSING_TEXTURE));
        assert_eq!(
            atlas.uvs(MISSING_TEXTURE),
            UvRect {
                u0: 0.0,
                v0: 0.0,
                u1: 1.0 / 16.0,
                v1: 1.0 / 16.0,
            }
        );
    }

    #[test]
    fn test_face_lookup_goes_through_table() {
        let atlas = filled_atlas();
        assert_eq!(
            atlas.uvs_for_face(BlockType::Grass, BlockFace::Bottom),
            atlas.uvs("dirt")
        );
        assert_eq!(
            atlas.uvs_for_face(BlockType::Grass, BlockFace::North),
            atlas.uvs("grass_side")
        );
    }

    #[test]
    fn test_wrong_dimensions_rejected_without_write() {
        let mut atlas = filled_atlas();
        let before = atlas.pixels().to_vec();
        assert!(matches!(
            atlas.add_texture("big", &solid(32, 9), 32, 32),
            Err(AtlasError::Dimensions { width: 32, .. })
        ));
        assert!(matches!(
            atlas.add_texture("short", &[0; 16], 16, 16),
            Err(AtlasError::ByteLength { actual: 16, .. })
        ));
        assert_eq!(atlas.pixels(), &before[..]);
        assert!(!atlas.contains("big"));
    }

    #[test]
    fn test_duplicate_name_keeps_first_slot() {
        let mut atlas = filled_atlas();
        let slot = atlas.slot_of("stone").unwrap();
        assert!(matches!(
            atlas.add_texture("stone", &solid(16, 200), 16, 16),
            Err(AtlasError::Duplicate(_))
        ));
        assert_eq!(atlas.slot_of("stone"), Some(slot));
        assert_eq!(atlas.len(), 6);
    }

    #[test]
    fn test_overflow_is_deterministic() {
        let mut atlas = TextureAtlas::with_layout(4, 2);
        let mut slots = Vec::new();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            slots.push(atlas.add_texture(name, &solid(4, i as u8 + 1), 4, 4).unwrap());
        }
        assert_eq!(slots, vec![1, 2, 3]);
        let before = atlas.pixels().to_vec();

        for _ in 0..2 {
            assert!(matches!(
                atlas.add_texture("d", &solid(4, 99), 4, 4),
                Err(AtlasError::Full { capacity: 4, .. })
            ));
        }
        assert_eq!(atlas.pixels(), &before[..]);
        assert_eq!(atlas.slot_of("c"), Some(3));
        assert_eq!(atlas.len(), 4);
    }

    #[test]
    fn test_slot_pixels_land_in_grid_cell() {
        let mut atlas = TextureAtlas::with_layout(2, 2);
        atlas
            .add_texture("red", &[255u8, 0, 0, 255].repeat(4), 2, 2)
            .unwrap();
        // Slot 1 is column 1, row 0 of a 4x4 image
        let row_bytes = 4 * 4;
        assert_eq!(&atlas.pixels()[8..12], &[255, 0, 0, 255]);
        assert_eq!(
            &atlas.pixels()[row_bytes + 12..row_bytes + 16],
            &[255, 0, 0, 255]
        );
        assert_eq!(
            &atlas.pixels()[2 * row_bytes..2 * row_bytes + 4],
            &[0, 0, 0, 0]
        );
    }

    #[test]
    fn test_build_once_then_cleanup() {
        let gpu = RecordingGpu::modern();
        let mut atlas = filled_atlas();
        atlas.build(&gpu).unwrap();
        assert!(atlas.is_built());
        assert!(matches!(atlas.build(&gpu), Err(AtlasError::AlreadyBuilt)));
        assert!(matches!(
            atlas.add_texture("late", &solid(16, 1), 16, 16),
            Err(AtlasError::AlreadyBuilt)
        ));
        let sizes: Vec<(u32, u32)> = gpu
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                GpuCall::CreateTexture { width, height, .. } => Some((width, height)),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![(256, 256)]);

        atlas.bind(&gpu, 0);
        atlas.cleanup(&gpu);
        atlas.cleanup(&gpu);
        assert_eq!(
            gpu.count(|call| matches!(call, GpuCall::DeleteTexture(_))),
            1
        );
        assert!(atlas.texture().is_none());
    }
}
