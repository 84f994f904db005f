//! Which texture each face of each block samples.

use crate::world::{BlockFace, BlockType};

/// Name of the placeholder texture that always occupies atlas slot 0.
pub const MISSING_TEXTURE: &str = "missing";

const fn uniform(name: &'static str) -> [&'static str; 6] {
    [name; 6]
}

const fn top_bottom_sides(
    top: &'static str,
    bottom: &'static str,
    sides: &'static str,
) -> [&'static str; 6] {
    [top, bottom, sides, sides, sides, sides]
}

/// Indexed by `BlockType::id()` then `BlockFace::index()`.
static FACE_TEXTURES: [[&str; 6]; BlockType::COUNT] = [
    uniform(MISSING_TEXTURE), // Air
    uniform("dirt"),
    uniform("stone"),
    top_bottom_sides("grass_top", "dirt", "grass_side"),
    uniform("sand"),
    uniform("sandstone"),
    uniform("snow_block"),
    uniform("ice"),
    top_bottom_sides("jungle_grass_top", "jungle_dirt", "jungle_grass_side"),
    uniform("jungle_dirt"),
    top_bottom_sides("wood_top", "wood_top", "wood_side"),
    uniform("leaves"),
    top_bottom_sides("cactus_top", "cactus_top", "cactus_side"),
    uniform("snow_layer"),
    uniform("bedrock"),
];

pub fn texture_name(block: BlockType, face: BlockFace) -> &'static str {
    FACE_TEXTURES[block.id() as usize][face.index()]
}

/// Every distinct texture referenced by a drawable block, in table order.
pub fn referenced_textures() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Vec::new();
    for row in FACE_TEXTURES.iter() {
        for name in row {
            if *name != MISSING_TEXTURE && !names.contains(name) {
                names.push(*name);
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grass_faces() {
        assert_eq!(texture_name(BlockType::Grass, BlockFace::Top), "grass_top");
        assert_eq!(texture_name(BlockType::Grass, BlockFace::Bottom), "dirt");
        for face in [BlockFace::North, BlockFace::South, BlockFace::East, BlockFace::West] {
            assert_eq!(texture_name(BlockType::Grass, face), "grass_side");
        }
    }

    #[test]
    fn test_wood_and_cactus_caps() {
        assert_eq!(texture_name(BlockType::Wood, BlockFace::Bottom), "wood_top");
        assert_eq!(texture_name(BlockType::Wood, BlockFace::East), "wood_side");
        assert_eq!(
            texture_name(BlockType::Cactus, BlockFace::Bottom),
            "cactus_top"
        );
        assert_eq!(
            texture_name(BlockType::Cactus, BlockFace::North),
            "cactus_side"
        );
        assert_eq!(
            texture_name(BlockType::JungleGrass, BlockFace::Bottom),
            "jungle_dirt"
        );
    }

    #[test]
    fn test_air_samples_placeholder() {
        for face in BlockFace::ALL {
            assert_eq!(texture_name(BlockType::Air, face), MISSING_TEXTURE);
        }
    }

    #[test]
    fn test_table_row_order_matches_ids() {
        assert_eq!(texture_name(BlockType::Bedrock, BlockFace::Top), "bedrock");
        assert_eq!(
            texture_name(BlockType::SnowLayer, BlockFace::Top),
            "snow_layer"
        );
        assert_eq!(referenced_textures().len(), 18);
    }
}
