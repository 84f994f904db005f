use serde::{Deserialize, Serialize};

/// Block kinds that reach the renderer. Discriminants are the on-disk ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    Air = 0,
    Dirt = 1,
    Stone = 2,
    Grass = 3,
    Sand = 4,
    Sandstone = 5,
    SnowBlock = 6,
    Ice = 7,
    JungleGrass = 8,
    JungleDirt = 9,
    Wood = 10,
    Leaves = 11,
    Cactus = 12,
    SnowLayer = 13,
    Bedrock = 14,
}

impl BlockType {
    pub const ALL: [Self; 15] = [
        Self::Air,
        Self::Dirt,
        Self::Stone,
        Self::Grass,
        Self::Sand,
        Self::Sandstone,
        Self::SnowBlock,
        Self::Ice,
        Self::JungleGrass,
        Self::JungleDirt,
        Self::Wood,
        Self::Leaves,
        Self::Cactus,
        Self::SnowLayer,
        Self::Bedrock,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Light passes through; neighbouring faces are kept and the face is
    /// drawn with blending.
    pub fn is_transparent(self) -> bool {
        matches!(
            self,
            Self::Air | Self::Ice | Self::Leaves | Self::SnowLayer
        )
    }
}

/// Face index convention shared with the mesh builder:
/// 0 = top, 1 = bottom, 2 = north, 3 = south, 4 = east, 5 = west.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockFace {
    Top = 0,
    Bottom = 1,
    North = 2,
    South = 3,
    East = 4,
    West = 5,
}

impl BlockFace {
    pub const ALL: [Self; 6] = [
        Self::Top,
        Self::Bottom,
        Self::North,
        Self::South,
        Self::East,
        Self::West,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn normal(self) -> [f32; 3] {
        match self {
            Self::Top => [0.0, 1.0, 0.0],
            Self::Bottom => [0.0, -1.0, 0.0],
            Self::North => [0.0, 0.0, -1.0],
            Self::South => [0.0, 0.0, 1.0],
            Self::East => [1.0, 0.0, 0.0],
            Self::West => [-1.0, 0.0, 0.0],
        }
    }

    pub fn is_side(self) -> bool {
        !matches!(self, Self::Top | Self::Bottom)
    }
}
