use glam::IVec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Face {
    /// Y+
    #[default]
    Top = 0,
    /// Y-
    Bottom,
    /// X-
    Left,
    /// X+
    Right,
    /// Z-
    Front,
    /// Z+
    Back,
}

// Quad corners, counter-clockwise when seen from outside the block.
const CORNERS: [[[u8; 3]; 4]; 6] = [
    // Top
    [[0, 1, 0], [0, 1, 1], [1, 1, 1], [1, 1, 0]],
    // Bottom
    [[0, 0, 0], [1, 0, 0], [1, 0, 1], [0, 0, 1]],
    // Left
    [[0, 0, 0], [0, 0, 1], [0, 1, 1], [0, 1, 0]],
    // Right
    [[1, 0, 0], [1, 1, 0], [1, 1, 1], [1, 0, 1]],
    // Front
    [[0, 0, 0], [0, 1, 0], [1, 1, 0], [1, 0, 0]],
    // Back
    [[0, 0, 1], [1, 0, 1], [1, 1, 1], [0, 1, 1]],
];

// Texture coordinates of the corners above, v grows downwards in the atlas.
const CORNER_UVS: [[[u8; 2]; 4]; 6] = [
    [[0, 0], [0, 1], [1, 1], [1, 0]],
    [[0, 0], [1, 0], [1, 1], [0, 1]],
    [[0, 1], [1, 1], [1, 0], [0, 0]],
    [[1, 1], [1, 0], [0, 0], [0, 1]],
    [[1, 1], [1, 0], [0, 0], [0, 1]],
    [[0, 1], [1, 1], [1, 0], [0, 0]],
];

/// Two triangles per quad, sharing the 0-2 diagonal.
pub const TRIANGLE_CORNERS: [usize; 6] = [0, 1, 2, 0, 2, 3];

impl Face {
    pub fn to_ivec3(&self) -> IVec3 {
        match self {
            Face::Top => IVec3::Y,
            Face::Bottom => -IVec3::Y,
            Face::Left => -IVec3::X,
            Face::Right => IVec3::X,
            Face::Front => -IVec3::Z,
            Face::Back => IVec3::Z,
        }
    }

    pub const fn all() -> [Face; 6] {
        [
            Face::Top,
            Face::Bottom,
            Face::Left,
            Face::Right,
            Face::Front,
            Face::Back,
        ]
    }

    pub fn normal(self) -> [i8; 3] {
        let n = self.to_ivec3();
        [n.x as i8, n.y as i8, n.z as i8]
    }

    /// Directional shade baked into the light stream. Matches the classic
    /// top-bright, bottom-dark look without any real lighting.
    pub const fn shade(self) -> u8 {
        match self {
            Face::Top => 255,
            Face::Bottom => 127,
            Face::Left | Face::Right => 153,
            Face::Front | Face::Back => 204,
        }
    }

    pub const fn corners(self) -> [[u8; 3]; 4] {
        CORNERS[self as usize]
    }

    pub const fn corner_uvs(self) -> [[u8; 2]; 4] {
        CORNER_UVS[self as usize]
    }
}

impl TryFrom<u8> for Face {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Face::all().get(value as usize).copied().ok_or(value)
    }
}
