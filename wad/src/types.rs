pub use super::name::WadName;
use serde::Deserialize;

pub type LightLevel = i16;
pub type LinedefFlags = u16;
pub type SectorId = u16;
pub type SectorTag = u16;
pub type SectorType = u16;
pub type SidedefId = u16;
pub type SpecialType = u16;
pub type ThingFlags = u16;
pub type ThingType = u16;
pub type VertexId = u16;
pub type WadCoord = i16;
pub type SegId = u16;
pub type LinedefId = u16;
pub type ChildId = u16;

/// Sidedef index meaning "no sidedef" (`-1` in the signed encoding).
pub const NO_SIDEDEF: SidedefId = 0xffff;

/// Linedef index of GL mini-segments, which lie on no linedef.
pub const NO_LINEDEF: LinedefId = 0xffff;

pub const HEADER_SIZE: usize = 12;
pub const LUMP_INFO_SIZE: usize = 16;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WadKind {
    Iwad,
    Pwad,
}

impl WadKind {
    pub fn from_identifier(identifier: &[u8; 4]) -> Option<WadKind> {
        match identifier {
            b"IWAD" => Some(WadKind::Iwad),
            b"PWAD" => Some(WadKind::Pwad),
            _ => None,
        }
    }

    pub fn identifier(self) -> &'static [u8; 4] {
        match self {
            WadKind::Iwad => b"IWAD",
            WadKind::Pwad => b"PWAD",
        }
    }
}

#[derive(Copy, Clone, Deserialize)]
pub struct WadInfo {
    pub identifier: [u8; 4],
    pub num_lumps: u32,
    pub info_table_offset: u32,
}

#[derive(Copy, Clone, Deserialize)]
pub struct WadLump {
    pub file_pos: u32,
    pub size: u32,
    pub name: WadName,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadThing {
    pub x: WadCoord,
    pub y: WadCoord,
    pub angle: WadCoord,
    pub thing_type: ThingType,
    pub flags: ThingFlags,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadVertex {
    pub x: WadCoord,
    pub y: WadCoord,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadLinedef {
    pub start_vertex: VertexId,
    pub end_vertex: VertexId,
    pub flags: LinedefFlags,
    pub special_type: SpecialType,
    pub sector_tag: SectorTag,
    pub right_side: SidedefId,
    pub left_side: SidedefId,
}

impl WadLinedef {
    pub fn impassable(&self) -> bool {
        self.flags & 0x0001 != 0
    }

    pub fn is_two_sided(&self) -> bool {
        self.flags & 0x0004 != 0
    }

    pub fn upper_unpegged(&self) -> bool {
        self.flags & 0x0008 != 0
    }

    pub fn lower_unpegged(&self) -> bool {
        self.flags & 0x0010 != 0
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadSidedef {
    pub x_offset: WadCoord,
    pub y_offset: WadCoord,
    pub upper_texture: WadName,
    pub lower_texture: WadName,
    pub middle_texture: WadName,
    pub sector: SectorId,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadSector {
    pub floor_height: WadCoord,
    pub ceiling_height: WadCoord,
    pub floor_texture: WadName,
    pub ceiling_texture: WadName,
    pub light: LightLevel,
    pub sector_type: SectorType,
    pub tag: SectorTag,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadSubsector {
    pub num_segs: u16,
    pub first_seg: SegId,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadSeg {
    pub start_vertex: VertexId,
    pub end_vertex: VertexId,
    pub angle: u16,
    pub linedef: LinedefId,
    pub direction: u16,
    pub offset: u16,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadNode {
    pub line_x: WadCoord,
    pub line_y: WadCoord,
    pub step_x: WadCoord,
    pub step_y: WadCoord,
    pub right_y_max: WadCoord,
    pub right_y_min: WadCoord,
    pub right_x_max: WadCoord,
    pub right_x_min: WadCoord,
    pub left_y_max: WadCoord,
    pub left_y_min: WadCoord,
    pub left_x_max: WadCoord,
    pub left_x_min: WadCoord,
    pub right: ChildId,
    pub left: ChildId,
}

#[derive(Copy, Clone, Deserialize)]
pub struct WadTextureHeader {
    pub name: WadName,
    pub masked: u32,
    pub width: u16,
    pub height: u16,
    pub column_directory: u32,
    pub num_patches: u16,
}

#[derive(Copy, Clone, Deserialize)]
pub struct WadTexturePatchRef {
    pub origin_x: i16,
    pub origin_y: i16,
    pub patch: u16,
    pub stepdir: u16,
    pub colormap: u16,
}

/// Version of the GL-node auxiliary records of a level.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GlVersion {
    V1,
    V2,
    V3,
    V4,
    V5,
}

impl GlVersion {
    /// Bit set in a GL seg's vertex reference when it points into `GL_VERT`.
    pub fn vertex_flag(self) -> u32 {
        match self {
            GlVersion::V1 | GlVersion::V2 => 1 << 15,
            GlVersion::V3 | GlVersion::V4 => 1 << 30,
            GlVersion::V5 => 1 << 31,
        }
    }

    /// Bit set in a GL node's child reference when it points to a subsector.
    pub fn leaf_flag(self) -> u32 {
        match self {
            GlVersion::V5 => 1 << 31,
            _ => 1 << 15,
        }
    }

    /// Whether seg and subsector records use 32-bit indices.
    pub fn wide_indices(self) -> bool {
        self >= GlVersion::V3
    }
}

/// A seg endpoint: either an ordinary `VERTEXES` entry or a `GL_VERT` entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GlVertexRef {
    Normal(usize),
    Gl(usize),
}

impl GlVertexRef {
    pub fn decode(raw: u32, version: GlVersion) -> GlVertexRef {
        let flag = version.vertex_flag();
        if raw & flag != 0 {
            GlVertexRef::Gl((raw & !flag) as usize)
        } else {
            GlVertexRef::Normal(raw as usize)
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GlVertex {
    pub x: f32,
    pub y: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GlSeg {
    pub start_vertex: GlVertexRef,
    pub end_vertex: GlVertexRef,
    /// `None` for mini-segments.
    pub linedef: Option<usize>,
    /// 0 for the linedef's front side.
    pub side: u16,
    pub partner: Option<usize>,
}

impl GlSeg {
    pub fn is_mini(&self) -> bool {
        self.linedef.is_none()
    }

    pub fn is_front(&self) -> bool {
        self.side == 0
    }
}

impl From<WadSeg> for GlSeg {
    fn from(seg: WadSeg) -> GlSeg {
        GlSeg {
            start_vertex: GlVertexRef::Normal(usize::from(seg.start_vertex)),
            end_vertex: GlVertexRef::Normal(usize::from(seg.end_vertex)),
            linedef: if seg.linedef == NO_LINEDEF {
                None
            } else {
                Some(usize::from(seg.linedef))
            },
            side: seg.direction,
            partner: None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GlSubsector {
    pub num_segs: usize,
    pub first_seg: usize,
}

impl From<WadSubsector> for GlSubsector {
    fn from(subsector: WadSubsector) -> GlSubsector {
        GlSubsector {
            num_segs: usize::from(subsector.num_segs),
            first_seg: usize::from(subsector.first_seg),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GlChild {
    Node(usize),
    Subsector(usize),
}

impl GlChild {
    pub fn decode(raw: u32, version: GlVersion) -> GlChild {
        let flag = version.leaf_flag();
        if raw & flag != 0 {
            GlChild::Subsector((raw & !flag) as usize)
        } else {
            GlChild::Node(raw as usize)
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GlNode {
    pub line_x: WadCoord,
    pub line_y: WadCoord,
    pub step_x: WadCoord,
    pub step_y: WadCoord,
    /// `[y_max, y_min, x_max, x_min]`.
    pub right_bounds: [WadCoord; 4],
    pub left_bounds: [WadCoord; 4],
    pub right: GlChild,
    pub left: GlChild,
}

pub const PALETTE_SIZE: usize = 256 * 3;

pub struct Palette(pub [u8; PALETTE_SIZE]);

impl Palette {
    /// The opaque RGBA colour of a palette index.
    pub fn rgba(&self, index: u8) -> [u8; 4] {
        let offset = usize::from(index) * 3;
        [self.0[offset], self.0[offset + 1], self.0[offset + 2], 255]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette([0u8; PALETTE_SIZE])
    }
}

impl AsMut<[u8]> for Palette {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}
