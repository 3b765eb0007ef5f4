use super::archive::{Archive, LumpReader};
use super::errors::{ErrorKind, Result};
use super::gl::{
    decode_gl_nodes, decode_gl_segs, decode_gl_subsectors, decode_gl_vertices, detect_gl_version,
};
use super::name::IntoWadName;
use super::types::{GlNode, GlSeg, GlSubsector, GlVersion, GlVertex, GlVertexRef, SidedefId};
use super::types::{WadLinedef, WadName, WadNode, WadSector, WadSeg, WadSidedef, WadSubsector};
use super::types::{WadThing, WadVertex, NO_SIDEDEF};
use failchain::{bail, ensure};
use log::{info, warn};
use math::Pnt2f;
use std::borrow::Cow;
use std::str::FromStr;

const THINGS_OFFSET: usize = 1;
const LINEDEFS_OFFSET: usize = 2;
const SIDEDEFS_OFFSET: usize = 3;
const VERTICES_OFFSET: usize = 4;
const SEGS_OFFSET: usize = 5;
const SSECTORS_OFFSET: usize = 6;
const NODES_OFFSET: usize = 7;
const SECTORS_OFFSET: usize = 8;

const GL_VERT_OFFSET: usize = 12;
const GL_LUMP_NAMES: [&str; 4] = ["GL_VERT", "GL_SEGS", "GL_SSECT", "GL_NODES"];

pub struct Level {
    pub name: WadName,
    pub things: Vec<WadThing>,
    pub linedefs: Vec<WadLinedef>,
    pub sidedefs: Vec<WadSidedef>,
    pub vertices: Vec<WadVertex>,
    pub segs: Vec<WadSeg>,
    pub subsectors: Vec<WadSubsector>,
    pub nodes: Vec<WadNode>,
    pub sectors: Vec<WadSector>,

    /// `None` when the level has no GL records.
    pub gl_version: Option<GlVersion>,
    pub gl_vertices: Vec<GlVertex>,
    pub gl_segs: Vec<GlSeg>,
    pub gl_subsectors: Vec<GlSubsector>,
    pub gl_nodes: Vec<GlNode>,
}

impl Level {
    /// Loads the last level called `name`.
    pub fn from_archive<'a, Q>(wad: &Archive, name: &'a Q) -> Result<Level>
    where
        Q: ?Sized,
        &'a Q: IntoWadName,
    {
        let name = name.into_wad_name()?;
        match wad.level_index::<WadName>(&name) {
            Some(index) => Level::from_level_index(wad, index),
            None => bail!(ErrorKind::missing_required_lump(&name)),
        }
    }

    pub fn from_level_index(wad: &Archive, index: usize) -> Result<Level> {
        let lump = wad.level_lump(index)?;
        let name = lump.name();
        info!("Reading level data for '{}'...", name);
        let start_index = lump.index();
        let core = |offset: usize, expected: &str| -> Result<LumpReader> {
            let lump = wad.lump_by_index(start_index + offset)?;
            ensure!(
                lump.name().as_str() == expected,
                ErrorKind::unexpected_level_lump(name.as_str(), expected, lump.name().as_str())
            );
            Ok(lump)
        };

        let things = core(THINGS_OFFSET, "THINGS")?.decode_vec()?;
        let linedefs = core(LINEDEFS_OFFSET, "LINEDEFS")?.decode_vec()?;
        let sidedefs = core(SIDEDEFS_OFFSET, "SIDEDEFS")?.decode_vec()?;
        let vertices = core(VERTICES_OFFSET, "VERTEXES")?.decode_vec()?;
        let segs = core(SEGS_OFFSET, "SEGS")?.decode_vec()?;
        let subsectors = core(SSECTORS_OFFSET, "SSECTORS")?.decode_vec()?;
        let nodes = core(NODES_OFFSET, "NODES")?.decode_vec()?;
        let sectors = core(SECTORS_OFFSET, "SECTORS")?.decode_vec()?;

        let mut level = Level {
            name,
            things,
            linedefs,
            sidedefs,
            vertices,
            segs,
            subsectors,
            nodes,
            sectors,
            gl_version: None,
            gl_vertices: Vec::new(),
            gl_segs: Vec::new(),
            gl_subsectors: Vec::new(),
            gl_nodes: Vec::new(),
        };

        if let Some([vert, segs, ssect, nodes]) = find_gl_lumps(wad, start_index, name)? {
            let version = detect_gl_version(vert.bytes(), segs.bytes());
            level.gl_version = Some(version);
            level.gl_vertices = decode_gl_vertices(vert.bytes(), version)?;
            level.gl_segs = decode_gl_segs(segs.bytes(), version)?;
            level.gl_subsectors = decode_gl_subsectors(ssect.bytes(), version)?;
            level.gl_nodes = decode_gl_nodes(nodes.bytes(), version)?;
        }

        info!("Loaded level '{}':", name);
        info!("    {:4} things", level.things.len());
        info!("    {:4} linedefs", level.linedefs.len());
        info!("    {:4} sidedefs", level.sidedefs.len());
        info!("    {:4} vertices", level.vertices.len());
        info!("    {:4} segs", level.segs.len());
        info!("    {:4} subsectors", level.subsectors.len());
        info!("    {:4} nodes", level.nodes.len());
        info!("    {:4} sectors", level.sectors.len());
        if let Some(version) = level.gl_version {
            info!("  GL nodes {:?}:", version);
            info!("    {:4} vertices", level.gl_vertices.len());
            info!("    {:4} segs", level.gl_segs.len());
            info!("    {:4} subsectors", level.gl_subsectors.len());
            info!("    {:4} nodes", level.gl_nodes.len());
        }

        Ok(level)
    }

    pub fn vertex(&self, index: usize) -> Option<Pnt2f> {
        self.vertices
            .get(index)
            .map(|v| Pnt2f::new(f32::from(v.x), f32::from(v.y)))
    }

    pub fn gl_vertex(&self, index: usize) -> Option<Pnt2f> {
        self.gl_vertices.get(index).map(|v| Pnt2f::new(v.x, v.y))
    }

    pub fn resolve_vertex(&self, vertex: GlVertexRef) -> Option<Pnt2f> {
        match vertex {
            GlVertexRef::Normal(index) => self.vertex(index),
            GlVertexRef::Gl(index) => self.gl_vertex(index),
        }
    }

    pub fn linedef(&self, index: usize) -> Option<&WadLinedef> {
        self.linedefs.get(index)
    }

    pub fn sidedef(&self, index: SidedefId) -> Option<&WadSidedef> {
        match index {
            NO_SIDEDEF => None,
            index => self.sidedefs.get(usize::from(index)),
        }
    }

    pub fn front_sidedef(&self, linedef: &WadLinedef) -> Option<&WadSidedef> {
        self.sidedef(linedef.right_side)
    }

    pub fn back_sidedef(&self, linedef: &WadLinedef) -> Option<&WadSidedef> {
        self.sidedef(linedef.left_side)
    }

    pub fn sector(&self, index: usize) -> Option<&WadSector> {
        self.sectors.get(index)
    }

    pub fn sidedef_sector(&self, sidedef: &WadSidedef) -> Option<&WadSector> {
        self.sector(usize::from(sidedef.sector))
    }

    pub fn seg_linedef(&self, seg: &GlSeg) -> Option<&WadLinedef> {
        seg.linedef.and_then(|index| self.linedef(index))
    }

    /// The sidedef facing into the seg's subsector. Back sides only count on two-sided lines.
    pub fn seg_sidedef(&self, seg: &GlSeg) -> Option<&WadSidedef> {
        self.seg_linedef(seg).and_then(|line| {
            if line.is_two_sided() && !seg.is_front() {
                self.back_sidedef(line)
            } else {
                self.front_sidedef(line)
            }
        })
    }

    /// Index of the sector a seg bounds, `None` for mini-segs and dangling references.
    pub fn seg_sector(&self, seg: &GlSeg) -> Option<usize> {
        self.seg_sidedef(seg)
            .map(|side| usize::from(side.sector))
            .filter(|&sector| sector < self.sectors.len())
    }

    /// Linedefs whose front side lies in `sector`, with their indices.
    pub fn sector_linedefs(&self, sector: usize) -> impl Iterator<Item = (usize, &WadLinedef)> {
        self.linedefs
            .iter()
            .enumerate()
            .filter(move |(_, line)| {
                self.front_sidedef(line)
                    .map_or(false, |side| usize::from(side.sector) == sector)
            })
    }

    /// The convex leaves of the map: GL subsectors when present, otherwise the classic ones.
    pub fn leaves(&self) -> Leaves {
        if self.gl_version.is_some() && !self.gl_subsectors.is_empty() {
            Leaves {
                subsectors: Cow::Borrowed(&self.gl_subsectors),
                segs: Cow::Borrowed(&self.gl_segs),
            }
        } else {
            Leaves {
                subsectors: Cow::Owned(self.subsectors.iter().map(|&s| s.into()).collect()),
                segs: Cow::Owned(self.segs.iter().map(|&s| s.into()).collect()),
            }
        }
    }
}

pub struct Leaves<'a> {
    pub subsectors: Cow<'a, [GlSubsector]>,
    pub segs: Cow<'a, [GlSeg]>,
}

impl<'a> Leaves<'a> {
    pub fn len(&self) -> usize {
        self.subsectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsectors.is_empty()
    }

    /// The segs of subsector `index`, `None` if its range is out of bounds.
    pub fn subsector_segs(&self, index: usize) -> Option<&[GlSeg]> {
        let subsector = self.subsectors.get(index)?;
        let start = subsector.first_seg;
        let end = start.checked_add(subsector.num_segs)?;
        self.segs.get(start..end)
    }
}

/// The four GL lumps of a level: right after the level's own lumps, or after a `GL_<MAP>`
/// anchor elsewhere in the archive (typically a merged `.gwa` file).
fn find_gl_lumps<'a>(
    wad: &'a Archive,
    start_index: usize,
    name: WadName,
) -> Result<Option<[LumpReader<'a>; 4]>> {
    if let Some(lumps) = gl_lumps_at(wad, start_index + GL_VERT_OFFSET)? {
        return Ok(Some(lumps));
    }

    let gl_name = match WadName::from_str(&format!("GL_{}", name)) {
        Ok(gl_name) => gl_name,
        Err(_) => return Ok(None),
    };
    match wad.named_lump(&gl_name)? {
        Some(anchor) => {
            let lumps = gl_lumps_at(wad, anchor.index() + 1)?;
            if lumps.is_none() {
                warn!("GL anchor `{}` is not followed by GL lumps.", gl_name);
            }
            Ok(lumps)
        }
        None => Ok(None),
    }
}

fn gl_lumps_at(wad: &Archive, first: usize) -> Result<Option<[LumpReader; 4]>> {
    if first + GL_LUMP_NAMES.len() > wad.num_lumps() {
        return Ok(None);
    }
    let lump = |offset: usize| wad.lump_by_index(first + offset);
    let lumps = [lump(0)?, lump(1)?, lump(2)?, lump(3)?];
    let names_match = lumps
        .iter()
        .zip(&GL_LUMP_NAMES)
        .all(|(lump, &expected)| lump.name().as_str() == expected);
    Ok(if names_match { Some(lumps) } else { None })
}

#[cfg(test)]
mod test {
    use super::Level;
    use crate::archive::Archive;
    use crate::fixture::{MapBuilder, SegDef, SegVertex, WadBuilder};
    use crate::types::{GlVersion, GlVertexRef};
    use math::Pnt2f;

    /// A 128x128 room with a 64-unit alcove to the east behind a two-sided line.
    fn two_rooms() -> MapBuilder {
        let mut map = MapBuilder::new();
        let v0 = map.vertex(0, 0);
        let v1 = map.vertex(128, 0);
        let v2 = map.vertex(128, 128);
        let v3 = map.vertex(0, 128);
        let v4 = map.vertex(192, 0);
        let v5 = map.vertex(192, 128);
        let room = map.sector(0, 128, "FLOOR1", "CEIL1", 160);
        let alcove = map.sector(16, 96, "FLOOR1", "F_SKY1", 200);
        let wall = map.sidedef(room, "-", "-", "STARTAN");
        let front = map.sidedef(room, "UPPER", "LOWER", "-");
        let back = map.sidedef(alcove, "-", "-", "-");
        let alcove_wall = map.sidedef(alcove, "-", "-", "STARTAN");
        let l0 = map.linedef(v0, v1, 1, wall, None);
        let l1 = map.linedef(v1, v2, 4, front, Some(back));
        let l2 = map.linedef(v2, v3, 1, wall, None);
        let l3 = map.linedef(v3, v0, 1, wall, None);
        let l4 = map.linedef(v1, v4, 1, alcove_wall, None);
        let l5 = map.linedef(v4, v5, 1, alcove_wall, None);
        let l6 = map.linedef(v5, v2, 1, alcove_wall, None);
        map.subsector_from_linedefs(&[l0, l1, l2, l3]);
        map.subsector_from_linedefs(&[l4, l5, l6]);
        map
    }

    fn archive_with(map: &MapBuilder) -> Archive {
        let mut wad = WadBuilder::iwad();
        map.write(&mut wad, "E1M1");
        Archive::from_bytes(wad.build(), "test").unwrap()
    }

    #[test]
    fn loads_classic_level() {
        let level = Level::from_archive(&archive_with(&two_rooms()), "E1M1").unwrap();
        assert_eq!(level.name.as_str(), "E1M1");
        assert_eq!(level.vertices.len(), 6);
        assert_eq!(level.linedefs.len(), 7);
        assert_eq!(level.sidedefs.len(), 4);
        assert_eq!(level.sectors.len(), 2);
        assert_eq!(level.gl_version, None);

        assert_eq!(level.vertex(2), Some(Pnt2f::new(128.0, 128.0)));
        assert_eq!(level.vertex(6), None);
        let two_sided = level.linedef(1).unwrap();
        assert!(two_sided.is_two_sided());
        assert_eq!(level.back_sidedef(two_sided).unwrap().sector, 1);
        assert!(level.back_sidedef(level.linedef(0).unwrap()).is_none());

        let leaves = level.leaves();
        assert_eq!(leaves.len(), 2);
        let segs = leaves.subsector_segs(1).unwrap();
        assert_eq!(segs.len(), 3);
        assert_eq!(level.seg_sector(&segs[0]), Some(1));
        assert_eq!(
            level.resolve_vertex(segs[0].start_vertex),
            Some(Pnt2f::new(128.0, 0.0))
        );

        let room_lines: Vec<_> = level.sector_linedefs(0).map(|(index, _)| index).collect();
        assert_eq!(room_lines, vec![0, 1, 2, 3]);
    }

    #[test]
    fn missing_level_fails() {
        assert!(Level::from_archive(&archive_with(&two_rooms()), "E1M2").is_err());
    }

    #[test]
    fn misplaced_lump_fails() {
        let mut wad = WadBuilder::iwad();
        wad.marker("E1M1")
            .lump("THINGS", Vec::new())
            .lump("SIDEDEFS", Vec::new())
            .lump("LINEDEFS", Vec::new());
        let archive = Archive::from_bytes(wad.build(), "test").unwrap();
        assert!(Level::from_archive(&archive, "E1M1").is_err());
    }

    #[test]
    fn loads_gl_nodes_after_level() {
        let mut map = two_rooms();
        map.gl_version = Some(GlVersion::V5);
        map.gl_vertices.push((64.5, 0.0));
        map.segs.push(SegDef {
            start: SegVertex::Gl(0),
            end: SegVertex::Normal(0),
            linedef: None,
            side: 0,
        });
        map.subsectors.push((1, 7));

        let level = Level::from_archive(&archive_with(&map), "E1M1").unwrap();
        assert_eq!(level.gl_version, Some(GlVersion::V5));
        assert_eq!(level.segs.len(), 0);
        assert_eq!(level.gl_segs.len(), 8);
        assert_eq!(level.gl_subsectors.len(), 3);

        let leaves = level.leaves();
        assert_eq!(leaves.len(), 3);
        let mini = &leaves.subsector_segs(2).unwrap()[0];
        assert!(mini.is_mini());
        assert_eq!(mini.start_vertex, GlVertexRef::Gl(0));
        assert_eq!(level.seg_sector(mini), None);
        assert_eq!(
            level.resolve_vertex(mini.start_vertex),
            Some(Pnt2f::new(64.5, 0.0))
        );
    }

    #[test]
    fn loads_gl_nodes_from_merged_archive() {
        let map = two_rooms();
        let mut base = archive_with(&map);

        let mut gl_only = map.clone();
        gl_only.gl_version = Some(GlVersion::V2);
        let mut gwa = WadBuilder::pwad();
        gl_only.write(&mut gwa, "E1M1");
        let gwa = Archive::from_bytes(gwa.build(), "gwa").unwrap();
        base.merge(gwa);

        // Loading by name picks the merged copy; its GL lumps are found right after it.
        let level = Level::from_archive(&base, "E1M1").unwrap();
        assert_eq!(level.gl_version, Some(GlVersion::V2));
        assert_eq!(level.gl_subsectors.len(), 2);

        // The base copy finds them through the `GL_E1M1` anchor.
        let level = Level::from_level_index(&base, 0).unwrap();
        assert_eq!(level.gl_version, Some(GlVersion::V2));
        assert_eq!(level.leaves().subsector_segs(0).unwrap().len(), 4);
    }
}
