use super::config::ConvertConfig;
use super::errors::{ErrorKind, Result};
use super::geometry::{light_color, Bounds, Mesh, Vertex};
use super::wall::{sector_walls, Wall};
use failchain::bail;
use indexmap::IndexMap;
use log::{info, warn};
use math::{Pnt2f, Pnt3f};
use std::time::Instant;
use wad::types::WadSector;
use wad::util::is_sky;
use wad::{Level, TextureDirectory, WadName};

/// A textured horizontal surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    pub texture: WadName,
    pub mesh: Mesh,
}

/// Geometry of one sector, accumulated from all of its subsectors.
#[derive(Clone, Debug, PartialEq)]
pub struct ParserSector {
    pub id: usize,
    pub tag: u16,
    pub floor: Option<Plane>,
    /// `None` for sky ceilings.
    pub ceiling: Option<Plane>,
    pub walls: Vec<Wall>,
    pub bounds: Bounds,
}

impl ParserSector {
    /// Floor and ceiling of one convex subsector, given its corners in map order.
    fn from_polygon(
        id: usize,
        sector: &WadSector,
        corners: &[Pnt2f],
        config: &ConvertConfig,
    ) -> ParserSector {
        let floor_height = f32::from(sector.floor_height);
        let ceiling_height = f32::from(sector.ceiling_height);

        let mut bounds = Bounds::empty();
        for corner in corners {
            bounds.extend(Pnt3f::new(corner.x, floor_height, -corner.y));
            bounds.extend(Pnt3f::new(corner.x, ceiling_height, -corner.y));
        }

        let floor = Plane {
            texture: sector.floor_texture,
            mesh: flat_mesh(sector, corners, floor_height, false, config),
        };
        let ceiling = if is_sky(sector.ceiling_texture, &config.sky_marker) {
            None
        } else {
            Some(Plane {
                texture: sector.ceiling_texture,
                mesh: flat_mesh(sector, corners, ceiling_height, true, config),
            })
        };

        ParserSector {
            id,
            tag: sector.tag,
            floor: Some(floor),
            ceiling,
            walls: Vec::new(),
            bounds,
        }
    }

    /// Folds another fragment of the same sector into this one.
    pub fn merge(&mut self, other: ParserSector) {
        debug_assert_eq!(self.id, other.id);
        self.floor = merge_planes(self.floor.take(), other.floor);
        self.ceiling = merge_planes(self.ceiling.take(), other.ceiling);
        self.walls.extend(other.walls);
        self.bounds = self.bounds.union(&other.bounds);
    }

    pub fn num_triangles(&self) -> usize {
        self.floor.iter().map(|plane| plane.mesh.num_triangles()).sum::<usize>()
            + self.ceiling.iter().map(|plane| plane.mesh.num_triangles()).sum::<usize>()
            + self.walls.iter().map(|wall| wall.mesh.num_triangles()).sum::<usize>()
    }
}

fn merge_planes(plane: Option<Plane>, other: Option<Plane>) -> Option<Plane> {
    match (plane, other) {
        (Some(mut plane), Some(other)) => {
            plane.mesh.append(other.mesh);
            Some(plane)
        }
        (plane, None) => plane,
        (None, other) => other,
    }
}

/// Fan over the corners, anchored at the first. The ceiling winds the opposite way.
fn flat_mesh(
    sector: &WadSector,
    corners: &[Pnt2f],
    height: f32,
    ceiling: bool,
    config: &ConvertConfig,
) -> Mesh {
    let color = light_color(sector.light);
    let vertices = corners
        .iter()
        .map(|corner| {
            let (x, z) = (corner.x, -corner.y);
            Vertex {
                position: Pnt3f::new(x, height, z),
                uv: Pnt2f::new(x / config.flat_scale, z / config.flat_scale),
                color,
            }
        })
        .collect();
    let mut indices = Vec::with_capacity(corners.len().saturating_sub(2) * 3);
    for j in 1..corners.len().saturating_sub(1) as u32 {
        if ceiling {
            indices.extend_from_slice(&[0, j, j + 1]);
        } else {
            indices.extend_from_slice(&[j + 1, j, 0]);
        }
    }
    Mesh { vertices, indices }
}

/// Merges fragments by sector id, keeping the order in which ids first appear.
pub fn merge_sectors(fragments: Vec<ParserSector>) -> Vec<ParserSector> {
    let mut merged: IndexMap<usize, ParserSector> = IndexMap::new();
    for fragment in fragments {
        if let Some(sector) = merged.get_mut(&fragment.id) {
            sector.merge(fragment);
        } else {
            merged.insert(fragment.id, fragment);
        }
    }
    merged.into_iter().map(|(_, sector)| sector).collect()
}

fn degenerate(config: &ConvertConfig, subsector: usize, reason: &str) -> Result<()> {
    if config.strict {
        bail!(ErrorKind::DegenerateSubsector(subsector));
    }
    warn!("Skipping subsector {}: {}.", subsector, reason);
    Ok(())
}

/// Builds the floors, ceilings and walls of every sector reachable from a subsector.
pub fn reconstruct(
    level: &Level,
    textures: &TextureDirectory,
    config: &ConvertConfig,
) -> Result<Vec<ParserSector>> {
    info!("Reconstructing sectors of {}...", level.name);
    let start_time = Instant::now();

    let leaves = level.leaves();
    let mut walled = vec![false; level.sectors.len()];
    let mut fragments = Vec::with_capacity(leaves.len());
    for i_subsector in 0..leaves.len() {
        let segs = if let Some(segs) = leaves.subsector_segs(i_subsector) {
            segs
        } else {
            degenerate(config, i_subsector, "seg range out of bounds")?;
            continue;
        };
        if segs.len() < 3 {
            degenerate(config, i_subsector, "fewer than three segs")?;
            continue;
        }

        let sector_id = if let Some(id) = segs.iter().find_map(|seg| level.seg_sector(seg)) {
            id
        } else {
            degenerate(config, i_subsector, "no seg resolves to a sector")?;
            continue;
        };
        let sector = &level.sectors[sector_id];

        let corners: Vec<Pnt2f> = segs
            .iter()
            .filter_map(|seg| {
                let corner = level.resolve_vertex(seg.start_vertex);
                if corner.is_none() {
                    warn!(
                        "Missing vertex {:?} in subsector {}.",
                        seg.start_vertex, i_subsector
                    );
                }
                corner
            })
            .collect();
        if corners.len() < 3 {
            degenerate(config, i_subsector, "fewer than three resolvable vertices")?;
            continue;
        }

        let mut fragment = ParserSector::from_polygon(sector_id, sector, &corners, config);
        if !walled[sector_id] {
            walled[sector_id] = true;
            fragment.walls = sector_walls(level, textures, sector_id, config)?;
        }
        fragments.push(fragment);
    }

    let sectors = merge_sectors(fragments);
    info!(
        "Done in {:.2}ms; {} sectors, {} triangles.",
        start_time.elapsed().as_secs_f64() * 1000.0,
        sectors.len(),
        sectors.iter().map(ParserSector::num_triangles).sum::<usize>()
    );
    Ok(sectors)
}

#[cfg(test)]
mod test {
    use super::{merge_sectors, reconstruct, ParserSector};
    use crate::config::ConvertConfig;
    use crate::wall::WallPiece;
    use crate::errors::ErrorKind;
    use crate::fixture;
    use math::{Pnt2f, Pnt3f};
    use wad::fixture::{SegDef, SegVertex};
    use wad::types::GlVersion;

    fn sectors(map: &wad::fixture::MapBuilder) -> Vec<ParserSector> {
        let (level, textures) = fixture::load(map);
        reconstruct(&level, &textures, &ConvertConfig::default()).unwrap()
    }

    #[test]
    fn room_floor_and_ceiling() {
        let sectors = sectors(&fixture::two_rooms());
        assert_eq!(sectors.len(), 2);
        let room = &sectors[0];
        assert_eq!(room.id, 0);

        let floor = room.floor.as_ref().unwrap();
        assert_eq!(floor.texture.as_str(), "FLOOR1");
        assert_eq!(floor.mesh.vertices.len(), 4);
        assert_eq!(floor.mesh.indices, vec![2, 1, 0, 3, 2, 0]);
        let corner = floor.mesh.vertices[2];
        assert_eq!(corner.position, Pnt3f::new(128.0, 0.0, -128.0));
        assert_eq!(corner.uv, Pnt2f::new(2.0, -2.0));

        let ceiling = room.ceiling.as_ref().unwrap();
        assert_eq!(ceiling.texture.as_str(), "CEIL1");
        assert_eq!(ceiling.mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(ceiling.mesh.vertices.iter().all(|v| v.position.y == 128.0));

        assert_eq!(room.bounds.min, Pnt3f::new(0.0, 0.0, -128.0));
        assert_eq!(room.bounds.max, Pnt3f::new(128.0, 128.0, 0.0));
        assert_eq!(room.walls.len(), 5);
    }

    #[test]
    fn single_room_end_to_end() {
        let (level, textures) = fixture::load(&fixture::single_room());
        let fragments = reconstruct(&level, &textures, &ConvertConfig::default()).unwrap();
        let sectors = merge_sectors(fragments);
        assert_eq!(sectors.len(), 1);
        let room = &sectors[0];

        for plane in room.floor.iter().chain(room.ceiling.iter()) {
            assert_eq!(plane.mesh.vertices.len(), 4);
            assert_eq!(plane.mesh.indices.len(), 6);
        }
        assert!(room.floor.is_some() && room.ceiling.is_some());

        assert_eq!(room.walls.len(), 4);
        for wall in &room.walls {
            assert_eq!(wall.piece, WallPiece::FrontMiddle);
            assert_eq!(wall.texture.as_str(), "STARTAN");
            assert_eq!(wall.mesh.vertices.len(), 4);
            assert_eq!(wall.mesh.indices, vec![0, 1, 2, 2, 3, 0]);
        }
        assert_eq!(room.bounds.min, Pnt3f::new(0.0, 0.0, -128.0));
        assert_eq!(room.bounds.max, Pnt3f::new(128.0, 128.0, 0.0));
    }

    #[test]
    fn sky_ceiling_is_omitted() {
        let sectors = sectors(&fixture::two_rooms());
        let alcove = &sectors[1];
        assert_eq!(alcove.id, 1);
        assert!(alcove.ceiling.is_none());
        assert_eq!(alcove.floor.as_ref().unwrap().mesh.indices, vec![2, 1, 0]);
        assert_eq!(alcove.bounds.min.y, 16.0);
        assert_eq!(alcove.bounds.max.y, 96.0);
    }

    #[test]
    fn split_sector_merges_fragments() {
        let mut map = fixture::two_rooms();
        // A second subsector of the room, listed after the alcove.
        let first = map.segs.len() as u32;
        for &(start, end) in &[(0u32, 1u32), (1, 2), (2, 0)] {
            map.segs.push(SegDef {
                start: SegVertex::Normal(start),
                end: SegVertex::Normal(end),
                linedef: Some(0),
                side: 0,
            });
        }
        map.subsectors.push((3, first));

        let sectors = sectors(&map);
        assert_eq!(sectors.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 1]);
        let room = &sectors[0];
        let floor = room.floor.as_ref().unwrap();
        assert_eq!(floor.mesh.vertices.len(), 7);
        assert_eq!(&floor.mesh.indices[6..], &[6, 5, 4]);
        assert_eq!(room.ceiling.as_ref().unwrap().mesh.indices.len(), 9);
        // Walls are only built once per sector.
        assert_eq!(room.walls.len(), 5);
    }

    #[test]
    fn merge_is_order_independent_up_to_buffers() {
        let all = sectors(&fixture::two_rooms());
        let mut reversed = all.clone();
        reversed.reverse();
        let merged = merge_sectors(reversed);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, 1);
        assert_eq!(merged[1].bounds, all[0].bounds);
        assert_eq!(merged[1].num_triangles(), all[0].num_triangles());
    }

    #[test]
    fn fragments_merge_alike_in_any_order() {
        let room = sectors(&fixture::two_rooms()).remove(0);
        let mut a = room.clone();
        a.ceiling = None;
        a.walls.truncate(2);
        let mut b = room.clone();
        b.floor = None;
        b.walls = room.walls[2..].to_vec();
        let mut c = room.clone();
        c.walls.clear();
        for vertex in c.floor.iter_mut().flat_map(|plane| plane.mesh.vertices.iter_mut()) {
            vertex.position.x += 512.0;
        }
        c.bounds.max.x += 512.0;
        let fragments = [a, b, c];

        let totals = |sector: &ParserSector| {
            let planes = sector.floor.iter().chain(sector.ceiling.iter());
            let vertices: usize = planes.clone().map(|p| p.mesh.vertices.len()).sum::<usize>()
                + sector.walls.iter().map(|w| w.mesh.vertices.len()).sum::<usize>();
            let indices: usize = planes.map(|p| p.mesh.indices.len()).sum::<usize>()
                + sector.walls.iter().map(|w| w.mesh.indices.len()).sum::<usize>();
            (vertices, indices, sector.bounds, sector.walls.len())
        };

        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        let results: Vec<_> = orders
            .iter()
            .map(|order| {
                let merged = merge_sectors(order.iter().map(|&i| fragments[i].clone()).collect());
                assert_eq!(merged.len(), 1);
                totals(&merged[0])
            })
            .collect();
        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }
        let (_, _, bounds, walls) = results[0];
        assert_eq!(walls, room.walls.len());
        assert_eq!(bounds.max.x, 640.0);
        assert_eq!(bounds.min, room.bounds.min);
    }

    #[test]
    fn merge_takes_ceiling_from_either_side() {
        let all = sectors(&fixture::two_rooms());
        let mut without = all[0].clone();
        without.ceiling = None;
        let mut with = all[0].clone();
        with.walls.clear();
        without.merge(with);
        assert_eq!(without.ceiling, all[0].ceiling);
        assert_eq!(without.floor.as_ref().unwrap().mesh.num_triangles(), 4);
    }

    #[test]
    fn gl_subsectors_skip_mini_segs() {
        let mut map = fixture::two_rooms();
        map.gl_version = Some(GlVersion::V5);
        map.gl_vertices.push((64.0, 64.0));
        // Mini-seg first: the sector still resolves through the next seg.
        map.segs[0] = SegDef {
            start: SegVertex::Gl(0),
            end: SegVertex::Normal(1),
            linedef: None,
            side: 0,
        };
        let sectors = sectors(&map);
        let floor = sectors[0].floor.as_ref().unwrap();
        assert_eq!(floor.mesh.vertices[0].position, Pnt3f::new(64.0, 0.0, -64.0));
    }

    #[test]
    fn degenerate_subsectors() {
        let mut map = fixture::two_rooms();
        map.subsectors.push((2, 0));
        let (level, textures) = fixture::load(&map);
        let sectors = reconstruct(&level, &textures, &ConvertConfig::default()).unwrap();
        assert_eq!(sectors.len(), 2);

        let strict = ConvertConfig {
            strict: true,
            ..ConvertConfig::default()
        };
        let error = reconstruct(&level, &textures, &strict).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::DegenerateSubsector(2));
    }
}
