use super::config::ConvertConfig;
use super::errors::{ErrorKind, Result};
use super::geometry::{light_color, Mesh, Vertex};
use failchain::bail;
use log::{error, warn};
use math::prelude::*;
use math::{Pnt2f, Pnt3f, Vec4f};
use wad::types::{WadLinedef, WadSector, WadSidedef};
use wad::util::{is_sky, is_untextured};
use wad::{Level, ParsedImage, TextureDirectory, WadName};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WallPiece {
    FrontMiddle,
    BackMiddle,
    Lower,
    Upper,
}

/// One textured quad of a linedef.
#[derive(Clone, Debug, PartialEq)]
pub struct Wall {
    pub linedef: usize,
    pub piece: WallPiece,
    pub texture: WadName,
    pub mesh: Mesh,
}

/// Logs a missing image, or fails with it in strict mode.
pub(crate) fn report_missing(config: &ConvertConfig, kind: ErrorKind) -> Result<()> {
    if config.strict {
        bail!(kind);
    }
    warn!("{}", kind);
    Ok(())
}

/// The walls of every linedef whose front side faces into `sector_index`.
pub fn sector_walls(
    level: &Level,
    textures: &TextureDirectory,
    sector_index: usize,
    config: &ConvertConfig,
) -> Result<Vec<Wall>> {
    let owner = if let Some(sector) = level.sector(sector_index) {
        sector
    } else {
        warn!("No sector with index {}, no walls built.", sector_index);
        return Ok(Vec::new());
    };

    let mut walls = Vec::new();
    for (linedef, line) in level.sector_linedefs(sector_index) {
        let front = if let Some(front) = level.front_sidedef(line) {
            front
        } else {
            continue;
        };
        let (start, end) = match (
            level.vertex(usize::from(line.start_vertex)),
            level.vertex(usize::from(line.end_vertex)),
        ) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                error!("Missing vertices for linedef {}, skipping.", linedef);
                continue;
            }
        };
        let back = if line.is_two_sided() {
            let back = level
                .back_sidedef(line)
                .and_then(|side| Some((side, level.sidedef_sector(side)?)));
            if back.is_none() {
                warn!(
                    "Two-sided linedef {} has no usable back side, treating as one-sided.",
                    linedef
                );
            }
            back
        } else {
            None
        };

        if let Some((_, back_sector)) = back {
            if shares_sky(owner, back_sector, &config.sky_marker) {
                continue;
            }
        }

        let builder = LineWalls {
            textures,
            config,
            linedef,
            line,
            owner,
            start,
            end,
            length: start.distance(end),
            color: light_color(owner.light),
        };
        builder.front_middle(front, &mut walls)?;
        if let Some((back_side, back_sector)) = back {
            builder.back_middle(back_side, &mut walls)?;
            builder.lower(front, back_sector, &mut walls)?;
            builder.upper(front, back_sector, &mut walls)?;
        }
    }
    Ok(walls)
}

/// Both sides open onto the same sky at the same floor height: nothing to draw between them.
fn shares_sky(sector: &WadSector, back: &WadSector, marker: &str) -> bool {
    sector.ceiling_texture == back.ceiling_texture
        && is_sky(sector.ceiling_texture, marker)
        && sector.floor_height == back.floor_height
}

struct LineWalls<'a> {
    textures: &'a TextureDirectory,
    config: &'a ConvertConfig,
    linedef: usize,
    line: &'a WadLinedef,
    owner: &'a WadSector,
    start: Pnt2f,
    end: Pnt2f,
    length: f32,
    color: Vec4f,
}

impl<'a> LineWalls<'a> {
    fn front_middle(&self, side: &WadSidedef, walls: &mut Vec<Wall>) -> Result<()> {
        let (floor, ceiling) = self.owner_heights();
        let height = (ceiling - floor).abs();
        let image = match self.image(side.middle_texture, height)? {
            Some(image) => image,
            None => return Ok(()),
        };
        let (u0, u1) = self.horizontal(side, image);
        let (v0, v1) = self.middle_vertical(side, image, height);
        let (start, end) = (self.start, self.end);
        walls.push(self.wall(
            WallPiece::FrontMiddle,
            side.middle_texture,
            [
                (end, floor, [u1, v1]),
                (end, ceiling, [u1, v0]),
                (start, ceiling, [u0, v0]),
                (start, floor, [u0, v1]),
            ],
        ));
        Ok(())
    }

    fn back_middle(&self, side: &WadSidedef, walls: &mut Vec<Wall>) -> Result<()> {
        let (floor, ceiling) = self.owner_heights();
        let height = (ceiling - floor).abs();
        let image = match self.image(side.middle_texture, height)? {
            Some(image) => image,
            None => return Ok(()),
        };
        let (u0, u1) = self.horizontal(side, image);
        let (v0, v1) = self.middle_vertical(side, image, height);
        let (start, end) = (self.start, self.end);
        walls.push(self.wall(
            WallPiece::BackMiddle,
            side.middle_texture,
            [
                (start, ceiling, [u0, v0]),
                (end, ceiling, [u1, v0]),
                (end, floor, [u1, v1]),
                (start, floor, [u0, v1]),
            ],
        ));
        Ok(())
    }

    fn lower(&self, side: &WadSidedef, back: &WadSector, walls: &mut Vec<Wall>) -> Result<()> {
        let (floor, ceiling) = self.owner_heights();
        let back_floor = f32::from(back.floor_height);
        let height = (back_floor - floor).abs();
        let image = match self.image(side.lower_texture, height)? {
            Some(image) => image,
            None => return Ok(()),
        };
        let texture_height = image.height as f32;
        let (u0, u1) = self.horizontal(side, image);
        let y_offset = f32::from(side.y_offset);
        let (v0, v1) = if self.line.lower_unpegged() {
            // Pegged to the top of the taller of the two openings.
            let top = ceiling.max(f32::from(back.ceiling_height));
            let bottom = floor.max(back_floor);
            let v0 = (top - bottom + y_offset) / texture_height;
            (v0, v0 + (ceiling - floor) / texture_height)
        } else {
            let v0 = y_offset / texture_height;
            (v0, v0 + height / texture_height)
        };
        let (start, end) = (self.start, self.end);
        walls.push(self.wall(
            WallPiece::Lower,
            side.lower_texture,
            [
                (end, floor, [u1, v1]),
                (end, back_floor, [u1, v0]),
                (start, back_floor, [u0, v0]),
                (start, floor, [u0, v1]),
            ],
        ));
        Ok(())
    }

    fn upper(&self, side: &WadSidedef, back: &WadSector, walls: &mut Vec<Wall>) -> Result<()> {
        let (_, ceiling) = self.owner_heights();
        let back_ceiling = f32::from(back.ceiling_height);
        let height = (back_ceiling - ceiling).abs();
        let image = match self.image(side.upper_texture, height)? {
            Some(image) => image,
            None => return Ok(()),
        };
        let texture_height = image.height as f32;
        let (u0, u1) = self.horizontal(side, image);
        let mut v0 = f32::from(side.y_offset) / texture_height;
        if self.line.upper_unpegged() {
            v0 -= height / texture_height;
        }
        let v1 = v0 - height / texture_height;
        let (start, end) = (self.start, self.end);
        walls.push(self.wall(
            WallPiece::Upper,
            side.upper_texture,
            [
                (start, back_ceiling, [u0, v0]),
                (end, back_ceiling, [u1, v0]),
                (end, ceiling, [u1, v1]),
                (start, ceiling, [u0, v1]),
            ],
        ));
        Ok(())
    }

    fn owner_heights(&self) -> (f32, f32) {
        (
            f32::from(self.owner.floor_height),
            f32::from(self.owner.ceiling_height),
        )
    }

    /// The image for a piece, `None` when the piece should not be drawn.
    fn image(&self, name: WadName, height: f32) -> Result<Option<&'a ParsedImage>> {
        if height == 0.0 || name.is_empty() || is_untextured(name) {
            return Ok(None);
        }
        match self.textures.texture(name) {
            Some(image) if image.width > 0 && image.height > 0 => Ok(Some(image)),
            Some(_) => {
                warn!("Wall texture `{}` is empty, skipping.", name);
                Ok(None)
            }
            None => {
                report_missing(
                    self.config,
                    ErrorKind::missing_wall_texture(name.as_str()),
                )?;
                Ok(None)
            }
        }
    }

    fn horizontal(&self, side: &WadSidedef, image: &ParsedImage) -> (f32, f32) {
        let width = image.width as f32;
        let u0 = f32::from(side.x_offset) / width;
        (u0, u0 + self.length / width)
    }

    fn middle_vertical(&self, side: &WadSidedef, image: &ParsedImage, height: f32) -> (f32, f32) {
        let texture_height = image.height as f32;
        let mut v0 = f32::from(side.y_offset) / texture_height;
        if self.line.lower_unpegged() {
            v0 -= height / texture_height;
        }
        (v0, v0 + height / texture_height)
    }

    fn wall(&self, piece: WallPiece, texture: WadName, corners: [(Pnt2f, f32, [f32; 2]); 4]) -> Wall {
        let vertices = corners
            .iter()
            .map(|&(point, height, [u, v])| Vertex {
                position: Pnt3f::new(point.x, height, -point.y),
                uv: Pnt2f::new(u, v),
                color: self.color,
            })
            .collect();
        Wall {
            linedef: self.linedef,
            piece,
            texture,
            mesh: Mesh {
                vertices,
                indices: vec![0, 1, 2, 2, 3, 0],
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::{sector_walls, Wall, WallPiece};
    use crate::config::ConvertConfig;
    use crate::errors::ErrorKind;
    use crate::fixture;
    use math::{Pnt2f, Pnt3f};

    const EPSILON: f32 = 1e-5;

    fn uvs(wall: &Wall) -> Vec<(f32, f32)> {
        wall.mesh.vertices.iter().map(|v| (v.uv.x, v.uv.y)).collect()
    }

    fn assert_uvs(wall: &Wall, expected: &[(f32, f32)]) {
        for (&(u, v), &(eu, ev)) in uvs(wall).iter().zip(expected) {
            assert!(
                (u - eu).abs() < EPSILON && (v - ev).abs() < EPSILON,
                "{:?} != {:?}",
                uvs(wall),
                expected
            );
        }
    }

    fn find(walls: &[Wall], linedef: usize, piece: WallPiece) -> &Wall {
        walls
            .iter()
            .find(|wall| wall.linedef == linedef && wall.piece == piece)
            .unwrap()
    }

    #[test]
    fn one_sided_front_middle() {
        let (level, textures) = fixture::load(&fixture::two_rooms());
        let walls = sector_walls(&level, &textures, 0, &ConvertConfig::default()).unwrap();

        let wall = find(&walls, 0, WallPiece::FrontMiddle);
        assert_eq!(wall.texture.as_str(), "STARTAN");
        assert_eq!(wall.mesh.indices, vec![0, 1, 2, 2, 3, 0]);
        let positions: Vec<_> = wall.mesh.vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![
                Pnt3f::new(128.0, 0.0, 0.0),
                Pnt3f::new(128.0, 128.0, 0.0),
                Pnt3f::new(0.0, 128.0, 0.0),
                Pnt3f::new(0.0, 0.0, 0.0),
            ]
        );
        assert_uvs(wall, &[(2.0, 1.0), (2.0, 0.0), (0.0, 0.0), (0.0, 1.0)]);
        let grey = 160.0 / 255.0;
        assert!((wall.mesh.vertices[0].color.x - grey).abs() < EPSILON);
        assert_eq!(wall.mesh.vertices[0].color.w, 1.0);
    }

    #[test]
    fn two_sided_pieces() {
        let (level, textures) = fixture::load(&fixture::two_rooms());
        let walls = sector_walls(&level, &textures, 0, &ConvertConfig::default()).unwrap();
        // Three one-sided middles, plus lower and upper on the two-sided line.
        assert_eq!(walls.len(), 5);
        assert!(walls
            .iter()
            .all(|wall| wall.linedef != 1 || wall.piece != WallPiece::FrontMiddle));

        let lower = find(&walls, 1, WallPiece::Lower);
        assert_eq!(lower.texture.as_str(), "LOWER");
        let heights: Vec<_> = lower.mesh.vertices.iter().map(|v| v.position.y).collect();
        assert_eq!(heights, vec![0.0, 16.0, 16.0, 0.0]);
        assert_uvs(lower, &[(4.0, 0.5), (4.0, 0.0), (0.0, 0.0), (0.0, 0.5)]);

        let upper = find(&walls, 1, WallPiece::Upper);
        let heights: Vec<_> = upper.mesh.vertices.iter().map(|v| v.position.y).collect();
        assert_eq!(heights, vec![96.0, 96.0, 128.0, 128.0]);
        assert_eq!(upper.mesh.vertices[0].position, Pnt3f::new(128.0, 96.0, 0.0));
        assert_uvs(upper, &[(0.0, 0.0), (2.0, 0.0), (2.0, -0.5), (0.0, -0.5)]);

        let alcove = sector_walls(&level, &textures, 1, &ConvertConfig::default()).unwrap();
        assert_eq!(alcove.len(), 3);
        assert!(alcove.iter().all(|wall| wall.linedef >= 4));
    }

    #[test]
    fn unpegged_uvs() {
        let mut map = fixture::two_rooms();
        map.linedefs[1].flags = 4 | 8 | 16;
        map.linedefs[0].flags = 1 | 16;
        map.sidedefs[1].y_offset = 8;
        let (level, textures) = fixture::load(&map);
        let walls = sector_walls(&level, &textures, 0, &ConvertConfig::default()).unwrap();

        // Lower: pegged to the taller opening, 128 - 16 + 8 over a 32-high texture.
        let lower = find(&walls, 1, WallPiece::Lower);
        assert_uvs(lower, &[(4.0, 7.75), (4.0, 3.75), (0.0, 3.75), (0.0, 7.75)]);

        // Upper: shifted up by its own height before extending upwards.
        let upper = find(&walls, 1, WallPiece::Upper);
        let (v0, v1) = (8.0 / 64.0 - 0.5, 8.0 / 64.0 - 1.0);
        assert_uvs(upper, &[(0.0, v0), (2.0, v0), (2.0, v1), (0.0, v1)]);

        // Middle: shifted up by the opening height.
        let middle = find(&walls, 0, WallPiece::FrontMiddle);
        assert_uvs(middle, &[(2.0, 0.0), (2.0, -1.0), (0.0, -1.0), (0.0, 0.0)]);
    }

    #[test]
    fn offsets_shift_uvs() {
        let mut map = fixture::two_rooms();
        map.sidedefs[0].x_offset = 32;
        map.sidedefs[0].y_offset = -64;
        let (level, textures) = fixture::load(&map);
        let walls = sector_walls(&level, &textures, 0, &ConvertConfig::default()).unwrap();
        let wall = find(&walls, 2, WallPiece::FrontMiddle);
        assert_uvs(wall, &[(2.5, 0.5), (2.5, -0.5), (0.5, -0.5), (0.5, 0.5)]);
        assert_eq!(
            Pnt2f::new(wall.mesh.vertices[0].position.x, -wall.mesh.vertices[0].position.z),
            Pnt2f::new(0.0, 128.0)
        );
    }

    #[test]
    fn shared_sky_skips_line() {
        let mut map = fixture::two_rooms();
        map.sectors[0].ceiling_texture = "F_SKY1".to_owned();
        map.sectors[1].floor_height = 0;
        let (level, textures) = fixture::load(&map);
        let walls = sector_walls(&level, &textures, 0, &ConvertConfig::default()).unwrap();
        assert_eq!(walls.len(), 3);
        assert!(walls.iter().all(|wall| wall.linedef != 1));
    }

    #[test]
    fn missing_texture_is_skipped_unless_strict() {
        let mut map = fixture::two_rooms();
        map.sidedefs[0].middle = "NOSUCH".to_owned();
        let (level, textures) = fixture::load(&map);
        let walls = sector_walls(&level, &textures, 0, &ConvertConfig::default()).unwrap();
        assert_eq!(walls.len(), 2);

        let strict = ConvertConfig {
            strict: true,
            ..ConvertConfig::default()
        };
        let error = sector_walls(&level, &textures, 0, &strict).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::MissingTexture(_)));
    }
}
