//! A small textured map shared by the unit tests.

use wad::fixture::{self, MapBuilder, TextureDef, WadBuilder};
use wad::{Archive, Level, TextureDirectory};

/// A 128x128 room (sector 0) with a 64-unit alcove (sector 1) to the east behind linedef 1.
///
/// Linedef 1 is two-sided with `UPPER` and `LOWER` on its front; every other linedef is a
/// one-sided `STARTAN` wall. The alcove has a sky ceiling.
pub fn two_rooms() -> MapBuilder {
    let mut map = MapBuilder::new();
    let v0 = map.vertex(0, 0);
    let v1 = map.vertex(128, 0);
    let v2 = map.vertex(128, 128);
    let v3 = map.vertex(0, 128);
    let v4 = map.vertex(192, 0);
    let v5 = map.vertex(192, 128);
    let room = map.sector(0, 128, "FLOOR1", "CEIL1", 160);
    let alcove = map.sector(16, 96, "FLOOR1", "F_SKY1", 204);
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

/// A single 128x128 room with floor 0 and ceiling 128, closed by four one-sided walls.
pub fn single_room() -> MapBuilder {
    let mut map = MapBuilder::new();
    let v0 = map.vertex(0, 0);
    let v1 = map.vertex(128, 0);
    let v2 = map.vertex(128, 128);
    let v3 = map.vertex(0, 128);
    let room = map.sector(0, 128, "FLOOR1", "CEIL1", 160);
    let wall = map.sidedef(room, "-", "-", "STARTAN");
    let lines = [
        map.linedef(v0, v1, 1, wall, None),
        map.linedef(v1, v2, 1, wall, None),
        map.linedef(v2, v3, 1, wall, None),
        map.linedef(v3, v0, 1, wall, None),
    ];
    map.subsector_from_linedefs(&lines);
    map
}

/// Writes `map` as `E1M1` next to the textures it uses. `GLASS` has transparent pixels.
pub fn archive(map: &MapBuilder) -> Archive {
    let mut wad = WadBuilder::iwad();
    wad.lump("PLAYPAL", fixture::playpal(1))
        .lump("PNAMES", fixture::pnames(&["WALLP", "SMALLP", "HOLEP"]))
        .lump(
            "TEXTURE1",
            fixture::texture_lump(&[
                TextureDef {
                    name: "STARTAN".to_owned(),
                    width: 64,
                    height: 128,
                    patches: vec![(0, 0, 0)],
                },
                TextureDef {
                    name: "UPPER".to_owned(),
                    width: 64,
                    height: 64,
                    patches: vec![(0, 0, 0)],
                },
                TextureDef {
                    name: "LOWER".to_owned(),
                    width: 32,
                    height: 32,
                    patches: vec![(0, 0, 1)],
                },
                TextureDef {
                    name: "GLASS".to_owned(),
                    width: 2,
                    height: 2,
                    patches: vec![(0, 0, 2)],
                },
            ]),
        )
        .lump("WALLP", fixture::solid_patch(64, 128, 40))
        .lump("SMALLP", fixture::solid_patch(32, 32, 80))
        .lump(
            "HOLEP",
            fixture::patch(2, 2, &[vec![(0, vec![7])], vec![(1, vec![9])]]),
        )
        .marker("F_START")
        .lump("FLOOR1", fixture::flat(10))
        .lump("CEIL1", fixture::flat(20))
        .lump("F_SKY1", fixture::flat(30))
        .marker("F_END");
    map.write(&mut wad, "E1M1");
    Archive::from_bytes(wad.build(), "fixture").expect("fixture archive is valid")
}

pub fn load(map: &MapBuilder) -> (Level, TextureDirectory) {
    let archive = archive(map);
    let level = Level::from_archive(&archive, "E1M1").expect("fixture level loads");
    let textures = TextureDirectory::from_archive(&archive, 0).expect("fixture textures load");
    (level, textures)
}
