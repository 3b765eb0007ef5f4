//! Decoders for the auxiliary records written by GL nodebuilders.

use super::errors::{ErrorKind, Result};
use super::types::{GlChild, GlNode, GlSeg, GlSubsector, GlVersion, GlVertex, GlVertexRef};
use byteorder::{LittleEndian, ReadBytesExt};
use failchain::ResultExt;
use log::warn;

const MAGIC_PREFIX: &[u8] = b"gNd";

fn magic_of(bytes: &[u8]) -> Option<u8> {
    if bytes.len() >= 4 && &bytes[..3] == MAGIC_PREFIX {
        Some(bytes[3])
    } else {
        None
    }
}

fn strip_magic(bytes: &[u8]) -> &[u8] {
    if magic_of(bytes).is_some() {
        &bytes[4..]
    } else {
        bytes
    }
}

/// Picks the version from the `GL_VERT` magic, upgraded to V3 when `GL_SEGS` says so.
pub fn detect_gl_version(gl_vert: &[u8], gl_segs: &[u8]) -> GlVersion {
    let version = match magic_of(gl_vert) {
        None => GlVersion::V1,
        Some(b'2') => GlVersion::V2,
        Some(b'3') => GlVersion::V3,
        Some(b'4') => GlVersion::V4,
        Some(b'5') => GlVersion::V5,
        Some(other) => {
            warn!(
                "Unknown GL nodes magic `gNd{}`, reading as V2.",
                char::from(other)
            );
            GlVersion::V2
        }
    };
    if version == GlVersion::V2 && magic_of(gl_segs) == Some(b'3') {
        GlVersion::V3
    } else {
        version
    }
}

fn num_records(name: &'static str, bytes: &[u8], entry_size: usize) -> usize {
    let remainder = bytes.len() % entry_size;
    if remainder != 0 {
        warn!(
            "GL lump `{}` has {} trailing bytes after {}-byte records.",
            name, remainder, entry_size
        );
    }
    bytes.len() / entry_size
}

pub fn decode_gl_vertices(bytes: &[u8], version: GlVersion) -> Result<Vec<GlVertex>> {
    const NAME: &str = "GL_VERT";
    if version == GlVersion::V1 {
        let count = num_records(NAME, bytes, 4);
        let mut reader = bytes;
        return (0..count)
            .map(|i_vertex| {
                let mut read = || -> std::io::Result<GlVertex> {
                    Ok(GlVertex {
                        x: f32::from(reader.read_i16::<LittleEndian>()?),
                        y: f32::from(reader.read_i16::<LittleEndian>()?),
                    })
                };
                read().chain_err(|| ErrorKind::bad_gl_lump(NAME, i_vertex))
            })
            .collect();
    }

    let bytes = strip_magic(bytes);
    let count = num_records(NAME, bytes, 8);
    let mut reader = bytes;
    (0..count)
        .map(|i_vertex| {
            let mut read = || -> std::io::Result<GlVertex> {
                Ok(GlVertex {
                    x: reader.read_i32::<LittleEndian>()? as f32 / 65536.0,
                    y: reader.read_i32::<LittleEndian>()? as f32 / 65536.0,
                })
            };
            read().chain_err(|| ErrorKind::bad_gl_lump(NAME, i_vertex))
        })
        .collect()
}

fn optional_index(raw: u32, none: u32) -> Option<usize> {
    if raw == none {
        None
    } else {
        Some(raw as usize)
    }
}

pub fn decode_gl_segs(bytes: &[u8], version: GlVersion) -> Result<Vec<GlSeg>> {
    const NAME: &str = "GL_SEGS";
    let wide = version.wide_indices();
    let (bytes, entry_size) = match version {
        GlVersion::V1 | GlVersion::V2 => (bytes, 10),
        GlVersion::V3 | GlVersion::V4 => (strip_magic(bytes), 16),
        GlVersion::V5 => (bytes, 16),
    };
    let count = num_records(NAME, bytes, entry_size);
    let mut reader = bytes;
    (0..count)
        .map(|i_seg| {
            let mut read = || -> std::io::Result<GlSeg> {
                let (start, end) = if wide {
                    (
                        reader.read_u32::<LittleEndian>()?,
                        reader.read_u32::<LittleEndian>()?,
                    )
                } else {
                    (
                        u32::from(reader.read_u16::<LittleEndian>()?),
                        u32::from(reader.read_u16::<LittleEndian>()?),
                    )
                };
                let linedef = reader.read_u16::<LittleEndian>()?;
                let side = reader.read_u16::<LittleEndian>()?;
                let partner = if wide {
                    optional_index(reader.read_u32::<LittleEndian>()?, 0xffff_ffff)
                } else {
                    optional_index(u32::from(reader.read_u16::<LittleEndian>()?), 0xffff)
                };
                Ok(GlSeg {
                    start_vertex: GlVertexRef::decode(start, version),
                    end_vertex: GlVertexRef::decode(end, version),
                    linedef: optional_index(u32::from(linedef), 0xffff),
                    side,
                    partner,
                })
            };
            read().chain_err(|| ErrorKind::bad_gl_lump(NAME, i_seg))
        })
        .collect()
}

pub fn decode_gl_subsectors(bytes: &[u8], version: GlVersion) -> Result<Vec<GlSubsector>> {
    const NAME: &str = "GL_SSECT";
    let wide = version.wide_indices();
    let (bytes, entry_size) = match version {
        GlVersion::V1 | GlVersion::V2 => (bytes, 4),
        GlVersion::V3 | GlVersion::V4 => (strip_magic(bytes), 8),
        GlVersion::V5 => (bytes, 8),
    };
    let count = num_records(NAME, bytes, entry_size);
    let mut reader = bytes;
    (0..count)
        .map(|i_subsector| {
            let mut read = || -> std::io::Result<GlSubsector> {
                Ok(if wide {
                    GlSubsector {
                        num_segs: reader.read_u32::<LittleEndian>()? as usize,
                        first_seg: reader.read_u32::<LittleEndian>()? as usize,
                    }
                } else {
                    GlSubsector {
                        num_segs: usize::from(reader.read_u16::<LittleEndian>()?),
                        first_seg: usize::from(reader.read_u16::<LittleEndian>()?),
                    }
                })
            };
            read().chain_err(|| ErrorKind::bad_gl_lump(NAME, i_subsector))
        })
        .collect()
}

pub fn decode_gl_nodes(bytes: &[u8], version: GlVersion) -> Result<Vec<GlNode>> {
    const NAME: &str = "GL_NODES";
    let wide = version == GlVersion::V5;
    let count = num_records(NAME, bytes, if wide { 32 } else { 28 });
    let mut reader = bytes;
    (0..count)
        .map(|i_node| {
            let mut read = || -> std::io::Result<GlNode> {
                let mut coords = [0i16; 12];
                reader.read_i16_into::<LittleEndian>(&mut coords)?;
                let (right, left) = if wide {
                    (
                        reader.read_u32::<LittleEndian>()?,
                        reader.read_u32::<LittleEndian>()?,
                    )
                } else {
                    (
                        u32::from(reader.read_u16::<LittleEndian>()?),
                        u32::from(reader.read_u16::<LittleEndian>()?),
                    )
                };
                Ok(GlNode {
                    line_x: coords[0],
                    line_y: coords[1],
                    step_x: coords[2],
                    step_y: coords[3],
                    right_bounds: [coords[4], coords[5], coords[6], coords[7]],
                    left_bounds: [coords[8], coords[9], coords[10], coords[11]],
                    right: GlChild::decode(right, version),
                    left: GlChild::decode(left, version),
                })
            };
            read().chain_err(|| ErrorKind::bad_gl_lump(NAME, i_node))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::{
        decode_gl_nodes, decode_gl_segs, decode_gl_subsectors, decode_gl_vertices,
        detect_gl_version,
    };
    use crate::types::{GlChild, GlVersion, GlVertexRef};
    use byteorder::{LittleEndian, WriteBytesExt};

    #[test]
    fn detects_version_from_magic() {
        assert_eq!(detect_gl_version(&[0, 0, 0, 0], &[]), GlVersion::V1);
        assert_eq!(detect_gl_version(b"gNd2", b""), GlVersion::V2);
        assert_eq!(detect_gl_version(b"gNd2", b"gNd3"), GlVersion::V3);
        assert_eq!(detect_gl_version(b"gNd4", b""), GlVersion::V4);
        assert_eq!(detect_gl_version(b"gNd5", b"gNd3"), GlVersion::V5);
        assert_eq!(detect_gl_version(b"gNd9", b""), GlVersion::V2);
    }

    #[test]
    fn fixed_point_vertices() {
        let mut bytes = b"gNd2".to_vec();
        bytes.write_i32::<LittleEndian>(3 << 16 | 0x8000).unwrap();
        bytes.write_i32::<LittleEndian>(-(2 << 16)).unwrap();
        let vertices = decode_gl_vertices(&bytes, GlVersion::V2).unwrap();
        assert_eq!(vertices.len(), 1);
        assert_eq!(vertices[0].x, 3.5);
        assert_eq!(vertices[0].y, -2.0);
    }

    #[test]
    fn short_vertices_in_v1() {
        let mut bytes = Vec::new();
        bytes.write_i16::<LittleEndian>(-64).unwrap();
        bytes.write_i16::<LittleEndian>(128).unwrap();
        bytes.push(7);
        let vertices = decode_gl_vertices(&bytes, GlVersion::V1).unwrap();
        assert_eq!(vertices.len(), 1);
        assert_eq!((vertices[0].x, vertices[0].y), (-64.0, 128.0));
    }

    #[test]
    fn narrow_segs_strip_bit_15() {
        let mut bytes = Vec::new();
        for &value in &[0x8003u16, 2, 7, 1, 0xffff, 4, 0x8001, 0xffff, 0, 0] {
            bytes.write_u16::<LittleEndian>(value).unwrap();
        }
        let segs = decode_gl_segs(&bytes, GlVersion::V2).unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].start_vertex, GlVertexRef::Gl(3));
        assert_eq!(segs[0].end_vertex, GlVertexRef::Normal(2));
        assert_eq!(segs[0].linedef, Some(7));
        assert!(!segs[0].is_front());
        assert_eq!(segs[0].partner, None);

        assert!(segs[1].is_mini());
        assert_eq!(segs[1].end_vertex, GlVertexRef::Gl(1));
        assert_eq!(segs[1].partner, Some(0));
    }

    #[test]
    fn wide_segs_per_version() {
        let write = |bytes: &mut Vec<u8>, start: u32, end: u32| {
            bytes.write_u32::<LittleEndian>(start).unwrap();
            bytes.write_u32::<LittleEndian>(end).unwrap();
            bytes.write_u16::<LittleEndian>(5).unwrap();
            bytes.write_u16::<LittleEndian>(0).unwrap();
            bytes.write_u32::<LittleEndian>(0xffff_ffff).unwrap();
        };

        let mut v3 = b"gNd3".to_vec();
        write(&mut v3, 1 << 30 | 9, 4);
        let segs = decode_gl_segs(&v3, GlVersion::V3).unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].start_vertex, GlVertexRef::Gl(9));
        assert_eq!(segs[0].end_vertex, GlVertexRef::Normal(4));
        assert!(segs[0].is_front());

        let mut v5 = Vec::new();
        write(&mut v5, 1 << 31 | 70_000, 1 << 30);
        let segs = decode_gl_segs(&v5, GlVersion::V5).unwrap();
        assert_eq!(segs[0].start_vertex, GlVertexRef::Gl(70_000));
        assert_eq!(segs[0].end_vertex, GlVertexRef::Normal(1 << 30));
        assert_eq!(segs[0].linedef, Some(5));
    }

    #[test]
    fn subsectors_per_version() {
        let mut narrow = Vec::new();
        for &value in &[4u16, 0, 3, 4] {
            narrow.write_u16::<LittleEndian>(value).unwrap();
        }
        let subsectors = decode_gl_subsectors(&narrow, GlVersion::V2).unwrap();
        assert_eq!(subsectors.len(), 2);
        assert_eq!((subsectors[1].num_segs, subsectors[1].first_seg), (3, 4));

        let mut wide = b"gNd3".to_vec();
        wide.write_u32::<LittleEndian>(5).unwrap();
        wide.write_u32::<LittleEndian>(100_000).unwrap();
        let subsectors = decode_gl_subsectors(&wide, GlVersion::V3).unwrap();
        assert_eq!(subsectors.len(), 1);
        assert_eq!((subsectors[0].num_segs, subsectors[0].first_seg), (5, 100_000));
    }

    #[test]
    fn node_children() {
        let coords = [0i16, 0, 64, 0, 64, 0, 64, 0, 0, -64, 64, 0];
        let mut narrow = Vec::new();
        for &coord in &coords {
            narrow.write_i16::<LittleEndian>(coord).unwrap();
        }
        narrow.write_u16::<LittleEndian>(0x8002).unwrap();
        narrow.write_u16::<LittleEndian>(1).unwrap();
        let nodes = decode_gl_nodes(&narrow, GlVersion::V2).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].step_x, 64);
        assert_eq!(nodes[0].left_bounds, [0, -64, 64, 0]);
        assert_eq!(nodes[0].right, GlChild::Subsector(2));
        assert_eq!(nodes[0].left, GlChild::Node(1));

        let mut wide = Vec::new();
        for &coord in &coords {
            wide.write_i16::<LittleEndian>(coord).unwrap();
        }
        wide.write_u32::<LittleEndian>(1 << 31 | 40_000).unwrap();
        wide.write_u32::<LittleEndian>(0x8000).unwrap();
        let nodes = decode_gl_nodes(&wide, GlVersion::V5).unwrap();
        assert_eq!(nodes[0].right, GlChild::Subsector(40_000));
        assert_eq!(nodes[0].left, GlChild::Node(0x8000));
    }
}
