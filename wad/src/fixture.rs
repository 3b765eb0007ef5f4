//! In-memory WAD writer, used to build small archives for tests and tools.

use super::types::{GlVersion, WadKind, HEADER_SIZE, LUMP_INFO_SIZE, PALETTE_SIZE};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

fn name_bytes(name: &str) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    for (dest, &src) in bytes.iter_mut().zip(name.as_bytes()) {
        *dest = src;
    }
    bytes
}

/// Writes a `WadName` field into a record buffer.
fn push_name(buffer: &mut Vec<u8>, name: &str) {
    buffer.extend_from_slice(&name_bytes(name));
}

fn push_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer
        .write_u16::<LittleEndian>(value)
        .expect("writing to a vec cannot fail");
}

fn push_i16(buffer: &mut Vec<u8>, value: i16) {
    buffer
        .write_i16::<LittleEndian>(value)
        .expect("writing to a vec cannot fail");
}

fn push_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer
        .write_u32::<LittleEndian>(value)
        .expect("writing to a vec cannot fail");
}

fn push_i32(buffer: &mut Vec<u8>, value: i32) {
    buffer
        .write_i32::<LittleEndian>(value)
        .expect("writing to a vec cannot fail");
}

/// Lays out lumps back to back after the header, followed by the directory.
pub struct WadBuilder {
    kind: WadKind,
    lumps: Vec<([u8; 8], Vec<u8>)>,
}

impl WadBuilder {
    pub fn new(kind: WadKind) -> WadBuilder {
        WadBuilder {
            kind,
            lumps: Vec::new(),
        }
    }

    pub fn iwad() -> WadBuilder {
        WadBuilder::new(WadKind::Iwad)
    }

    pub fn pwad() -> WadBuilder {
        WadBuilder::new(WadKind::Pwad)
    }

    pub fn lump<DataT: Into<Vec<u8>>>(&mut self, name: &str, data: DataT) -> &mut Self {
        self.lumps.push((name_bytes(name), data.into()));
        self
    }

    pub fn marker(&mut self, name: &str) -> &mut Self {
        self.lump(name, Vec::new())
    }

    pub fn build(&self) -> Vec<u8> {
        let data_size: usize = self.lumps.iter().map(|(_, data)| data.len()).sum();
        let directory_offset = HEADER_SIZE + data_size;
        let mut bytes = Vec::with_capacity(directory_offset + self.lumps.len() * LUMP_INFO_SIZE);

        bytes.extend_from_slice(self.kind.identifier());
        push_u32(&mut bytes, self.lumps.len() as u32);
        push_u32(&mut bytes, directory_offset as u32);
        for (_, data) in &self.lumps {
            bytes.extend_from_slice(data);
        }

        let mut position = HEADER_SIZE;
        for (name, data) in &self.lumps {
            push_u32(&mut bytes, if data.is_empty() { 0 } else { position as u32 });
            push_u32(&mut bytes, data.len() as u32);
            bytes.extend_from_slice(name);
            position += data.len();
        }
        bytes
    }
}

#[derive(Copy, Clone, Debug)]
pub struct LinedefDef {
    pub start: u16,
    pub end: u16,
    pub flags: u16,
    pub front: u16,
    pub back: Option<u16>,
}

#[derive(Clone, Debug)]
pub struct SidedefDef {
    pub x_offset: i16,
    pub y_offset: i16,
    pub upper: String,
    pub lower: String,
    pub middle: String,
    pub sector: u16,
}

#[derive(Clone, Debug)]
pub struct SectorDef {
    pub floor_height: i16,
    pub ceiling_height: i16,
    pub floor_texture: String,
    pub ceiling_texture: String,
    pub light: i16,
    pub tag: u16,
}

/// A seg endpoint for `MapBuilder`; `Gl` indices refer to `gl_vertices`.
#[derive(Copy, Clone, Debug)]
pub enum SegVertex {
    Normal(u32),
    Gl(u32),
}

#[derive(Copy, Clone, Debug)]
pub struct SegDef {
    pub start: SegVertex,
    pub end: SegVertex,
    pub linedef: Option<u16>,
    pub side: u16,
}

/// Writes the lumps of one level. Segs and subsectors go to the classic `SEGS`/`SSECTORS` lumps,
/// or, when `gl_version` is set, to GL lumps of that version (the classic ones are left empty).
#[derive(Clone, Debug, Default)]
pub struct MapBuilder {
    pub vertices: Vec<(i16, i16)>,
    pub gl_vertices: Vec<(f32, f32)>,
    pub linedefs: Vec<LinedefDef>,
    pub sidedefs: Vec<SidedefDef>,
    pub sectors: Vec<SectorDef>,
    pub segs: Vec<SegDef>,
    pub subsectors: Vec<(u32, u32)>,
    pub gl_version: Option<GlVersion>,
}

impl MapBuilder {
    pub fn new() -> MapBuilder {
        MapBuilder::default()
    }

    pub fn vertex(&mut self, x: i16, y: i16) -> u16 {
        self.vertices.push((x, y));
        (self.vertices.len() - 1) as u16
    }

    pub fn sector(
        &mut self,
        floor_height: i16,
        ceiling_height: i16,
        floor_texture: &str,
        ceiling_texture: &str,
        light: i16,
    ) -> u16 {
        self.sectors.push(SectorDef {
            floor_height,
            ceiling_height,
            floor_texture: floor_texture.to_owned(),
            ceiling_texture: ceiling_texture.to_owned(),
            light,
            tag: 0,
        });
        (self.sectors.len() - 1) as u16
    }

    pub fn sidedef(&mut self, sector: u16, upper: &str, lower: &str, middle: &str) -> u16 {
        self.sidedef_with_offsets(sector, upper, lower, middle, 0, 0)
    }

    pub fn sidedef_with_offsets(
        &mut self,
        sector: u16,
        upper: &str,
        lower: &str,
        middle: &str,
        x_offset: i16,
        y_offset: i16,
    ) -> u16 {
        self.sidedefs.push(SidedefDef {
            x_offset,
            y_offset,
            upper: upper.to_owned(),
            lower: lower.to_owned(),
            middle: middle.to_owned(),
            sector,
        });
        (self.sidedefs.len() - 1) as u16
    }

    pub fn linedef(&mut self, start: u16, end: u16, flags: u16, front: u16, back: Option<u16>) -> u16 {
        self.linedefs.push(LinedefDef {
            start,
            end,
            flags,
            front,
            back,
        });
        (self.linedefs.len() - 1) as u16
    }

    /// Adds one subsector whose segs run along `linedefs`' front sides, in order.
    pub fn subsector_from_linedefs(&mut self, linedefs: &[u16]) {
        let first = self.segs.len() as u32;
        for &linedef in linedefs {
            let LinedefDef { start, end, .. } = self.linedefs[linedef as usize];
            self.segs.push(SegDef {
                start: SegVertex::Normal(u32::from(start)),
                end: SegVertex::Normal(u32::from(end)),
                linedef: Some(linedef),
                side: 0,
            });
        }
        self.subsectors.push((linedefs.len() as u32, first));
    }

    pub fn write(&self, wad: &mut WadBuilder, name: &str) {
        let gl = self.gl_version;
        wad.marker(name)
            .lump("THINGS", Vec::new())
            .lump("LINEDEFS", self.encode_linedefs())
            .lump("SIDEDEFS", self.encode_sidedefs())
            .lump("VERTEXES", self.encode_vertices())
            .lump("SEGS", if gl.is_none() { self.encode_segs() } else { Vec::new() })
            .lump(
                "SSECTORS",
                if gl.is_none() {
                    self.encode_subsectors()
                } else {
                    Vec::new()
                },
            )
            .lump("NODES", Vec::new())
            .lump("SECTORS", self.encode_sectors())
            .lump("REJECT", Vec::new())
            .lump("BLOCKMAP", Vec::new());

        if let Some(version) = gl {
            wad.marker(&format!("GL_{}", name))
                .lump("GL_VERT", self.encode_gl_vertices(version))
                .lump("GL_SEGS", self.encode_gl_segs(version))
                .lump("GL_SSECT", self.encode_gl_subsectors(version))
                .lump("GL_NODES", Vec::new());
        }
    }

    fn encode_vertices(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &(x, y) in &self.vertices {
            push_i16(&mut bytes, x);
            push_i16(&mut bytes, y);
        }
        bytes
    }

    fn encode_linedefs(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for linedef in &self.linedefs {
            push_u16(&mut bytes, linedef.start);
            push_u16(&mut bytes, linedef.end);
            push_u16(&mut bytes, linedef.flags);
            push_u16(&mut bytes, 0);
            push_u16(&mut bytes, 0);
            push_u16(&mut bytes, linedef.front);
            push_u16(&mut bytes, linedef.back.unwrap_or(0xffff));
        }
        bytes
    }

    fn encode_sidedefs(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for sidedef in &self.sidedefs {
            push_i16(&mut bytes, sidedef.x_offset);
            push_i16(&mut bytes, sidedef.y_offset);
            push_name(&mut bytes, &sidedef.upper);
            push_name(&mut bytes, &sidedef.lower);
            push_name(&mut bytes, &sidedef.middle);
            push_u16(&mut bytes, sidedef.sector);
        }
        bytes
    }

    fn encode_sectors(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for sector in &self.sectors {
            push_i16(&mut bytes, sector.floor_height);
            push_i16(&mut bytes, sector.ceiling_height);
            push_name(&mut bytes, &sector.floor_texture);
            push_name(&mut bytes, &sector.ceiling_texture);
            push_i16(&mut bytes, sector.light);
            push_u16(&mut bytes, 0);
            push_u16(&mut bytes, sector.tag);
        }
        bytes
    }

    fn encode_segs(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for seg in &self.segs {
            let index = |vertex: SegVertex| match vertex {
                SegVertex::Normal(index) | SegVertex::Gl(index) => index as u16,
            };
            push_u16(&mut bytes, index(seg.start));
            push_u16(&mut bytes, index(seg.end));
            push_u16(&mut bytes, 0);
            push_u16(&mut bytes, seg.linedef.unwrap_or(0xffff));
            push_u16(&mut bytes, seg.side);
            push_u16(&mut bytes, 0);
        }
        bytes
    }

    fn encode_subsectors(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &(count, first) in &self.subsectors {
            push_u16(&mut bytes, count as u16);
            push_u16(&mut bytes, first as u16);
        }
        bytes
    }

    fn encode_gl_vertices(&self, version: GlVersion) -> Vec<u8> {
        let mut bytes = Vec::new();
        match version {
            GlVersion::V1 => {
                for &(x, y) in &self.gl_vertices {
                    push_i16(&mut bytes, x as i16);
                    push_i16(&mut bytes, y as i16);
                }
            }
            _ => {
                bytes.extend_from_slice(gl_magic(version));
                for &(x, y) in &self.gl_vertices {
                    push_i32(&mut bytes, (x * 65536.0) as i32);
                    push_i32(&mut bytes, (y * 65536.0) as i32);
                }
            }
        }
        bytes
    }

    fn encode_gl_segs(&self, version: GlVersion) -> Vec<u8> {
        let mut bytes = Vec::new();
        let flag = version.vertex_flag();
        let encode = |vertex: SegVertex| match vertex {
            SegVertex::Normal(index) => index,
            SegVertex::Gl(index) => index | flag,
        };
        if version == GlVersion::V3 || version == GlVersion::V4 {
            bytes.extend_from_slice(gl_magic(version));
        }
        for seg in &self.segs {
            if version.wide_indices() {
                push_u32(&mut bytes, encode(seg.start));
                push_u32(&mut bytes, encode(seg.end));
                push_u16(&mut bytes, seg.linedef.unwrap_or(0xffff));
                push_u16(&mut bytes, seg.side);
                push_u32(&mut bytes, 0xffff_ffff);
            } else {
                push_u16(&mut bytes, encode(seg.start) as u16);
                push_u16(&mut bytes, encode(seg.end) as u16);
                push_u16(&mut bytes, seg.linedef.unwrap_or(0xffff));
                push_u16(&mut bytes, seg.side);
                push_u16(&mut bytes, 0xffff);
            }
        }
        bytes
    }

    fn encode_gl_subsectors(&self, version: GlVersion) -> Vec<u8> {
        let mut bytes = Vec::new();
        if version == GlVersion::V3 || version == GlVersion::V4 {
            bytes.extend_from_slice(gl_magic(version));
        }
        for &(count, first) in &self.subsectors {
            if version.wide_indices() {
                push_u32(&mut bytes, count);
                push_u32(&mut bytes, first);
            } else {
                push_u16(&mut bytes, count as u16);
                push_u16(&mut bytes, first as u16);
            }
        }
        bytes
    }
}

pub fn gl_magic(version: GlVersion) -> &'static [u8; 4] {
    match version {
        GlVersion::V1 | GlVersion::V2 => b"gNd2",
        GlVersion::V3 => b"gNd3",
        GlVersion::V4 => b"gNd4",
        GlVersion::V5 => b"gNd5",
    }
}

/// `num_palettes` palettes where palette `p` maps index `i` to `(i, 255 - i, p)`.
pub fn playpal(num_palettes: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(num_palettes * PALETTE_SIZE);
    for palette in 0..num_palettes {
        for index in 0..256usize {
            bytes.extend_from_slice(&[index as u8, (255 - index) as u8, palette as u8]);
        }
    }
    bytes
}

/// A 64x64 flat filled with a single palette index.
pub fn flat(index: u8) -> Vec<u8> {
    vec![index; 64 * 64]
}

/// A picture-format patch. Each column is a list of `(top, pixels)` posts.
pub fn patch(width: u16, height: u16, columns: &[Vec<(u8, Vec<u8>)>]) -> Vec<u8> {
    let mut header = Vec::new();
    push_u16(&mut header, width);
    push_u16(&mut header, height);
    push_i16(&mut header, 0);
    push_i16(&mut header, 0);

    let offsets_size = columns.len() * 4;
    let mut posts = Vec::new();
    let mut offsets = Vec::new();
    for column in columns {
        push_u32(&mut offsets, (header.len() + offsets_size + posts.len()) as u32);
        for (top, pixels) in column {
            posts.push(*top);
            posts.push(pixels.len() as u8);
            posts.push(0);
            posts.extend_from_slice(pixels);
            posts.push(0);
        }
        posts.push(0xff);
    }

    let mut bytes = header;
    bytes.extend_from_slice(&offsets);
    bytes.extend_from_slice(&posts);
    bytes
}

/// A fully opaque patch filled with one palette index.
pub fn solid_patch(width: u16, height: u16, index: u8) -> Vec<u8> {
    let column = vec![(0u8, vec![index; height as usize])];
    let columns: Vec<_> = (0..width).map(|_| column.clone()).collect();
    patch(width, height, &columns)
}

pub fn pnames(names: &[&str]) -> Vec<u8> {
    let mut bytes = Vec::new();
    push_u32(&mut bytes, names.len() as u32);
    for name in names {
        push_name(&mut bytes, name);
    }
    bytes
}

#[derive(Clone, Debug)]
pub struct TextureDef {
    pub name: String,
    pub width: i16,
    pub height: i16,
    /// `(origin_x, origin_y, patch index)`.
    pub patches: Vec<(i16, i16, i16)>,
}

pub fn texture_lump(textures: &[TextureDef]) -> Vec<u8> {
    let mut bodies = Vec::new();
    let mut offsets = Vec::new();
    let header_size = 4 + textures.len() * 4;
    for texture in textures {
        push_i32(&mut offsets, (header_size + bodies.len()) as i32);
        push_name(&mut bodies, &texture.name);
        push_u32(&mut bodies, 0);
        push_i16(&mut bodies, texture.width);
        push_i16(&mut bodies, texture.height);
        push_u32(&mut bodies, 0);
        push_i16(&mut bodies, texture.patches.len() as i16);
        for &(origin_x, origin_y, patch) in &texture.patches {
            push_i16(&mut bodies, origin_x);
            push_i16(&mut bodies, origin_y);
            push_i16(&mut bodies, patch);
            push_i16(&mut bodies, 1);
            push_i16(&mut bodies, 0);
        }
    }

    let mut bytes = Vec::new();
    push_u32(&mut bytes, textures.len() as u32);
    bytes
        .write_all(&offsets)
        .expect("writing to a vec cannot fail");
    bytes.extend_from_slice(&bodies);
    bytes
}
