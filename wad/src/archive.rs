use super::errors::{ErrorKind, Result};
use super::name::IntoWadName;
use super::types::{
    Palette, WadInfo, WadKind, WadLump, WadName, HEADER_SIZE, LUMP_INFO_SIZE,
};
use bincode;
use failchain::{ensure, ResultExt};
use indexmap::IndexMap;
use log::{info, warn};
use serde::de::DeserializeOwned;
use std::borrow::Borrow;
use std::fmt::Debug;
use std::fs;
use std::hash::Hash;
use std::io::Read;
use std::mem;
use std::path::Path;

/// A marker-delimited range of lumps.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Flats,
    Patches,
    Sprites,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LumpKind {
    MapAnchor,
    MapData,
    GlAnchor,
    GlData,
    Palette,
    Colormap,
    PatchNames,
    Textures,
    NamespaceStart(Namespace),
    NamespaceEnd(Namespace),
    Opaque,
}

const KNOWN_LUMPS: &[(&str, LumpKind)] = &[
    ("THINGS", LumpKind::MapData),
    ("LINEDEFS", LumpKind::MapData),
    ("SIDEDEFS", LumpKind::MapData),
    ("VERTEXES", LumpKind::MapData),
    ("SEGS", LumpKind::MapData),
    ("SSECTORS", LumpKind::MapData),
    ("NODES", LumpKind::MapData),
    ("SECTORS", LumpKind::MapData),
    ("REJECT", LumpKind::MapData),
    ("BLOCKMAP", LumpKind::MapData),
    ("GL_VERT", LumpKind::GlData),
    ("GL_SEGS", LumpKind::GlData),
    ("GL_SSECT", LumpKind::GlData),
    ("GL_NODES", LumpKind::GlData),
    ("GL_PVS", LumpKind::GlData),
    ("PLAYPAL", LumpKind::Palette),
    ("COLORMAP", LumpKind::Colormap),
    ("PNAMES", LumpKind::PatchNames),
    ("TEXTURE1", LumpKind::Textures),
    ("TEXTURE2", LumpKind::Textures),
    ("F_START", LumpKind::NamespaceStart(Namespace::Flats)),
    ("FF_START", LumpKind::NamespaceStart(Namespace::Flats)),
    ("F_END", LumpKind::NamespaceEnd(Namespace::Flats)),
    ("FF_END", LumpKind::NamespaceEnd(Namespace::Flats)),
    ("P_START", LumpKind::NamespaceStart(Namespace::Patches)),
    ("PP_START", LumpKind::NamespaceStart(Namespace::Patches)),
    ("P_END", LumpKind::NamespaceEnd(Namespace::Patches)),
    ("PP_END", LumpKind::NamespaceEnd(Namespace::Patches)),
    ("S_START", LumpKind::NamespaceStart(Namespace::Sprites)),
    ("SS_START", LumpKind::NamespaceStart(Namespace::Sprites)),
    ("S_END", LumpKind::NamespaceEnd(Namespace::Sprites)),
    ("SS_END", LumpKind::NamespaceEnd(Namespace::Sprites)),
];

impl LumpKind {
    pub fn classify(name: &WadName) -> LumpKind {
        let name = name.as_str();
        if let Some(&(_, kind)) = KNOWN_LUMPS.iter().find(|&&(known, _)| known == name) {
            kind
        } else if is_map_name(name) {
            LumpKind::MapAnchor
        } else if name.starts_with("GL_") {
            LumpKind::GlAnchor
        } else {
            LumpKind::Opaque
        }
    }
}

/// `ExMy` or `MAPxx`.
fn is_map_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match bytes.len() {
        4 => {
            bytes[0] == b'E'
                && bytes[1].is_ascii_digit()
                && bytes[2] == b'M'
                && bytes[3].is_ascii_digit()
        }
        5 => name.starts_with("MAP") && bytes[3..].iter().all(u8::is_ascii_digit),
        _ => false,
    }
}

#[derive(Debug)]
struct Source {
    name: String,
    kind: WadKind,
    bytes: Vec<u8>,
}

#[derive(Copy, Clone, Debug)]
struct LumpInfo {
    name: WadName,
    kind: LumpKind,
    source: usize,
    offset: usize,
    size: usize,
}

/// One or more WAD files, held in memory, with a merged lump directory.
#[derive(Debug)]
pub struct Archive {
    sources: Vec<Source>,
    index_map: IndexMap<WadName, usize>,
    lumps: Vec<LumpInfo>,
    levels: Vec<usize>,
}

impl Archive {
    pub fn open<P>(wad_path: &P) -> Result<Archive>
    where
        P: AsRef<Path> + Debug,
    {
        info!("Loading wad file {:?}...", wad_path);
        let bytes = fs::read(wad_path).chain_err(ErrorKind::on_file_open)?;
        Archive::from_bytes(bytes, &wad_path.as_ref().to_string_lossy())
    }

    pub fn from_bytes(bytes: Vec<u8>, source_name: &str) -> Result<Archive> {
        ensure!(
            bytes.len() >= HEADER_SIZE,
            ErrorKind::wad_too_short(source_name, bytes.len())
        );
        let header: WadInfo =
            bincode::deserialize_from(&bytes[..HEADER_SIZE]).chain_err(ErrorKind::bad_wad_header)?;
        let kind = WadKind::from_identifier(&header.identifier)
            .ok_or_else(|| ErrorKind::bad_wad_header_identifier(&header.identifier))?;

        let directory_start = header.info_table_offset as usize;
        let directory_end = (header.num_lumps as usize)
            .checked_mul(LUMP_INFO_SIZE)
            .and_then(|size| size.checked_add(directory_start));
        let directory_end = match directory_end {
            Some(end) if end <= bytes.len() => end,
            _ => {
                return Err(ErrorKind::info_table_out_of_bounds(
                    header.info_table_offset,
                    header.num_lumps,
                    bytes.len(),
                )
                .into())
            }
        };

        let mut lumps = Vec::with_capacity(header.num_lumps as usize);
        let mut directory = &bytes[directory_start..directory_end];
        for i_lump in 0..header.num_lumps {
            let fileinfo: WadLump = bincode::deserialize_from(&mut directory)
                .chain_err(|| ErrorKind::bad_lump_info(i_lump))?;
            let offset = fileinfo.file_pos as usize;
            let size = fileinfo.size as usize;
            ensure!(
                size == 0
                    || offset
                        .checked_add(size)
                        .map_or(false, |end| end <= bytes.len()),
                ErrorKind::lump_out_of_bounds(
                    fileinfo.name.as_str(),
                    fileinfo.file_pos,
                    fileinfo.size,
                    bytes.len()
                )
            );
            lumps.push(LumpInfo {
                name: fileinfo.name,
                kind: LumpKind::classify(&fileinfo.name),
                source: 0,
                offset,
                size,
            });
        }

        let mut archive = Archive {
            sources: vec![Source {
                name: source_name.to_owned(),
                kind,
                bytes,
            }],
            index_map: IndexMap::new(),
            lumps,
            levels: Vec::new(),
        };
        archive.rebuild_index();
        info!(
            "Read {:?} `{}`: {} lumps, {} levels.",
            kind,
            source_name,
            archive.lumps.len(),
            archive.levels.len()
        );
        Ok(archive)
    }

    /// Appends `patch`'s directory after this one. Name lookups return the last match, so the
    /// patch shadows any lump or level it redefines.
    pub fn merge(&mut self, patch: Archive) {
        let source_offset = self.sources.len();
        for source in &patch.sources {
            if source.kind == WadKind::Iwad {
                warn!("Merging `{}`, which is an IWAD, as a patch.", source.name);
            }
        }
        self.sources.extend(patch.sources);
        self.lumps
            .extend(patch.lumps.into_iter().map(|mut lump| {
                lump.source += source_offset;
                lump
            }));
        self.rebuild_index();
        info!(
            "Merged archive: {} sources, {} lumps, {} levels.",
            self.sources.len(),
            self.lumps.len(),
            self.levels.len()
        );
    }

    fn rebuild_index(&mut self) {
        self.index_map.clear();
        self.levels.clear();
        for (i_lump, lump) in self.lumps.iter().enumerate() {
            self.index_map.insert(lump.name, i_lump);
        }

        // Our heuristic for level lumps is that they are preceeded by the "THINGS" lump.
        for i_lump in 1..self.lumps.len() {
            let (previous, current) = (self.lumps[i_lump - 1], self.lumps[i_lump]);
            if current.name.as_str() == "THINGS" && previous.source == current.source {
                self.lumps[i_lump - 1].kind = LumpKind::MapAnchor;
                self.levels.push(i_lump - 1);
            }
        }
    }

    pub fn num_lumps(&self) -> usize {
        self.lumps.len()
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level_lump(&self, level_index: usize) -> Result<LumpReader> {
        let index = *self
            .levels
            .get(level_index)
            .ok_or_else(|| ErrorKind::missing_required_lump(&level_index))?;
        self.lump_by_index(index)
    }

    /// Anchor names of every level, in directory order. Shadowed levels appear more than once.
    pub fn level_names(&self) -> Vec<WadName> {
        self.levels
            .iter()
            .map(|&index| self.lumps[index].name)
            .collect()
    }

    /// Position in `level_names` of the last level with the given anchor name.
    pub fn level_index<'a, Q>(&self, name: &'a Q) -> Option<usize>
    where
        Q: ?Sized,
        &'a Q: IntoWadName,
    {
        let name = name.into_wad_name().ok()?;
        self.levels
            .iter()
            .rposition(|&index| self.lumps[index].name == name)
    }

    pub fn required_named_lump<'a, Q>(&self, name: &'a Q) -> Result<LumpReader>
    where
        Q: ?Sized,
        &'a Q: IntoWadName,
    {
        let name: WadName = name.into_wad_name()?;
        self.named_lump(&name)?
            .ok_or_else(|| ErrorKind::missing_required_lump(&name).into())
    }

    pub fn named_lump<Q>(&self, name: &Q) -> Result<Option<LumpReader>>
    where
        WadName: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index_map.get(name) {
            Some(&index) => self.lump_by_index(index).map(Some),
            None => Ok(None),
        }
    }

    pub fn lump_by_index(&self, index: usize) -> Result<LumpReader> {
        Ok(LumpReader {
            archive: self,
            info: self
                .lumps
                .get(index)
                .ok_or_else(|| ErrorKind::missing_required_lump(&index))?,
            index,
        })
    }

    /// Every lump between a start and end marker of `namespace`, across all merged sources.
    /// Nested markers (`F1_START` and friends) and other virtual lumps are skipped.
    pub fn namespace_lumps(&self, namespace: Namespace) -> Vec<LumpReader> {
        let mut inside = false;
        let mut lumps = Vec::new();
        for (index, info) in self.lumps.iter().enumerate() {
            match info.kind {
                LumpKind::NamespaceStart(started) if started == namespace => inside = true,
                LumpKind::NamespaceEnd(ended) if ended == namespace => inside = false,
                _ if inside && info.size > 0 => lumps.push(LumpReader {
                    archive: self,
                    info,
                    index,
                }),
                _ => {}
            }
        }
        lumps
    }

    pub fn palettes(&self) -> Result<Vec<Palette>> {
        let palettes = self.required_named_lump(b"PLAYPAL\0")?.read_blobs()?;
        info!("Loaded {} palettes.", palettes.len());
        Ok(palettes)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct LumpReader<'a> {
    archive: &'a Archive,
    info: &'a LumpInfo,
    index: usize,
}

impl<'a> LumpReader<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> WadName {
        self.info.name
    }

    pub fn kind(&self) -> LumpKind {
        self.info.kind
    }

    pub fn source_name(&self) -> &'a str {
        &self.archive.sources[self.info.source].name
    }

    pub fn is_virtual(&self) -> bool {
        self.info.size == 0
    }

    /// The lump's bytes, borrowed from the owning archive.
    pub fn bytes(&self) -> &'a [u8] {
        if self.info.size == 0 {
            return &[];
        }
        let source = &self.archive.sources[self.info.source];
        &source.bytes[self.info.offset..self.info.offset + self.info.size]
    }

    /// Decodes the lump as a packed array of `T`. Empty lumps decode to an empty vector.
    pub fn decode_vec<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let LumpReader { info, index, .. } = *self;
        self.read(|mut reader| {
            let element_size = mem::size_of::<T>();
            ensure!(
                element_size > 0 && info.size % element_size == 0,
                ErrorKind::bad_lump_size(index, info.name.as_ref(), info.size, element_size),
            );
            let num_elements = info.size / element_size;
            (0..num_elements)
                .map(move |i_element| {
                    bincode::deserialize_from(&mut reader).chain_err(|| {
                        ErrorKind::bad_lump_element(index, info.name.as_ref(), i_element)
                    })
                })
                .collect()
        })
    }

    pub fn decode_one<T: DeserializeOwned>(&self) -> Result<T> {
        let LumpReader { info, index, .. } = *self;
        self.read(|reader| {
            let element_size = mem::size_of::<T>();
            ensure!(
                element_size > 0 && info.size == element_size,
                ErrorKind::bad_lump_size(index, info.name.as_ref(), info.size, element_size)
            );
            Ok(bincode::deserialize_from(reader)
                .chain_err(|| ErrorKind::bad_lump_element(index, info.name.as_ref(), 0))?)
        })
    }

    pub fn read_blobs<B>(&self) -> Result<Vec<B>>
    where
        B: Default + AsMut<[u8]>,
    {
        let LumpReader { info, index, .. } = *self;
        self.read(|reader| {
            let blob_size = B::default().as_mut().len();
            ensure!(
                info.size > 0 && blob_size > 0 && (info.size % blob_size) == 0,
                ErrorKind::bad_lump_size(index, info.name.as_ref(), info.size, blob_size.max(1)),
            );
            let num_blobs = info.size / blob_size;
            let mut blobs = Vec::with_capacity(num_blobs);
            for _ in 0..num_blobs {
                let mut blob = B::default();
                reader
                    .read_exact(blob.as_mut())
                    .chain_err(|| ErrorKind::reading_lump(index, info.name.as_ref()))?;
                blobs.push(blob);
            }
            Ok(blobs)
        })
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.bytes().to_vec())
    }

    fn read<F, T>(&self, with: F) -> Result<T>
    where
        F: FnOnce(&mut &'a [u8]) -> Result<T>,
    {
        with(&mut self.bytes())
    }
}
