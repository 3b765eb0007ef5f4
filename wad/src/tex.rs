use super::archive::{Archive, Namespace};
use super::errors::{ErrorKind, Result};
use super::image::{Image, ParsedImage};
use super::name::{IntoWadName, WadName};
use super::types::{Palette, WadTextureHeader, WadTexturePatchRef};
use bincode;
use byteorder::{LittleEndian, ReadBytesExt};
use failchain::{ensure, ResultExt};
use indexmap::IndexMap;
use log::{error, info, warn};
use math::Vec2;
use std::mem;
use std::time::Instant;

/// Every wall texture, patch and flat of an archive, resolved to RGBA with one palette.
pub struct TextureDirectory {
    palette: Palette,
    textures: IndexMap<WadName, ParsedImage>,
    patches: IndexMap<WadName, ParsedImage>,
    flats: IndexMap<WadName, ParsedImage>,
}

impl TextureDirectory {
    pub fn from_archive(wad: &Archive, palette_index: usize) -> Result<TextureDirectory> {
        info!("Reading texture directory...");

        let mut palettes = wad.palettes()?;
        ensure!(
            palette_index < palettes.len(),
            ErrorKind::palette_out_of_range(palette_index, palettes.len())
        );
        let palette = palettes.swap_remove(palette_index);

        let pnames_patches = read_patches(wad)?;
        info!("  {:4} patches in PNAMES", pnames_patches.len());

        let start_time = Instant::now();
        info!("Reading & assembling textures...");
        let mut composites = IndexMap::new();
        for &lump_name in TEXTURE_LUMP_NAMES {
            let lump = match wad.named_lump(lump_name)? {
                Some(lump) => lump,
                None => {
                    info!("     0 textures in {}", String::from_utf8_lossy(lump_name));
                    continue;
                }
            };
            let num_textures = read_textures(lump.bytes(), &pnames_patches, &mut composites)?;
            info!(
                "  {:4} textures in {}",
                num_textures,
                String::from_utf8_lossy(lump_name)
            );
        }
        info!(
            "Done in {:.2}ms.",
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        let textures = composites
            .into_iter()
            .map(|(name, image)| (name, image.to_parsed(name, &palette)))
            .collect();

        let mut patches = IndexMap::new();
        for lump in wad.namespace_lumps(Namespace::Patches) {
            match Image::from_buffer(lump.bytes()) {
                Ok(image) => {
                    patches.insert(lump.name(), image.to_parsed(lump.name(), &palette));
                }
                Err(e) => error!("Skipping patch `{}`: {}", lump.name(), e),
            }
        }
        info!("  {:4} patches", patches.len());

        let flats: IndexMap<_, _> = wad
            .namespace_lumps(Namespace::Flats)
            .into_iter()
            .map(|lump| {
                let flat = Image::from_flat(lump.bytes()).to_parsed(lump.name(), &palette);
                (lump.name(), flat)
            })
            .collect();
        info!("  {:4} flats", flats.len());

        Ok(TextureDirectory {
            palette,
            textures,
            patches,
            flats,
        })
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// A wall texture by name. Composite textures shadow patches with the same name.
    pub fn texture<N: IntoWadName>(&self, name: N) -> Option<&ParsedImage> {
        let name = name.into_wad_name().ok()?;
        self.textures
            .get(&name)
            .or_else(|| self.patches.get(&name))
    }

    pub fn flat<N: IntoWadName>(&self, name: N) -> Option<&ParsedImage> {
        let name = name.into_wad_name().ok()?;
        self.flats.get(&name)
    }

    pub fn num_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn num_patches(&self) -> usize {
        self.patches.len()
    }

    pub fn num_flats(&self) -> usize {
        self.flats.len()
    }
}

const TEXTURE_LUMP_NAMES: &[&[u8; 8]] = &[b"TEXTURE1", b"TEXTURE2"];

/// The patches listed in PNAMES, in order; `None` for those missing or undecodable.
fn read_patches(wad: &Archive) -> Result<Vec<(WadName, Option<Image>)>> {
    let pnames = match wad.named_lump(b"PNAMES\0\0")? {
        Some(lump) => lump,
        None => {
            info!("No PNAMES lump, composite textures will be skipped.");
            return Ok(Vec::new());
        }
    };
    let mut lump = pnames.bytes();

    let num_patches = lump
        .read_u32::<LittleEndian>()
        .chain_err(ErrorKind::missing_number_of_patches)? as usize;
    let mut patches = Vec::with_capacity(num_patches.min(lump.len() / 8));

    let mut missing_patches = 0usize;
    info!("Reading {} patches....", num_patches);
    let start_time = Instant::now();
    for i_patch in 0..num_patches {
        let name: WadName = match bincode::deserialize_from(&mut lump) {
            Ok(name) => name,
            Err(error) => {
                error!(
                    "Failed to read patch name with index {}: {}",
                    i_patch, error
                );
                break;
            }
        };
        match wad.named_lump(&name)? {
            Some(lump) => {
                let image = match Image::from_buffer(lump.bytes()) {
                    Ok(i) => Some(i),
                    Err(e) => {
                        error!("Skipping patch `{}`: {}", name, e);
                        None
                    }
                };
                patches.push((name, image));
            }
            None => {
                missing_patches += 1;
                patches.push((name, None));
            }
        }
    }
    info!(
        "Done in {:.2}ms; {} missing patches.",
        start_time.elapsed().as_secs_f64() * 1000.0,
        missing_patches
    );
    Ok(patches)
}

fn read_textures(
    lump_buffer: &[u8],
    patches: &[(WadName, Option<Image>)],
    textures: &mut IndexMap<WadName, Image>,
) -> Result<usize> {
    let mut lump = lump_buffer;
    let num_textures = lump
        .read_u32::<LittleEndian>()
        .chain_err(ErrorKind::missing_number_of_textures)? as usize;

    let offsets_end = num_textures * mem::size_of::<u32>();
    ensure!(
        offsets_end <= lump.len(),
        ErrorKind::textures_lump_too_small_for_offsets(lump.len(), offsets_end)
    );
    let mut offsets = &lump[..offsets_end];

    for i_texture in 0..num_textures {
        let offset = offsets
            .read_u32::<LittleEndian>()
            .chain_err(ErrorKind::missing_number_of_textures)? as usize;
        if offset >= lump_buffer.len() {
            error!(
                "Skipping texture {}: offset {} past the {} byte lump.",
                i_texture,
                offset,
                lump_buffer.len()
            );
            continue;
        }

        lump = &lump_buffer[offset..];
        let header: WadTextureHeader = match bincode::deserialize_from(&mut lump) {
            Ok(header) => header,
            Err(e) => {
                error!(
                    "Skipping texture {}: could not read header: {}",
                    i_texture, e
                );
                continue;
            }
        };
        let mut image = match Image::new_from_header(&header) {
            Ok(image) => image,
            Err(e) => {
                error!("Skipping texture {}: {}", header.name, e);
                continue;
            }
        };

        for i_patch in 0..header.num_patches {
            let pref: WadTexturePatchRef = match bincode::deserialize_from(&mut lump) {
                Ok(pref) => pref,
                Err(e) => {
                    error!("Skipping patch {} in image {}: {}", i_patch, header.name, e);
                    break;
                }
            };
            let offset = Vec2::new(
                isize::from(pref.origin_x),
                isize::from(pref.origin_y.max(0)),
            );
            match patches.get(usize::from(pref.patch)) {
                Some(&(_, Some(ref patch))) => {
                    image.blit(patch, offset, i_patch == 0);
                }
                Some(&(ref patch_name, None)) => {
                    warn!(
                        "PatchRef {}, required by {} is missing.",
                        patch_name, header.name
                    );
                }
                None => {
                    error!(
                        "PatchRef index {} out of bounds ({}) in {}, skipping.",
                        pref.patch,
                        patches.len(),
                        header.name
                    );
                }
            }
        }

        textures.insert(header.name, image);
    }
    Ok(num_textures)
}
