use super::atlas::{pack_keyed, Atlas, AtlasPage, PageId};
use super::config::ConvertConfig;
use super::errors::{ErrorKind, Result};
use super::geometry::Mesh;
use super::sector::{reconstruct, ParserSector};
use super::wall::report_missing;
use super::wrap;
use failchain::ResultExt;
use indexmap::IndexSet;
use log::{debug, info};
use std::collections::HashSet;
use std::fmt;
use std::time::Instant;
use wad::{Archive, Level, ParsedImage, TextureDirectory, WadName};

/// An image as referenced by geometry. Flats and wall textures live in separate namespaces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImageRef {
    Flat(WadName),
    Wall(WadName),
}

impl ImageRef {
    pub fn name(&self) -> WadName {
        match *self {
            ImageRef::Flat(name) | ImageRef::Wall(name) => name,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ImageRef::Flat(name) => write!(formatter, "flat {}", name),
            ImageRef::Wall(name) => write!(formatter, "wall {}", name),
        }
    }
}

/// A triangle list textured from a single atlas page, in flat buffers.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pub sector: usize,
    pub image: ImageRef,
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
    pub page: PageId,
    pub has_transparency: bool,
}

/// Receives the converted scene. Every page is announced once, before its first surface.
pub trait SceneSink {
    fn page(&mut self, page: &AtlasPage) -> Result<()>;
    fn surface(&mut self, surface: &Surface, page: &AtlasPage) -> Result<()>;
}

/// Every textured mesh of a sector, floor then ceiling then walls.
fn sector_meshes(sector: &ParserSector) -> impl Iterator<Item = (ImageRef, &Mesh)> {
    let floor = sector
        .floor
        .iter()
        .map(|plane| (ImageRef::Flat(plane.texture), &plane.mesh));
    let ceiling = sector
        .ceiling
        .iter()
        .map(|plane| (ImageRef::Flat(plane.texture), &plane.mesh));
    let walls = sector
        .walls
        .iter()
        .map(|wall| (ImageRef::Wall(wall.texture), &wall.mesh));
    floor.chain(ceiling).chain(walls)
}

/// The images used by `sectors`, deduplicated, in order of first use.
pub fn referenced_images(sectors: &[ParserSector]) -> IndexSet<ImageRef> {
    sectors
        .iter()
        .flat_map(sector_meshes)
        .filter(|(_, mesh)| !mesh.is_empty())
        .map(|(image, _)| image)
        .collect()
}

/// Flattens sectors into atlas-mapped surfaces, opaque ones first.
pub fn build_surfaces(
    sectors: &[ParserSector],
    atlas: &Atlas<ImageRef>,
    config: &ConvertConfig,
) -> Result<Vec<Surface>> {
    let mut opaque = Vec::new();
    let mut transparent = Vec::new();
    for sector in sectors {
        for (image, mesh) in sector_meshes(sector) {
            if mesh.is_empty() {
                continue;
            }
            let sprite = if let Some(sprite) = atlas.sprite(&image) {
                sprite
            } else {
                debug!("No sprite for {} in sector {}, skipping.", image, sector.id);
                continue;
            };
            let page = atlas.page(sprite.page).ok_or_else(|| {
                ErrorKind::Packing(format!("sprite for {} has no page {}", image, sprite.page))
            })?;
            let bounds = sprite.uv_bounds(page);

            let local = if config.wrap_uvs {
                wrap::restitch(mesh)
            } else {
                wrap::normalize(mesh)
            };
            let surface = Surface {
                sector: sector.id,
                image,
                positions: local
                    .vertices
                    .iter()
                    .map(|v| [v.position.x, v.position.y, v.position.z])
                    .collect(),
                uvs: local
                    .vertices
                    .iter()
                    .map(|v| bounds.map(v.uv.x, v.uv.y))
                    .collect(),
                colors: local
                    .vertices
                    .iter()
                    .map(|v| [v.color.x, v.color.y, v.color.z, v.color.w])
                    .collect(),
                indices: local.indices,
                page: sprite.page,
                has_transparency: sprite.has_transparency,
            };
            if surface.has_transparency {
                transparent.push(surface);
            } else {
                opaque.push(surface);
            }
        }
    }
    opaque.extend(transparent);
    Ok(opaque)
}

/// Streams surfaces into `sink`, announcing each page right before its first use.
pub fn export<SinkT: SceneSink + ?Sized>(
    sink: &mut SinkT,
    surfaces: &[Surface],
    atlas: &Atlas<ImageRef>,
) -> Result<()> {
    let mut announced = HashSet::new();
    for surface in surfaces {
        let page = atlas.page(surface.page).ok_or_else(|| {
            ErrorKind::sink(format!("surface refers to missing page {}", surface.page))
        })?;
        if announced.insert(page.id) {
            sink.page(page)?;
        }
        sink.surface(surface, page)?;
    }
    Ok(())
}

/// What a conversion produced.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConversionSummary {
    pub sectors: usize,
    pub surfaces: usize,
    pub pages: usize,
}

/// Turns one level of an archive into a scene.
pub struct Converter {
    level: Level,
    textures: TextureDirectory,
    config: ConvertConfig,
}

impl Converter {
    pub fn new(level: Level, textures: TextureDirectory, config: ConvertConfig) -> Self {
        Converter {
            level,
            textures,
            config,
        }
    }

    /// Loads `level_name` and the texture directory from `wad`.
    pub fn from_archive(wad: &Archive, level_name: &str, config: ConvertConfig) -> Result<Self> {
        let level = Level::from_archive(wad, level_name)
            .chain_err(|| ErrorKind::on_level_load(level_name))?;
        let textures = TextureDirectory::from_archive(wad, config.palette)
            .chain_err(ErrorKind::on_texture_directory)?;
        Ok(Converter::new(level, textures, config))
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn convert<SinkT: SceneSink + ?Sized>(&self, sink: &mut SinkT) -> Result<ConversionSummary> {
        let sectors = reconstruct(&self.level, &self.textures, &self.config)?;

        info!("Packing textures...");
        let start_time = Instant::now();
        let mut images = Vec::new();
        for image in referenced_images(&sectors) {
            if let Some(parsed) = self.lookup(image)? {
                images.push((image, parsed));
            }
        }
        let atlas = pack_keyed(
            images,
            self.config.page_width,
            self.config.page_height,
            self.config.margin,
        )?;
        info!(
            "Done in {:.2}ms.",
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        let surfaces = build_surfaces(&sectors, &atlas, &self.config)?;
        export(sink, &surfaces, &atlas)?;
        let summary = ConversionSummary {
            sectors: sectors.len(),
            surfaces: surfaces.len(),
            pages: atlas.pages.len(),
        };
        info!(
            "Exported {} surfaces of {} sectors on {} pages.",
            summary.surfaces, summary.sectors, summary.pages
        );
        Ok(summary)
    }

    fn lookup(&self, image: ImageRef) -> Result<Option<&ParsedImage>> {
        let (found, kind) = match image {
            ImageRef::Flat(name) => (
                self.textures.flat(name),
                ErrorKind::missing_flat(name.as_str()),
            ),
            ImageRef::Wall(name) => (
                self.textures.texture(name),
                ErrorKind::missing_wall_texture(name.as_str()),
            ),
        };
        if found.is_none() {
            report_missing(&self.config, kind)?;
        }
        Ok(found)
    }
}
