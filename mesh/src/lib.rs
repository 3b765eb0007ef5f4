mod atlas;
mod config;
mod errors;
mod export;
mod geometry;
mod sector;
mod wall;
mod wrap;

#[cfg(test)]
mod fixture;

pub use self::atlas::{pack, pack_keyed, Atlas, AtlasPage, PackerState, PageId, PlacedSprite, UvBounds};
pub use self::config::ConvertConfig;
pub use self::errors::{Error, ErrorKind, Result};
pub use self::export::{
    build_surfaces, export, referenced_images, ConversionSummary, Converter, ImageRef, SceneSink,
    Surface,
};
pub use self::geometry::{Bounds, Mesh, Vertex};
pub use self::sector::{merge_sectors, reconstruct, ParserSector, Plane};
pub use self::wall::{sector_walls, Wall, WallPiece};
pub use self::wrap::{normalize as normalize_uvs, restitch};
