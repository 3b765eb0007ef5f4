//! Shelf packing of images into fixed-size RGBA pages.
//!
//! Images are placed left to right on horizontal shelves. A shelf is as tall as the first image
//! placed on it; when an image does not fit on the current shelf a new one is opened below it,
//! and when no shelf fits, a new page. Every image is framed by `margin` empty pixels, so
//! neighbours are `2 * margin` apart on both axes and no image is closer than `margin` to an edge.

use super::errors::{ErrorKind, Result};
use failchain::{bail, ensure};
use indexmap::IndexMap;
use log::info;
use std::hash::Hash;
use wad::ParsedImage;

pub type PageId = usize;

#[derive(Clone, Debug, PartialEq)]
pub struct AtlasPage {
    pub id: PageId,
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl AtlasPage {
    fn new(id: PageId, width: usize, height: usize) -> AtlasPage {
        AtlasPage {
            id,
            name: format!("atlas{}", id),
            width,
            height,
            rgba: vec![0; width * height * 4],
        }
    }
}

/// Where an image ended up, in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlacedSprite {
    pub page: PageId,
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub has_transparency: bool,
}

impl PlacedSprite {
    /// The sprite's rectangle in normalized page coordinates, `v` growing downwards.
    pub fn uv_bounds(&self, page: &AtlasPage) -> UvBounds {
        let (page_width, page_height) = (page.width as f32, page.height as f32);
        UvBounds {
            u0: self.x as f32 / page_width,
            v0: self.y as f32 / page_height,
            u1: (self.x + self.width) as f32 / page_width,
            v1: (self.y + self.height) as f32 / page_height,
        }
    }

    pub fn overlaps(&self, other: &PlacedSprite) -> bool {
        self.page == other.page
            && self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UvBounds {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvBounds {
    /// Maps sprite-local coordinates in `[0, 1]` into the page.
    pub fn map(&self, u: f32, v: f32) -> [f32; 2] {
        [
            self.u0 + u * (self.u1 - self.u0),
            self.v0 + v * (self.v1 - self.v0),
        ]
    }
}

#[derive(Debug)]
pub struct Atlas<KeyT = String> {
    pub pages: Vec<AtlasPage>,
    pub sprites: IndexMap<KeyT, PlacedSprite>,
}

impl<KeyT: Hash + Eq> Atlas<KeyT> {
    pub fn sprite(&self, key: &KeyT) -> Option<&PlacedSprite> {
        self.sprites.get(key)
    }

    pub fn page(&self, id: PageId) -> Option<&AtlasPage> {
        self.pages.get(id)
    }
}

/// A strip of the page starting at `y`, margins included. `cursor` is where the next frame starts.
#[derive(Copy, Clone, Debug)]
struct Shelf {
    y: usize,
    height: usize,
    cursor: usize,
}

impl Shelf {
    fn next_y(&self, margin: usize) -> usize {
        self.y + self.height + 2 * margin
    }
}

/// Packing in progress: the pages so far and the open shelf of the last one.
pub struct PackerState {
    page_width: usize,
    page_height: usize,
    margin: usize,
    pages: Vec<AtlasPage>,
    shelf: Option<Shelf>,
}

impl PackerState {
    pub fn new(page_width: usize, page_height: usize, margin: usize) -> Result<PackerState> {
        ensure!(
            page_width > 0 && page_height > 0,
            ErrorKind::empty_page(page_width, page_height)
        );
        Ok(PackerState {
            page_width,
            page_height,
            margin,
            pages: Vec::new(),
            shelf: None,
        })
    }

    /// Copies `image` into the next free slot, opening shelves and pages as needed.
    pub fn place(&mut self, image: &ParsedImage) -> Result<PlacedSprite> {
        let (width, height, margin) = (image.width, image.height, self.margin);
        let name = image.name.as_str();
        ensure!(
            image.rgba.len() == width * height * 4,
            ErrorKind::bad_image_buffer(name, image.rgba.len(), width * height * 4)
        );
        if width + 2 * margin > self.page_width || height + 2 * margin > self.page_height {
            bail!(ErrorKind::image_too_large_for_page(
                name,
                (width, height),
                (self.page_width, self.page_height),
                margin,
            ));
        }

        let mut shelf = match self.shelf {
            Some(shelf)
                if shelf.cursor + width + 2 * margin <= self.page_width
                    && height <= shelf.height =>
            {
                shelf
            }
            Some(shelf) if shelf.next_y(margin) + height + 2 * margin <= self.page_height => {
                Shelf {
                    y: shelf.next_y(margin),
                    height,
                    cursor: 0,
                }
            }
            _ => {
                let id = self.pages.len();
                self.pages
                    .push(AtlasPage::new(id, self.page_width, self.page_height));
                Shelf {
                    y: 0,
                    height,
                    cursor: 0,
                }
            }
        };
        let (x, y) = (shelf.cursor + margin, shelf.y + margin);
        shelf.cursor += width + 2 * margin;
        self.shelf = Some(shelf);

        let page_id = self.pages.len() - 1;
        let page = &mut self.pages[page_id];
        let row_bytes = width * 4;
        for (row, source) in image.rgba.chunks(row_bytes.max(1)).take(height).enumerate() {
            let start = ((y + row) * page.width + x) * 4;
            page.rgba[start..start + row_bytes].copy_from_slice(source);
        }

        Ok(PlacedSprite {
            page: page_id,
            x,
            y,
            width,
            height,
            has_transparency: image.has_transparency,
        })
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn into_pages(self) -> Vec<AtlasPage> {
        self.pages
    }
}

/// Packs images keyed by their name. Later images with an already packed name are ignored.
pub fn pack(
    images: &[ParsedImage],
    page_width: usize,
    page_height: usize,
    margin: usize,
) -> Result<Atlas> {
    pack_keyed(
        images.iter().map(|image| (image.name.to_string(), image)),
        page_width,
        page_height,
        margin,
    )
}

/// Packs images in iteration order under caller-chosen keys.
pub fn pack_keyed<'a, KeyT, ImagesT>(
    images: ImagesT,
    page_width: usize,
    page_height: usize,
    margin: usize,
) -> Result<Atlas<KeyT>>
where
    KeyT: Hash + Eq,
    ImagesT: IntoIterator<Item = (KeyT, &'a ParsedImage)>,
{
    let mut state = PackerState::new(page_width, page_height, margin)?;
    let mut sprites = IndexMap::new();
    for (key, image) in images {
        if sprites.contains_key(&key) {
            continue;
        }
        let sprite = state.place(image)?;
        sprites.insert(key, sprite);
    }

    let pages = state.into_pages();
    info!(
        "Packed {} images into {} {}x{} pages.",
        sprites.len(),
        pages.len(),
        page_width,
        page_height
    );
    for page in &pages {
        let used: usize = sprites
            .values()
            .filter(|sprite| sprite.page == page.id)
            .map(|sprite| sprite.width * sprite.height)
            .sum();
        info!(
            "  {}: {:.1}% used",
            page.name,
            100.0 * used as f64 / (page.width * page.height) as f64
        );
    }
    Ok(Atlas { pages, sprites })
}
