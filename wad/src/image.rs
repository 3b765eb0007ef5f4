use super::errors::{ErrorKind, Result};
use super::types::{Palette, WadName, WadTextureHeader};
use byteorder::{LittleEndian, ReadBytesExt};
use failchain::{ensure, ResultExt};
use math::Vec2;

pub const MAX_IMAGE_SIZE: usize = 4096;

pub const FLAT_SIZE: usize = 64;

/// Pixels with the high bit set are transparent; the low byte is a palette index.
const TRANSPARENT: u16 = 0xff00;

/// A palette-indexed image with transparency.
pub struct Image {
    width: usize,
    height: usize,
    x_offset: isize,
    y_offset: isize,
    pixels: Vec<u16>,
}

impl Image {
    pub fn new(width: usize, height: usize) -> Result<Image> {
        ensure!(
            width <= MAX_IMAGE_SIZE && height <= MAX_IMAGE_SIZE,
            ErrorKind::image_too_large(width, height)
        );
        Ok(Image {
            width,
            height,
            x_offset: 0,
            y_offset: 0,
            pixels: vec![TRANSPARENT; width * height],
        })
    }

    pub fn new_from_header(header: &WadTextureHeader) -> Result<Image> {
        Image::new(usize::from(header.width), usize::from(header.height))
    }

    /// A 64x64 flat stored as raw row-major palette indices. Short flats are padded with
    /// index 0, anything past 4096 bytes is ignored.
    pub fn from_flat(bytes: &[u8]) -> Image {
        let mut pixels = vec![0u16; FLAT_SIZE * FLAT_SIZE];
        for (pixel, &index) in pixels.iter_mut().zip(bytes) {
            *pixel = u16::from(index);
        }
        Image {
            width: FLAT_SIZE,
            height: FLAT_SIZE,
            x_offset: 0,
            y_offset: 0,
            pixels,
        }
    }

    /// Decodes a picture: a header, one offset per column, and per column a list of posts.
    pub fn from_buffer(buffer: &[u8]) -> Result<Image> {
        let mut reader = buffer;
        let width = usize::from(
            reader
                .read_u16::<LittleEndian>()
                .chain_err(|| ErrorKind::image("missing width"))?,
        );
        let height = usize::from(
            reader
                .read_u16::<LittleEndian>()
                .chain_err(|| ErrorKind::image("missing height"))?,
        );
        ensure!(
            width <= MAX_IMAGE_SIZE && height <= MAX_IMAGE_SIZE,
            ErrorKind::image_too_large(width, height)
        );

        let x_offset = reader
            .read_i16::<LittleEndian>()
            .chain_err(|| ErrorKind::image("missing x offset"))? as isize;
        let y_offset = reader
            .read_i16::<LittleEndian>()
            .chain_err(|| ErrorKind::image("missing y offset"))? as isize;

        let mut pixels = vec![TRANSPARENT; width * height];

        for i_column in 0..width {
            let offset = reader
                .read_u32::<LittleEndian>()
                .chain_err(|| ErrorKind::unfinished_image_column(i_column, width, height))?
                as usize;
            ensure!(
                offset < buffer.len(),
                ErrorKind::image(format!(
                    "invalid column offset in {}, offset={}, size={}",
                    i_column,
                    offset,
                    buffer.len()
                ))
            );
            let mut source = buffer[offset..].iter();
            let mut i_run = 0;
            loop {
                // 255 ends the column.
                let row_start = usize::from(*source.next().ok_or_else(|| {
                    ErrorKind::image(format!("unfinished column {}, run {}", i_column, i_run))
                })?);
                if row_start == 255 {
                    break;
                }

                let run_length = usize::from(*source.next().ok_or_else(|| {
                    ErrorKind::image(format!(
                        "missing run length: column {}, run {}",
                        i_column, i_run
                    ))
                })?);
                ensure!(
                    row_start + run_length <= height,
                    ErrorKind::image(format!(
                        "run too big: column {}, run {} ({} +{}), size {}x{}",
                        i_column, i_run, row_start, run_length, width, height
                    ))
                );

                // Padding.
                ensure!(
                    source.next().is_some(),
                    ErrorKind::image(format!(
                        "missing padding byte 1: column {}, run {}",
                        i_column, i_run
                    ))
                );

                ensure!(
                    source.len() >= run_length,
                    ErrorKind::image(format!(
                        "source underrun: column {}, run {} ({}, +{}), bytes left {}",
                        i_column,
                        i_run,
                        row_start,
                        run_length,
                        source.len()
                    ))
                );
                if run_length > 0 {
                    let destination = pixels[row_start * width + i_column..]
                        .chunks_mut(width)
                        .map(|row| &mut row[0])
                        .take(run_length);
                    for (dest_pixel, &index) in destination.zip(&mut source) {
                        *dest_pixel = u16::from(index);
                    }
                }

                ensure!(
                    source.next().is_some(),
                    ErrorKind::image(format!(
                        "missing padding byte 2: column {}, run {}",
                        i_column, i_run
                    ))
                );
                i_run += 1;
            }
        }

        Ok(Image {
            width,
            height,
            x_offset,
            y_offset,
            pixels,
        })
    }

    pub fn blit(&mut self, source: &Image, offset: Vec2<isize>, ignore_transparency: bool) {
        // The region of `source` that lands inside `self`.
        let x_start = (-offset[0]).max(0) as usize;
        let y_start = (-offset[1]).max(0) as usize;
        let x_end = (self.width as isize - offset[0]).min(source.width as isize);
        let y_end = (self.height as isize - offset[1]).min(source.height as isize);
        if x_end <= x_start as isize || y_end <= y_start as isize {
            return;
        }
        let (x_end, y_end) = (x_end as usize, y_end as usize);

        let src_pitch = source.width;
        let dest_pitch = self.width;
        let copy_width = x_end - x_start;
        let copy_height = y_end - y_start;

        let src_rows = source.pixels[x_start + y_start * src_pitch..]
            .chunks(src_pitch)
            .take(copy_height)
            .map(|row| &row[..copy_width]);

        let dest_x = (x_start as isize + offset[0]) as usize;
        let dest_y = (y_start as isize + offset[1]) as usize;
        let dest_rows = self.pixels[dest_x + dest_y * dest_pitch..]
            .chunks_mut(dest_pitch)
            .take(copy_height)
            .map(|row| &mut row[..copy_width]);

        if ignore_transparency {
            for (dest_row, source_row) in dest_rows.zip(src_rows) {
                dest_row.copy_from_slice(source_row);
            }
        } else {
            for (dest_row, source_row) in dest_rows.zip(src_rows) {
                for (dest_pixel, &source_pixel) in dest_row.iter_mut().zip(source_row) {
                    // Copy unless the source's high bit is set, without branching.
                    let blend = 0u16.wrapping_sub(source_pixel >> 15);
                    *dest_pixel = (source_pixel & !blend) | (*dest_pixel & blend);
                }
            }
        }
    }

    pub fn x_offset(&self) -> isize {
        self.x_offset
    }

    pub fn y_offset(&self) -> isize {
        self.y_offset
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn has_transparency(&self) -> bool {
        self.pixels.iter().any(|&pixel| pixel & 0x8000 != 0)
    }

    /// Resolves palette indices to RGBA; transparent pixels become `[0, 0, 0, 0]`.
    pub fn to_parsed(&self, name: WadName, palette: &Palette) -> ParsedImage {
        let mut rgba = Vec::with_capacity(self.pixels.len() * 4);
        let mut has_transparency = false;
        for &pixel in &self.pixels {
            if pixel & 0x8000 != 0 {
                has_transparency = true;
                rgba.extend_from_slice(&[0, 0, 0, 0]);
            } else {
                rgba.extend_from_slice(&palette.rgba(pixel as u8));
            }
        }
        ParsedImage {
            name,
            width: self.width,
            height: self.height,
            rgba,
            has_transparency,
        }
    }
}

/// A decoded image ready for packing: row-major RGBA, four bytes per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedImage {
    pub name: WadName,
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
    pub has_transparency: bool,
}

impl ParsedImage {
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * self.width + x) * 4;
        [
            self.rgba[offset],
            self.rgba[offset + 1],
            self.rgba[offset + 2],
            self.rgba[offset + 3],
        ]
    }
}
