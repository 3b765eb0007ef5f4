use failchain::{BoxedError, ChainErrorKind};
use failure::Fail;
use std::fmt::Debug;
use std::result::Result as StdResult;

pub type Error = BoxedError<ErrorKind>;
pub type Result<T> = StdResult<T, Error>;

#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "Corrupt WAD file: {}", 0)]
    CorruptWad(String),

    #[fail(display = "WAD image error: {}", 0)]
    ImageError(String),

    #[fail(display = "I/O WAD error: {}", 0)]
    Io(String),
}

impl ChainErrorKind for ErrorKind {
    type Error = Error;
}

impl ErrorKind {
    pub(crate) fn invalid_byte_in_wad_name(byte: u8, bytes: &[u8]) -> Self {
        ErrorKind::CorruptWad(format!(
            "Invalid character `{}` in wad name `{}`.",
            char::from(byte),
            String::from_utf8_lossy(bytes),
        ))
    }

    pub(crate) fn wad_name_too_long(bytes: &[u8]) -> Self {
        ErrorKind::CorruptWad(format!(
            "Wad name too long `{}`.",
            String::from_utf8_lossy(bytes)
        ))
    }

    pub(crate) fn on_file_open() -> Self {
        ErrorKind::Io("Failed to open file.".to_owned())
    }

    pub(crate) fn wad_too_short(source: &str, len: usize) -> Self {
        ErrorKind::CorruptWad(format!(
            "`{}` is {} bytes, too short for a WAD header.",
            source, len
        ))
    }

    pub(crate) fn bad_wad_header() -> Self {
        ErrorKind::CorruptWad("Could not read WAD header.".to_owned())
    }

    pub(crate) fn bad_wad_header_identifier(identifier: &[u8]) -> Self {
        ErrorKind::CorruptWad(format!(
            "Invalid header identifier: {}",
            String::from_utf8_lossy(identifier)
        ))
    }

    pub(crate) fn info_table_out_of_bounds(offset: u32, num_lumps: u32, len: usize) -> Self {
        ErrorKind::CorruptWad(format!(
            "Lump directory at {} with {} entries does not fit in {} bytes.",
            offset, num_lumps, len
        ))
    }

    pub(crate) fn bad_lump_info(lump_index: u32) -> Self {
        ErrorKind::CorruptWad(format!("Invalid lump info for lump {}", lump_index))
    }

    pub(crate) fn lump_out_of_bounds(name: &str, offset: u32, size: u32, len: usize) -> Self {
        ErrorKind::CorruptWad(format!(
            "Lump `{}` at {}+{} lies outside the {} byte file.",
            name, offset, size, len
        ))
    }

    pub(crate) fn reading_lump(index: usize, name: &str) -> Self {
        ErrorKind::Io(format!("Reading lump {}, `{}` failed", index, name))
    }

    pub(crate) fn bad_lump_element(lump_index: usize, lump_name: &str, element_index: usize) -> Self {
        ErrorKind::CorruptWad(format!(
            "Invalid element {} in lump `{}` (index={})",
            element_index, lump_name, lump_index
        ))
    }

    pub(crate) fn bad_lump_size(
        index: usize,
        name: &str,
        total_size: usize,
        element_size: usize,
    ) -> Self {
        ErrorKind::CorruptWad(format!(
            "Invalid lump size in `{}` (index={}): total={}, element={}, div={}, mod={}",
            name,
            index,
            total_size,
            element_size,
            total_size / element_size,
            total_size % element_size
        ))
    }

    pub(crate) fn missing_required_lump<NameT: Debug>(name: &NameT) -> Self {
        ErrorKind::CorruptWad(format!("Missing required lump {:?}", name))
    }

    pub(crate) fn unexpected_level_lump(level: &str, expected: &str, found: &str) -> Self {
        ErrorKind::CorruptWad(format!(
            "Level `{}`: expected lump `{}`, found `{}`.",
            level, expected, found
        ))
    }

    pub(crate) fn bad_gl_lump(name: &'static str, element_index: usize) -> Self {
        ErrorKind::CorruptWad(format!(
            "Truncated GL lump `{}` at element {}.",
            name, element_index
        ))
    }

    pub(crate) fn palette_out_of_range(index: usize, num_palettes: usize) -> Self {
        ErrorKind::CorruptWad(format!(
            "Palette {} requested, but PLAYPAL only has {}.",
            index, num_palettes
        ))
    }

    pub(crate) fn missing_number_of_patches() -> Self {
        ErrorKind::CorruptWad("Missing number of patches in PNAMES".to_owned())
    }

    pub(crate) fn missing_number_of_textures() -> Self {
        ErrorKind::CorruptWad("Missing number of textures".to_owned())
    }

    pub(crate) fn textures_lump_too_small_for_offsets(lump_len: usize, offsets_end: usize) -> Self {
        ErrorKind::CorruptWad(format!(
            "Textures lump too small for offsets: {} < {}",
            lump_len, offsets_end
        ))
    }

    pub(crate) fn image<StringT: Into<String>>(message: StringT) -> Self {
        ErrorKind::ImageError(message.into())
    }

    pub(crate) fn image_too_large(width: usize, height: usize) -> Self {
        Self::image(format!("Image too large {}x{}.", width, height))
    }

    pub(crate) fn unfinished_image_column(i_column: usize, width: usize, height: usize) -> Self {
        Self::image(format!(
            "unfinished column {}, {}x{}",
            i_column, width, height
        ))
    }
}
