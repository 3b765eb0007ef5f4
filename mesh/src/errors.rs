use failchain::{BoxedError, ChainErrorKind};
use failure::Fail;
use std::path::Path;
use std::result::Result as StdResult;

pub type Error = BoxedError<ErrorKind>;
pub type Result<T> = StdResult<T, Error>;

#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "WAD error: {}", 0)]
    Wad(String),

    #[fail(display = "Atlas packing error: {}", 0)]
    Packing(String),

    #[fail(display = "Missing texture: {}", 0)]
    MissingTexture(String),

    #[fail(display = "Subsector {} has fewer than three usable segs.", 0)]
    DegenerateSubsector(usize),

    #[fail(display = "Configuration error: {}", 0)]
    Config(String),

    #[fail(display = "Scene sink error: {}", 0)]
    Sink(String),
}

impl ChainErrorKind for ErrorKind {
    type Error = Error;
}

impl ErrorKind {
    pub(crate) fn on_level_load(name: &str) -> Self {
        ErrorKind::Wad(format!("Failed to load level `{}`.", name))
    }

    pub(crate) fn on_texture_directory() -> Self {
        ErrorKind::Wad("Failed to read the texture directory.".to_owned())
    }

    pub(crate) fn image_too_large_for_page(
        name: &str,
        (width, height): (usize, usize),
        (page_width, page_height): (usize, usize),
        margin: usize,
    ) -> Self {
        ErrorKind::Packing(format!(
            "Image `{}` ({}x{}) does not fit a {}x{} page with margin {}.",
            name, width, height, page_width, page_height, margin
        ))
    }

    pub(crate) fn bad_image_buffer(name: &str, len: usize, expected: usize) -> Self {
        ErrorKind::Packing(format!(
            "Image `{}` has {} bytes of RGBA, expected {}.",
            name, len, expected
        ))
    }

    pub(crate) fn empty_page(width: usize, height: usize) -> Self {
        ErrorKind::Packing(format!("Atlas pages cannot be {}x{}.", width, height))
    }

    pub(crate) fn missing_wall_texture(name: &str) -> Self {
        ErrorKind::MissingTexture(format!("wall texture `{}`", name))
    }

    pub(crate) fn missing_flat(name: &str) -> Self {
        ErrorKind::MissingTexture(format!("flat `{}`", name))
    }

    pub(crate) fn on_config_read(path: &Path) -> Self {
        ErrorKind::Config(format!("Could not read `{}`.", path.display()))
    }

    pub(crate) fn on_config_parse() -> Self {
        ErrorKind::Config("Could not parse TOML.".to_owned())
    }

    pub(crate) fn bad_config(message: &str) -> Self {
        ErrorKind::Config(message.to_owned())
    }

    pub fn sink<MessageT: Into<String>>(message: MessageT) -> Self {
        ErrorKind::Sink(message.into())
    }
}
