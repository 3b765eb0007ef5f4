mod archive;
mod errors;
mod gl;
mod image;
mod level;
mod name;

pub mod fixture;
pub mod tex;
pub mod types;
pub mod util;

pub use self::archive::{Archive, LumpKind, LumpReader, Namespace};
pub use self::errors::{Error, ErrorKind, Result};
pub use self::gl::{
    decode_gl_nodes, decode_gl_segs, decode_gl_subsectors, decode_gl_vertices, detect_gl_version,
};
pub use self::image::{Image, ParsedImage, MAX_IMAGE_SIZE};
pub use self::level::{Leaves, Level};
pub use self::name::{IntoWadName, WadName};
pub use self::tex::TextureDirectory;
