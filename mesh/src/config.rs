use super::errors::{ErrorKind, Result};
use failchain::{ensure, ResultExt};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use toml;

/// Conversion settings. Every field has a default, so an empty document is a valid config.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    pub page_width: usize,
    pub page_height: usize,
    /// Empty pixels left around every packed image.
    pub margin: usize,
    /// Turns missing textures and degenerate subsectors into errors instead of warnings.
    pub strict: bool,
    /// Split triangles whose UVs span several texture tiles.
    pub wrap_uvs: bool,
    /// World units per floor and ceiling texture repetition.
    pub flat_scale: f32,
    pub sky_marker: String,
    /// Which PLAYPAL entry resolves image colours.
    pub palette: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            page_width: 2048,
            page_height: 2048,
            margin: 1,
            strict: false,
            wrap_uvs: true,
            flat_scale: 64.0,
            sky_marker: "SKY".to_owned(),
            palette: 0,
        }
    }
}

impl ConvertConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ConvertConfig> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)
            .chain_err(|| ErrorKind::on_config_read(path))?
            .read_to_string(&mut contents)
            .chain_err(|| ErrorKind::on_config_read(path))?;
        ConvertConfig::from_text(&contents)
    }

    pub fn from_text(text: &str) -> Result<ConvertConfig> {
        let config: ConvertConfig = toml::from_str(text).chain_err(ErrorKind::on_config_parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.page_width > 0 && self.page_height > 0,
            ErrorKind::bad_config("page dimensions must be positive")
        );
        ensure!(
            self.flat_scale > 0.0,
            ErrorKind::bad_config("flat_scale must be positive")
        );
        Ok(())
    }
}
