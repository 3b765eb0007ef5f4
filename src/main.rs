#[macro_use]
extern crate clap;

mod errors;
mod obj;

use self::errors::{Error, Result, ResultExt};
use self::obj::ObjSink;
use clap::{App, AppSettings, Arg};
use failure::Fail;
use log::{error, info};
use mesh::{ConvertConfig, Converter};
use std::path::PathBuf;
use std::time::Instant;
use wad::Archive;

pub struct WadFiles {
    iwad: PathBuf,
    pwads: Vec<PathBuf>,
}

impl WadFiles {
    fn open(&self) -> Result<Archive> {
        let mut wad = Archive::open(&self.iwad)
            .err_context(|_| format!("opening IWAD {}", self.iwad.display()))?;
        for pwad in &self.pwads {
            let patch =
                Archive::open(pwad).err_context(|_| format!("opening PWAD {}", pwad.display()))?;
            wad.merge(patch);
        }
        Ok(wad)
    }
}

pub struct ConvertOptions {
    level: Option<String>,
    out: PathBuf,
    config: Option<PathBuf>,
    strict: bool,
}

pub enum RunMode {
    ListLevelNames(WadFiles),
    Convert(WadFiles, ConvertOptions),
}

impl RunMode {
    pub fn from_args() -> Result<RunMode> {
        let matches = App::new("wadmesh")
            .version(crate_version!())
            .author("Cristi Cobzarenco <cristi.cobzarenco@gmail.com>")
            .about("Converts Doom levels into textured OBJ meshes.")
            .settings(&[AppSettings::ColoredHelp])
            .arg(
                Arg::with_name("iwad")
                    .long("iwad")
                    .short("i")
                    .help("initial WAD file to use")
                    .value_name("FILE")
                    .required(true),
            )
            .arg(
                Arg::with_name("pwad")
                    .long("pwad")
                    .short("p")
                    .help("patch WAD applied over the IWAD, in order")
                    .value_name("FILE")
                    .multiple(true)
                    .number_of_values(1),
            )
            .arg(
                Arg::with_name("level")
                    .long("level")
                    .short("l")
                    .help("name of the level to convert, the first one by default")
                    .value_name("NAME"),
            )
            .arg(
                Arg::with_name("out")
                    .long("out")
                    .short("o")
                    .help("output stem for the .obj, .mtl and atlas images")
                    .value_name("PATH")
                    .default_value("level"),
            )
            .arg(
                Arg::with_name("config")
                    .long("config")
                    .short("c")
                    .help("path to TOML conversion config")
                    .value_name("FILE"),
            )
            .arg(
                Arg::with_name("strict")
                    .long("strict")
                    .help("fail on missing textures and degenerate subsectors"),
            )
            .arg(
                Arg::with_name("list-levels")
                    .long("list-levels")
                    .help("list the names and indices of all the levels in the WAD, then exit"),
            )
            .get_matches();

        let files = WadFiles {
            iwad: value_t!(matches, "iwad", String)?.into(),
            pwads: matches
                .values_of("pwad")
                .map(|values| values.map(PathBuf::from).collect())
                .unwrap_or_default(),
        };

        Ok(if matches.is_present("list-levels") {
            RunMode::ListLevelNames(files)
        } else {
            let out = value_t!(matches, "out", String)?;
            RunMode::Convert(
                files,
                ConvertOptions {
                    level: matches.value_of("level").map(str::to_owned),
                    out: output_stem(&out),
                    config: matches.value_of("config").map(PathBuf::from),
                    strict: matches.is_present("strict"),
                },
            )
        })
    }
}

fn output_stem(out: &str) -> PathBuf {
    let stem = if out.to_ascii_lowercase().ends_with(".obj") {
        &out[..out.len() - 4]
    } else {
        out
    };
    PathBuf::from(stem)
}

fn convert(wad: &Archive, options: ConvertOptions) -> Result<()> {
    let mut config = match options.config {
        Some(path) => ConvertConfig::from_file(&path)?,
        None => ConvertConfig::default(),
    };
    config.strict |= options.strict;

    let level = match options.level {
        Some(level) => level,
        None => wad
            .level_names()
            .first()
            .map(ToString::to_string)
            .ok_or_else(|| Error::from("no levels in WAD".to_owned()))?,
    };

    let start_time = Instant::now();
    let converter = Converter::from_archive(wad, &level, config)?;
    let mut sink = ObjSink::create(&options.out)?;
    let summary = converter.convert(&mut sink)?;
    sink.finish()?;
    info!(
        "Converted {} into {}.obj in {:.2}s: {} sectors, {} surfaces, {} pages.",
        level,
        options.out.display(),
        start_time.elapsed().as_secs_f64(),
        summary.sectors,
        summary.surfaces,
        summary.pages
    );
    Ok(())
}

fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match RunMode::from_args()? {
        RunMode::ListLevelNames(files) => {
            let wad = files.open()?;
            for (i_level, name) in wad.level_names().iter().enumerate() {
                println!("{:3} {:8}", i_level, name);
            }
        }
        RunMode::Convert(files, options) => {
            let wad = files.open()?;
            convert(&wad, options)?;
        }
    }
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        error!("{}", error);
        for cause in Fail::iter_causes(&error) {
            error!("    caused by: {}", cause);
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod test {
    use super::output_stem;
    use std::path::PathBuf;

    #[test]
    fn obj_extension_is_stripped() {
        assert_eq!(output_stem("out/e1m1.obj"), PathBuf::from("out/e1m1"));
        assert_eq!(output_stem("E1M1.OBJ"), PathBuf::from("E1M1"));
        assert_eq!(output_stem("out/e1m1"), PathBuf::from("out/e1m1"));
    }
}
