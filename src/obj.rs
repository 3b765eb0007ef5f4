//! Wavefront OBJ/MTL output, with atlas pages saved as PNG files next to them.

use image::RgbaImage;
use log::info;
use mesh::{AtlasPage, ErrorKind, SceneSink, Surface};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

fn sink_error<ErrorT: std::fmt::Display>(what: &str, error: ErrorT) -> mesh::Error {
    ErrorKind::sink(format!("{}: {}", what, error)).into()
}

pub struct ObjSink<WriterT: Write> {
    obj: WriterT,
    mtl: WriterT,
    /// File name prefix of the `.mtl` file and page images.
    stem: String,
    /// Where page images are saved; `None` only records the materials.
    page_dir: Option<PathBuf>,
    num_vertices: usize,
    num_surfaces: usize,
}

impl ObjSink<BufWriter<File>> {
    /// Creates `<stem>.obj` and `<stem>.mtl`; pages go to `<stem>_atlasN.png`.
    pub fn create<P: AsRef<Path>>(stem: P) -> mesh::Result<Self> {
        let stem = stem.as_ref();
        let create = |extension: &str| {
            let path = stem.with_extension(extension);
            File::create(&path)
                .map(BufWriter::new)
                .map_err(|error| sink_error(&format!("creating {}", path.display()), error))
        };
        let name = stem
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| sink_error("output path", format!("{} has no file name", stem.display())))?;
        let page_dir = stem.parent().map(Path::to_path_buf).unwrap_or_default();
        ObjSink::new(create("obj")?, create("mtl")?, name, Some(page_dir))
    }
}

impl<WriterT: Write> ObjSink<WriterT> {
    pub fn new(
        obj: WriterT,
        mtl: WriterT,
        stem: String,
        page_dir: Option<PathBuf>,
    ) -> mesh::Result<Self> {
        let mut sink = ObjSink {
            obj,
            mtl,
            stem,
            page_dir,
            num_vertices: 0,
            num_surfaces: 0,
        };
        writeln!(sink.obj, "# wadmesh {}", env!("CARGO_PKG_VERSION"))
            .and_then(|_| writeln!(sink.obj, "mtllib {}.mtl", sink.stem))
            .map_err(|error| sink_error("writing OBJ header", error))?;
        Ok(sink)
    }

    pub fn finish(mut self) -> mesh::Result<(WriterT, WriterT)> {
        self.obj
            .flush()
            .and_then(|_| self.mtl.flush())
            .map_err(|error| sink_error("flushing output", error))?;
        info!(
            "Wrote {} surfaces, {} vertices.",
            self.num_surfaces, self.num_vertices
        );
        Ok((self.obj, self.mtl))
    }

    fn page_file(&self, page: &AtlasPage) -> String {
        format!("{}_{}.png", self.stem, page.name)
    }

    fn write_materials(&mut self, page: &AtlasPage) -> std::io::Result<()> {
        let image = self.page_file(page);
        for &(suffix, dissolve) in &[("", 1.0), ("_alpha", 0.5)] {
            writeln!(self.mtl, "newmtl {}{}", page.name, suffix)?;
            writeln!(self.mtl, "Ka 1.000 1.000 1.000")?;
            writeln!(self.mtl, "Kd 1.000 1.000 1.000")?;
            writeln!(self.mtl, "d {:.1}", dissolve)?;
            writeln!(self.mtl, "illum 1")?;
            writeln!(self.mtl, "map_Kd {}", image)?;
            if suffix == "_alpha" {
                writeln!(self.mtl, "map_d {}", image)?;
            }
            writeln!(self.mtl)?;
        }
        Ok(())
    }

    fn write_surface(&mut self, surface: &Surface, page: &AtlasPage) -> std::io::Result<()> {
        writeln!(self.obj, "o sector_{}", surface.sector)?;
        let suffix = if surface.has_transparency { "_alpha" } else { "" };
        writeln!(self.obj, "usemtl {}{}", page.name, suffix)?;
        for (position, color) in surface.positions.iter().zip(&surface.colors) {
            writeln!(
                self.obj,
                "v {} {} {} {} {} {}",
                position[0], position[1], position[2], color[0], color[1], color[2]
            )?;
        }
        // OBJ texture coordinates start at the bottom of the image.
        for uv in &surface.uvs {
            writeln!(self.obj, "vt {} {}", uv[0], 1.0 - uv[1])?;
        }
        let base = self.num_vertices + 1;
        for triangle in surface.indices.chunks(3) {
            if let [a, b, c] = *triangle {
                let (a, b, c) = (base + a as usize, base + b as usize, base + c as usize);
                writeln!(self.obj, "f {0}/{0} {1}/{1} {2}/{2}", a, b, c)?;
            }
        }
        self.num_vertices += surface.positions.len();
        self.num_surfaces += 1;
        Ok(())
    }
}

impl<WriterT: Write> SceneSink for ObjSink<WriterT> {
    fn page(&mut self, page: &AtlasPage) -> mesh::Result<()> {
        if let Some(dir) = &self.page_dir {
            let path = dir.join(self.page_file(page));
            save_page(page, &path)?;
            info!("Saved {} to {}.", page.name, path.display());
        }
        self.write_materials(page)
            .map_err(|error| sink_error("writing MTL", error))
    }

    fn surface(&mut self, surface: &Surface, page: &AtlasPage) -> mesh::Result<()> {
        self.write_surface(surface, page)
            .map_err(|error| sink_error("writing OBJ", error))
    }
}

pub fn save_page(page: &AtlasPage, path: &Path) -> mesh::Result<()> {
    let image = RgbaImage::from_raw(page.width as u32, page.height as u32, page.rgba.clone())
        .ok_or_else(|| {
            sink_error(
                "encoding page",
                format!("{} is not {}x{} RGBA", page.name, page.width, page.height),
            )
        })?;
    image
        .save(path)
        .map_err(|error| sink_error(&format!("saving {}", path.display()), error))
}

#[cfg(test)]
mod test {
    use super::ObjSink;
    use mesh::{AtlasPage, ImageRef, SceneSink, Surface};
    use std::io::Cursor;
    use std::str::FromStr;
    use wad::WadName;

    fn page() -> AtlasPage {
        AtlasPage {
            id: 0,
            name: "atlas0".to_owned(),
            width: 2,
            height: 2,
            rgba: vec![255; 16],
        }
    }

    fn quad(sector: usize, has_transparency: bool) -> Surface {
        Surface {
            sector,
            image: ImageRef::Wall(WadName::from_str("STARTAN").unwrap()),
            positions: vec![
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
            ],
            uvs: vec![[0.5, 0.5], [0.5, 0.0], [0.0, 0.0], [0.0, 0.5]],
            colors: vec![[0.5, 0.5, 0.5, 1.0]; 4],
            indices: vec![0, 1, 2, 2, 3, 0],
            page: 0,
            has_transparency,
        }
    }

    fn write(surfaces: &[Surface]) -> (String, String) {
        let mut sink = ObjSink::new(Vec::new(), Vec::new(), "scene".to_owned(), None).unwrap();
        sink.page(&page()).unwrap();
        for surface in surfaces {
            sink.surface(surface, &page()).unwrap();
        }
        let (obj, mtl) = sink.finish().unwrap();
        (String::from_utf8(obj).unwrap(), String::from_utf8(mtl).unwrap())
    }

    #[test]
    fn writes_groups_and_one_based_faces() {
        let (obj, mtl) = write(&[quad(3, false), quad(4, true)]);
        let lines: Vec<&str> = obj.lines().collect();
        assert_eq!(lines[1], "mtllib scene.mtl");
        assert_eq!(lines[2], "o sector_3");
        assert_eq!(lines[3], "usemtl atlas0");
        assert!(lines.contains(&"f 1/1 2/2 3/3"));
        assert!(lines.contains(&"f 7/7 8/8 5/5"));
        assert!(lines.contains(&"usemtl atlas0_alpha"));
        assert!(lines.contains(&"vt 0.5 1"));

        assert!(mtl.contains("newmtl atlas0\n"));
        assert!(mtl.contains("newmtl atlas0_alpha\n"));
        assert!(mtl.contains("map_Kd scene_atlas0.png"));
        assert!(mtl.contains("d 0.5"));
    }

    #[test]
    fn output_loads_back() {
        let (obj, mtl) = write(&[quad(3, false), quad(4, true)]);
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, materials) = tobj::load_obj_buf(&mut Cursor::new(obj), &options, |_| {
            tobj::load_mtl_buf(&mut Cursor::new(mtl.clone()))
        })
        .unwrap();
        let materials = materials.unwrap();

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "sector_3");
        assert_eq!(models[0].mesh.indices.len(), 6);
        assert_eq!(models[0].mesh.positions.len(), 12);
        let material = &materials[models[1].mesh.material_id.unwrap()];
        assert_eq!(material.name, "atlas0_alpha");
        assert_eq!(
            material.diffuse_texture.as_deref(),
            Some("scene_atlas0.png")
        );
    }
}
