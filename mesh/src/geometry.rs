use math::{vec4, Pnt2f, Pnt3f, Vec4f};
use std::f32;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: Pnt3f,
    pub uv: Pnt2f,
    pub color: Vec4f,
}

/// An indexed triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends `other`, offsetting its indices by the current vertex count.
    pub fn append(&mut self, other: Mesh) {
        let base = self.vertices.len() as u32;
        self.indices
            .extend(other.indices.into_iter().map(|index| index + base));
        self.vertices.extend(other.vertices);
    }

    /// The corners of every triangle; triangles with out-of-range indices are skipped.
    pub fn triangles<'a>(&'a self) -> impl Iterator<Item = [Vertex; 3]> + 'a {
        self.indices.chunks(3).filter_map(move |triangle| match *triangle {
            [a, b, c] => Some([
                *self.vertices.get(a as usize)?,
                *self.vertices.get(b as usize)?,
                *self.vertices.get(c as usize)?,
            ]),
            _ => None,
        })
    }
}

/// Grey level for a sector light value, opaque.
pub fn light_color(light: i16) -> Vec4f {
    let level = f32::from(light.max(0).min(255)) / 255.0;
    vec4(level, level, level, 1.0)
}

/// Axis-aligned bounding box; starts out empty (inverted).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub min: Pnt3f,
    pub max: Pnt3f,
}

impl Bounds {
    pub fn empty() -> Self {
        Bounds {
            min: Pnt3f::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Pnt3f::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, point: Pnt3f) {
        self.min = Pnt3f::new(
            self.min.x.min(point.x),
            self.min.y.min(point.y),
            self.min.z.min(point.z),
        );
        self.max = Pnt3f::new(
            self.max.x.max(point.x),
            self.max.y.max(point.y),
            self.max.z.max(point.z),
        );
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut bounds = *self;
        if !other.is_empty() {
            bounds.extend(other.min);
            bounds.extend(other.max);
        }
        bounds
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::empty()
    }
}

#[cfg(test)]
mod test {
    use super::{light_color, Bounds, Mesh, Vertex};
    use math::{vec4, Pnt2f, Pnt3f};

    fn vertex(x: f32) -> Vertex {
        Vertex {
            position: Pnt3f::new(x, 0.0, 0.0),
            uv: Pnt2f::new(0.0, 0.0),
            color: vec4(1.0, 1.0, 1.0, 1.0),
        }
    }

    #[test]
    fn append_offsets_indices() {
        let mut mesh = Mesh {
            vertices: vec![vertex(0.0), vertex(1.0), vertex(2.0)],
            indices: vec![0, 1, 2],
        };
        mesh.append(Mesh {
            vertices: vec![vertex(3.0), vertex(4.0), vertex(5.0)],
            indices: vec![2, 1, 0],
        });
        assert_eq!(mesh.indices, vec![0, 1, 2, 5, 4, 3]);
        assert_eq!(mesh.num_triangles(), 2);
        let second = mesh.triangles().nth(1).unwrap();
        assert_eq!(second[0].position.x, 5.0);
    }

    #[test]
    fn bounds_union_ignores_empty() {
        let mut bounds = Bounds::empty();
        assert!(bounds.is_empty());
        bounds.extend(Pnt3f::new(1.0, 2.0, 3.0));
        bounds.extend(Pnt3f::new(-1.0, 5.0, 0.0));
        assert_eq!(bounds.union(&Bounds::empty()), bounds);

        let mut other = Bounds::empty();
        other.extend(Pnt3f::new(4.0, -2.0, 1.0));
        let union = bounds.union(&other);
        assert_eq!(union.min, Pnt3f::new(-1.0, -2.0, 0.0));
        assert_eq!(union.max, Pnt3f::new(4.0, 5.0, 3.0));
    }

    #[test]
    fn light_is_clamped() {
        assert_eq!(light_color(255), vec4(1.0, 1.0, 1.0, 1.0));
        assert_eq!(light_color(300), vec4(1.0, 1.0, 1.0, 1.0));
        assert_eq!(light_color(-4), vec4(0.0, 0.0, 0.0, 1.0));
    }
}
