use super::errors::{ErrorKind, Result};
use super::Pnt3f;
use cgmath::prelude::*;
use cgmath::{Point3, Vector3};
use failchain::{bail, ensure};
use std::collections::HashSet;

const HULL_EPSILON: f64 = 1e-9;

type Pnt3d = Point3<f64>;
type Vec3d = Vector3<f64>;
type Face = [usize; 3];

/// The convex hull of a 3D point set, as outward-facing triangles.
///
/// Coincident input points are merged: faces index into `points()`, which holds the first
/// occurrence of every distinct point, in input order.
#[derive(Clone, Debug)]
pub struct ConvexHull {
    points: Vec<Pnt3f>,
    faces: Vec<Face>,
}

impl ConvexHull {
    pub fn new(input: &[Pnt3f]) -> Result<ConvexHull> {
        let points = dedup_points(input);
        ensure!(
            points.len() >= 4,
            ErrorKind::too_few_hull_points(points.len())
        );
        let wide: Vec<Pnt3d> = points.iter().map(|&point| widen(point)).collect();

        let mut faces = initial_tetrahedron(&wide)?;
        let mut visible_edges = HashSet::new();
        let mut horizon = Vec::new();
        for (i_point, &point) in wide.iter().enumerate() {
            if faces.iter().any(|face| face.contains(&i_point)) {
                continue;
            }

            visible_edges.clear();
            for face in faces.iter().filter(|face| is_visible(&wide, face, point)) {
                visible_edges.extend(face_edges(face).iter().cloned());
            }
            if visible_edges.is_empty() {
                // Inside (or on) the current hull.
                continue;
            }

            // Edges of visible faces whose twin belongs to a hidden face form the horizon; they
            // keep the winding of the visible face they came from.
            horizon.clear();
            for face in faces.iter().filter(|face| is_visible(&wide, face, point)) {
                for &(start, end) in &face_edges(face) {
                    if !visible_edges.contains(&(end, start)) {
                        horizon.push((start, end));
                    }
                }
            }

            faces.retain(|face| !is_visible(&wide, face, point));
            faces.extend(horizon.iter().map(|&(start, end)| [start, end, i_point]));
        }

        Ok(ConvexHull { points, faces })
    }

    pub fn points(&self) -> &[Pnt3f] {
        &self.points
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Three vertices per face, outward winding.
    pub fn triangle_vertices(&self) -> Vec<Pnt3f> {
        self.faces
            .iter()
            .flat_map(|face| face.iter().map(move |&index| self.points[index]))
            .collect()
    }

    /// Three indices into `points()` per face, outward winding.
    pub fn triangle_indices(&self) -> Vec<u32> {
        self.faces
            .iter()
            .flat_map(|face| face.iter().map(|&index| index as u32))
            .collect()
    }
}

fn widen(point: Pnt3f) -> Pnt3d {
    Pnt3d::new(f64::from(point.x), f64::from(point.y), f64::from(point.z))
}

fn dedup_points(input: &[Pnt3f]) -> Vec<Pnt3f> {
    let mut points: Vec<Pnt3f> = Vec::with_capacity(input.len());
    for &point in input {
        let wide = widen(point);
        let seen = points
            .iter()
            .any(|&other| widen(other).distance2(wide) <= HULL_EPSILON * HULL_EPSILON);
        if !seen {
            points.push(point);
        }
    }
    points
}

fn face_normal(points: &[Pnt3d], face: &Face) -> Vec3d {
    let [a, b, c] = *face;
    (points[b] - points[a]).cross(points[c] - points[a])
}

fn signed_distance(points: &[Pnt3d], face: &Face, point: Pnt3d) -> f64 {
    let normal = face_normal(points, face);
    let length = normal.magnitude();
    if length <= 0.0 {
        return 0.0;
    }
    normal.dot(point - points[face[0]]) / length
}

fn is_visible(points: &[Pnt3d], face: &Face, point: Pnt3d) -> bool {
    signed_distance(points, face, point) > HULL_EPSILON
}

fn face_edges(face: &Face) -> [(usize, usize); 3] {
    [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])]
}

fn farthest_by<F: Fn(Pnt3d) -> f64>(points: &[Pnt3d], measure: F) -> (usize, f64) {
    points
        .iter()
        .enumerate()
        .map(|(index, &point)| (index, measure(point)))
        .fold((0, -1.0), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        })
}

fn initial_tetrahedron(points: &[Pnt3d]) -> Result<Vec<Face>> {
    let i0 = 0;
    let p0 = points[i0];

    let (i1, spread) = farthest_by(points, |point| point.distance(p0));
    if spread <= HULL_EPSILON {
        bail!(ErrorKind::degenerate_hull("coincident"));
    }
    let direction = (points[i1] - p0).normalize();

    let (i2, offset) = farthest_by(points, |point| (point - p0).cross(direction).magnitude());
    if offset <= HULL_EPSILON {
        bail!(ErrorKind::degenerate_hull("collinear"));
    }
    let base = [i0, i1, i2];

    let (i3, height) = farthest_by(points, |point| {
        signed_distance(points, &base, point).abs()
    });
    if height <= HULL_EPSILON {
        bail!(ErrorKind::degenerate_hull("coplanar"));
    }

    let centroid = Pnt3d::centroid(&[p0, points[i1], points[i2], points[i3]]);
    let mut faces = vec![[i0, i1, i2], [i0, i2, i3], [i0, i3, i1], [i1, i3, i2]];
    for face in &mut faces {
        if signed_distance(points, face, centroid) > 0.0 {
            face.swap(1, 2);
        }
    }
    Ok(faces)
}

#[cfg(test)]
mod test {
    use super::ConvexHull;
    use crate::Pnt3f;
    use cgmath::prelude::*;

    fn corner_cube() -> Vec<Pnt3f> {
        vec![
            Pnt3f::new(0.0, 0.0, 0.0),
            Pnt3f::new(1.0, 0.0, 0.0),
            Pnt3f::new(1.0, 1.0, 0.0),
            Pnt3f::new(0.0, 1.0, 0.0),
            Pnt3f::new(0.0, 0.0, 1.0),
            Pnt3f::new(1.0, 0.0, 1.0),
            Pnt3f::new(0.0, 1.0, 1.0),
            Pnt3f::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn cube_with_missing_corner() {
        let hull = ConvexHull::new(&corner_cube()).unwrap();
        assert_eq!(hull.points().len(), 7);
        assert_eq!(hull.num_faces(), 10);
        assert_eq!(hull.triangle_vertices().len(), 30);
        assert_eq!(hull.triangle_indices().len(), 30);
    }

    #[test]
    fn faces_point_outwards() {
        let hull = ConvexHull::new(&corner_cube()).unwrap();
        let centroid = Pnt3f::centroid(hull.points());
        for face in hull.faces() {
            let [a, b, c] = *face;
            let (a, b, c) = (hull.points()[a], hull.points()[b], hull.points()[c]);
            let normal = (b - a).cross(c - a);
            let face_center = Pnt3f::centroid(&[a, b, c]);
            assert!(normal.dot(face_center - centroid) > 0.0);
        }
    }

    #[test]
    fn every_point_on_hull_used() {
        let hull = ConvexHull::new(&corner_cube()).unwrap();
        for index in 0..hull.points().len() {
            assert!(hull.faces().iter().any(|face| face.contains(&index)));
        }
    }

    #[test]
    fn interior_points_are_ignored() {
        let mut points = vec![
            Pnt3f::new(0.0, 0.0, 0.0),
            Pnt3f::new(2.0, 0.0, 0.0),
            Pnt3f::new(0.0, 2.0, 0.0),
            Pnt3f::new(0.0, 0.0, 2.0),
        ];
        points.push(Pnt3f::new(0.25, 0.25, 0.25));
        let hull = ConvexHull::new(&points).unwrap();
        assert_eq!(hull.num_faces(), 4);
        assert!(hull.faces().iter().all(|face| !face.contains(&4)));
    }

    #[test]
    fn degenerate_inputs_fail() {
        assert!(ConvexHull::new(&[Pnt3f::new(0.0, 0.0, 0.0); 5]).is_err());
        let flat = [
            Pnt3f::new(0.0, 0.0, 0.0),
            Pnt3f::new(1.0, 0.0, 0.0),
            Pnt3f::new(1.0, 1.0, 0.0),
            Pnt3f::new(0.0, 1.0, 0.0),
        ];
        assert!(ConvexHull::new(&flat).is_err());
        let line = [
            Pnt3f::new(0.0, 0.0, 0.0),
            Pnt3f::new(1.0, 1.0, 1.0),
            Pnt3f::new(2.0, 2.0, 2.0),
            Pnt3f::new(3.0, 3.0, 3.0),
        ];
        assert!(ConvexHull::new(&line).is_err());
    }
}
