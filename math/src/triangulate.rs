//! Triangulation of simple polygons and of small 3D point sets.
//!
//! 2D polygons are first put in counter-clockwise order by sorting their vertices around the
//! centroid, then ear clipped. 3D point sets lying in an axis-aligned plane go through the same
//! 2D path; anything else is treated as the vertices of a convex solid and meshed with its hull.

use super::errors::{ErrorKind, Result};
use super::hull::ConvexHull;
use super::{Pnt2f, Pnt3f};
use cgmath::prelude::*;
use std::cmp::Ordering;

/// Absolute tolerance for deciding that points share an axis coordinate.
pub const AXIS_PLANE_EPSILON: f32 = 1e-10;

/// Sorts `points` counter-clockwise by angle around their centroid.
pub fn sort_ccw(points: &mut [Pnt2f]) {
    let order = ccw_order(points);
    let sorted: Vec<Pnt2f> = order.iter().map(|&i| points[i]).collect();
    points.copy_from_slice(&sorted);
}

/// Indices into `points` in counter-clockwise order around their centroid. Coincident points
/// keep their relative order.
pub fn ccw_order(points: &[Pnt2f]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    if points.is_empty() {
        return order;
    }
    let center = Pnt2f::centroid(points);
    let angle = |i: usize| (points[i].y - center.y).atan2(points[i].x - center.x);
    order.sort_by(|&a, &b| angle(a).partial_cmp(&angle(b)).unwrap_or(Ordering::Equal));
    order
}

/// Twice the signed area of a triangle; positive for counter-clockwise winding.
pub fn signed_area2(a: Pnt2f, b: Pnt2f, c: Pnt2f) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Ear clips a polygon already in counter-clockwise order.
fn ear_clip(ordered: &[Pnt2f]) -> Result<Vec<u32>> {
    if ordered.len() < 3 {
        return Ok(Vec::new());
    }
    if ordered.len() == 3 {
        return Ok(vec![0, 1, 2]);
    }

    let mut coords = Vec::with_capacity(ordered.len() * 2);
    for point in ordered {
        coords.push(f64::from(point.x));
        coords.push(f64::from(point.y));
    }
    let raw = earcutr::earcut(&coords, &[], 2)
        .map_err(|error| ErrorKind::ear_clipping(ordered.len(), error))?;

    let mut indices = Vec::with_capacity(raw.len());
    for triangle in raw.chunks(3) {
        if let [a, b, c] = *triangle {
            if signed_area2(ordered[a], ordered[b], ordered[c]) < 0.0 {
                indices.extend_from_slice(&[a as u32, c as u32, b as u32]);
            } else {
                indices.extend_from_slice(&[a as u32, b as u32, c as u32]);
            }
        }
    }
    Ok(indices)
}

/// Reorders the polygon and returns it together with a triangle index list into the reordered
/// vertices. Every emitted triangle winds counter-clockwise.
pub fn triangulate_indices(points: &[Pnt2f]) -> Result<(Vec<Pnt2f>, Vec<u32>)> {
    let ordered: Vec<Pnt2f> = ccw_order(points).into_iter().map(|i| points[i]).collect();
    let indices = ear_clip(&ordered)?;
    Ok((ordered, indices))
}

/// Like `triangulate_indices`, but the triangles index `points` as given.
pub fn triangulate_unordered(points: &[Pnt2f]) -> Result<Vec<u32>> {
    let order = ccw_order(points);
    let ordered: Vec<Pnt2f> = order.iter().map(|&i| points[i]).collect();
    Ok(ear_clip(&ordered)?
        .into_iter()
        .map(|index| order[index as usize] as u32)
        .collect())
}

/// Like `triangulate_indices`, but returns three vertices per triangle.
pub fn triangulate_vertices(points: &[Pnt2f]) -> Result<Vec<Pnt2f>> {
    let (ordered, indices) = triangulate_indices(points)?;
    Ok(indices
        .into_iter()
        .map(|index| ordered[index as usize])
        .collect())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn get(self, point: Pnt3f) -> f32 {
        match self {
            Axis::X => point.x,
            Axis::Y => point.y,
            Axis::Z => point.z,
        }
    }

    fn project(self, point: Pnt3f) -> Pnt2f {
        match self {
            Axis::X => Pnt2f::new(point.y, point.z),
            Axis::Y => Pnt2f::new(point.x, point.z),
            Axis::Z => Pnt2f::new(point.x, point.y),
        }
    }

    fn unproject(self, point: Pnt2f, value: f32) -> Pnt3f {
        match self {
            Axis::X => Pnt3f::new(value, point.x, point.y),
            Axis::Y => Pnt3f::new(point.x, value, point.y),
            Axis::Z => Pnt3f::new(point.x, point.y, value),
        }
    }
}

/// Returns the axis along which all `points` share a coordinate, and that coordinate.
fn shared_axis(points: &[Pnt3f]) -> Option<(Axis, f32)> {
    let first = *points.first()?;
    [Axis::X, Axis::Y, Axis::Z]
        .iter()
        .cloned()
        .find(|&axis| {
            points
                .iter()
                .all(|&point| (axis.get(point) - axis.get(first)).abs() <= AXIS_PLANE_EPSILON)
        })
        .map(|axis| (axis, axis.get(first)))
}

/// Triangulates a 3D point set into three vertices per triangle.
pub fn triangulate_3d_vertices(points: &[Pnt3f]) -> Result<Vec<Pnt3f>> {
    if let Some((axis, value)) = shared_axis(points) {
        let projected: Vec<Pnt2f> = points.iter().map(|&point| axis.project(point)).collect();
        return Ok(triangulate_vertices(&projected)?
            .into_iter()
            .map(|point| axis.unproject(point, value))
            .collect());
    }
    Ok(ConvexHull::new(points)?.triangle_vertices())
}

/// Triangulates a 3D point set into a vertex list and a triangle index list.
///
/// In the axis-plane case the vertices are the input reordered; in the hull case they are the
/// distinct input points, in first-occurrence order.
pub fn triangulate_3d_indices(points: &[Pnt3f]) -> Result<(Vec<Pnt3f>, Vec<u32>)> {
    if let Some((axis, value)) = shared_axis(points) {
        let projected: Vec<Pnt2f> = points.iter().map(|&point| axis.project(point)).collect();
        let (ordered, indices) = triangulate_indices(&projected)?;
        let vertices = ordered
            .into_iter()
            .map(|point| axis.unproject(point, value))
            .collect();
        return Ok((vertices, indices));
    }
    let hull = ConvexHull::new(points)?;
    Ok((hull.points().to_vec(), hull.triangle_indices()))
}
