//! Restitching of meshes whose texture coordinates repeat.
//!
//! Wall and flat UVs are in texture tiles: `[0, 1]` covers the image once and anything outside
//! repeats it. Atlas sprites cannot repeat, so every triangle is cut along the integer `u` and
//! `v` lines it crosses and each piece gets coordinates local to its own tile.

use super::geometry::{Mesh, Vertex};
use log::warn;
use math::triangulate::{signed_area2, triangulate_unordered};
use math::uv_wrap::inverse_lerp;
use math::Pnt2f;

const EPSILON: f32 = 1e-5;

/// Splits every triangle into pieces that each cover a single tile, with UVs in `[0, 1]`.
pub fn restitch(mesh: &Mesh) -> Mesh {
    let mut output = Mesh::new();
    for triangle in mesh.triangles() {
        let winding = signed_area2(triangle[0].uv, triangle[1].uv, triangle[2].uv);
        if winding.abs() <= EPSILON * EPSILON {
            // No area in texture space: the whole triangle samples one line of texels.
            emit_piece(&mut output, &triangle, winding);
            continue;
        }
        let mut pieces = vec![triangle.to_vec()];
        for axis in 0..2 {
            pieces = pieces
                .into_iter()
                .flat_map(|piece| split_along(piece, axis))
                .collect();
        }
        for piece in &pieces {
            emit_piece(&mut output, piece, winding);
        }
    }
    output
}

/// Rescales UVs so the mesh spans the unit square exactly once.
pub fn normalize(mesh: &Mesh) -> Mesh {
    let mut min = Pnt2f::new(std::f32::INFINITY, std::f32::INFINITY);
    let mut max = Pnt2f::new(std::f32::NEG_INFINITY, std::f32::NEG_INFINITY);
    for vertex in &mesh.vertices {
        min = Pnt2f::new(min.x.min(vertex.uv.x), min.y.min(vertex.uv.y));
        max = Pnt2f::new(max.x.max(vertex.uv.x), max.y.max(vertex.uv.y));
    }
    let scale = |value: f32, low: f32, high: f32| {
        if high - low > EPSILON {
            (value - low) / (high - low)
        } else {
            0.0
        }
    };
    Mesh {
        vertices: mesh
            .vertices
            .iter()
            .map(|vertex| Vertex {
                uv: Pnt2f::new(
                    scale(vertex.uv.x, min.x, max.x),
                    scale(vertex.uv.y, min.y, max.y),
                ),
                ..*vertex
            })
            .collect(),
        indices: mesh.indices.clone(),
    }
}

/// Cuts a convex polygon at every integer line strictly inside its range along `axis`.
fn split_along(polygon: Vec<Vertex>, axis: usize) -> Vec<Vec<Vertex>> {
    let (low, high) = polygon
        .iter()
        .fold((std::f32::INFINITY, std::f32::NEG_INFINITY), |(low, high), vertex| {
            (low.min(vertex.uv[axis]), high.max(vertex.uv[axis]))
        });

    let mut pieces = Vec::new();
    let mut rest = polygon;
    let mut line = low.floor() + 1.0;
    while line < high - EPSILON {
        if line > low + EPSILON {
            let (below, above) = cut(&rest, axis, line);
            if below.len() >= 3 {
                pieces.push(below);
            }
            rest = above;
        }
        line += 1.0;
    }
    if rest.len() >= 3 {
        pieces.push(rest);
    }
    pieces
}

/// Sutherland-Hodgman against `uv[axis] = line`, keeping both halves.
fn cut(polygon: &[Vertex], axis: usize, line: f32) -> (Vec<Vertex>, Vec<Vertex>) {
    let mut below = Vec::with_capacity(polygon.len() + 1);
    let mut above = Vec::with_capacity(polygon.len() + 1);
    for (i, &a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        let (da, db) = (a.uv[axis] - line, b.uv[axis] - line);
        if da <= 0.0 {
            below.push(a);
        }
        if da >= 0.0 {
            above.push(a);
        }
        if (da < 0.0 && db > 0.0) || (da > 0.0 && db < 0.0) {
            let t = inverse_lerp(line, a.uv[axis], b.uv[axis]);
            let mut crossing = lerp(&a, &b, t);
            crossing.uv[axis] = line;
            below.push(crossing);
            above.push(crossing);
        }
    }
    (below, above)
}

fn lerp(a: &Vertex, b: &Vertex, t: f32) -> Vertex {
    Vertex {
        position: a.position + (b.position - a.position) * t,
        uv: a.uv + (b.uv - a.uv) * t,
        color: a.color + (b.color - a.color) * t,
    }
}

/// Appends a convex piece with tile-local UVs, wound like the source triangle.
fn emit_piece(output: &mut Mesh, piece: &[Vertex], winding: f32) {
    let count = piece.len() as f32;
    let center = piece.iter().fold(Pnt2f::new(0.0, 0.0), |sum, vertex| {
        Pnt2f::new(sum.x + vertex.uv.x / count, sum.y + vertex.uv.y / count)
    });
    let tile = Pnt2f::new(center.x.floor(), center.y.floor());
    let local: Vec<Vertex> = piece
        .iter()
        .map(|vertex| Vertex {
            uv: Pnt2f::new(
                (vertex.uv.x - tile.x).max(0.0).min(1.0),
                (vertex.uv.y - tile.y).max(0.0).min(1.0),
            ),
            ..*vertex
        })
        .collect();

    let base = output.vertices.len() as u32;
    let triangles = if local.len() > 3 {
        triangulate_piece(&local)
    } else {
        vec![[0, 1, 2]]
    };
    for [a, b, c] in triangles {
        let area = signed_area2(local[a].uv, local[b].uv, local[c].uv);
        let (b, c) = if (area < 0.0) != (winding < 0.0) {
            (c, b)
        } else {
            (b, c)
        };
        output
            .indices
            .extend_from_slice(&[base + a as u32, base + b as u32, base + c as u32]);
    }
    output.vertices.extend(local);
}

/// Ear clips a piece in texture space, falling back to a fan if that fails.
fn triangulate_piece(piece: &[Vertex]) -> Vec<[usize; 3]> {
    let uvs: Vec<Pnt2f> = piece.iter().map(|vertex| vertex.uv).collect();
    let fan: Vec<[usize; 3]> = (1..piece.len() - 1).map(|j| [0, j, j + 1]).collect();
    let indices = match triangulate_unordered(&uvs) {
        Ok(indices) => indices,
        Err(error) => {
            warn!("Falling back to a fan for a {}-gon: {}", piece.len(), error);
            return fan;
        }
    };
    let triangles: Vec<[usize; 3]> = indices
        .chunks(3)
        .filter_map(|triangle| match *triangle {
            [a, b, c] => Some([a as usize, b as usize, c as usize]),
            _ => None,
        })
        .collect();

    // Coincident corners may be dropped, but the triangles must still cover the piece.
    let area = |triangles: &[[usize; 3]]| -> f32 {
        triangles
            .iter()
            .map(|&[a, b, c]| signed_area2(uvs[a], uvs[b], uvs[c]).abs())
            .sum()
    };
    let expected = area(&fan);
    if !triangles.is_empty() && (area(&triangles) - expected).abs() <= EPSILON * expected.max(1.0) {
        triangles
    } else {
        fan
    }
}
