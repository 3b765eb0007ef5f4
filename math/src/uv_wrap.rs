//! Integer texture-coordinate crossings along an edge.
//!
//! A texture tiled once per UV unit repeats at every integer coordinate. An edge whose UVs span
//! several units has to be split at those integers before its triangle can be mapped into a
//! non-repeating atlas region; these functions find where.

use super::Pnt3f;
use num_traits::Float;

/// The integer boundaries crossed between two texture coordinates, in increasing order.
///
/// Empty when both ends already lie in `[0, 1]`. A boundary at 0 is only produced when the
/// smaller end is not itself 0, and no boundary is produced for `i` in `[-1, 0)`, so -1 is only
/// emitted when the smaller end lies below it.
pub fn wrap_boundaries(a: f32, b: f32) -> Vec<f32> {
    let (mut min, mut max) = if a <= b { (a, b) } else { (b, a) };
    if min >= 0.0 && max <= 1.0 {
        return Vec::new();
    }

    if min > 0.0 && max > 1.0 {
        min = min.ceil();
    }
    if min == 0.0 {
        min = 1.0;
    }
    max = if max < 0.0 { max.floor() } else { max.ceil() };

    let mut boundaries = Vec::new();
    let mut i = min;
    while i < max {
        if i >= 0.0 {
            boundaries.push(i.floor());
        } else if i < -1.0 {
            boundaries.push(i.ceil());
        }
        i += 1.0;
    }
    boundaries
}

/// Where `value` falls between `from` and `to`, as a fraction of the distance.
pub fn inverse_lerp<T: Float>(value: T, from: T, to: T) -> T {
    let span = to - from;
    if span == T::zero() {
        T::zero()
    } else {
        (value - from) / span
    }
}

/// The edge parameter `t` in `[0, 1]` of every wrap boundary between `a` and `b`, ordered from
/// `a` towards `b`.
pub fn split_parameters(a: f32, b: f32) -> Vec<f32> {
    let mut parameters: Vec<f32> = wrap_boundaries(a, b)
        .into_iter()
        .map(|boundary| inverse_lerp(boundary, a, b))
        .filter(|&t| t > 0.0 && t < 1.0)
        .collect();
    if a > b {
        parameters.reverse();
    }
    parameters
}

/// One split position per wrap boundary of an edge given as `(position, uv)` at both ends.
pub fn clip_positions(a: (Pnt3f, f32), b: (Pnt3f, f32)) -> Vec<Pnt3f> {
    let ((start, start_uv), (end, end_uv)) = (a, b);
    wrap_boundaries(start_uv, end_uv)
        .into_iter()
        .map(|boundary| {
            let t = inverse_lerp(boundary, start_uv, end_uv);
            start + (end - start) * t
        })
        .collect()
}
