//! Collision detection.
//!
//! Every collision in the game (head vs segment, head vs power-up) uses the
//! same coarse axis-aligned proximity box, not a circle.

use glam::DVec2;

/// Whether `a` and `b` are closer than `size` on both axes.
///
/// Distances are taken in plain plane coordinates; the box does not wrap
/// across world edges.
#[inline]
pub fn within_box(a: DVec2, b: DVec2, size: f64) -> bool {
    (a.x - b.x).abs() < size && (a.y - b.y).abs() < size
}

/// Index of the first point in `points` inside the proximity box of `head`.
#[inline]
pub fn first_hit<'a, I>(head: DVec2, points: I, size: f64) -> Option<usize>
where
    I: IntoIterator<Item = &'a DVec2>,
{
    points.into_iter().position(|p| within_box(head, *p, size))
}
