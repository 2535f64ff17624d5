//! Approximate closest pair of points across two cluster colors.
//!
//! Both clusters are laid out on one Hilbert curve; a cross-color pair that is
//! close in space is then usually close on the curve as well, so scanning each
//! point against the next few points of the other color bounds the work while
//! finding the true pair or one barely worse.

use crate::point::Point;
use crate::hilbert::CurveMap;
use crate::hilbert::sort::balanced_sort;
use super::classifier::PointClustering;

/// Result of a closest-pair query: one member of each color and their square distance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClosestPair {
    pub first : usize,
    pub second : usize,
    pub square_distance : u64
}

/// How far ahead along the merged curve each point looks for partners of the
/// other color.
const SCAN_WINDOW : usize = 8;

/// Approximate the closest pair between the members of two categories.
///
/// Returns None when either category is missing or empty.
pub fn poly_chromatic_closest_pair(points : &[Point], clustering : &PointClustering,
                                   color_a : usize, color_b : usize, map : &CurveMap) -> Option<ClosestPair> {
    let members_a = clustering.get_cluster(&color_a)?.get_members_sorted();
    let members_b = clustering.get_cluster(&color_b)?.get_members_sorted();
    if members_a.is_empty() || members_b.is_empty() || color_a == color_b { return None; }

    // Gather both colors and sort them together along the curve.
    let mut combined : Vec<(usize, bool)> = Vec::with_capacity(members_a.len() + members_b.len());
    combined.extend(members_a.iter().map(|&m| (m, true)));
    combined.extend(members_b.iter().map(|&m| (m, false)));
    let combined_points : Vec<Point> = combined.iter().map(|&(m, _)| points[m].clone()).collect();
    let order = balanced_sort(&combined_points, map).order;

    let mut best : Option<ClosestPair> = None;
    for (position, &slot) in order.iter().enumerate() {
        let (member, is_a) = combined[slot];
        for ahead in order.iter().skip(position + 1).take(SCAN_WINDOW) {
            let (other, other_is_a) = combined[*ahead];
            if is_a == other_is_a { continue; }
            let square_distance = points[member].square_distance(&points[other]);
            let (first, second) = if is_a { (member, other) } else { (other, member) };
            let candidate = ClosestPair { first, second, square_distance };
            if best.map_or(true, |b| candidate.square_distance < b.square_distance) {
                best = Some(candidate);
            }
        }
    }
    best
}
