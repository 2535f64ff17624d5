//! The Hilbert curve machinery: an invertible map between D-dimensional
//! integer points and positions along a space-filling curve, plus the
//! supporting pieces that make the curve useful for clustering — axis
//! permutations, coordinate balancing, and a progressive sort that never
//! materializes the full (D·B)-bit curve index.

pub mod transform;
pub mod permutation;
pub mod balancer;
pub mod sort;

use crate::point::{Point, PointData};
use self::balancer::PointBalancer;
use self::permutation::Permutation;
use self::transform::{axes_to_transpose, interleave};
use num_bigint::BigUint;

/// Everything needed to place a point on one particular Hilbert curve:
/// an axis permutation, an optional balancer that recenters each dimension,
/// and the bit-depth of the curve.
///
/// The curve coordinates produced here feed ONLY the Hilbert transform.
/// Distances are always measured on the stored, untransformed coordinates;
/// the balancer's shift is monotonic per dimension, so it changes the curve
/// ordering without changing which points are close to one another.
#[derive(Clone, Debug)]
pub struct CurveMap {
    permutation : Permutation,
    balancer : Option<PointBalancer>,
    bits_per_dimension : usize
}

impl CurveMap {
    /// A curve over the raw coordinates with no permutation and no balancing.
    pub fn plain(dimensions : usize, bits_per_dimension : usize) -> Self {
        CurveMap {
            permutation : Permutation::identity(dimensions),
            balancer : None,
            bits_per_dimension
        }
    }

    /// A curve with the given permutation and optional balancer.
    pub fn new(permutation : Permutation, balancer : Option<PointBalancer>, bits_per_dimension : usize) -> Self {
        CurveMap { permutation, balancer, bits_per_dimension }
    }

    pub fn bits_per_dimension(&self) -> usize { self.bits_per_dimension }

    pub fn permutation(&self) -> &Permutation { &self.permutation }

    /// Coordinates fed to the Hilbert transform: permuted, balanced, and
    /// clamped to the curve's B-bit range.
    pub fn curve_coordinates(&self, point : &Point) -> Vec<u32> {
        let mut coordinates = Vec::with_capacity(point.dimensions());
        for position in 0..point.dimensions() {
            let dimension = self.permutation.source_of(position);
            let raw = point.coordinate(dimension);
            let balanced = match &self.balancer {
                Some(balancer) => balancer.balance_coordinate(dimension, raw, self.bits_per_dimension),
                None => raw
            };
            coordinates.push(balanced);
        }
        coordinates
    }

    /// The point's curve index in transposed form: one B-bit lane per dimension.
    pub fn lanes(&self, point : &Point) -> Vec<u32> {
        axes_to_transpose(&self.curve_coordinates(point), self.bits_per_dimension)
    }

    /// The point's curve index as a single (D·B)-bit integer.
    ///
    /// The clustering pipeline never calls this in bulk; it exists for
    /// spot checks and tests. Bulk ordering goes through `sort`.
    pub fn index(&self, point : &Point) -> BigUint {
        interleave(&self.lanes(point), self.bits_per_dimension)
    }
}
