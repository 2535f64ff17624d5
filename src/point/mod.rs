//! Points to be clustered.
//!
//! The original design had a deep inheritance tree of point classes; here a
//! single dense `Point` struct carries the clustering engine, and the
//! `PointData` trait lets sparse and lazily-materialized variants present the
//! same contract at the seams (see `sparse` and `hyper`).

use std::cmp::{max, Ordering};
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

pub mod sparse;
pub mod hyper;

/// Source of unique point ids for a run.
static NEXT_POINT_ID : AtomicUsize = AtomicUsize::new(0);

/// Claim the next auto-generated point id.
pub fn next_point_id() -> usize {
    NEXT_POINT_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Restart the id sequence at zero.
///
/// Ids are only required to be unique within a run, so call this between runs
/// (and in tests) before ingesting a fresh point set.
pub fn reset_point_ids() {
    NEXT_POINT_ID.store(0, AtomicOrdering::Relaxed);
}

/// Read-only contract shared by all point representations.
///
/// Equality of points is by id alone; distances ignore the id.
pub trait PointData {
    /// Unique (within a run) identifier for the point.
    fn get_id(&self) -> usize;

    /// Number of dimensions.
    fn dimensions(&self) -> usize;

    /// Coordinate value for the given zero-based dimension.
    fn coordinate(&self, dimension : usize) -> u32;

    /// Lazy, finite, restartable sequence of all coordinates in dimension order.
    fn iter_coordinates<'a>(&'a self) -> Box<dyn Iterator<Item = u32> + 'a>;

    /// Sum of the squares of all coordinates.
    fn square_magnitude(&self) -> u64;

    /// Largest coordinate value.
    fn max_coordinate(&self) -> u32;
}

/// Square of the Euclidean distance between any two point representations.
///
/// This is the reference implementation of the distance contract; `Point`
/// overrides it with a faster kernel but must agree with it exactly.
pub fn square_distance_by_iteration<A : PointData + ?Sized, B : PointData + ?Sized>(a : &A, b : &B) -> u64 {
    let mut sum = 0_u64;
    for (x, y) in a.iter_coordinates().zip(b.iter_coordinates()) {
        let delta = x as i64 - y as i64;
        sum += (delta * delta) as u64;
    }
    sum
}

/// An immutable point in D-dimensional space with non-negative integer coordinates.
///
/// The square magnitude and largest coordinate are computed once at construction
/// and cached; the distance short-circuit in `is_square_distance_within` depends
/// on them being consistent with the coordinates, so the coordinates are never
/// exposed mutably.
#[derive(Clone)]
pub struct Point {
    /// Unique id, assigned from an atomic counter unless supplied by the caller.
    id : usize,

    /// Coordinates of the point.
    coordinates : Vec<u32>,

    /// Σ xᵢ², cached for distance short-circuits.
    square_magnitude : u64,

    /// √(Σ xᵢ²), cached for the lower-bound distance test.
    magnitude : f64,

    /// max xᵢ, cached for choosing the distance accumulation strategy
    /// and the Hilbert bit-depth.
    max_coordinate : u32
}

impl Point {
    /// Create a Point with an auto-generated id.
    pub fn new(coordinates : &[u32]) -> Self {
        Self::with_id(next_point_id(), coordinates)
    }

    /// Create a Point with the given id, which must be unique within the run.
    pub fn with_id(id : usize, coordinates : &[u32]) -> Self {
        let mut square_magnitude = 0_u64;
        let mut max_coordinate = 0_u32;
        for &x in coordinates {
            square_magnitude += (x as u64) * (x as u64);
            max_coordinate = max(max_coordinate, x);
        }
        Point {
            id,
            coordinates : coordinates.to_vec(),
            square_magnitude,
            magnitude : (square_magnitude as f64).sqrt(),
            max_coordinate
        }
    }

    /// Borrow the coordinate array.
    pub fn coordinates(&self) -> &[u32] { &self.coordinates }

    /// Square of the Euclidean distance to another Point.
    ///
    /// When the coordinate ranges of both points are modest, this uses the
    /// dot-product form `‖p−q‖² = |p|²+|q|²−2·(p·q)` with a four-way unrolled
    /// loop, exploiting the cached square magnitudes. Otherwise it falls back
    /// to accumulating squared differences, whose terms cannot overflow for
    /// 32-bit coordinates.
    pub fn square_distance(&self, other : &Self) -> u64 {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        // Unrolled by four; safe so long as each product of coordinates stays within 32 bits.
        if (self.max_coordinate as u64) * (other.max_coordinate as u64) * 4 <= u32::max_value() as u64 {
            self.square_magnitude + other.square_magnitude - 2 * self.dot_product(other)
        }
        else {
            square_distance_by_iteration(self, other)
        }
    }

    /// Dot product of the two coordinate vectors, unrolled by four.
    fn dot_product(&self, other : &Self) -> u64 {
        let a = &self.coordinates;
        let b = &other.coordinates;
        let n = a.len();
        let whole = n - n % 4;
        let mut sum = 0_u64;
        let mut i = 0;
        while i < whole {
            let s = a[i] as u64 * b[i] as u64
                  + a[i + 1] as u64 * b[i + 1] as u64
                  + a[i + 2] as u64 * b[i + 2] as u64
                  + a[i + 3] as u64 * b[i + 3] as u64;
            sum += s;
            i += 4;
        }
        while i < n {
            sum += a[i] as u64 * b[i] as u64;
            i += 1;
        }
        sum
    }

    /// Decide whether the square distance to `other` is within `square_limit`,
    /// short-circuiting with the cached magnitudes where possible:
    ///
    /// ```text
    ///    (|p|−|q|)² ≤ ‖p−q‖² ≤ |p|²+|q|²
    /// ```
    ///
    /// The upper bound holds because all coordinates are non-negative, so the
    /// dot product cannot be negative. On clustered data the bounds decide a
    /// quarter to two-fifths of comparisons without touching the coordinates.
    pub fn is_square_distance_within(&self, other : &Self, square_limit : u64) -> bool {
        let sum_of_squares = self.square_magnitude as u128 + other.square_magnitude as u128;
        // Upper bound: already near without looking at a single coordinate.
        if sum_of_squares <= square_limit as u128 { return true; }

        // Lower bound (|p|−|q|)², evaluated with a conservative error margin so
        // floating-point rounding can only cause a fall-through, never a wrong verdict.
        let difference = self.magnitude - other.magnitude;
        let margin = (self.magnitude + other.magnitude) * 1e-12;
        let safe_difference = difference.abs() - margin;
        if safe_difference > 0.0 && safe_difference * safe_difference > square_limit as f64 {
            return false;
        }
        self.square_distance(other) <= square_limit
    }
}

impl PointData for Point {
    fn get_id(&self) -> usize { self.id }
    fn dimensions(&self) -> usize { self.coordinates.len() }
    fn coordinate(&self, dimension : usize) -> u32 { self.coordinates[dimension] }
    fn iter_coordinates<'a>(&'a self) -> Box<dyn Iterator<Item = u32> + 'a> {
        Box::new(self.coordinates.iter().copied())
    }
    fn square_magnitude(&self) -> u64 { self.square_magnitude }
    fn max_coordinate(&self) -> u32 { self.max_coordinate }
}

impl PartialEq for Point {
    fn eq(&self, other : &Self) -> bool { self.id == other.id }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H : Hasher>(&self, state : &mut H) { self.id.hash(state); }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other : &Self) -> Option<Ordering> { Some(self.id.cmp(&other.id)) }
}

impl Ord for Point {
    fn cmp(&self, other : &Self) -> Ordering { self.id.cmp(&other.id) }
}

impl Debug for Point {
    fn fmt(&self, f : &mut Formatter) -> std::fmt::Result {
        if self.coordinates.len() <= 10 {
            write!(f, "Point {} {:?}", self.id, self.coordinates)
        }
        else {
            write!(f, "Point {} [{} dimensions, max {}]", self.id, self.coordinates.len(), self.max_coordinate)
        }
    }
}
