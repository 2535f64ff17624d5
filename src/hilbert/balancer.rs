//! Coordinate balancing.
//!
//! When a dimension's values huddle far from the middle of the B-bit range,
//! the top bits of its lane are constant and contribute nothing to the curve
//! ordering. The balancer shifts each dimension so its median lands at
//! `2^(B−1)`, making a low-bit prefix of the Hilbert index informative.
//!
//! The shift feeds only the curve; stored coordinates used for distances are
//! never balanced. Keeping the two coordinate streams separate is what makes
//! the shift safe: it is monotonic per dimension, so it rearranges the curve
//! without moving any point relative to its neighbors.

use rand::Rng;
use rand::seq::SliceRandom;
use crate::point::{Point, PointData};

/// Streaming median estimator in the Frugal family.
///
/// Holds one estimate and a step size. Each observation nudges the estimate
/// toward the sample by the current step; consecutive moves in the same
/// direction grow the step linearly, a direction change shrinks it back,
/// and the estimate never overshoots the sample that pulled it.
#[derive(Clone, Debug)]
pub struct FrugalMedian {
    estimate : i64,
    step : i64,
    last_direction : i64
}

impl FrugalMedian {
    /// Start estimating from the first sample seen.
    pub fn new(first_sample : u32) -> Self {
        FrugalMedian { estimate : first_sample as i64, step : 1, last_direction : 0 }
    }

    /// Absorb one sample.
    pub fn observe(&mut self, sample : u32) {
        let sample = sample as i64;
        if sample == self.estimate { return; }
        let direction = if sample > self.estimate { 1 } else { -1 };
        if direction == self.last_direction {
            self.step += 1;
        }
        else {
            self.step = 1;
        }
        let pull = (sample - self.estimate).abs().min(self.step);
        self.estimate += direction * pull;
        self.last_direction = direction;
    }

    /// Current estimate of the median.
    pub fn estimate(&self) -> u32 {
        self.estimate.max(0) as u32
    }
}

/// Per-dimension recentering information for one dataset.
///
/// Created once per dataset and immutable thereafter.
#[derive(Clone, Debug)]
pub struct PointBalancer {
    /// Approximate median of each dimension's coordinate values.
    medians : Vec<u32>
}

impl PointBalancer {
    /// Build from the full point set: exact per-dimension medians.
    pub fn from_all_points(points : &[Point]) -> Self {
        let dimensions = points.first().map_or(0, |p| p.dimensions());
        let mut medians = Vec::with_capacity(dimensions);
        let mut column : Vec<u32> = Vec::with_capacity(points.len());
        for dimension in 0..dimensions {
            column.clear();
            column.extend(points.iter().map(|p| p.coordinate(dimension)));
            column.sort_unstable();
            medians.push(column[column.len() / 2]);
        }
        PointBalancer { medians }
    }

    /// Build from an O(√N) shuffled sample, feeding each dimension's sampled
    /// values through a Frugal streaming estimator.
    pub fn from_sample<R : Rng>(points : &[Point], rng : &mut R) -> Self {
        let dimensions = points.first().map_or(0, |p| p.dimensions());
        let sample_size = ((points.len() as f64).sqrt().ceil() as usize).max(1).min(points.len());
        let mut picks : Vec<usize> = (0..points.len()).collect();
        picks.shuffle(rng);
        picks.truncate(sample_size);

        let mut estimators : Vec<FrugalMedian> = Vec::with_capacity(dimensions);
        for (ordinal, &pick) in picks.iter().enumerate() {
            let point = &points[pick];
            if ordinal == 0 {
                for dimension in 0..dimensions {
                    estimators.push(FrugalMedian::new(point.coordinate(dimension)));
                }
            }
            else {
                for dimension in 0..dimensions {
                    estimators[dimension].observe(point.coordinate(dimension));
                }
            }
        }
        PointBalancer { medians : estimators.iter().map(|e| e.estimate()).collect() }
    }

    /// The approximate median for one dimension.
    pub fn median(&self, dimension : usize) -> u32 { self.medians[dimension] }

    /// Shift one coordinate so the dimension's median maps to `2^(B−1)`,
    /// clamping to the curve's B-bit range.
    #[inline]
    pub fn balance_coordinate(&self, dimension : usize, value : u32, bits_per_dimension : usize) -> u32 {
        let center = 1_i64 << (bits_per_dimension - 1);
        let ceiling = (1_i64 << bits_per_dimension) - 1;
        let shifted = value as i64 + center - self.medians[dimension] as i64;
        shifted.max(0).min(ceiling) as u32
    }

    /// Shift all of a point's coordinates; the result carries the same identity.
    pub fn balance(&self, point : &Point, bits_per_dimension : usize) -> Point {
        let balanced : Vec<u32> = (0..point.dimensions())
            .map(|d| self.balance_coordinate(d, point.coordinate(d), bits_per_dimension))
            .collect();
        Point::with_id(point.get_id(), &balanced)
    }
}

#[cfg(test)]
/// Tests of the balancer and the streaming median.
mod tests {
    #[allow(unused_imports)]
    use spectral::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use crate::point::{Point, PointData};
    use super::{FrugalMedian, PointBalancer};

    #[test]
    fn frugal_median_converges() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut estimator = FrugalMedian::new(rng.gen_range(400..600));
        for _ in 0..5000 {
            estimator.observe(rng.gen_range(0..1000));
        }
        let estimate = estimator.estimate();
        asserting(&format!("estimate {} should be near 500", estimate))
            .that(&(estimate > 300 && estimate < 700)).is_equal_to(true);
    }

    #[test]
    fn exact_balancer_centers_the_median() {
        let points : Vec<Point> = (0..101_u32)
            .map(|i| Point::with_id(i as usize, &[i + 1000, i * 3]))
            .collect();
        let balancer = PointBalancer::from_all_points(&points);
        assert_eq!(balancer.median(0), 1050);
        assert_eq!(balancer.median(1), 150);
        let bits = 11;
        asserting("median maps to 2^(B-1)")
            .that(&balancer.balance_coordinate(0, 1050, bits)).is_equal_to(1 << (bits - 1));
    }

    #[test]
    fn balancing_clamps_to_range() {
        let points = vec![Point::with_id(0, &[100]), Point::with_id(1, &[102]), Point::with_id(2, &[104])];
        let balancer = PointBalancer::from_all_points(&points);
        let bits = 4;
        // 100 shifted by (8 - 102) would go negative; it must clamp to zero.
        assert_eq!(balancer.balance_coordinate(0, 0, bits), 0);
        assert_eq!(balancer.balance_coordinate(0, 1000, bits), 15);
    }

    #[test]
    fn sampled_balancer_lands_near_the_exact_median() {
        let mut rng = StdRng::seed_from_u64(23);
        let points : Vec<Point> = (0..10_000)
            .map(|id| Point::with_id(id, &[rng.gen_range(45_000..55_000), 7]))
            .collect();
        let exact = PointBalancer::from_all_points(&points);
        let sampled = PointBalancer::from_sample(&points, &mut rng);
        // The estimator starts at a sample and never leaves the observed range,
        // so the sampled median cannot stray farther than the spread of the data.
        let difference = (exact.median(0) as i64 - sampled.median(0) as i64).abs();
        asserting(&format!("sampled median {} vs exact {}", sampled.median(0), exact.median(0)))
            .that(&(difference <= 10_000)).is_equal_to(true);
        assert_eq!(sampled.median(1), 7);
    }

    #[test]
    fn balance_preserves_identity() {
        let points = vec![Point::with_id(9, &[5, 6]), Point::with_id(10, &[7, 8])];
        let balancer = PointBalancer::from_all_points(&points);
        let balanced = balancer.balance(&points[0], 8);
        assert_eq!(balanced.get_id(), 9);
    }
}
