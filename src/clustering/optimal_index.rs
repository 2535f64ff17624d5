//! Search for a coordinate permutation whose Hilbert curve keeps clusters
//! contiguous.
//!
//! Any permutation of the axes yields a valid curve, and some curves slice a
//! given dataset into far fewer fragments than others. The search generates
//! random permutations, scores each by the cluster count the ClusterCounter
//! estimates for its curve, and keeps the best. Trials are independent, so
//! they run on the worker pool; the budget bounds both the total number of
//! trials and the patience for non-improving streaks.

use log::{debug, info};
use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use crate::point::Point;
use crate::hilbert::CurveMap;
use crate::hilbert::balancer::PointBalancer;
use crate::hilbert::permutation::Permutation;
use crate::hilbert::sort::balanced_sort;
use super::counter::{ClusterCounter, CurveProfile};

/// Budget and tuning for the permutation search.
#[derive(Copy, Clone, Debug)]
pub struct OptimalIndex {
    /// How many of the best-scoring candidates are retained and rescored with
    /// the least-smoothed counter before the final choice.
    pub index_count : usize,

    /// Upper bound on the number of random permutations tried.
    pub max_trials : usize,

    /// Stop after this many consecutive trials fail to improve on the best.
    pub max_iterations_without_improvement : usize,

    /// Runs at or under this size count as outliers while scoring.
    pub outlier_size : usize,

    /// Build the balancer from an O(√N) sample instead of every point.
    pub use_sample : bool
}

impl Default for OptimalIndex {
    fn default() -> Self {
        OptimalIndex {
            index_count : 4,
            max_trials : 16,
            max_iterations_without_improvement : 8,
            outlier_size : 5,
            use_sample : true
        }
    }
}

/// The winning curve: its permutation-bearing map, the curve order it induces,
/// and the profile that scored it.
pub struct IndexSearchResult {
    pub map : CurveMap,
    pub order : Vec<usize>,
    pub profile : CurveProfile
}

/// Score of one trial, ordered so that fewer clusters win and ties go to the
/// tighter merge distance.
fn score_of(profile : &CurveProfile) -> (u32, u64) {
    (profile.estimated_cluster_count(), profile.linkage_square_distance)
}

impl OptimalIndex {
    pub fn new() -> Self { Self::default() }

    /// Run the search and return the best curve found.
    ///
    /// Trial zero is always the identity permutation, so the search can only
    /// improve on the unpermuted curve. The caller's seed makes a run
    /// reproducible.
    pub fn search(&self, points : &[Point], bits_per_dimension : usize, seed : u64) -> IndexSearchResult {
        let dimensions = points.first().map_or(0, |p| crate::point::PointData::dimensions(p));
        let mut rng = StdRng::seed_from_u64(seed);
        let balancer = if self.use_sample {
            PointBalancer::from_sample(points, &mut rng)
        }
        else {
            PointBalancer::from_all_points(points)
        };

        let mut permutations : Vec<Permutation> = vec![Permutation::identity(dimensions)];
        for _ in 1..self.max_trials.max(1) {
            permutations.push(Permutation::random(dimensions, &mut rng));
        }

        // Evaluate in batches sized to the worker pool; the early-stop check
        // runs between batches.
        let batch_size = rayon::current_num_threads().max(1);
        let mut evaluated : Vec<(usize, CurveMap, Vec<usize>, CurveProfile)> = Vec::new();
        let mut best_score : Option<(u32, u64)> = None;
        let mut stale = 0_usize;
        let mut trial = 0_usize;
        while trial < permutations.len() && stale <= self.max_iterations_without_improvement {
            let upper = (trial + batch_size).min(permutations.len());
            let batch : Vec<(usize, CurveMap, Vec<usize>, CurveProfile)> = (trial..upper)
                .into_par_iter()
                .map(|t| {
                    let map = CurveMap::new(permutations[t].clone(), Some(balancer.clone()), bits_per_dimension);
                    let order = balanced_sort(points, &map).order;
                    let counter = ClusterCounter::new(points.len() as u32)
                        .with_outlier_size(self.outlier_size as u16);
                    let profile = counter.count(points, &order);
                    (t, map, order, profile)
                })
                .collect();
            for entry in batch {
                let score = score_of(&entry.3);
                if best_score.map_or(true, |b| score < b) {
                    best_score = Some(score);
                    stale = 0;
                    debug!("trial {} improved the curve: {} clusters, merge distance {}",
                        entry.0, entry.3.estimated_cluster_count(), entry.3.linkage_square_distance);
                }
                else {
                    stale += 1;
                }
                evaluated.push(entry);
            }
            trial = upper;
        }

        // Rescore the short list with the least-smoothed counter and pick the winner.
        evaluated.sort_by_key(|entry| (score_of(&entry.3), entry.0));
        evaluated.truncate(self.index_count.max(1));
        let rescored : Vec<(usize, (u32, u64))> = evaluated.par_iter()
            .enumerate()
            .map(|(position, entry)| {
                let counter = ClusterCounter::new(points.len() as u32)
                    .with_outlier_size(self.outlier_size as u16)
                    .with_noise_skip_by(1);
                let profile = counter.count(points, &entry.2);
                (position, score_of(&profile))
            })
            .collect();
        let winner_position = rescored.iter()
            .min_by_key(|(position, score)| (*score, *position))
            .map(|(position, _)| *position)
            .unwrap_or(0);

        let (trial_number, map, order, profile) = evaluated.swap_remove(winner_position);
        info!("curve search done after {} trials; winner is trial {} with {} estimated clusters",
            trial, trial_number, profile.estimated_cluster_count());
        IndexSearchResult { map, order, profile }
    }
}

/// Derive a seed from entropy when the caller does not need reproducibility.
pub fn entropy_seed() -> u64 {
    rand::thread_rng().gen()
}

#[cfg(test)]
/// Tests of the permutation search.
mod tests {
    #[allow(unused_imports)]
    use spectral::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use crate::point::{Point, PointData};
    use crate::hilbert::transform::bits_required;
    use super::OptimalIndex;

    fn blob_data(seed : u64) -> Vec<Point> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut points = Vec::new();
        let mut id = 0;
        for _ in 0..12 {
            let center : Vec<u32> = (0..6).map(|_| rng.gen_range(20_000..900_000)).collect();
            for _ in 0..40 {
                let coordinates : Vec<u32> = center.iter().map(|&c| c + rng.gen_range(0..2_000)).collect();
                points.push(Point::with_id(id, &coordinates));
                id += 1;
            }
        }
        points
    }

    #[test]
    fn search_returns_a_usable_curve() {
        let points = blob_data(401);
        let bits = bits_required(points.iter().map(|p| p.max_coordinate()).max().unwrap());
        let search = OptimalIndex { max_trials : 6, ..OptimalIndex::default() };
        let result = search.search(&points, bits, 7);

        assert_eq!(result.order.len(), points.len());
        let mut seen = vec![false; points.len()];
        for &index in &result.order {
            assert!(!seen[index]);
            seen[index] = true;
        }
        asserting("a merge distance was found").that(&(result.profile.linkage_square_distance > 0)).is_equal_to(true);
        // Tight, well-separated blobs: the raw estimate runs high when blobs
        // fragment into several curve segments, but stays within a few multiples
        // of the true dozen.
        let estimate = result.profile.estimated_cluster_count();
        asserting(&format!("estimate {} should be near 12", estimate))
            .that(&(estimate >= 6 && estimate <= 60)).is_equal_to(true);
    }

    #[test]
    fn search_is_reproducible_for_a_fixed_seed() {
        let points = blob_data(402);
        let bits = bits_required(points.iter().map(|p| p.max_coordinate()).max().unwrap());
        let search = OptimalIndex { max_trials : 4, ..OptimalIndex::default() };
        let first = search.search(&points, bits, 99);
        let second = search.search(&points, bits, 99);
        assert_eq!(first.order, second.order);
        assert_eq!(first.profile, second.profile);
    }
}
