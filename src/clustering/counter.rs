use std::cmp::{min, max, Ordering};
use crate::point::Point;

// ........................... CurveProfile ..........................................

/// Result from analyzing the distances between consecutive points in Hilbert
/// curve order: the characteristic merge distance plus statistics about how
/// many clusters are likely to be formed when clustering with that distance.
#[derive(Copy,Clone,Debug,PartialEq)]
pub struct CurveProfile {
    /// The square of the characteristic merge distance, used as the merge
    /// threshold by the classifier. (Avoid unnecessary square roots.)
    ///
    /// _This is the primary result value._
    pub linkage_square_distance : u64,

    /// Counts how many pairwise point distances are larger than the `linkage_square_distance`.
    /// This is a crude estimate (on the high side) of how many clusters a rough clustering will
    /// yield using this `linkage_square_distance`.
    pub count_of_too_large_distances : u32,

    /// Counts how many runs of points sorted in Hilbert Curve order are composed of points
    /// separated by no more than the `linkage_square_distance`
    /// AND have a size that exceeds the `outlier_size`.
    /// This is an upper limit on the number of clusters that will result from
    /// the full clustering algorithm.
    ///
    /// **Experiment shows that this tends to be from 1.5x to 3x the true number of clusters.**
    pub large_cluster_count : u32,

    /// Counts how many runs of points sorted in Hilbert Curve order are composed of points
    /// separated by no more than the `linkage_square_distance`
    /// AND have a size that is less than or equal to the `outlier_size`.
    pub outlier_cluster_count : u32,

    /// Counts how many individual points fall into clusters inferred to be outliers.
    pub outlier_count : u32
}

impl CurveProfile {
    pub fn new() -> Self {
        CurveProfile {
            linkage_square_distance : 0,
            count_of_too_large_distances : 0,
            large_cluster_count : 0,
            outlier_cluster_count : 0,
            outlier_count : 0
        }
    }

    /// Estimated number of clusters of all sizes, outliers included.
    pub fn estimated_cluster_count(&self) -> u32 {
        self.large_cluster_count + self.outlier_cluster_count
    }
}

// ........................... ClusterCounter ..........................................

/// Given a set of points in Hilbert curve order, finds the characteristic merge
/// distance to use when performing **single-link agglomerative clustering**,
/// and estimates the cluster count that distance would yield.
///
/// The analysis slides a window of length two along the ordered points and
/// studies the multiset of squared neighbor distances. It attempts to duplicate
/// what people do easily by eye: spot where the distribution of distances shows
/// its first sudden jump, an elbow in the curve. The physical insight is that
/// pairs of points within the same cluster will be close together, pairs of
/// points from different clusters will be far apart, and there is a gray region
/// of distances between them where there will be few pairs of points.
///
/// When there is uncertainty between several values, we will prefer the smaller
/// value. In a bottom up algorithm, it is better to err on the side of failing
/// to merge clusters that belong together rather than merging clusters that do
/// not belong together.
///
/// **THIS MEASUREMENT IS THE SINGLE MOST IMPORTANT CALCULATION TO GET RIGHT!!!**
///
///   - If the value is too high, **homogeneity** will suffer. (Points that do not belong together will be clustered together.)
///   - If the value is too low, **completeness** will suffer. (Points that belong together will be split apart.)
///
/// The number one cause of obtaining a bad value is high levels of noise in the
/// data, which blurs the distinction between cluster boundaries; `noise_skip_by`
/// sharpens the signal by comparing distances several positions apart in sorted
/// order instead of adjacent ones. If the jump is too faint to trust, the
/// counter falls back to a multiple of the median distance.
///
/// The configuration of this struct permits a fluent style.
#[derive(Copy, Clone, Debug)]
pub struct ClusterCounter {
    /// When counting potential clusters, do not count as a proper cluster any
    /// run of consecutive points in Hilbert order whose separation stays within
    /// the merge distance unless the run exceeds this size.
    outlier_size : u16,

    /// To accommodate noise, look for a sudden jump in distance not between adjacent
    /// positions of the sorted distances, but between positions separated by this
    /// number (plus one).
    ///
    ///   - Too large a value will depress the resulting `linkage_square_distance`.
    ///   - Too small a value will risk noise points throwing off the calculation,
    ///     falsely increasing the `linkage_square_distance`.
    noise_skip_by : u16,

    /// If the first pass yields an implausibly high cluster count, the analysis
    /// repeats once with this smaller skip.
    reduced_noise_skip_by : u16,

    /// The merge distance will be chosen so that at minimum, this number of
    /// clusters will be yielded by a rough clustering.
    /// The default is 1/(2√N), but never less than ten.
    minimum_cluster_count : u16,

    /// It is not uncommon for a few very small distances to be followed by
    /// a proportionally huge increase, like going from 2 to 10 being a fivefold increase.
    /// This threshold prevents trusting growth ratios until at least this many
    /// distances have been passed. Defaults to ½N.
    ///
    ///   - Increase it if nearly half or more of your points are coincident or very close together.
    ///   - Decrease it if you have a huge number of outliers (beyond 40% outliers).
    lowest_index_for_checking_growth_ratio : u32,

    /// Multiple of the median distance used as the merge distance when the
    /// jump in the sorted distances is too ambiguous to trust.
    median_fallback_multiplier : u64
}

impl ClusterCounter {
    /// Create a ClusterCounter with all values set to defaults.
    pub fn new(num_points : u32) -> Self {
        let mut minimum_cluster_count = (num_points as f64).sqrt() / 2.0;
        if minimum_cluster_count < 10.0 {
            minimum_cluster_count = 10.0;
        }
        ClusterCounter {
            outlier_size : 5,
            noise_skip_by : 10,
            reduced_noise_skip_by : 1,
            minimum_cluster_count : minimum_cluster_count as u16,
            lowest_index_for_checking_growth_ratio : num_points / 2,
            median_fallback_multiplier : 4
        }
    }

    /// Configure the algorithm by setting a value for `outlier_size`.
    pub fn with_outlier_size(mut self, outlier_size : u16) -> Self {
        self.outlier_size = outlier_size;
        self
    }

    /// Configure the algorithm by setting a value for `noise_skip_by`.
    pub fn with_noise_skip_by(mut self, noise_skip_by : u16) -> Self {
        self.noise_skip_by = noise_skip_by;
        self
    }

    /// Configure the algorithm by setting a value for `minimum_cluster_count`.
    pub fn with_minimum_cluster_count(mut self, min_cluster_count : u16) -> Self {
        self.minimum_cluster_count = max(min_cluster_count, 6);
        self
    }

    /// Configure the algorithm by setting `lowest_index_for_checking_growth_ratio`.
    pub fn with_lowest_index_for_checking_growth_ratio(mut self, index : u32) -> Self {
        self.lowest_index_for_checking_growth_ratio = index;
        self
    }

    /// Find the characteristic merge distance and estimate the cluster count.
    ///
    ///   - points - Points to analyze.
    ///   - order - Indices into `points` arranged in Hilbert curve order.
    pub fn count(&self, points : &[Point], order : &[usize]) -> CurveProfile {
        let pairs = AdjacentPairDistance::all_pairs(points, order);
        if pairs.is_empty() {
            let mut profile = CurveProfile::new();
            profile.linkage_square_distance = 1;
            if order.len() as u16 <= self.outlier_size && !order.is_empty() {
                profile.outlier_cluster_count = 1;
                profile.outlier_count = order.len() as u32;
            }
            else if !order.is_empty() {
                profile.large_cluster_count = 1;
            }
            return profile;
        }

        let first = self.profile_with_skip(&pairs, order.len(), self.noise_skip_by);
        if !self.looks_too_high(&first, order.len()) || self.reduced_noise_skip_by >= self.noise_skip_by {
            return first;
        }
        // Too many clusters: denoise less aggressively and keep the tighter answer.
        let second = self.profile_with_skip(&pairs, order.len(), self.reduced_noise_skip_by);
        let first_key = (first.estimated_cluster_count(), first.linkage_square_distance);
        let second_key = (second.estimated_cluster_count(), second.linkage_square_distance);
        if second_key < first_key { second } else { first }
    }

    /// Does the estimate imply more clusters than the outlier size could plausibly allow?
    fn looks_too_high(&self, profile : &CurveProfile, num_points : usize) -> bool {
        let too_many_outliers = (profile.outlier_count as usize) * 2 > num_points;
        let too_many_clusters = (profile.estimated_cluster_count() as usize) * 2 * (self.outlier_size as usize) > num_points;
        too_many_outliers || too_many_clusters
    }

    fn profile_with_skip(&self, pairs : &[AdjacentPairDistance], num_points : usize, skip : u16) -> CurveProfile {
        let linkage_square_distance = self.choose_linkage_distance(pairs, num_points, skip);
        self.estimate_cluster_counts(pairs, num_points, linkage_square_distance)
    }

    /// Find the merge distance by analyzing the distribution of distances between
    /// consecutive points after they are arranged in Hilbert Curve order.
    ///
    /// The sorted distances are scanned for the position where they grow the
    /// fastest, both absolutely and proportionally. The merge distance is the
    /// midpoint of that jump, which puts it inside the gray region between the
    /// within-cluster and between-cluster regimes.
    fn choose_linkage_distance(&self, pairs : &[AdjacentPairDistance], num_points : usize, skip : u16) -> u64 {
        let mut sorted_distances : Vec<u64> = pairs.iter().map(|p| p.square_distance).collect();
        sorted_distances.sort_unstable();
        let median = sorted_distances[sorted_distances.len() / 2];
        let fallback = max(1, median.saturating_mul(self.median_fallback_multiplier));

        let lowest_index = min(self.lowest_index_for_checking_growth_ratio as usize, sorted_distances.len() / 2);
        let start_index = 1 + skip as usize + lowest_index;
        if num_points <= self.minimum_cluster_count as usize { return fallback; }
        let conservative_high_index = min(num_points - self.minimum_cluster_count as usize, sorted_distances.len() - 1);
        if start_index >= conservative_high_index { return fallback; }

        let mut stats = DistanceGrowthStats::new();
        for i_distance in start_index..=conservative_high_index {
            let distance = sorted_distances[i_distance];
            let previous_distance = sorted_distances[i_distance - 1 - skip as usize];
            stats.accumulate(i_distance, previous_distance, distance);
        }

        let index_to_use = stats.get_index_of_max_change(lowest_index, conservative_high_index);

        // The smoothed comparison can land up to `skip` positions past the true
        // elbow, so locate the single largest consecutive gap inside the window
        // the comparison straddled.
        let window_start = index_to_use.saturating_sub(1 + skip as usize);
        let mut below_jump = index_to_use.saturating_sub(1);
        let mut widest_gap = 0_u64;
        for i in window_start + 1..=index_to_use {
            let gap = sorted_distances[i] - sorted_distances[i - 1];
            if gap >= widest_gap {
                widest_gap = gap;
                below_jump = i - 1;
            }
        }
        let jump_bottom = sorted_distances[below_jump];
        let jump_top = sorted_distances[below_jump + 1];

        // An elbow that never rises clear of the median is no elbow at all.
        if jump_top < median.saturating_mul(2) {
            return fallback;
        }
        // Sit a quarter of the way into the gray region: when in doubt, the
        // smaller distance fails to merge clusters that belong together, which
        // later phases can repair, instead of merging clusters that do not.
        max(1, jump_bottom + (jump_top - jump_bottom) / 4)
    }

    /// Estimate how many large clusters and outliers would be formed if we cluster using the
    /// given value of `linkage_square_distance` and a single pass through a set of points
    /// ordered by the Hilbert curve.
    ///
    /// The values derived are upper bounds; after all clustering refinements are
    /// handled, all these numbers are likely to decline, because this single pass
    /// fails to merge together some smaller clusters that deserve to be merged.
    ///
    ///   - pairs - Distances between consecutive pairs of points in curve order
    ///     (not sorted by distance).
    ///   - linkage_square_distance - Upper limit on the distance between two points
    ///     that permits them to be clustered together.
    pub fn estimate_cluster_counts(&self, pairs : &[AdjacentPairDistance], num_points : usize, linkage_square_distance : u64) -> CurveProfile {
        assert!(linkage_square_distance > 0, "linkage_square_distance must be greater than zero");
        let mut profile = CurveProfile::new();
        profile.linkage_square_distance = linkage_square_distance;

        let mut run_start = 0_usize;
        for (i, pair) in pairs.iter().enumerate() {
            if pair.square_distance > linkage_square_distance {
                // Close out the current run of near neighbors and start another.
                self.tally_run(&mut profile, i + 1 - run_start);
                profile.count_of_too_large_distances += 1;
                run_start = i + 1;
            }
        }
        self.tally_run(&mut profile, num_points - run_start);
        profile
    }

    fn tally_run(&self, profile : &mut CurveProfile, run_size : usize) {
        if run_size == 0 { return; }
        if run_size <= self.outlier_size as usize {
            profile.outlier_cluster_count += 1;
            profile.outlier_count += run_size as u32;
        }
        else {
            profile.large_cluster_count += 1;
        }
    }
}

// ........................... DistanceGrowthStats .....................................................

/// Internal struct for accumulating guesses as to where the curve formed by
/// sorted square distances between points grows the fastest.
#[derive(Clone, Debug)]
pub struct DistanceGrowthStats {
    index_of_maximum_increase : usize,
    index_of_maximum_ratio : usize,
    index_of_maximum_increase_and_ratio : usize,
    max_increase_alone : u64,
    max_ratio_alone : f64
}

impl DistanceGrowthStats {
    pub fn new() -> Self {
        DistanceGrowthStats {
            index_of_maximum_increase : 0,
            index_of_maximum_ratio : 0,
            index_of_maximum_increase_and_ratio : 0,
            max_increase_alone : 0,
            max_ratio_alone : 0.0
        }
    }

    pub fn accumulate(&mut self, index : usize, previous_value : u64, new_value : u64) {
        if previous_value == 0 { return; }
        let delta = new_value - previous_value;
        let ratio = new_value as f64 / previous_value as f64;
        let mut both_high = true;
        if delta > self.max_increase_alone {
            self.max_increase_alone = delta;
            self.index_of_maximum_increase = index;
        }
        else {
            both_high = false;
        }
        if ratio > self.max_ratio_alone {
            self.max_ratio_alone = ratio;
            self.index_of_maximum_ratio = index;
        }
        else {
            both_high = false;
        }
        if both_high {
            self.index_of_maximum_increase_and_ratio = index;
        }
    }

    /// The strongest proportional jump seen so far.
    pub fn max_ratio(&self) -> f64 { self.max_ratio_alone }

    /// Decide when the distance value changed the most, but be conservative if several measures disagree.
    ///
    ///   - `i_low_paired` - Do not choose `index_of_maximum_increase_and_ratio` if it falls below this.
    ///   - `i_high` - Do not go above this index.
    ///   - return - The index into the sorted distances having the best guess for the merge distance.
    pub fn get_index_of_max_change(&self, i_low_paired : usize, i_high : usize) -> usize {
        let i_conservative = i_low_paired + (i_high - i_low_paired) * 3 / 4;
        if self.index_of_maximum_increase_and_ratio > i_high {
            i_high
        }
        else if self.index_of_maximum_increase_and_ratio > i_conservative {
            self.index_of_maximum_increase_and_ratio
        }
        else if self.index_of_maximum_ratio < i_conservative {
            max(min(i_high, self.index_of_maximum_increase), i_low_paired)
        }
        else if self.index_of_maximum_increase < i_conservative {
            max(min(i_high, self.index_of_maximum_ratio), i_low_paired)
        }
        else {
            min(min(i_high, self.index_of_maximum_increase), self.index_of_maximum_ratio)
        }
    }
}


// ........................... AdjacentPairDistance ..........................................

/// Measures the square distance between a pair of `Points` adjacent to one
/// another in Hilbert curve order.
#[derive(Copy, Clone, Debug)]
pub struct AdjacentPairDistance {
    /// Square of the distance between two points.
    pub square_distance : u64,
    /// Zero-based curve position of the first point.
    pub first_position : usize,
    /// Zero-based curve position of the second point.
    pub second_position : usize,
    /// Index of the first point in the input slice.
    pub first_point : usize,
    /// Index of the second point in the input slice.
    pub second_point : usize
}

impl Ord for AdjacentPairDistance {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.square_distance, self.first_position, self.second_position).cmp(&(other.square_distance, other.first_position, other.second_position))
    }
}

impl PartialOrd for AdjacentPairDistance { fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) } }

impl PartialEq for AdjacentPairDistance {
    fn eq(&self, other: &Self) -> bool {
        (self.square_distance, self.first_position, self.second_position) == (other.square_distance, other.first_position, other.second_position)
    }
}

impl Eq for AdjacentPairDistance { }

impl AdjacentPairDistance {
    /// Generate the distances between consecutive points of the curve order.
    ///
    ///   - points - Points to analyze.
    ///   - order - Indices into `points` in Hilbert curve order.
    pub fn all_pairs(points : &[Point], order : &[usize]) -> Vec<AdjacentPairDistance> {
        if order.len() <= 1 { return Vec::new(); }
        let mut pairs = Vec::with_capacity(order.len() - 1);
        for position in 1..order.len() {
            let first_point = order[position - 1];
            let second_point = order[position];
            pairs.push(AdjacentPairDistance {
                square_distance : points[first_point].square_distance(&points[second_point]),
                first_position : position - 1,
                second_position : position,
                first_point,
                second_point
            });
        }
        pairs
    }
}
