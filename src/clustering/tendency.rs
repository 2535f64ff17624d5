//! Fast triage of a dataset's clustering tendency.
//!
//! One curve sort and one pass over neighbor distances answer a cheaper
//! question than clustering does: is there any cluster structure here at all,
//! and roughly what kind? The full pipeline can then be skipped (Unclustered),
//! or its budget tuned to what the triage found.

use log::info;
use crate::point::Point;
use crate::hilbert::CurveMap;
use crate::hilbert::sort::balanced_sort;
use super::logarithm::log_ratio;

/// Verdicts, from no structure at all to strong structure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClusteringTendency {
    /// No discernible structure: one undifferentiated mass of points.
    Unclustered,
    /// One cluster holds essentially every non-outlier point, with a real
    /// population of outliers around it.
    SinglyClustered,
    /// One cluster dominates but meaningful minority clusters exist.
    MajorityClustered,
    /// Cluster structure exists but outliers are a heavy fraction of the data.
    WeaklyClustered,
    /// Clear cluster structure with a modest outlier population.
    ModeratelyClustered,
    /// Strong cluster structure and almost no outliers.
    HighlyClustered
}

/// Configuration for the triage pass.
#[derive(Copy, Clone, Debug)]
pub struct TendencyAssessor {
    /// Runs of curve neighbors at or under this size do not count as clusters.
    pub outlier_size : usize,

    /// A point is an outlier when its nearest curve neighbor is farther than
    /// this multiple of the median neighbor distance. The multiple applies to
    /// the plain distance; internally it is squared to compare square distances.
    pub outlier_distance_multiple : f64
}

impl Default for TendencyAssessor {
    fn default() -> Self {
        TendencyAssessor {
            outlier_size : 5,
            outlier_distance_multiple : 4.0
        }
    }
}

impl TendencyAssessor {
    pub fn new() -> Self { Self::default() }

    /// Classify the dataset. Sorting dominates the cost; everything after the
    /// sort is linear.
    pub fn assess(&self, points : &[Point], map : &CurveMap) -> ClusteringTendency {
        if points.len() < 2 { return ClusteringTendency::Unclustered; }
        let order = balanced_sort(points, map).order;

        // Square distance from each point to its predecessor and successor on the curve.
        let gaps : Vec<u64> = order.windows(2)
            .map(|w| points[w[0]].square_distance(&points[w[1]]))
            .collect();
        let mut sorted_gaps = gaps.clone();
        sorted_gaps.sort_unstable();
        let median = sorted_gaps[sorted_gaps.len() / 2].max(1);

        // The outlier test compares log(gap²/median²) against 2·log(multiple),
        // squaring the configured multiple without overflowing u64.
        let log_threshold = 2.0 * self.outlier_distance_multiple.ln();
        let is_far = |gap : u64| gap > 0 && log_ratio(gap, median) > log_threshold;

        let mut outliers = 0_usize;
        for position in 0..order.len() {
            let near_before = position > 0 && !is_far(gaps[position - 1]);
            let near_after = position < gaps.len() && !is_far(gaps[position]);
            if !near_before && !near_after { outliers += 1; }
        }
        let outlier_fraction = outliers as f64 / order.len() as f64;

        // Runs of near neighbors are candidate clusters; track the biggest.
        let mut largest_run = 1_usize;
        let mut run = 1_usize;
        for &gap in gaps.iter() {
            if is_far(gap) {
                largest_run = largest_run.max(run);
                run = 1;
            }
            else {
                run += 1;
            }
        }
        largest_run = largest_run.max(run);
        let survivors = order.len() - outliers;
        let dominance = if survivors == 0 { 0.0 } else { largest_run.min(survivors) as f64 / survivors as f64 };

        let verdict = self.classify(outlier_fraction, dominance);
        info!("tendency: {:?} (outlier fraction {:.3}, dominance {:.3})", verdict, outlier_fraction, dominance);
        verdict
    }

    /// Map the two measurements onto a verdict.
    fn classify(&self, outlier_fraction : f64, dominance : f64) -> ClusteringTendency {
        if outlier_fraction >= 0.75 {
            ClusteringTendency::Unclustered
        }
        else if dominance >= 0.95 {
            // Everything in one run: with no outliers at all that is not
            // clustering, it is the absence of structure.
            if outlier_fraction < 0.02 { ClusteringTendency::Unclustered }
            else { ClusteringTendency::SinglyClustered }
        }
        else if dominance >= 0.60 {
            ClusteringTendency::MajorityClustered
        }
        else if outlier_fraction <= 0.05 {
            ClusteringTendency::HighlyClustered
        }
        else if outlier_fraction <= 0.20 {
            ClusteringTendency::ModeratelyClustered
        }
        else {
            ClusteringTendency::WeaklyClustered
        }
    }
}
