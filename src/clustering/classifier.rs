//! Agglomerative single-link clustering driven by the Hilbert curve.
//!
//! A run proceeds through four phases:
//!
//!   1. **Seed.** Every point starts in its own cluster (or in the cluster a
//!      caller-supplied seeding assigns it).
//!   2. **Curve-adjacency merge.** Consecutive points on the curve whose square
//!      distance is within the characteristic merge distance are unioned.
//!      A single cluster usually lands on the curve as several separate
//!      segments, so this phase over-counts clusters.
//!   3. **Neighbor-refinement merge.** Each cluster is reduced to a centroid
//!      representative; the few nearest rival clusters are checked by minimum
//!      pairwise point distance (exact on request or when cheap, otherwise a
//!      bounding-ball approximation) and unioned when within the merge
//!      distance. Candidate scans run on a worker pool; merges queue up and
//!      are applied serially afterward.
//!   4. **Outlier attachment.** Runt clusters get a relaxed threshold and are
//!      attached to the nearest cluster that accepts them.

use std::ops::Range;
use log::{debug, info};
use rayon::prelude::*;
use crate::point::{Point, PointData};
use crate::hilbert::CurveMap;
use crate::hilbert::sort::balanced_sort;
use super::{integer_clustering, Clustering};
use super::counter::{ClusterCounter, CurveProfile};
use super::neighbors::top_k_nearest;

/// The engine clusters point indices; the real points live in the caller's slice.
pub type PointClustering = Clustering<usize, usize, Range<usize>>;

/// Configuration knobs for the single-link merging phases.
#[derive(Copy, Clone, Debug)]
pub struct HilbertClassifier {
    /// How many nearby clusters to consider as merge candidates for each
    /// cluster during neighbor refinement. Higher is more accurate and slower.
    pub max_neighbors_to_compare : usize,

    /// If true, inter-cluster distance is the exact minimum over all point
    /// pairs, an O(|A|·|B|) scan. If false, small cluster pairs are still
    /// checked exactly but large ones use a bounding-ball approximation.
    pub use_exact_cluster_distance : bool,

    /// Relaxation factor applied to the square merge distance when deciding
    /// whether an outlier cluster may attach to a neighbor.
    pub outlier_distance_multiplier : u64,

    /// Clusters with fewer members than this are outliers.
    pub outlier_size : usize
}

/// Pairs whose member product stays under this are always checked exactly;
/// the bounding-ball shortcut only pays for itself above it.
const EXACT_CHECK_CEILING : usize = 1024;

impl Default for HilbertClassifier {
    fn default() -> Self {
        HilbertClassifier {
            max_neighbors_to_compare : 5,
            use_exact_cluster_distance : false,
            outlier_distance_multiplier : 5,
            outlier_size : 5
        }
    }
}

/// A cluster's stand-in during neighbor refinement: its centroid, the spread
/// of its members around the centroid, and one member to merge by.
struct Representative {
    category : usize,
    centroid : Point,
    /// Distance from the centroid to the farthest member.
    radius : f64,
    sample_member : usize,
    member_count : usize
}

impl HilbertClassifier {
    pub fn new() -> Self { Self::default() }

    /// Cluster the points: order them along the curve, discover the merge
    /// distance, then run the merging phases. Returns the clustering along
    /// with the curve profile that supplied the merge distance.
    pub fn classify(&self, points : &[Point], map : &CurveMap) -> (PointClustering, CurveProfile) {
        let outcome = balanced_sort(points, map);
        debug!("curve sort touched {:.2} of the full key bits", outcome.relative_cost);
        let counter = ClusterCounter::new(points.len() as u32).with_outlier_size(self.outlier_size as u16);
        let profile = counter.count(points, &outcome.order);
        let clustering = self.classify_with_distance(points, &outcome.order, profile.linkage_square_distance);
        (clustering, profile)
    }

    /// Run the merging phases with a known merge distance and curve order.
    pub fn classify_with_distance(&self, points : &[Point], order : &[usize], linkage_square_distance : u64) -> PointClustering {
        let mut clustering = integer_clustering();
        for index in 0..points.len() {
            clustering.add_to_new_cluster(index).expect("point indices are unique");
        }
        self.merge_by_adjacency(points, order, linkage_square_distance, &mut clustering);
        info!("after adjacency merge: {} clusters", clustering.cluster_count());
        self.merge_by_neighbors(points, linkage_square_distance, &mut clustering);
        info!("after neighbor refinement: {} clusters", clustering.cluster_count());
        self.attach_outliers(points, linkage_square_distance, &mut clustering);
        info!("after outlier attachment: {} clusters", clustering.cluster_count());
        clustering
    }

    /// Phase 2: union consecutive curve neighbors that are near one another.
    fn merge_by_adjacency(&self, points : &[Point], order : &[usize], linkage_square_distance : u64, clustering : &mut PointClustering) {
        for window in order.windows(2) {
            let (a, b) = (window[0], window[1]);
            if points[a].is_square_distance_within(&points[b], linkage_square_distance) {
                clustering.merge(a, b);
            }
        }
    }

    /// Phase 3: merge clusters whose members nearly touch even though the curve
    /// visited them in separate segments.
    fn merge_by_neighbors(&self, points : &[Point], linkage_square_distance : u64, clustering : &mut PointClustering) {
        let representatives = self.make_representatives(points, clustering);
        if representatives.len() < 2 { return; }
        let centroids : Vec<Point> = representatives.iter().map(|r| r.centroid.clone()).collect();

        // Scans are parallel over source clusters; merges queue up and are
        // applied serially below so the partition is never mutated concurrently.
        let snapshot : &PointClustering = clustering;
        let proposals : Vec<(usize, usize)> = (0..representatives.len())
            .into_par_iter()
            .flat_map_iter(|source| {
                let neighbors = top_k_nearest(&centroids[source], &centroids, Some(source), self.max_neighbors_to_compare);
                let mut near : Vec<(usize, usize)> = Vec::new();
                for neighbor in neighbors {
                    if self.clusters_are_near(points, snapshot, &representatives[source], &representatives[neighbor.candidate], linkage_square_distance) {
                        near.push((representatives[source].sample_member, representatives[neighbor.candidate].sample_member));
                    }
                }
                near.into_iter()
            })
            .collect();

        for (a, b) in proposals {
            clustering.merge(a, b);
        }
    }

    /// Phase 4: give runt clusters a relaxed threshold and attach them to the
    /// nearest cluster that accepts them.
    fn attach_outliers(&self, points : &[Point], linkage_square_distance : u64, clustering : &mut PointClustering) {
        let relaxed_limit = linkage_square_distance.saturating_mul(self.outlier_distance_multiplier);
        let representatives = self.make_representatives(points, clustering);
        if representatives.len() < 2 { return; }
        let centroids : Vec<Point> = representatives.iter().map(|r| r.centroid.clone()).collect();

        for source in 0..representatives.len() {
            if representatives[source].member_count >= self.outlier_size { continue; }
            let neighbors = top_k_nearest(&centroids[source], &centroids, Some(source), self.max_neighbors_to_compare);
            let outlier_category = representatives[source].category;
            let outlier_members : Vec<usize> = match clustering.get_cluster(&outlier_category) {
                Some(cluster) => cluster.get_members_sorted(),
                // Already swallowed by an earlier attachment this phase.
                None => continue
            };
            for neighbor in neighbors {
                let target = &representatives[neighbor.candidate];
                if self.any_pair_within(points, &outlier_members, clustering, target, relaxed_limit) {
                    clustering.merge(outlier_members[0], target.sample_member);
                    break;
                }
            }
        }
    }

    /// Build one representative per cluster, in category order so reruns take
    /// identical decisions.
    fn make_representatives(&self, points : &[Point], clustering : &PointClustering) -> Vec<Representative> {
        let categories = clustering.get_categories_sorted();
        categories.par_iter()
            .map(|&category| {
                let cluster = clustering.get_cluster(&category).unwrap();
                let members = cluster.get_members_sorted();
                let centroid = centroid_of(points, &members);
                let radius = members.iter()
                    .map(|&m| (centroid.square_distance(&points[m]) as f64).sqrt())
                    .fold(0.0_f64, f64::max);
                Representative {
                    category,
                    centroid,
                    radius,
                    sample_member : members[0],
                    member_count : members.len()
                }
            })
            .collect()
    }

    /// Is the minimum pairwise distance between the two clusters within the limit?
    ///
    /// Exact when requested or when the pair is small enough to scan cheaply;
    /// otherwise a bounding-ball approximation: the centroid gap less both radii.
    fn clusters_are_near(&self, points : &[Point], clustering : &PointClustering,
                         a : &Representative, b : &Representative, square_limit : u64) -> bool {
        let exact = self.use_exact_cluster_distance || a.member_count * b.member_count <= EXACT_CHECK_CEILING;
        if exact {
            let members_a = match clustering.get_cluster(&a.category) {
                Some(cluster) => cluster.get_members_sorted(),
                None => return false
            };
            return self.any_pair_within(points, &members_a, clustering, b, square_limit);
        }
        let gap = (a.centroid.square_distance(&b.centroid) as f64).sqrt() - a.radius - b.radius;
        gap <= 0.0 || gap * gap <= square_limit as f64
    }

    /// Scan for any cross-cluster pair within the limit, stopping at the first hit.
    fn any_pair_within(&self, points : &[Point], members_a : &[usize], clustering : &PointClustering,
                       b : &Representative, square_limit : u64) -> bool {
        let members_b = match clustering.get_cluster(&b.category) {
            Some(cluster) => cluster.get_members_sorted(),
            None => return false
        };
        members_a.iter().any(|&m_a| {
            let point_a = &points[m_a];
            members_b.iter().any(|&m_b| point_a.is_square_distance_within(&points[m_b], square_limit))
        })
    }
}

/// The member-wise mean of a cluster, truncated to integer coordinates.
/// Carries a synthetic id; it never enters a Clustering.
fn centroid_of(points : &[Point], members : &[usize]) -> Point {
    let dimensions = points[members[0]].dimensions();
    let mut sums = vec![0_u64; dimensions];
    for &member in members {
        for (dimension, sum) in sums.iter_mut().enumerate() {
            *sum += points[member].coordinate(dimension) as u64;
        }
    }
    let count = members.len() as u64;
    let mean : Vec<u32> = sums.iter().map(|&s| (s / count) as u32).collect();
    Point::with_id(usize::max_value(), &mean)
}
