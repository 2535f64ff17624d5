//! Synthetic datasets for clustering tests.
//!
//! Every generator is seeded, so a failing case replays exactly. Gold-standard
//! clusterings index points by their position in the returned Vec.

use std::ops::Range;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use slash::clustering::{integer_clustering, Clustering};
use slash::point::Point;

pub type GoldClustering = Clustering<usize, usize, Range<usize>>;

/// A near-Gaussian draw: the sum of twelve uniforms, shifted and scaled.
pub fn gaussian_like(rng : &mut StdRng, center : f64, sigma : f64) -> u32 {
    let sum : f64 = (0..12).map(|_| rng.gen::<f64>()).sum();
    let standard = sum - 6.0;
    (center + standard * sigma).max(0.0).min(u32::max_value() as f64) as u32
}

/// Points uniform in [0, ceiling) per dimension: no cluster structure at all.
pub fn uniform_cloud(count : usize, dimensions : usize, ceiling : u32, seed : u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|id| {
            let coordinates : Vec<u32> = (0..dimensions).map(|_| rng.gen_range(0..ceiling)).collect();
            Point::with_id(id, &coordinates)
        })
        .collect()
}

/// A mixture of spherical Gaussian clusters with centers kept far enough apart
/// that the mixture is unambiguous. Returns the points and the gold clustering.
pub fn gaussian_mixture(cluster_count : usize, points_per_cluster : usize, dimensions : usize,
                        sigma_range : Range<f64>, ceiling : u32, seed : u64) -> (Vec<Point>, GoldClustering) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(cluster_count * points_per_cluster);
    let mut gold = integer_clustering();
    let margin = ceiling / 10;
    for _ in 0..cluster_count {
        let sigma = rng.gen_range(sigma_range.start..sigma_range.end);
        let center : Vec<f64> = (0..dimensions)
            .map(|_| rng.gen_range(margin..ceiling - margin) as f64)
            .collect();
        let category = gold.create_category();
        for _ in 0..points_per_cluster {
            let coordinates : Vec<u32> = center.iter()
                .map(|&c| gaussian_like(&mut rng, c, sigma))
                .collect();
            let index = points.len();
            points.push(Point::with_id(index, &coordinates));
            gold.add_to_cluster(index, category).unwrap();
        }
    }
    (points, gold)
}

/// Clusters shaped as chains: each is a run of Gaussian segments laid end to
/// end along a random axis-aligned walk, so the whole chain is one connected,
/// non-spherical cluster.
pub fn chained_clusters(chain_count : usize, segments_per_chain : usize, points_per_segment : usize,
                        dimensions : usize, seed : u64) -> (Vec<Point>, GoldClustering) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::new();
    let mut gold = integer_clustering();
    let segment_length = 6_000.0;
    let sigma = 900.0;
    for chain in 0..chain_count {
        let category = gold.create_category();
        // Chains start well apart on a coarse grid.
        let mut cursor : Vec<f64> = (0..dimensions)
            .map(|d| if d == 0 { 100_000.0 + chain as f64 * 150_000.0 } else { 500_000.0 })
            .collect();
        for _ in 0..segments_per_chain {
            for _ in 0..points_per_segment {
                let coordinates : Vec<u32> = cursor.iter()
                    .map(|&c| gaussian_like(&mut rng, c, sigma))
                    .collect();
                let index = points.len();
                points.push(Point::with_id(index, &coordinates));
                gold.add_to_cluster(index, category).unwrap();
            }
            // Step to the next segment along a random dimension (never the
            // chain-separating dimension zero).
            let direction = rng.gen_range(1..dimensions);
            let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
            cursor[direction] = (cursor[direction] + sign * segment_length).max(20_000.0);
        }
    }
    (points, gold)
}

/// One dense Gaussian cluster plus scattered singleton points.
pub fn dominant_cluster(cluster_size : usize, singleton_count : usize, dimensions : usize,
                        seed : u64) -> (Vec<Point>, GoldClustering) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::new();
    let mut gold = integer_clustering();
    let category = gold.create_category();
    for _ in 0..cluster_size {
        let coordinates : Vec<u32> = (0..dimensions)
            .map(|_| gaussian_like(&mut rng, 500_000.0, 2_000.0))
            .collect();
        let index = points.len();
        points.push(Point::with_id(index, &coordinates));
        gold.add_to_cluster(index, category).unwrap();
    }
    for _ in 0..singleton_count {
        let coordinates : Vec<u32> = (0..dimensions)
            .map(|_| rng.gen_range(0..1_000_000))
            .collect();
        let index = points.len();
        points.push(Point::with_id(index, &coordinates));
        gold.add_to_new_cluster(index).unwrap();
    }
    (points, gold)
}
