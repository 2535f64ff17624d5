//! End-to-end scenarios: synthetic datasets through the full pipeline.
//!
//! These run at CI-friendly sizes that preserve each scenario's structure;
//! the `#[ignore]`d variants at the bottom use the full-scale shapes.

mod data;

use spectral::prelude::*;
use slash::clustering::bcubed::BCubed;
use slash::clustering::tendency::ClusteringTendency;
use slash::config::{ClusterConfig, DataConfig};
use slash::dataset::{assess, cluster, recluster, Dataset};
use slash::point::Point;

/// Wrap raw points in a Dataset with no initial categories.
fn dataset_of(points : Vec<Point>) -> Dataset {
    let _ = env_logger::builder().is_test(true).try_init();
    let ids = (0..points.len()).map(|i| format!("p{}", i)).collect();
    let initial_categories = vec![None; points.len()];
    Dataset { points, ids, initial_categories }
}

/// A configuration sized for tests: a short curve search, everything else default.
fn test_config() -> ClusterConfig {
    let mut config = ClusterConfig::default();
    config.index.budget.max_trials = 4;
    config.index.budget.index_count = 2;
    config
}

/// Scenario: uniform noise. The triage pass must call it unclustered.
#[test]
fn uniform_cloud_assesses_as_unclustered() {
    let points = data::uniform_cloud(3_000, 50, 1_000_000, 11);
    let dataset = dataset_of(points);
    let verdict = assess(&dataset, &test_config()).unwrap();
    assert_eq!(verdict, ClusteringTendency::Unclustered);
}

/// Scenario: many equal Gaussian clusters. The triage pass sees strong
/// structure and the full pipeline recovers the mixture almost exactly.
#[test]
fn many_equal_clusters_are_recovered() {
    let (points, gold) = data::gaussian_mixture(50, 100, 100, 100.0..500.0, 1_000_000, 21);
    let dataset = dataset_of(points);
    let config = test_config();

    let verdict = assess(&dataset, &config).unwrap();
    assert_eq!(verdict, ClusteringTendency::HighlyClustered);

    let outcome = cluster(&dataset, &config, 77).unwrap();
    let count = outcome.clustering.cluster_count();
    asserting(&format!("50 clusters expected, got {}", count))
        .that(&(count >= 50 && count <= 52)).is_equal_to(true);

    let similarity = BCubed::compare(&outcome.clustering, &gold, 0.5).similarity();
    asserting(&format!("BCubed {} should reach 0.98", similarity))
        .that(&(similarity >= 0.98)).is_equal_to(true);
}

/// Scenario: one dominant cluster among scattered singletons.
#[test]
fn dominant_cluster_is_recognized() {
    let (points, _gold) = data::dominant_cluster(1_800, 200, 20, 31);
    let dataset = dataset_of(points);
    let verdict = assess(&dataset, &test_config()).unwrap();
    let acceptable = verdict == ClusteringTendency::SinglyClustered
        || verdict == ClusteringTendency::MajorityClustered
        || verdict == ClusteringTendency::HighlyClustered;
    asserting(&format!("verdict {:?}", verdict)).that(&acceptable).is_equal_to(true);
}

/// Scenario: two Gaussian clusters, comfortably separated. The pipeline must
/// find exactly two and match the gold standard.
#[test]
fn two_clusters_are_separated() {
    let (points, gold) = data::gaussian_mixture(2, 400, 50, 200.0..400.0, 1_000_000, 41);
    let dataset = dataset_of(points);
    let outcome = cluster(&dataset, &test_config(), 5).unwrap();

    asserting(&format!("2 clusters expected, got {}", outcome.clustering.cluster_count()))
        .that(&(outcome.clustering.cluster_count() <= 3)).is_equal_to(true);
    let similarity = BCubed::compare(&outcome.clustering, &gold, 0.5).similarity();
    asserting(&format!("BCubed {} should reach 0.98", similarity))
        .that(&(similarity >= 0.98)).is_equal_to(true);
}

/// Scenario: chained clusters. With the density splitter disabled, each chain
/// of end-to-end segments merges into a single cluster.
#[test]
fn chains_merge_into_single_clusters() {
    let (points, gold) = data::chained_clusters(5, 8, 30, 10, 51);
    let dataset = dataset_of(points);
    let mut config = test_config();
    config.density_classifier.skip = true;

    let outcome = cluster(&dataset, &config, 13).unwrap();
    let count = outcome.clustering.cluster_count();
    asserting(&format!("5 chains expected, got {}", count))
        .that(&(count >= 5 && count <= 6)).is_equal_to(true);
    let similarity = BCubed::compare(&outcome.clustering, &gold, 0.5).similarity();
    asserting(&format!("BCubed {} should reach 0.98", similarity))
        .that(&(similarity >= 0.98)).is_equal_to(true);
}

/// Idempotence: clustering the pipeline's own output again, with identical
/// parameters, reproduces the partition modulo label renaming.
#[test]
fn reclustering_own_output_is_idempotent() {
    let (points, _gold) = data::gaussian_mixture(10, 80, 30, 100.0..300.0, 1_000_000, 61);
    let dataset = dataset_of(points);
    let mut config = test_config();
    config.acceptable_bcubed = 0.98;

    let first = cluster(&dataset, &config, 9).unwrap();

    // Round the labeling through the output format and back in.
    let rendered = dataset.write_labels(&first.labels, &config.output);
    let reread = Dataset::read_text(&rendered, &DataConfig::default()).unwrap();
    assert_eq!(reread.points.len(), dataset.points.len());

    let second = recluster(&reread, &config, 9).unwrap();
    let similarity = second.bcubed_similarity.expect("initial labels were present");
    asserting(&format!("similarity {} should be 1.0", similarity))
        .that(&(similarity >= 0.999)).is_equal_to(true);
    asserting("no quality shortfall").that(&second.quality_shortfall).is_equal_to(false);
}

/// Reclustering without any initial labels performs no self-test.
#[test]
fn recluster_without_labels_skips_the_self_test() {
    let (points, _gold) = data::gaussian_mixture(4, 50, 10, 100.0..200.0, 1_000_000, 71);
    let dataset = dataset_of(points);
    let outcome = recluster(&dataset, &test_config(), 3).unwrap();
    assert!(outcome.bcubed_similarity.is_none());
    assert!(!outcome.quality_shortfall);
}

// ..................... full-scale variants, run on demand .....................

/// Spec-scale scenario 1: 20 000 points, 100 dimensions, uniform.
#[test]
#[ignore]
fn full_scale_uniform_cloud_is_unclustered() {
    let points = data::uniform_cloud(20_000, 100, 1_000_000, 81);
    let dataset = dataset_of(points);
    let verdict = assess(&dataset, &test_config()).unwrap();
    assert_eq!(verdict, ClusteringTendency::Unclustered);
}

/// Spec-scale scenario 4: two clusters at half the comfortable separation,
/// recovered in the majority of repeated randomized trials.
#[test]
#[ignore]
fn overlapping_clusters_usually_separate() {
    let mut successes = 0;
    let trials = 20;
    for trial in 0..trials {
        let (points, gold) = data::gaussian_mixture(2, 2_500, 100, 300.0..300.0001, 1_000_000, 900 + trial);
        let dataset = dataset_of(points);
        let outcome = cluster(&dataset, &test_config(), trial).unwrap();
        let similarity = BCubed::compare(&outcome.clustering, &gold, 0.5).similarity();
        if similarity >= 0.98 { successes += 1; }
    }
    asserting(&format!("{} of {} trials succeeded", successes, trials))
        .that(&(successes * 2 > trials)).is_equal_to(true);
}

/// Spec-scale scenario 5: 100 000 points in 50 chains of 20 segments.
#[test]
#[ignore]
fn full_scale_chains_merge() {
    let (points, gold) = data::chained_clusters(50, 20, 100, 100, 91);
    let dataset = dataset_of(points);
    let mut config = test_config();
    config.density_classifier.skip = true;
    let outcome = cluster(&dataset, &config, 17).unwrap();
    let similarity = BCubed::compare(&outcome.clustering, &gold, 0.5).similarity();
    asserting(&format!("BCubed {}", similarity)).that(&(similarity >= 0.98)).is_equal_to(true);
}
