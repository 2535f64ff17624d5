//! # SLASH
//!
//! **S**ingle-**L**ink **A**gglomerative **S**calable **H**ilbert clustering:
//! unassisted clustering of large, high-dimensional sets of integer-coordinate
//! points, using the Hilbert space-filling curve.
//!
//! You do not tell SLASH how many clusters to expect. Points are threaded onto
//! a Hilbert curve, the distribution of neighbor distances along the curve
//! reveals a characteristic merge distance, and bottom-up single-link merging
//! guided by that distance assembles the clusters — coping with clusters of
//! widely varying density, size, and shape, including chained shapes that
//! defeat centroid methods. A density pass afterwards breaks apart clusters
//! that single-link merging glued together across a thin bridge of points.
//!
//! The main pieces, in dependency order:
//!
//!   - [`point`] - points with cached square magnitudes and the fast distance kernel.
//!   - [`hilbert`] - the curve transform, axis permutations, coordinate
//!     balancing, and a progressive curve sort.
//!   - [`clustering`] - the partition container, the BCubed measure, the
//!     merge-distance counter, the single-link classifier, the density
//!     splitter, the curve search, and the tendency triage.
//!   - [`config`] / [`dataset`] - the YAML-driven configuration document and
//!     the delimited-text collaborator that feeds the engine and writes its
//!     labeling.
//!
//! A minimal run, from records to labels:
//!
//! ```
//! use slash::config::{ClusterConfig, DataConfig};
//! use slash::dataset::{cluster, Dataset};
//!
//! let records = "id,category,x,y\n\
//!     a,,10,11\n\
//!     b,,12,10\n\
//!     c,,11,13\n\
//!     d,,900,905\n\
//!     e,,903,901\n\
//!     f,,901,904\n";
//! let dataset = Dataset::read_text(records, &DataConfig::default()).unwrap();
//! let outcome = cluster(&dataset, &ClusterConfig::default(), 42).unwrap();
//! assert_eq!(outcome.clustering.cluster_count(), 2);
//! assert!(outcome.clustering.are_together(0, 2));
//! assert!(!outcome.clustering.are_together(0, 3));
//! ```

pub mod point;
pub mod hilbert;
pub mod clustering;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod stopwatch;
