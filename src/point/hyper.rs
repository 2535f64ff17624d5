//! Hyper-contrasted points: sparse points whose absent dimensions take
//! deterministic pseudo-random values instead of a single missing value.
//!
//! Ratings-style data is sparse, and filling the gaps with a fixed value makes
//! every pair of points look artificially similar. Filling them with values
//! drawn deterministically from the point's id pushes unrelated points apart
//! while keeping the data reproducible. The materialized coordinate arrays are
//! large, so they live in a bounded LRU cache and are rebuilt on demand.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::cmp::max;

use lru::LruCache;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use super::{next_point_id, PointData};

/// Default number of materialized coordinate arrays held in the cache.
pub const DEFAULT_CACHE_CAPACITY : usize = 10_000;

/// Bounded cache of demand-materialized coordinate arrays, keyed by point id.
///
/// Hits and misses cost amortized O(1). Memory is bounded by
/// `capacity · D · 4` bytes plus map overhead.
pub struct CoordinateCache {
    cache : Mutex<LruCache<usize, Arc<Vec<u32>>>>,
    hits : AtomicU64,
    misses : AtomicU64
}

impl CoordinateCache {
    /// Create a cache that holds at most `capacity` coordinate arrays.
    pub fn new(capacity : usize) -> Self {
        let capacity = NonZeroUsize::new(max(capacity, 1)).unwrap();
        CoordinateCache {
            cache : Mutex::new(LruCache::new(capacity)),
            hits : AtomicU64::new(0),
            misses : AtomicU64::new(0)
        }
    }

    /// Create a cache with the default capacity.
    pub fn with_default_capacity() -> Self { Self::new(DEFAULT_CACHE_CAPACITY) }

    /// Fetch the coordinates for a point id, materializing and caching them on a miss.
    pub fn get_or_materialize<F : FnOnce() -> Vec<u32>>(&self, id : usize, materialize : F) -> Arc<Vec<u32>> {
        let mut cache = self.cache.lock().unwrap();
        if let Some(found) = cache.get(&id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return found.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let made = Arc::new(materialize());
        cache.put(id, made.clone());
        made
    }

    /// Fraction of lookups served from the cache so far.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        if hits + misses == 0.0 { 0.0 } else { hits / (hits + misses) }
    }
}

/// A sparse point whose absent dimensions materialize to deterministic
/// pseudo-random values in `[0, contrast_ceiling]`, keyed off the point id.
#[derive(Clone)]
pub struct HyperContrastedPoint {
    id : usize,
    dimensions : usize,

    /// Ascending indices of the dimensions with real values.
    present : Vec<usize>,

    /// Values for the present dimensions, parallel to `present`.
    values : Vec<u32>,

    /// Upper bound (inclusive) for the materialized values of absent dimensions.
    contrast_ceiling : u32,

    cache : Arc<CoordinateCache>,
    square_magnitude : u64,
    max_coordinate : u32
}

impl HyperContrastedPoint {
    /// Create a point with an auto-generated id.
    pub fn new(dimensions : usize, present : Vec<usize>, values : Vec<u32>,
               contrast_ceiling : u32, cache : Arc<CoordinateCache>) -> Self {
        Self::with_id(next_point_id(), dimensions, present, values, contrast_ceiling, cache)
    }

    /// Create a point with the given id.
    pub fn with_id(id : usize, dimensions : usize, present : Vec<usize>, values : Vec<u32>,
                   contrast_ceiling : u32, cache : Arc<CoordinateCache>) -> Self {
        assert_eq!(present.len(), values.len(), "present and values must be parallel");
        let mut point = HyperContrastedPoint {
            id, dimensions, present, values, contrast_ceiling, cache,
            square_magnitude : 0,
            max_coordinate : 0
        };
        let coordinates = point.materialized();
        let mut square_magnitude = 0_u64;
        let mut max_coordinate = 0_u32;
        for &x in coordinates.iter() {
            square_magnitude += (x as u64) * (x as u64);
            max_coordinate = max(max_coordinate, x);
        }
        point.square_magnitude = square_magnitude;
        point.max_coordinate = max_coordinate;
        point
    }

    /// Fetch the full coordinate array, rebuilding it through the cache on a miss.
    ///
    /// The same id always rebuilds the same array: absent values come from a
    /// generator seeded by the point id.
    pub fn materialized(&self) -> Arc<Vec<u32>> {
        let id = self.id;
        let dimensions = self.dimensions;
        let present = &self.present;
        let values = &self.values;
        let ceiling = self.contrast_ceiling;
        self.cache.get_or_materialize(id, || {
            let mut rng = StdRng::seed_from_u64(id as u64);
            let mut coordinates = Vec::with_capacity(dimensions);
            let mut cursor = 0;
            for dimension in 0..dimensions {
                if cursor < present.len() && present[cursor] == dimension {
                    coordinates.push(values[cursor]);
                    cursor += 1;
                }
                else {
                    coordinates.push(rng.gen_range(0..=ceiling));
                }
            }
            coordinates
        })
    }
}

impl PointData for HyperContrastedPoint {
    fn get_id(&self) -> usize { self.id }

    fn dimensions(&self) -> usize { self.dimensions }

    fn coordinate(&self, dimension : usize) -> u32 {
        self.materialized()[dimension]
    }

    fn iter_coordinates<'a>(&'a self) -> Box<dyn Iterator<Item = u32> + 'a> {
        let coordinates = self.materialized();
        Box::new((0..self.dimensions).map(move |d| coordinates[d]))
    }

    fn square_magnitude(&self) -> u64 { self.square_magnitude }

    fn max_coordinate(&self) -> u32 { self.max_coordinate }
}
