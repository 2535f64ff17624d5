//! Axis permutations.
//!
//! Permuting the coordinate axes before computing curve indices yields a
//! different Hilbert curve over the same data. Distances between points are
//! unaffected, so the clustering engine is free to shop among permutations
//! for a curve whose ordering keeps clusters contiguous (see `OptimalIndex`).

use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt::{Debug, Formatter};

/// A bijection on the dimensions {0, …, D−1}.
#[derive(Clone, PartialEq, Eq)]
pub struct Permutation {
    /// `sources[i]` is the original dimension whose coordinate lands in
    /// position i after the permutation is applied.
    sources : Vec<usize>
}

impl Permutation {
    /// The permutation that leaves every dimension in place.
    pub fn identity(dimensions : usize) -> Self {
        Permutation { sources : (0..dimensions).collect() }
    }

    /// A uniformly random permutation.
    pub fn random<R : Rng>(dimensions : usize, rng : &mut R) -> Self {
        let mut sources : Vec<usize> = (0..dimensions).collect();
        sources.shuffle(rng);
        Permutation { sources }
    }

    /// Build from an explicit mapping; returns None unless it is a bijection.
    pub fn from_sources(sources : Vec<usize>) -> Option<Self> {
        let mut seen = vec![false; sources.len()];
        for &s in sources.iter() {
            if s >= sources.len() || seen[s] { return None; }
            seen[s] = true;
        }
        Some(Permutation { sources })
    }

    /// Number of dimensions the permutation acts on.
    pub fn dimensions(&self) -> usize { self.sources.len() }

    /// The original dimension whose coordinate lands in the given position.
    #[inline]
    pub fn source_of(&self, position : usize) -> usize { self.sources[position] }

    /// Apply to a coordinate vector, reordering its entries.
    pub fn apply(&self, coordinates : &[u32]) -> Vec<u32> {
        self.sources.iter().map(|&s| coordinates[s]).collect()
    }
}

impl Debug for Permutation {
    fn fmt(&self, f : &mut Formatter) -> std::fmt::Result {
        if self.sources.len() <= 12 {
            write!(f, "Permutation {:?}", self.sources)
        }
        else {
            write!(f, "Permutation over {} dimensions", self.sources.len())
        }
    }
}
