//! Parallel top-K nearest-neighbor scans.
//!
//! The neighbor-refinement phase of the classifier asks, for each cluster
//! representative, which few other representatives lie closest. The scan is a
//! parallel reduction: workers fold batches of candidates into private bounded
//! heaps, and the heaps are merged at the end. No locks are held while
//! distances are computed.

use std::collections::BinaryHeap;
use rayon::prelude::*;
use crate::point::Point;

/// Candidates are folded in batches of this size.
pub const BATCH_SIZE : usize = 1024;

/// One neighbor of a target: a candidate's position in the candidate slice and
/// its square distance from the target. Orders by distance (then position, so
/// that equal distances resolve deterministically).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Neighbor {
    pub square_distance : u64,
    pub candidate : usize
}

impl Ord for Neighbor {
    fn cmp(&self, other : &Self) -> std::cmp::Ordering {
        (self.square_distance, self.candidate).cmp(&(other.square_distance, other.candidate))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other : &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

/// Push onto a max-heap bounded at k entries: the heap always retains the k
/// smallest neighbors seen.
fn push_bounded(heap : &mut BinaryHeap<Neighbor>, neighbor : Neighbor, k : usize) {
    if heap.len() < k {
        heap.push(neighbor);
    }
    else if let Some(worst) = heap.peek() {
        if neighbor < *worst {
            heap.pop();
            heap.push(neighbor);
        }
    }
}

/// Find the k nearest candidates to the target, excluding the candidate at
/// `skip_candidate` (usually the target itself). Returns neighbors in
/// ascending distance order.
pub fn top_k_nearest(target : &Point, candidates : &[Point], skip_candidate : Option<usize>, k : usize) -> Vec<Neighbor> {
    if k == 0 || candidates.is_empty() { return Vec::new(); }
    let merged : BinaryHeap<Neighbor> = candidates
        .par_chunks(BATCH_SIZE)
        .enumerate()
        .fold(BinaryHeap::new, |mut heap, (chunk_index, chunk)| {
            let base = chunk_index * BATCH_SIZE;
            for (offset, candidate) in chunk.iter().enumerate() {
                let position = base + offset;
                if Some(position) == skip_candidate { continue; }
                let neighbor = Neighbor {
                    square_distance : target.square_distance(candidate),
                    candidate : position
                };
                push_bounded(&mut heap, neighbor, k);
            }
            heap
        })
        .reduce(BinaryHeap::new, |mut kept, other| {
            for neighbor in other {
                push_bounded(&mut kept, neighbor, k);
            }
            kept
        });
    let mut neighbors = merged.into_sorted_vec();
    neighbors.truncate(k);
    neighbors
}
