//! Invertible correspondence between a D-dimensional vector of B-bit
//! coordinates and a single (D·B)-bit Hilbert curve index.
//!
//! The conversion follows Skilling's transpose method: Gray-code and
//! bit-exchange passes operate on a length-D array of B-bit lanes (the
//! *transposed* index), and a separate interleave step converts between the
//! lane array and the linear big-integer index.
//!
//! Interleave convention (high-order lane first): reading the linear index
//! from its most significant bit downward yields lane 0 bit B−1, lane 1 bit
//! B−1, …, lane D−1 bit B−1, then lane 0 bit B−2, and so on. The exhaustive
//! unit-step tests below pin this convention down; changing it breaks the
//! adjacency of consecutive indices.

use num_bigint::BigUint;
use num_traits::Zero;
use crate::clustering::msb::MostSignificantBit;

/// Number of bits per dimension needed to hold coordinates up to `max_coordinate`.
///
/// An exact power of two needs one more bit than the power itself, since the
/// curve's range is the half-open cube [0, 2^B).
///
/// ```
///    use slash::hilbert::transform::bits_required;
///
///    assert_eq!(bits_required(0), 1);
///    assert_eq!(bits_required(1), 1);
///    assert_eq!(bits_required(3), 2);
///    assert_eq!(bits_required(4), 3);  // power of two bumps the depth
///    assert_eq!(bits_required(999_999), 20);
/// ```
pub fn bits_required(max_coordinate : u32) -> usize {
    max_coordinate.msb() + 1
}

/// Convert coordinates into the transposed Hilbert index (one B-bit lane per
/// dimension), following Skilling's algorithm.
///
/// Each coordinate must fit in `bits` bits. A single dimension degenerates to
/// the identity map.
pub fn axes_to_transpose(coordinates : &[u32], bits : usize) -> Vec<u32> {
    debug_assert!(bits >= 1 && bits <= 32);
    let mut x = coordinates.to_vec();
    let n = x.len();
    if n == 0 { return x; }
    debug_assert!(x.iter().all(|&c| bits == 32 || c < (1_u32 << bits)));
    let m = 1_u32 << (bits - 1);

    // Inverse undo excess work
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..n {
            if x[i] & q != 0 {
                x[0] ^= p;                          // invert low bits of lane 0
            }
            else {
                let t = (x[0] ^ x[i]) & p;          // exchange low bits with lane 0
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode (cascade uses the already-updated previous lane)
    for i in 1..n {
        let previous = x[i - 1];
        x[i] ^= previous;
    }
    let mut t = 0_u32;
    let mut q = m;
    while q > 1 {
        if x[n - 1] & q != 0 { t ^= q - 1; }
        q >>= 1;
    }
    for lane in x.iter_mut() { *lane ^= t; }
    x
}

/// Convert a transposed Hilbert index back into coordinates, inverting
/// `axes_to_transpose`.
pub fn transpose_to_axes(lanes : &[u32], bits : usize) -> Vec<u32> {
    debug_assert!(bits >= 1 && bits <= 32);
    let mut x = lanes.to_vec();
    let n = x.len();
    if n == 0 { return x; }

    // Gray decode by H ^ (H/2)
    let t = x[n - 1] >> 1;
    for i in (1..n).rev() {
        let previous = x[i - 1];
        x[i] ^= previous;
    }
    x[0] ^= t;

    // Undo excess work
    let mut q = 2_u32;
    while (q as u64) < (2_u64 << (bits - 1)) {
        let p = q - 1;
        for i in (0..n).rev() {
            if x[i] & q != 0 {
                x[0] ^= p;
            }
            else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q <<= 1;
    }
    x
}

/// Interleave the transposed lanes into the linear index.
///
/// Bit k of lane d (k = 0 is the least significant bit of a lane) becomes bit
/// `k·D + (D−1−d)` of the linear index, which realizes the high-order-lane-first
/// convention documented at the top of this module.
pub fn interleave(lanes : &[u32], bits : usize) -> BigUint {
    let n = lanes.len();
    let mut index = BigUint::zero();
    for (d, &lane) in lanes.iter().enumerate() {
        for k in 0..bits {
            if (lane >> k) & 1 == 1 {
                index.set_bit((k * n + (n - 1 - d)) as u64, true);
            }
        }
    }
    index
}

/// Split a linear index back into transposed lanes, inverting `interleave`.
pub fn deinterleave(index : &BigUint, bits : usize, dimensions : usize) -> Vec<u32> {
    let mut lanes = vec![0_u32; dimensions];
    for d in 0..dimensions {
        for k in 0..bits {
            if index.bit((k * dimensions + (dimensions - 1 - d)) as u64) {
                lanes[d] |= 1 << k;
            }
        }
    }
    lanes
}

/// The Hilbert curve index of a coordinate vector, as a (D·B)-bit integer.
pub fn hilbert_index(coordinates : &[u32], bits : usize) -> BigUint {
    interleave(&axes_to_transpose(coordinates, bits), bits)
}

/// The coordinate vector at the given position along the Hilbert curve.
pub fn hilbert_axes(index : &BigUint, bits : usize, dimensions : usize) -> Vec<u32> {
    transpose_to_axes(&deinterleave(index, bits, dimensions), bits)
}
