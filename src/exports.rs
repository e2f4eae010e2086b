//! C ABI exports for selected monomorphizations.

use crate::comparator::{Largest, Smallest};
use crate::histogram::{simd_histogram_16, simd_histogram_8};
use crate::partition::partition_fuzzy;
use core::slice;

/// Fuzzy partition of `f32` values keeping the smallest, 64-bit ids.
///
/// Reorders `vals[0..n)` and `ids[0..n)` in place so the first `q` entries
/// (`q_min <= q <= q_max`) are the `q` smallest, and returns the separating
/// threshold. `q_out` may be null.
///
/// # Safety
///
/// `vals` and `ids` must be valid for reads and writes of `n` elements;
/// `q_out`, when non-null, must be valid for a write.
#[no_mangle]
pub unsafe extern "C" fn partition_fuzzy_smallest_f32(
    vals: *mut f32,
    ids: *mut i64,
    n: usize,
    q_min: usize,
    q_max: usize,
    q_out: *mut usize,
) -> f32 {
    if vals.is_null() || ids.is_null() {
        return 0.0;
    }
    let vals = slice::from_raw_parts_mut(vals, n);
    let ids = slice::from_raw_parts_mut(ids, n);
    let (thresh, q) = partition_fuzzy::<Smallest, f32, i64>(vals, ids, q_min, q_max);
    if !q_out.is_null() {
        *q_out = q;
    }
    thresh
}

/// Fuzzy partition of `f32` values keeping the largest, 64-bit ids.
///
/// # Safety
///
/// See [`partition_fuzzy_smallest_f32`].
#[no_mangle]
pub unsafe extern "C" fn partition_fuzzy_largest_f32(
    vals: *mut f32,
    ids: *mut i64,
    n: usize,
    q_min: usize,
    q_max: usize,
    q_out: *mut usize,
) -> f32 {
    if vals.is_null() || ids.is_null() {
        return 0.0;
    }
    let vals = slice::from_raw_parts_mut(vals, n);
    let ids = slice::from_raw_parts_mut(ids, n);
    let (thresh, q) = partition_fuzzy::<Largest, f32, i64>(vals, ids, q_min, q_max);
    if !q_out.is_null() {
        *q_out = q;
    }
    thresh
}

/// Fuzzy partition of `u16` values keeping the smallest, 64-bit ids.
/// Takes the vectorized path when `vals` is 32-byte aligned.
///
/// # Safety
///
/// See [`partition_fuzzy_smallest_f32`].
#[no_mangle]
pub unsafe extern "C" fn partition_fuzzy_smallest_u16(
    vals: *mut u16,
    ids: *mut i64,
    n: usize,
    q_min: usize,
    q_max: usize,
    q_out: *mut usize,
) -> u16 {
    if vals.is_null() || ids.is_null() {
        return 0;
    }
    let vals = slice::from_raw_parts_mut(vals, n);
    let ids = slice::from_raw_parts_mut(ids, n);
    let (thresh, q) = partition_fuzzy::<Smallest, u16, i64>(vals, ids, q_min, q_max);
    if !q_out.is_null() {
        *q_out = q;
    }
    thresh
}

/// Fuzzy partition of `u16` values keeping the largest, 64-bit ids.
///
/// # Safety
///
/// See [`partition_fuzzy_smallest_f32`].
#[no_mangle]
pub unsafe extern "C" fn partition_fuzzy_largest_u16(
    vals: *mut u16,
    ids: *mut i64,
    n: usize,
    q_min: usize,
    q_max: usize,
    q_out: *mut usize,
) -> u16 {
    if vals.is_null() || ids.is_null() {
        return 0;
    }
    let vals = slice::from_raw_parts_mut(vals, n);
    let ids = slice::from_raw_parts_mut(ids, n);
    let (thresh, q) = partition_fuzzy::<Largest, u16, i64>(vals, ids, q_min, q_max);
    if !q_out.is_null() {
        *q_out = q;
    }
    thresh
}

/// 8-bin histogram of `data[0..n)`, added into `hist[0..8)`.
/// See [`simd_histogram_8`] for the `min`/`shift` semantics.
///
/// # Safety
///
/// `data` must be valid for `n` reads and `hist` for 8 u32 writes.
#[no_mangle]
pub unsafe extern "C" fn histogram_u16_8(
    data: *const u16,
    n: usize,
    min: u16,
    shift: i32,
    hist: *mut u32,
) {
    if data.is_null() || hist.is_null() {
        return;
    }
    let data = slice::from_raw_parts(data, n);
    let hist = &mut *(hist as *mut [u32; 8]);
    simd_histogram_8(data, min, shift, hist);
}

/// 16-bin histogram of `data[0..n)`, added into `hist[0..16)`.
/// See [`simd_histogram_16`] for the `min`/`shift` semantics.
///
/// # Safety
///
/// `data` must be valid for `n` reads and `hist` for 16 u32 writes.
#[no_mangle]
pub unsafe extern "C" fn histogram_u16_16(
    data: *const u16,
    n: usize,
    min: u16,
    shift: i32,
    hist: *mut u32,
) {
    if data.is_null() || hist.is_null() {
        return;
    }
    let data = slice::from_raw_parts(data, n);
    let hist = &mut *(hist as *mut [u32; 16]);
    simd_histogram_16(data, min, shift, hist);
}
