//! Fuzzy rank partitioning of parallel value/id arrays.
//!
//! Given values, identifiers and a rank window `[q_min, q_max]`, the
//! partitioner reorders both arrays in place so that the first `q` entries
//! (for some `q` in the window) are the `q` best entries under a
//! [`Comparator`], and returns the threshold value that separates kept from
//! discarded entries. Order within the kept prefix is unspecified; entries
//! beyond it are left in an unspecified state. Identifiers always stay
//! paired with their values.
//!
//! The window gives the algorithm freedom to stop at the first threshold
//! that yields a valid rank, which is what makes a single bisection pass
//! sufficient in practice.
//!
//! # Example
//!
//! ```
//! use fuzzy_partition_utils::comparator::Smallest;
//! use fuzzy_partition_utils::partition::partition_fuzzy;
//!
//! let mut vals = [5.0f32, 3.0, 8.0, 1.0, 4.0, 9.0, 2.0, 7.0];
//! let mut ids = [10u32, 20, 30, 40, 50, 60, 70, 80];
//! let (thresh, q) = partition_fuzzy::<Smallest, f32, u32>(&mut vals, &mut ids, 3, 3);
//! assert_eq!((thresh, q), (3.0, 3));
//! ```
//!
//! # Implementations
//!
//! The generic path bisects on thresholds sampled from the array itself
//! (median of three of a prime-stride walk). For `u16` values in a 32-byte
//! aligned buffer, [`partition_fuzzy`] instead bisects over the integer
//! value range, with AVX2 kernels for counting and compaction when the CPU
//! supports them. The scalar fallback of that path runs the exact same
//! bisection, so `(thresh, q)` and the output arrays do not depend on
//! runtime CPU features.

pub(crate) mod bounded;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) mod avx2;

use crate::comparator::{median3, Comparator, Scalar};

/// Prime stride of the threshold sampler's deterministic walk. Coprime to
/// every realistic array length, so the walk visits each index once.
const SAMPLE_STRIDE: u64 = 6_700_417;

/// Hard cap on bisection iterations, a defense against distributions and
/// float rounding that fail to shrink the bracket.
const MAX_BISECT_ITERATIONS: usize = 200;

#[inline]
fn is_aligned_32<T>(ptr: *const T) -> bool {
    (ptr as usize) & 31 == 0
}

/// Reorders `vals` and `ids` in place so the first `q` entries
/// (`q_min <= q <= q_max`) are the `q` best under `C`, returning
/// `(thresh, q)`.
///
/// Kept entries rank better than or equal to `thresh`. Values equal to
/// `C::neutral()` can never be selected by a threshold; windows reachable
/// only through such values end with `q = 0`.
///
/// Early outs: `q_min == 0` returns value zero and a rank slot holding
/// `C::Rev::neutral()` converted to `usize` (a historical sentinel, kept
/// for compatibility); `q_max >= vals.len()` returns `C::neutral()` and
/// `q_max` without touching the arrays. Outside the early outs the generic
/// path needs at least 3 values.
///
/// # Panics
///
/// If the slices differ in length, if `q_min > q_max`, or if the generic
/// path is given fewer than 3 values outside the early outs.
pub fn partition_fuzzy<C, T, I>(
    vals: &mut [T],
    ids: &mut [I],
    q_min: usize,
    q_max: usize,
) -> (T, usize)
where
    C: Comparator<T>,
    T: Scalar,
    I: Copy,
{
    assert_eq!(
        vals.len(),
        ids.len(),
        "value and id arrays must have the same length"
    );
    assert!(q_min <= q_max, "invalid rank window: q_min > q_max");
    <T as Scalar>::partition_fuzzy_dispatch::<C, I>(vals, ids, q_min, q_max)
}

/// u16 fast path selection: the bounded integer bisection whenever the
/// buffer satisfies the 32-byte alignment precondition, otherwise the
/// generic sampling path.
pub(crate) fn partition_fuzzy_u16<C, I>(
    vals: &mut [u16],
    ids: &mut [I],
    q_min: usize,
    q_max: usize,
) -> (u16, usize)
where
    C: Comparator<u16>,
    I: Copy,
{
    if is_aligned_32(vals.as_ptr()) {
        run_bounded::<C, I>(vals, ids, q_min, q_max, None)
    } else {
        partition_fuzzy_median3::<C, u16, I>(vals, ids, q_min, q_max)
    }
}

/// Vectorized fuzzy partition of 32-byte aligned `u16` values.
///
/// Same contract as [`partition_fuzzy`], but bisects over the integer value
/// range `[min, max]` of the input instead of sampling thresholds, and uses
/// AVX2 kernels when available at runtime. Results are identical with and
/// without AVX2.
///
/// # Panics
///
/// If the slices differ in length, `q_min > q_max`, or the value buffer is
/// not 32-byte aligned.
pub fn simd_partition_fuzzy<C, I>(
    vals: &mut [u16],
    ids: &mut [I],
    q_min: usize,
    q_max: usize,
) -> (u16, usize)
where
    C: Comparator<u16>,
    I: Copy,
{
    assert_eq!(
        vals.len(),
        ids.len(),
        "value and id arrays must have the same length"
    );
    assert!(q_min <= q_max, "invalid rank window: q_min > q_max");
    assert!(
        is_aligned_32(vals.as_ptr()),
        "simd partition requires a 32-byte aligned value buffer"
    );
    run_bounded::<C, I>(vals, ids, q_min, q_max, None)
}

/// [`simd_partition_fuzzy`] with an exact target rank.
pub fn simd_partition<C, I>(vals: &mut [u16], ids: &mut [I], q: usize) -> u16
where
    C: Comparator<u16>,
    I: Copy,
{
    simd_partition_fuzzy::<C, I>(vals, ids, q, q).0
}

/// [`simd_partition`] with caller-supplied value bounds.
///
/// `s0` and `s1` must bracket every value in the array
/// (`s0 <= min`, `max <= s1`); [`simd_partition`] derives them with a
/// min/max sweep instead. When `s0 == s1` the whole range is one tie and
/// the call returns `s0` immediately with rank `q`.
pub fn simd_partition_with_bounds<C, I>(
    vals: &mut [u16],
    ids: &mut [I],
    q: usize,
    s0: u16,
    s1: u16,
) -> u16
where
    C: Comparator<u16>,
    I: Copy,
{
    assert_eq!(
        vals.len(),
        ids.len(),
        "value and id arrays must have the same length"
    );
    assert!(
        is_aligned_32(vals.as_ptr()),
        "simd partition requires a 32-byte aligned value buffer"
    );
    run_bounded::<C, I>(vals, ids, q, q, Some((s0, s1))).0
}

fn run_bounded<C, I>(
    vals: &mut [u16],
    ids: &mut [I],
    q_min: usize,
    q_max: usize,
    bounds: Option<(u16, u16)>,
) -> (u16, usize)
where
    C: Comparator<u16>,
    I: Copy,
{
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    if crate::avx2_available() {
        return match bounds {
            Some((s0, s1)) => bounded::partition_fuzzy_with_bounds::<C, I, avx2::Avx2Kernel>(
                vals, ids, q_min, q_max, s0, s1,
            ),
            None => bounded::partition_fuzzy::<C, I, avx2::Avx2Kernel>(vals, ids, q_min, q_max),
        };
    }

    match bounds {
        Some((s0, s1)) => bounded::partition_fuzzy_with_bounds::<C, I, bounded::ScalarKernel>(
            vals, ids, q_min, q_max, s0, s1,
        ),
        None => bounded::partition_fuzzy::<C, I, bounded::ScalarKernel>(vals, ids, q_min, q_max),
    }
}

/// Samples a threshold strictly inside the open bracket
/// `(thresh_inf, thresh_sup)`: the median of the first three such values
/// met on a prime-stride walk of the array, the first such value if fewer
/// than three exist, or `thresh_inf` itself if the bracket is empty.
pub(crate) fn sample_threshold_median3<C, T>(vals: &[T], thresh_inf: T, thresh_sup: T) -> T
where
    C: Comparator<T>,
    T: Scalar,
{
    let n = vals.len() as u64;
    let mut picked = [thresh_inf; 3];
    let mut vi = 0;
    for i in 0..n {
        let v = vals[((i * SAMPLE_STRIDE) % n) as usize];
        if C::cmp(thresh_inf, v) && C::cmp(v, thresh_sup) {
            picked[vi] = v;
            vi += 1;
            if vi == 3 {
                break;
            }
        }
    }
    match vi {
        3 => median3::<C, T>(picked[0], picked[1], picked[2]),
        0 => thresh_inf,
        _ => picked[0],
    }
}

/// Counts entries strictly better than `thresh` and entries equal to it.
pub(crate) fn count_lt_and_eq<C, T>(vals: &[T], thresh: T) -> (usize, usize)
where
    C: Comparator<T>,
    T: Scalar,
{
    let mut n_lt = 0;
    let mut n_eq = 0;
    for &v in vals {
        if C::cmp(v, thresh) {
            n_lt += 1;
        } else if v == thresh {
            n_eq += 1;
        }
    }
    (n_lt, n_eq)
}

/// Stable in-place compaction: keeps every entry strictly better than
/// `thresh` plus the first `n_eq` entries equal to it, identifiers moving
/// in lockstep. Returns the number of entries kept.
pub(crate) fn compress_array<C, T, I>(
    vals: &mut [T],
    ids: &mut [I],
    thresh: T,
    mut n_eq: usize,
) -> usize
where
    C: Comparator<T>,
    T: Scalar,
    I: Copy,
{
    let mut wp = 0;
    for i in 0..vals.len() {
        if C::cmp(vals[i], thresh) {
            vals[wp] = vals[i];
            ids[wp] = ids[i];
            wp += 1;
        } else if n_eq > 0 && vals[i] == thresh {
            vals[wp] = vals[i];
            ids[wp] = ids[i];
            wp += 1;
            n_eq -= 1;
        }
    }
    debug_assert_eq!(n_eq, 0, "compression did not consume its tie budget");
    wp
}

/// Generic fuzzy partition: bisection on thresholds sampled from the array,
/// with a median-of-three starting point.
pub(crate) fn partition_fuzzy_median3<C, T, I>(
    vals: &mut [T],
    ids: &mut [I],
    q_min: usize,
    q_max: usize,
) -> (T, usize)
where
    C: Comparator<T>,
    T: Scalar,
    I: Copy,
{
    let n = vals.len();
    if q_min == 0 {
        return (T::ZERO, <C::Rev as Comparator<T>>::neutral().to_rank());
    }
    if q_max >= n {
        return (C::neutral(), q_max);
    }
    assert!(n >= 3, "fuzzy partition needs at least 3 values, got {n}");

    let mut thresh_inf = <C::Rev as Comparator<T>>::neutral();
    let mut thresh_sup = C::neutral();
    let mut thresh = median3::<C, T>(vals[0], vals[n / 2], vals[n - 1]);

    let mut n_lt = 0usize;
    let mut n_eq = 0usize;
    let mut q = 0usize;

    for _ in 0..MAX_BISECT_ITERATIONS {
        (n_lt, n_eq) = count_lt_and_eq::<C, T>(vals, thresh);

        if n_lt <= q_min {
            if n_lt + n_eq >= q_min {
                q = q_min;
                break;
            }
            // not worse enough: too few entries survive this threshold
            thresh_inf = thresh;
        } else if n_lt <= q_max {
            q = n_lt;
            break;
        } else {
            thresh_sup = thresh;
        }

        let new_thresh = sample_threshold_median3::<C, T>(vals, thresh_inf, thresh_sup);
        if new_thresh == thresh_inf {
            // nothing left strictly inside the bracket
            break;
        }
        thresh = new_thresh;
    }

    let mut n_eq_keep = q as i64 - n_lt as i64;
    if n_eq_keep < 0 {
        // more than q entries pile up at the best end of the bracket; step
        // the threshold one representable value onto the pile and keep
        // q_min of its members
        q = q_min;
        thresh = <C::Rev as Comparator<T>>::nextafter(thresh);
        n_eq_keep = q as i64;
    } else {
        debug_assert!(n_eq_keep as usize <= n_eq);
    }

    let wp = compress_array::<C, T, I>(vals, ids, thresh, n_eq_keep as usize);
    debug_assert_eq!(wp, q, "compaction kept a different count than the chosen rank");
    (thresh, q)
}

/// Benchmark only re-exports.
#[cfg(feature = "bench")]
pub mod bench {
    use crate::comparator::Comparator;

    pub fn partition_fuzzy_median3_f32<C: Comparator<f32>, I: Copy>(
        vals: &mut [f32],
        ids: &mut [I],
        q_min: usize,
        q_max: usize,
    ) -> (f32, usize) {
        super::partition_fuzzy_median3::<C, f32, I>(vals, ids, q_min, q_max)
    }

    /// The u16 integer bisection with the scalar kernel, regardless of CPU
    /// features.
    pub fn partition_fuzzy_u16_scalar_kernel<C: Comparator<u16>, I: Copy>(
        vals: &mut [u16],
        ids: &mut [I],
        q_min: usize,
        q_max: usize,
    ) -> (u16, usize) {
        super::bounded::partition_fuzzy::<C, I, super::bounded::ScalarKernel>(
            vals, ids, q_min, q_max,
        )
    }
}
