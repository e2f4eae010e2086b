//! Integer bisection partition for 16-bit values.
//!
//! Instead of sampling thresholds from the array, this path bisects the
//! integer interval spanned by the values. Counting and compaction go
//! through a [`Kernel`] so the AVX2 implementation and the scalar fallback
//! share one control flow and produce identical results.

use crate::comparator::{Comparator, Scalar};

/// Count/compact primitives the bisection is built on.
pub(crate) trait Kernel {
    /// Minimum and maximum of the array.
    fn find_minimax(vals: &[u16]) -> (u16, u16);

    /// Entries strictly better than `thresh`, and entries equal to it.
    fn count_lt_and_eq<C: Comparator<u16>>(vals: &[u16], thresh: u16) -> (usize, usize);

    /// Stable in-place compaction keeping strictly-better entries plus the
    /// first `n_eq` ties; returns the kept count.
    fn compress_array<C: Comparator<u16>, I: Copy>(
        vals: &mut [u16],
        ids: &mut [I],
        thresh: u16,
        n_eq: usize,
    ) -> usize;
}

/// Plain scalar kernel, also the reference the vectorized kernel is tested
/// against.
pub(crate) struct ScalarKernel;

impl Kernel for ScalarKernel {
    fn find_minimax(vals: &[u16]) -> (u16, u16) {
        let mut smin = u16::MAX;
        let mut smax = u16::MIN;
        for &v in vals {
            smin = smin.min(v);
            smax = smax.max(v);
        }
        (smin, smax)
    }

    fn count_lt_and_eq<C: Comparator<u16>>(vals: &[u16], thresh: u16) -> (usize, usize) {
        super::count_lt_and_eq::<C, u16>(vals, thresh)
    }

    fn compress_array<C: Comparator<u16>, I: Copy>(
        vals: &mut [u16],
        ids: &mut [I],
        thresh: u16,
        n_eq: usize,
    ) -> usize {
        super::compress_array::<C, u16, I>(vals, ids, thresh, n_eq)
    }
}

/// Midpoint of the inclusive bracket `[s0, s1]`. Rounds toward the worse
/// side of the comparator so the bound on that side stays reachable; the
/// opposite bound is where stalls are expected (best-side value piles) and
/// the post-loop correction handles those.
#[inline]
fn midpoint<C: Comparator<u16>>(s0: u32, s1: u32) -> u16 {
    if C::IS_MAX {
        ((s0 + s1) / 2) as u16
    } else {
        ((s0 + s1 + 1) / 2) as u16
    }
}

/// Fuzzy partition with bounds taken from a min/max sweep of the array.
pub(crate) fn partition_fuzzy<C, I, K>(
    vals: &mut [u16],
    ids: &mut [I],
    q_min: usize,
    q_max: usize,
) -> (u16, usize)
where
    C: Comparator<u16>,
    I: Copy,
    K: Kernel,
{
    if q_min == 0 {
        return (0, <C::Rev as Comparator<u16>>::neutral().to_rank());
    }
    if q_max >= vals.len() {
        return (C::neutral(), q_max);
    }
    let (s0, s1) = K::find_minimax(vals);
    partition_fuzzy_with_bounds::<C, I, K>(vals, ids, q_min, q_max, s0, s1)
}

/// Fuzzy partition of `vals`/`ids` by bisection over `[s0, s1]`, which must
/// bracket every value in the array.
pub(crate) fn partition_fuzzy_with_bounds<C, I, K>(
    vals: &mut [u16],
    ids: &mut [I],
    q_min: usize,
    q_max: usize,
    s0: u16,
    s1: u16,
) -> (u16, usize)
where
    C: Comparator<u16>,
    I: Copy,
    K: Kernel,
{
    let n = vals.len();
    if q_min == 0 {
        return (0, <C::Rev as Comparator<u16>>::neutral().to_rank());
    }
    if q_max >= n {
        return (C::neutral(), q_max);
    }
    if s0 == s1 {
        // the whole range is one tie; any prefix is a valid answer
        return (s0, q_min);
    }

    let (mut s0, mut s1) = (s0 as u32, s1 as u32);
    let mut n_lt = 0usize;
    let mut n_eq = 0usize;
    let mut q = 0usize;
    let mut thresh = midpoint::<C>(s0, s1);

    for _ in 0..super::MAX_BISECT_ITERATIONS {
        (n_lt, n_eq) = K::count_lt_and_eq::<C>(vals, thresh);

        if n_lt <= q_min {
            if n_lt + n_eq >= q_min {
                q = q_min;
                break;
            }
            // too few survivors: move toward the worse side
            if C::IS_MAX {
                s1 = thresh as u32;
            } else {
                s0 = thresh as u32;
            }
        } else if n_lt <= q_max {
            q = n_lt;
            break;
        } else {
            // too many survivors: move toward the better side
            if C::IS_MAX {
                s0 = thresh as u32;
            } else {
                s1 = thresh as u32;
            }
        }

        let new_thresh = midpoint::<C>(s0, s1);
        if new_thresh == thresh {
            // bracket cannot shrink further
            break;
        }
        thresh = new_thresh;
    }

    let mut n_eq_keep = q as i64 - n_lt as i64;
    if n_eq_keep < 0 {
        // more than q entries pile up at the best end of the bracket; a
        // one-value step toward the better side lands on the pile
        q = q_min;
        thresh = if C::IS_MAX { thresh + 1 } else { thresh - 1 };
        n_eq_keep = q as i64;
    } else {
        debug_assert!(n_eq_keep as usize <= n_eq);
    }

    let wp = K::compress_array::<C, I>(vals, ids, thresh, n_eq_keep as usize);
    debug_assert_eq!(wp, q, "compaction kept a different count than the chosen rank");
    (thresh, q)
}
