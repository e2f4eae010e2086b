//! AVX2 kernels for the 16-bit partition path: min/max sweep, packed-mask
//! counting, and bitmap-driven compaction, sixteen lanes at a time.
//!
//! All loads of the value array are aligned; the dispatch boundary asserts
//! the 32-byte alignment precondition before selecting this kernel.

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use super::bounded::Kernel;
use crate::comparator::Comparator;

pub(crate) struct Avx2Kernel;

impl Kernel for Avx2Kernel {
    #[inline]
    fn find_minimax(vals: &[u16]) -> (u16, u16) {
        // SAFETY: this kernel is only selected after runtime AVX2 detection
        // and the alignment assert at the dispatch boundary.
        unsafe { find_minimax_avx2(vals) }
    }

    #[inline]
    fn count_lt_and_eq<C: Comparator<u16>>(vals: &[u16], thresh: u16) -> (usize, usize) {
        // SAFETY: see find_minimax.
        unsafe { count_lt_and_eq_avx2::<C>(vals, thresh) }
    }

    #[inline]
    fn compress_array<C: Comparator<u16>, I: Copy>(
        vals: &mut [u16],
        ids: &mut [I],
        thresh: u16,
        n_eq: usize,
    ) -> usize {
        // SAFETY: see find_minimax.
        unsafe { compress_array_avx2::<C, I>(vals, ids, thresh, n_eq) }
    }
}

/// Mask of lanes ranking better than or equal to the threshold.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn better_or_equal<C: Comparator<u16>>(v: __m256i, thr: __m256i) -> __m256i {
    if C::IS_MAX {
        _mm256_cmpeq_epi16(v, _mm256_max_epu16(v, thr))
    } else {
        _mm256_cmpeq_epi16(v, _mm256_min_epu16(v, thr))
    }
}

/// Mask of lanes ranking worse than or equal to the threshold.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn worse_or_equal<C: Comparator<u16>>(v: __m256i, thr: __m256i) -> __m256i {
    if C::IS_MAX {
        _mm256_cmpeq_epi16(v, _mm256_min_epu16(v, thr))
    } else {
        _mm256_cmpeq_epi16(v, _mm256_max_epu16(v, thr))
    }
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn find_minimax_avx2(vals: &[u16]) -> (u16, u16) {
    let n1 = vals.len() / 16;
    let mut vmin = _mm256_set1_epi16(-1);
    let mut vmax = _mm256_setzero_si256();
    let mut ptr = vals.as_ptr();
    for _ in 0..n1 {
        let v = _mm256_load_si256(ptr as *const __m256i);
        ptr = ptr.add(16);
        vmin = _mm256_min_epu16(vmin, v);
        vmax = _mm256_max_epu16(vmax, v);
    }

    let mut mins = [u16::MAX; 16];
    let mut maxs = [0u16; 16];
    if n1 > 0 {
        _mm256_storeu_si256(mins.as_mut_ptr() as *mut __m256i, vmin);
        _mm256_storeu_si256(maxs.as_mut_ptr() as *mut __m256i, vmax);
    }

    let mut smin = u16::MAX;
    let mut smax = u16::MIN;
    for i in 0..16 {
        smin = smin.min(mins[i]);
        smax = smax.max(maxs[i]);
    }
    for &v in &vals[n1 * 16..] {
        smin = smin.min(v);
        smax = smax.max(v);
    }
    (smin, smax)
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn count_lt_and_eq_avx2<C: Comparator<u16>>(
    vals: &[u16],
    thresh: u16,
) -> (usize, usize) {
    let n1 = vals.len() / 16;
    let thr = _mm256_set1_epi16(thresh as i16);
    let mut n_lt = 0usize;
    let mut n_eq = 0usize;
    let mut ptr = vals.as_ptr();

    for _ in 0..n1 {
        let v = _mm256_load_si256(ptr as *const __m256i);
        ptr = ptr.add(16);
        let eq = _mm256_cmpeq_epi16(v, thr);
        let we = worse_or_equal::<C>(v, thr);
        // saturate both 16-bit masks down to bytes and grab the sign bits:
        // per 128-bit half, the low byte group carries eq, the high one
        // worse-or-equal
        let bits = _mm256_movemask_epi8(_mm256_packs_epi16(eq, we)) as u32;
        n_eq += (bits & 0x00ff_00ff).count_ones() as usize;
        n_lt += 16 - (bits & 0xff00_ff00).count_ones() as usize;
    }

    let (tail_lt, tail_eq) = super::count_lt_and_eq::<C, u16>(&vals[n1 * 16..], thresh);
    (n_lt + tail_lt, n_eq + tail_eq)
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn compress_array_avx2<C: Comparator<u16>, I: Copy>(
    vals: &mut [u16],
    ids: &mut [I],
    thresh: u16,
    mut n_eq: usize,
) -> usize {
    let n = vals.len();
    let n1 = n / 16;
    let thr = _mm256_set1_epi16(thresh as i16);
    let vptr = vals.as_mut_ptr();
    let iptr = ids.as_mut_ptr();
    let mut wp = 0usize;
    let mut i0 = 0usize;

    // Phase A: the tie budget is open. Each lane yields a word with two
    // bits per element: bit 2j marks element j equal to the threshold, bit
    // 2j+1 marks it strictly better. A trailing-zero scan visits survivors
    // in order, so the compaction stays stable. Writes can only land at or
    // before the element being copied, never on an unprocessed one.
    while i0 < n1 * 16 && n_eq > 0 {
        let v = _mm256_load_si256(vptr.add(i0) as *const __m256i);
        let eq = _mm256_cmpeq_epi16(v, thr);
        let strict = _mm256_andnot_si256(eq, better_or_equal::<C>(v, thr));
        let eq_bits = _mm256_movemask_epi8(eq) as u32;
        let strict_bits = _mm256_movemask_epi8(strict) as u32;
        let mut word = (eq_bits & 0x5555_5555) | (strict_bits & 0xaaaa_aaaa);
        while word != 0 {
            let pos = word.trailing_zeros() as usize;
            let j = pos >> 1;
            let idx = i0 + j;
            if pos & 1 == 1 {
                // strictly better, kept unconditionally
                *vptr.add(wp) = *vptr.add(idx);
                *iptr.add(wp) = *iptr.add(idx);
                wp += 1;
            } else if n_eq > 0 {
                *vptr.add(wp) = *vptr.add(idx);
                *iptr.add(wp) = *iptr.add(idx);
                wp += 1;
                n_eq -= 1;
            }
            word &= !(0b11 << (2 * j));
        }
        i0 += 16;
    }

    // Phase B: budget exhausted, ties are dropped.
    while i0 < n1 * 16 {
        let v = _mm256_load_si256(vptr.add(i0) as *const __m256i);
        let eq = _mm256_cmpeq_epi16(v, thr);
        let strict = _mm256_andnot_si256(eq, better_or_equal::<C>(v, thr));
        let mut word = _mm256_movemask_epi8(strict) as u32;
        while word != 0 {
            let pos = word.trailing_zeros() as usize;
            let j = pos >> 1;
            let idx = i0 + j;
            *vptr.add(wp) = *vptr.add(idx);
            *iptr.add(wp) = *iptr.add(idx);
            wp += 1;
            word &= !(0b11 << (2 * j));
        }
        i0 += 16;
    }

    // scalar remainder, same rule
    for idx in n1 * 16..n {
        let v = *vptr.add(idx);
        if C::cmp(v, thresh) {
            *vptr.add(wp) = v;
            *iptr.add(wp) = *iptr.add(idx);
            wp += 1;
        } else if n_eq > 0 && v == thresh {
            *vptr.add(wp) = v;
            *iptr.add(wp) = *iptr.add(idx);
            wp += 1;
            n_eq -= 1;
        }
    }

    debug_assert_eq!(n_eq, 0, "compression did not consume its tie budget");
    wp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligned::AlignedU16s;
    use crate::comparator::{Largest, Smallest};
    use crate::partition::bounded::{self, ScalarKernel};
    use std::vec::Vec;

    fn have_avx2() -> bool {
        std::is_x86_feature_detected!("avx2")
    }

    fn aligned_data(n: usize, modulus: u64) -> AlignedU16s {
        let values: Vec<u16> = (0..n as u64)
            .map(|i| (i.wrapping_mul(2654435761) % modulus) as u16)
            .collect();
        AlignedU16s::from_values(&values)
    }

    #[test]
    fn minimax_matches_scalar() {
        if !have_avx2() {
            return;
        }
        for &n in &[1usize, 15, 16, 17, 64, 100, 1000] {
            let data = aligned_data(n, 60_000);
            let expect = <ScalarKernel as Kernel>::find_minimax(data.as_slice());
            let got = <Avx2Kernel as Kernel>::find_minimax(data.as_slice());
            assert_eq!(got, expect, "n={n}");
        }
    }

    #[test]
    fn count_matches_scalar() {
        if !have_avx2() {
            return;
        }
        for &n in &[0usize, 1, 15, 16, 17, 33, 64, 257, 1024] {
            for &modulus in &[7u64, 251, 60_000] {
                let data = aligned_data(n, modulus);
                for &thresh in &[0u16, 1, 3, 100, 250, 40_000, u16::MAX] {
                    let expect =
                        <ScalarKernel as Kernel>::count_lt_and_eq::<Smallest>(data.as_slice(), thresh);
                    let got =
                        <Avx2Kernel as Kernel>::count_lt_and_eq::<Smallest>(data.as_slice(), thresh);
                    assert_eq!(got, expect, "smallest n={n} mod={modulus} thresh={thresh}");

                    let expect =
                        <ScalarKernel as Kernel>::count_lt_and_eq::<Largest>(data.as_slice(), thresh);
                    let got =
                        <Avx2Kernel as Kernel>::count_lt_and_eq::<Largest>(data.as_slice(), thresh);
                    assert_eq!(got, expect, "largest n={n} mod={modulus} thresh={thresh}");
                }
            }
        }
    }

    #[test]
    fn compress_matches_scalar_bit_for_bit() {
        if !have_avx2() {
            return;
        }
        for &n in &[0usize, 1, 15, 16, 17, 64, 100, 515] {
            for &modulus in &[5u64, 97] {
                let data = aligned_data(n, modulus);
                let ids: Vec<u32> = (0..n as u32).collect();
                for &thresh in &[0u16, 1, 2, 50, 96] {
                    let (n_lt, n_eq) =
                        <ScalarKernel as Kernel>::count_lt_and_eq::<Smallest>(data.as_slice(), thresh);
                    for budget in [0usize, 1.min(n_eq), n_eq / 2, n_eq] {
                        let mut v_ref = data.as_slice().to_vec();
                        let mut id_ref = ids.clone();
                        let wp_ref = <ScalarKernel as Kernel>::compress_array::<Smallest, u32>(
                            &mut v_ref, &mut id_ref, thresh, budget,
                        );

                        let mut v_simd = AlignedU16s::from_values(data.as_slice());
                        let mut id_simd = ids.clone();
                        let wp = <Avx2Kernel as Kernel>::compress_array::<Smallest, u32>(
                            v_simd.as_mut_slice(),
                            &mut id_simd,
                            thresh,
                            budget,
                        );

                        assert_eq!(wp, wp_ref);
                        assert_eq!(wp, n_lt + budget);
                        assert_eq!(v_simd.as_slice()[..wp], v_ref[..wp]);
                        assert_eq!(id_simd[..wp], id_ref[..wp]);
                    }
                }
            }
        }
    }

    #[test]
    fn full_partition_matches_the_scalar_kernel_bit_for_bit() {
        if !have_avx2() {
            return;
        }
        for &n in &[2usize, 15, 16, 31, 64, 100, 1024] {
            for &modulus in &[3u64, 101, 50_000] {
                let data = aligned_data(n, modulus);
                let ids: Vec<u64> = (0..n as u64).collect();
                for &(q_min, q_max) in &[(1usize, 1usize), (1, n - 1), (n / 2, n / 2 + 3)] {
                    let q_max = q_max.min(n - 1);
                    let q_min = q_min.max(1).min(q_max);

                    let mut v_ref = data.as_slice().to_vec();
                    let mut id_ref = ids.clone();
                    let r_ref = bounded::partition_fuzzy::<Smallest, u64, ScalarKernel>(
                        &mut v_ref, &mut id_ref, q_min, q_max,
                    );

                    let mut v_simd = AlignedU16s::from_values(data.as_slice());
                    let mut id_simd = ids.clone();
                    let r_simd = bounded::partition_fuzzy::<Smallest, u64, Avx2Kernel>(
                        v_simd.as_mut_slice(),
                        &mut id_simd,
                        q_min,
                        q_max,
                    );

                    assert_eq!(r_simd, r_ref, "n={n} mod={modulus} window=({q_min},{q_max})");
                    let q = r_ref.1;
                    assert_eq!(v_simd.as_slice()[..q], v_ref[..q]);
                    assert_eq!(id_simd[..q], id_ref[..q]);
                }
            }
        }
    }
}
