//! 8- and 16-bin histograms of 16-bit value streams.
//!
//! The partitioner uses these to bracket quantiles quickly; they are plain
//! counting kernels otherwise. Each value is optionally mapped through
//! `(v - min) >> shift` first (16-bit wrapping subtraction, arithmetic
//! shift) and contributes to bin `v'` only when `0 <= v' < B`; a negative
//! `shift` requests the raw, unpreprocessed path.
//!
//! In the raw path the 16-bin histogram counts exact values below 16 and
//! drops everything else, while the 8-bin histogram folds the value's low
//! four bits into eight bins (`hist[b]` counts values with `v mod 16` in
//! `{b, b + 8}`, i.e. `v mod 8 == b`).
//!
//! # Example
//!
//! ```
//! use fuzzy_partition_utils::histogram::simd_histogram_8;
//!
//! let data = [3u16, 3, 7, 200];
//! let mut hist = [0u32; 8];
//! // min = 0, shift = 0: bins are the raw values, 200 is out of range
//! simd_histogram_8(&data, 0, 0, &mut hist);
//! assert_eq!(hist[3], 2);
//! assert_eq!(hist[7], 1);
//! assert_eq!(hist.iter().sum::<u32>(), 3);
//! ```
//!
//! On AVX2 the counting runs through staged 2-, 4-, 8- and 16-bit lane
//! accumulators that stay in-register for thousands of values between
//! spills; other CPUs use the scalar reference implementation. The caller
//! provides (and usually zero-initializes) the output array; counts are
//! added in place.

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod avx2;

/// Fills an 8-bin histogram of `data`, adding counts to `hist` in place.
///
/// Non-negative `shift` counts `(v - min) >> shift` for values landing in
/// `0..8`; supported shifts are `0..=8`. Negative `shift` counts raw
/// values modulo 8.
///
/// # Panics
///
/// If `shift > 8`.
pub fn simd_histogram_8(data: &[u16], min: u16, shift: i32, hist: &mut [u32; 8]) {
    assert!(
        shift <= 8,
        "histogram shift {shift} is outside the supported 0..=8 range"
    );

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    if crate::avx2_available() {
        // SAFETY: AVX2 presence checked just above.
        unsafe { histogram_8_avx2(data, min, shift, hist) };
        return;
    }

    histogram_8_reference(data, min, shift, hist);
}

/// Fills a 16-bin histogram of `data`, adding counts to `hist` in place.
///
/// Non-negative `shift` counts `(v - min) >> shift` for values landing in
/// `0..16`; supported shifts are `0..=8`. Negative `shift` counts raw
/// values below 16 and drops the rest.
///
/// # Panics
///
/// If `shift > 8`.
pub fn simd_histogram_16(data: &[u16], min: u16, shift: i32, hist: &mut [u32; 16]) {
    assert!(
        shift <= 8,
        "histogram shift {shift} is outside the supported 0..=8 range"
    );

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    if crate::avx2_available() {
        // SAFETY: AVX2 presence checked just above.
        unsafe { histogram_16_avx2(data, min, shift, hist) };
        return;
    }

    histogram_16_reference(data, min, shift, hist);
}

/// Reference implementation of [`simd_histogram_8`]; also handles the
/// scalar remainder of the vectorized path.
pub(crate) fn histogram_8_reference(data: &[u16], min: u16, shift: i32, hist: &mut [u32; 8]) {
    if shift < 0 {
        for &v in data {
            hist[(v & 7) as usize] += 1;
        }
    } else {
        for &v in data {
            let b = (v.wrapping_sub(min) as i16) >> shift;
            if b >= 0 && b < 8 {
                hist[b as usize] += 1;
            }
        }
    }
}

/// Reference implementation of [`simd_histogram_16`].
pub(crate) fn histogram_16_reference(data: &[u16], min: u16, shift: i32, hist: &mut [u32; 16]) {
    if shift < 0 {
        for &v in data {
            if v < 16 {
                hist[v as usize] += 1;
            }
        }
    } else {
        for &v in data {
            let b = (v.wrapping_sub(min) as i16) >> shift;
            if b >= 0 && b < 16 {
                hist[b as usize] += 1;
            }
        }
    }
}

/// Vectorized 8-bin path: full lanes through the staged cores, remainder
/// through the reference loop.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
unsafe fn histogram_8_avx2(data: &[u16], min: u16, shift: i32, hist: &mut [u32; 8]) {
    let (head, tail) = data.split_at(data.len() & !15);
    if shift < 0 {
        // raw fold: count v mod 16 in sixteen slots, then merge the halves
        let mut bins = [0u32; 16];
        avx2::histogram_16_core::<0, true>(head, 0, &mut bins);
        for b in 0..8 {
            hist[b] += bins[b] + bins[b + 8];
        }
    } else {
        match shift {
            0 => avx2::histogram_8_core::<0>(head, min, hist),
            1 => avx2::histogram_8_core::<1>(head, min, hist),
            2 => avx2::histogram_8_core::<2>(head, min, hist),
            3 => avx2::histogram_8_core::<3>(head, min, hist),
            4 => avx2::histogram_8_core::<4>(head, min, hist),
            5 => avx2::histogram_8_core::<5>(head, min, hist),
            6 => avx2::histogram_8_core::<6>(head, min, hist),
            7 => avx2::histogram_8_core::<7>(head, min, hist),
            8 => avx2::histogram_8_core::<8>(head, min, hist),
            _ => unreachable!("shift validated by the caller"),
        }
    }
    histogram_8_reference(tail, min, shift, hist);
}

/// Vectorized 16-bin path.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
unsafe fn histogram_16_avx2(data: &[u16], min: u16, shift: i32, hist: &mut [u32; 16]) {
    let (head, tail) = data.split_at(data.len() & !15);
    if shift < 0 {
        avx2::histogram_16_core::<0, false>(head, 0, hist);
    } else {
        match shift {
            0 => avx2::histogram_16_core::<0, false>(head, min, hist),
            1 => avx2::histogram_16_core::<1, false>(head, min, hist),
            2 => avx2::histogram_16_core::<2, false>(head, min, hist),
            3 => avx2::histogram_16_core::<3, false>(head, min, hist),
            4 => avx2::histogram_16_core::<4, false>(head, min, hist),
            5 => avx2::histogram_16_core::<5, false>(head, min, hist),
            6 => avx2::histogram_16_core::<6, false>(head, min, hist),
            7 => avx2::histogram_16_core::<7, false>(head, min, hist),
            8 => avx2::histogram_16_core::<8, false>(head, min, hist),
            _ => unreachable!("shift validated by the caller"),
        }
    }
    histogram_16_reference(tail, min, shift, hist);
}

/// Benchmark only re-exports.
#[cfg(feature = "bench")]
pub mod bench {
    pub fn histogram_8_reference(data: &[u16], min: u16, shift: i32, hist: &mut [u32; 8]) {
        super::histogram_8_reference(data, min, shift, hist)
    }

    pub fn histogram_16_reference(data: &[u16], min: u16, shift: i32, hist: &mut [u32; 16]) {
        super::histogram_16_reference(data, min, shift, hist)
    }
}
