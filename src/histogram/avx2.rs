//! Staged histogram accumulation on AVX2.
//!
//! Every 16-bit lane of the working vector is an independent sub-histogram
//! of eight 2-bit counters. A shuffle table turns a bin index into a
//! one-hot contribution, and the counters are repeatedly widened in
//! register (2 -> 4 -> 8 -> 16 bits) so memory is touched only once per
//! couple hundred thousand input values:
//!
//! - 2-bit fields take at most 3 one-hot adds,
//! - nibbles take 5 of those flushes (max 15),
//! - bytes take 8 nibble spreads (max 240),
//! - u16 lanes take 128 byte expansions before draining to the caller.
//!
//! Sixteen bins are handled as two eight-bin pipelines selected by bit 3
//! of the preprocessed value.

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

const ADDS_2BIT: usize = 3;
const FLUSHES_4BIT: usize = 5;
const FLUSHES_8BIT: usize = 8;
const FLUSHES_16BIT: usize = 128;

/// One-hot table for `_mm256_shuffle_epi8`. A bin index `b` in `0..8`
/// looks up the byte pair `(T[b], T[b | 8])`; bins 0, 1, 4, 5 live in the
/// low byte of the lane, bins 2, 3, 6, 7 in the high byte. The resulting
/// 2-bit field layout per lane (bit offset -> bin) is
/// 0->0, 2->4, 4->1, 6->5, 8->2, 10->6, 12->3, 14->7; the widening stages
/// unscramble it.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn one_hot_table() -> __m256i {
    _mm256_setr_epi8(
        1, 16, 0, 0, 4, 64, 0, 0, 0, 0, 1, 16, 0, 0, 4, 64, //
        1, 16, 0, 0, 4, 64, 0, 0, 0, 0, 1, 16, 0, 0, 4, 64,
    )
}

/// Turns 16 bin indices (0..8, or 0xffff for lanes that must not
/// contribute) into one-hot 2-bit contributions. Invalid lanes have the
/// top bit of both key bytes set, which shuffles to zero.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn one_hot_16(bins: __m256i, table: __m256i) -> __m256i {
    let key = _mm256_or_si256(
        bins,
        _mm256_slli_epi16::<8>(_mm256_or_si256(bins, _mm256_set1_epi16(8))),
    );
    _mm256_shuffle_epi8(table, key)
}

/// Spreads nibble counters to bytes, summing adjacent lanes: the result
/// bytes stay at or below 30, so eight of these fit a u8 accumulator.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn widen_nibbles(a4: __m256i) -> __m256i {
    let m = _mm256_set1_epi16(0x0f0f);
    let even = _mm256_and_si256(a4, m);
    let odd = _mm256_and_si256(_mm256_srli_epi16::<4>(a4), m);
    _mm256_hadd_epi16(even, odd)
}

/// Expands byte counters to u16 lanes, again summing adjacent lanes.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn widen_bytes(a8: __m256i) -> __m256i {
    let even = _mm256_and_si256(a8, _mm256_set1_epi16(0x00ff));
    let odd = _mm256_srli_epi16::<8>(a8);
    _mm256_hadd_epi16(even, odd)
}

/// The widened accumulators of one eight-bin pipeline.
struct BinPipeline {
    a4_lo: __m256i, // nibble counters, bins 0..4
    a4_hi: __m256i, // bins 4..8
    a8_lo: __m256i,
    a8_hi: __m256i,
    a16_lo: __m256i,
    a16_hi: __m256i,
}

impl BinPipeline {
    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn new() -> Self {
        let z = _mm256_setzero_si256();
        BinPipeline {
            a4_lo: z,
            a4_hi: z,
            a8_lo: z,
            a8_hi: z,
            a16_lo: z,
            a16_hi: z,
        }
    }

    /// Folds a 2-bit accumulator (at most [`ADDS_2BIT`] one-hot adds) into
    /// the nibble counters: the even fields are bins 0..4, the odd fields
    /// bins 4..8.
    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn flush2(&mut self, a2: __m256i) {
        let m = _mm256_set1_epi16(0x3333);
        self.a4_lo = _mm256_add_epi16(self.a4_lo, _mm256_and_si256(a2, m));
        self.a4_hi = _mm256_add_epi16(
            self.a4_hi,
            _mm256_and_si256(_mm256_srli_epi16::<2>(a2), m),
        );
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn flush4(&mut self) {
        self.a8_lo = _mm256_add_epi8(self.a8_lo, widen_nibbles(self.a4_lo));
        self.a8_hi = _mm256_add_epi8(self.a8_hi, widen_nibbles(self.a4_hi));
        self.a4_lo = _mm256_setzero_si256();
        self.a4_hi = _mm256_setzero_si256();
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn flush8(&mut self) {
        self.a16_lo = _mm256_add_epi16(self.a16_lo, widen_bytes(self.a8_lo));
        self.a16_hi = _mm256_add_epi16(self.a16_hi, widen_bytes(self.a8_hi));
        self.a8_lo = _mm256_setzero_si256();
        self.a8_hi = _mm256_setzero_si256();
    }

    /// Spills the u16 lanes into `bins[0..8]` and clears them.
    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn drain(&mut self, bins: &mut [u32]) {
        drain_lanes(self.a16_lo, &mut bins[..4]);
        drain_lanes(self.a16_hi, &mut bins[4..8]);
        self.a16_lo = _mm256_setzero_si256();
        self.a16_hi = _mm256_setzero_si256();
    }
}

/// After the two hadd stages, bin `b` of a four-bin group is spread over
/// u16 lanes `2b`, `2b + 1`, `8 + 2b` and `9 + 2b`.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn drain_lanes(a16: __m256i, bins: &mut [u32]) {
    let mut lanes = [0u16; 16];
    _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, a16);
    for b in 0..4 {
        bins[b] += lanes[2 * b] as u32
            + lanes[2 * b + 1] as u32
            + lanes[8 + 2 * b] as u32
            + lanes[9 + 2 * b] as u32;
    }
}

/// Eight-bin core with `(v - min) >> SHIFT` preprocessing. Only the full
/// 16-lane prefix of `data` is consumed; the caller handles the remainder.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn histogram_8_core<const SHIFT: i32>(
    data: &[u16],
    min: u16,
    hist: &mut [u32; 8],
) {
    let n1 = data.len() / 16;
    let table = one_hot_table();
    let minv = _mm256_set1_epi16(min as i16);
    let ones = _mm256_set1_epi16(-1);
    let range_mask = _mm256_set1_epi16(0xfff8u16 as i16);
    let mut pipe = BinPipeline::new();
    let mut a2 = _mm256_setzero_si256();
    let (mut k2, mut k4, mut k8, mut k16) = (0usize, 0usize, 0usize, 0usize);
    let mut ptr = data.as_ptr();

    for _ in 0..n1 {
        let v = _mm256_loadu_si256(ptr as *const __m256i);
        ptr = ptr.add(16);
        let vp = _mm256_srai_epi16::<SHIFT>(_mm256_sub_epi16(v, minv));
        // in range iff nothing is left outside the low 3 bits (this also
        // rejects negative lanes through their sign bits)
        let valid = _mm256_cmpeq_epi16(_mm256_and_si256(vp, range_mask), _mm256_setzero_si256());
        let bins = _mm256_or_si256(vp, _mm256_xor_si256(valid, ones));
        a2 = _mm256_add_epi16(a2, one_hot_16(bins, table));

        k2 += 1;
        if k2 == ADDS_2BIT {
            k2 = 0;
            pipe.flush2(a2);
            a2 = _mm256_setzero_si256();
            k4 += 1;
            if k4 == FLUSHES_4BIT {
                k4 = 0;
                pipe.flush4();
                k8 += 1;
                if k8 == FLUSHES_8BIT {
                    k8 = 0;
                    pipe.flush8();
                    k16 += 1;
                    if k16 == FLUSHES_16BIT {
                        k16 = 0;
                        pipe.drain(&mut hist[..]);
                    }
                }
            }
        }
    }

    if k2 > 0 {
        pipe.flush2(a2);
    }
    pipe.flush4();
    pipe.flush8();
    pipe.drain(&mut hist[..]);
}

/// Sixteen-bin core: two eight-bin pipelines selected by bit 3 of the
/// preprocessed value. `PREMASK` first reduces the raw value modulo 16
/// (used by the raw 8-bin fold; `min` and `SHIFT` are zero there), and a
/// lane is valid iff the arithmetic shift by 4 leaves nothing, which drops
/// both negatives and values of 16 or more.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn histogram_16_core<const SHIFT: i32, const PREMASK: bool>(
    data: &[u16],
    min: u16,
    hist: &mut [u32; 16],
) {
    let n1 = data.len() / 16;
    let table = one_hot_table();
    let minv = _mm256_set1_epi16(min as i16);
    let ones = _mm256_set1_epi16(-1);
    let mut lo = BinPipeline::new();
    let mut hi = BinPipeline::new();
    let mut a2_lo = _mm256_setzero_si256();
    let mut a2_hi = _mm256_setzero_si256();
    let (mut k2, mut k4, mut k8, mut k16) = (0usize, 0usize, 0usize, 0usize);
    let mut ptr = data.as_ptr();

    for _ in 0..n1 {
        let mut v = _mm256_loadu_si256(ptr as *const __m256i);
        ptr = ptr.add(16);
        if PREMASK {
            v = _mm256_and_si256(v, _mm256_set1_epi16(15));
        }
        let vp = _mm256_srai_epi16::<SHIFT>(_mm256_sub_epi16(v, minv));
        let valid = _mm256_cmpeq_epi16(_mm256_srai_epi16::<4>(vp), _mm256_setzero_si256());
        let low_half = _mm256_cmpeq_epi16(
            _mm256_and_si256(vp, _mm256_set1_epi16(8)),
            _mm256_setzero_si256(),
        );
        let sel_lo = _mm256_and_si256(valid, low_half);
        let sel_hi = _mm256_andnot_si256(low_half, valid);
        let b = _mm256_and_si256(vp, _mm256_set1_epi16(7));
        let bins_lo = _mm256_or_si256(b, _mm256_xor_si256(sel_lo, ones));
        let bins_hi = _mm256_or_si256(b, _mm256_xor_si256(sel_hi, ones));
        a2_lo = _mm256_add_epi16(a2_lo, one_hot_16(bins_lo, table));
        a2_hi = _mm256_add_epi16(a2_hi, one_hot_16(bins_hi, table));

        k2 += 1;
        if k2 == ADDS_2BIT {
            k2 = 0;
            lo.flush2(a2_lo);
            hi.flush2(a2_hi);
            a2_lo = _mm256_setzero_si256();
            a2_hi = _mm256_setzero_si256();
            k4 += 1;
            if k4 == FLUSHES_4BIT {
                k4 = 0;
                lo.flush4();
                hi.flush4();
                k8 += 1;
                if k8 == FLUSHES_8BIT {
                    k8 = 0;
                    lo.flush8();
                    hi.flush8();
                    k16 += 1;
                    if k16 == FLUSHES_16BIT {
                        k16 = 0;
                        lo.drain(&mut hist[..8]);
                        hi.drain(&mut hist[8..]);
                    }
                }
            }
        }
    }

    if k2 > 0 {
        lo.flush2(a2_lo);
        hi.flush2(a2_hi);
    }
    lo.flush4();
    hi.flush4();
    lo.flush8();
    hi.flush8();
    lo.drain(&mut hist[..8]);
    hi.drain(&mut hist[8..]);
}
