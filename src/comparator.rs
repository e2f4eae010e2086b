//! Comparator capabilities for rank selection.
//!
//! A comparator fixes, at compile time, what "better" means for the
//! partitioner: [`Smallest`] keeps the smallest values (e.g. L2 distances),
//! [`Largest`] keeps the largest (e.g. inner products). Each comparator also
//! carries its worst possible value ([`Comparator::neutral`], usable as
//! padding that always loses) and a one-step walk toward the worse side
//! ([`Comparator::nextafter`]), which the partitioner needs when many values
//! pile up on a threshold.

use crate::partition;

/// Value types the partitioner operates on.
///
/// Implemented for `f32` and `u16`; `u16` additionally routes
/// [`partition_fuzzy`](crate::partition::partition_fuzzy) to the vectorized
/// integer-bisection path when the buffer is 32-byte aligned.
pub trait Scalar: Copy + PartialOrd {
    /// Zero of the value type.
    const ZERO: Self;
    /// Smallest representable value.
    const LOWEST: Self;
    /// Largest representable value.
    const HIGHEST: Self;

    /// Next representable value toward [`Scalar::HIGHEST`].
    /// Returns `self` unchanged at the upper end of the range.
    fn next_up(self) -> Self;

    /// Next representable value toward [`Scalar::LOWEST`].
    fn next_down(self) -> Self;

    /// Saturating conversion to a rank. Only used to materialize the
    /// rank sentinel of the `q_min == 0` early out.
    fn to_rank(self) -> usize;

    #[doc(hidden)]
    fn partition_fuzzy_dispatch<C, I>(
        vals: &mut [Self],
        ids: &mut [I],
        q_min: usize,
        q_max: usize,
    ) -> (Self, usize)
    where
        C: Comparator<Self>,
        I: Copy,
    {
        partition::partition_fuzzy_median3::<C, Self, I>(vals, ids, q_min, q_max)
    }
}

impl Scalar for f32 {
    const ZERO: Self = 0.0;
    const LOWEST: Self = f32::NEG_INFINITY;
    const HIGHEST: Self = f32::INFINITY;

    #[inline(always)]
    fn next_up(self) -> Self {
        f32::next_up(self)
    }

    #[inline(always)]
    fn next_down(self) -> Self {
        f32::next_down(self)
    }

    #[inline(always)]
    fn to_rank(self) -> usize {
        self as usize
    }
}

impl Scalar for u16 {
    const ZERO: Self = 0;
    const LOWEST: Self = u16::MIN;
    const HIGHEST: Self = u16::MAX;

    #[inline(always)]
    fn next_up(self) -> Self {
        self.saturating_add(1)
    }

    #[inline(always)]
    fn next_down(self) -> Self {
        self.saturating_sub(1)
    }

    #[inline(always)]
    fn to_rank(self) -> usize {
        self as usize
    }

    fn partition_fuzzy_dispatch<C, I>(
        vals: &mut [u16],
        ids: &mut [I],
        q_min: usize,
        q_max: usize,
    ) -> (u16, usize)
    where
        C: Comparator<u16>,
        I: Copy,
    {
        partition::partition_fuzzy_u16::<C, I>(vals, ids, q_min, q_max)
    }
}

/// Ranking policy over a value type `T`.
///
/// `cmp(a, b)` is a strict comparison meaning "`a` ranks better than `b`";
/// equal values never compare better than each other.
pub trait Comparator<T: Scalar> {
    /// The comparator with the opposite sense. Its neutral value is the
    /// best possible value under `Self`.
    type Rev: Comparator<T>;

    /// True when this comparator keeps the largest values.
    const IS_MAX: bool;

    /// Returns true when `a` ranks strictly better than `b`.
    fn cmp(a: T, b: T) -> bool;

    /// Worst possible value: no payload value ranks worse than this.
    fn neutral() -> T;

    /// Steps `t` one representable value toward the worse side.
    /// At the end of the range, `t` is returned unchanged.
    fn nextafter(t: T) -> T;
}

/// Keeps the smallest values.
pub struct Smallest;

/// Keeps the largest values.
pub struct Largest;

impl<T: Scalar> Comparator<T> for Smallest {
    type Rev = Largest;
    const IS_MAX: bool = false;

    #[inline(always)]
    fn cmp(a: T, b: T) -> bool {
        a < b
    }

    #[inline(always)]
    fn neutral() -> T {
        T::HIGHEST
    }

    #[inline(always)]
    fn nextafter(t: T) -> T {
        t.next_up()
    }
}

impl<T: Scalar> Comparator<T> for Largest {
    type Rev = Smallest;
    const IS_MAX: bool = true;

    #[inline(always)]
    fn cmp(a: T, b: T) -> bool {
        a > b
    }

    #[inline(always)]
    fn neutral() -> T {
        T::LOWEST
    }

    #[inline(always)]
    fn nextafter(t: T) -> T {
        t.next_down()
    }
}

/// Median of three values under comparator `C`.
///
/// Symmetric in its arguments and always returns one of them; when two
/// arguments are equal, that repeated value is the result.
#[inline]
pub fn median3<C, T>(a: T, b: T, c: T) -> T
where
    T: Scalar,
    C: Comparator<T>,
{
    let (a, b) = if C::cmp(b, a) { (b, a) } else { (a, b) };
    if C::cmp(c, a) {
        a
    } else if C::cmp(b, c) {
        b
    } else {
        c
    }
}
