#![doc = include_str!("../README.MD")]
#![no_std]

#[cfg(feature = "c-exports")]
pub mod exports;

#[cfg(feature = "std")]
extern crate std;

pub mod comparator;
pub mod histogram;
pub mod partition;

#[cfg(feature = "std")]
pub mod aligned;

/// Runtime AVX2 availability. Without `std` there is no runtime detection,
/// so only features compiled into the target count.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[inline]
pub(crate) fn avx2_available() -> bool {
    #[cfg(feature = "std")]
    {
        std::is_x86_feature_detected!("avx2")
    }
    #[cfg(not(feature = "std"))]
    {
        cfg!(target_feature = "avx2")
    }
}
