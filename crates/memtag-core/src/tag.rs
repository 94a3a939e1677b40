//! Pointer tag encoding and decoding.
//!
//! The tag occupies bits [56..60] of the address; everything outside that
//! field is the conventional address and is never altered here. [`encode`]
//! and [`decode`] are pure bit manipulation and compile on every
//! architecture. [`random`] and [`stored`] are hardware-assisted and exist
//! only on aarch64.

use crate::checks::check_tag;
use crate::granule::{MAX_TAG, TAG_SHIFT};

#[cfg(target_arch = "aarch64")]
use crate::exclude::ExcludeMask;

/// The tag field within an address.
const TAG_FIELD: usize = (MAX_TAG as usize) << TAG_SHIFT;

/// Returns `ptr` with its tag field cleared and `tag` written into it.
///
/// The address bits outside the tag field are preserved exactly, so
/// encoding is freely repeatable: a second `encode` replaces the first
/// tag rather than accumulating.
///
/// # Panics
///
/// If `tag` exceeds [`MAX_TAG`], unless built with `disable-tag-checks`.
#[must_use]
pub fn encode<T>(ptr: *mut T, tag: u8) -> *mut T {
    check_tag!(tag);
    ptr.map_addr(|addr| (addr & !TAG_FIELD) | ((tag as usize) << TAG_SHIFT))
}

/// Extracts the tag encoded in `ptr`'s reserved bits.
///
/// Total for every input; the result is always in `0..=`[`MAX_TAG`].
#[must_use]
pub fn decode<T>(ptr: *const T) -> u8 {
    ((ptr.addr() >> TAG_SHIFT) as u8) & MAX_TAG
}

/// Returns `ptr` re-tagged with a randomly generated tag drawn from the
/// complement of `exclude` (the `IRG` instruction).
///
/// An excluded tag is *never* produced; this is a hard guarantee, not a
/// statistical one. If `exclude` covers all sixteen values the result is
/// whatever the hardware generator does with a full mask, which the
/// architecture leaves unspecified.
///
/// Only pointer bits are touched; no memory tag storage is read or
/// written.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE.
#[cfg(target_arch = "aarch64")]
#[must_use]
pub unsafe fn random<T>(ptr: *mut T, exclude: ExcludeMask) -> *mut T {
    // SAFETY: IRG manipulates register bits only; caller guarantees the
    // instruction exists.
    unsafe { crate::insn::insert_random_tag(ptr.cast::<u8>(), exclude.bits()).cast::<T>() }
}

/// Returns `ptr` re-tagged with the tag currently *stored* for the granule
/// it addresses (the `LDG` instruction), regardless of the tag encoded in
/// `ptr` itself.
///
/// `decode(stored(p)) == decode(p)` after a bulk tagging of the region
/// through `p` is exactly the idempotence the tagging operations promise.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE and `ptr` must address
/// tagging-capable memory mapped in this process.
#[cfg(target_arch = "aarch64")]
#[must_use]
pub unsafe fn stored<T>(ptr: *mut T) -> *mut T {
    // SAFETY: caller guarantees ptr addresses a tagging-capable granule.
    unsafe { crate::insn::load_tag(ptr.cast::<u8>()).cast::<T>() }
}
