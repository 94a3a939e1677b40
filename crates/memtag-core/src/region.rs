//! Bulk tag-and-data operations over granule-sized regions.
//!
//! Each operation walks `[ptr, ptr + len)` and brings every granule's
//! stored tag into agreement with the tag encoded in the pointer it was
//! given. Tagging and zeroing use the double-granule store instructions
//! for throughput, with one leading single granule when `len` is not a
//! double-granule multiple; copying has no double-granule instruction and
//! always moves one granule per step.
//!
//! Alignment contracts differ per operation and are enforced in two
//! classes. *Critical* checks guard arguments the hardware itself faults
//! on (a misaligned destination for zeroing or copying); they survive
//! `relaxed-alignment-checks` and disappear only under
//! `disable-alignment-checks`, at which point the caller has accepted
//! undefined behavior. *Advisory* checks guard arguments that merely make
//! the operation cover more memory than asked; both features remove them.
//!
//! Every operation either completes over the whole range or the process
//! faults; there is no partial-failure state and nothing is allocated or
//! retained.

use crate::granule::{is_double_granule_multiple, is_granule_aligned, is_granule_multiple};
use crate::insn;

macro_rules! critical_check {
    ($cond:expr, $msg:expr) => {{
        #[cfg(not(feature = "disable-alignment-checks"))]
        assert!($cond, $msg);
        #[cfg(feature = "disable-alignment-checks")]
        let _ = $cond;
    }};
}

macro_rules! advisory_check {
    ($cond:expr, $msg:expr) => {{
        #[cfg(not(any(
            feature = "disable-alignment-checks",
            feature = "relaxed-alignment-checks"
        )))]
        assert!($cond, $msg);
        #[cfg(any(
            feature = "disable-alignment-checks",
            feature = "relaxed-alignment-checks"
        ))]
        let _ = $cond;
    }};
}

const USE_DOUBLE_GRANULE: bool = cfg!(not(feature = "disable-double-granule"));

/// Stores the tag encoded in `ptr` for every granule in `[ptr, ptr + len)`.
/// Data bytes are left untouched.
///
/// `ptr` itself need not be granule-aligned: tagging always covers whole
/// granules, so a misaligned `ptr` silently extends the tagged range past
/// `ptr + len` by up to one granule. That is documented behavior, not an
/// error.
///
/// # Panics
///
/// If `len` is not a granule multiple (advisory check).
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE; every granule the range
/// touches must be tagging-capable memory mapped writable in this
/// process; no other thread may concurrently access the range's tags.
pub unsafe fn tag(mut ptr: *mut u8, len: usize) {
    advisory_check!(is_granule_multiple(len), "region length is not a granule multiple");

    let end = ptr.addr() + len;
    // SAFETY: forwarded caller contract; the loop stays within
    // [ptr, ptr + len) rounded out to granule boundaries.
    unsafe {
        if USE_DOUBLE_GRANULE {
            if !is_double_granule_multiple(len) {
                ptr = insn::set_tag_advance(ptr);
            }
            while ptr.addr() < end {
                ptr = insn::set_tag_pair_advance(ptr);
            }
        } else {
            while ptr.addr() < end {
                ptr = insn::set_tag_advance(ptr);
            }
        }
    }
}

/// Stores the tag encoded in `ptr` for every granule in `[ptr, ptr + len)`
/// and zeroes each granule's data as it is tagged.
///
/// Unlike [`tag`], the underlying store is intolerant of misalignment: it
/// faults rather than silently over-operating, so the alignment
/// preconditions here are critical.
///
/// # Panics
///
/// If `ptr` is not granule-aligned or `len` is not a granule multiple
/// (critical checks).
///
/// # Safety
///
/// As for [`tag`], and the range's previous contents are destroyed.
pub unsafe fn zero_and_tag(mut ptr: *mut u8, len: usize) {
    critical_check!(
        is_granule_aligned(ptr.addr()),
        "zeroed region pointer is not granule aligned"
    );
    critical_check!(is_granule_multiple(len), "zeroed region length is not a granule multiple");

    let end = ptr.addr() + len;
    // The zeroing pair store needs only granule alignment, not
    // double-granule alignment, so the loop shape matches `tag`.
    // SAFETY: forwarded caller contract.
    unsafe {
        if USE_DOUBLE_GRANULE {
            if !is_double_granule_multiple(len) {
                ptr = insn::set_tag_zero_advance(ptr);
            }
            while ptr.addr() < end {
                ptr = insn::set_tag_zero_pair_advance(ptr);
            }
        } else {
            while ptr.addr() < end {
                ptr = insn::set_tag_zero_advance(ptr);
            }
        }
    }
}

/// Copies `len` bytes from `src` into `[dst, dst + len)`, stamping the tag
/// encoded in `dst` on every destination granule as its data is written.
///
/// The tagged store has no double-granule form, so this always proceeds
/// one granule at a time regardless of the fast-path setting. `src` has no
/// alignment requirement.
///
/// # Panics
///
/// If `dst` is not granule-aligned or `len` is not a granule multiple
/// (critical checks).
///
/// # Safety
///
/// As for [`tag`] on the destination range; additionally `src` must be
/// readable for `len` bytes and must not overlap the destination.
pub unsafe fn copy_and_tag(mut dst: *mut u8, mut src: *const u8, len: usize) {
    critical_check!(
        is_granule_aligned(dst.addr()),
        "copy destination pointer is not granule aligned"
    );
    critical_check!(is_granule_multiple(len), "copy length is not a granule multiple");

    let end = dst.addr() + len;
    // SAFETY: forwarded caller contract.
    unsafe {
        while dst.addr() < end {
            (dst, src) = insn::copy_granule_advance(dst, src);
        }
    }
}
