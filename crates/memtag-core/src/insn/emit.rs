//! Direct instruction emission through inline assembly.
//!
//! The post-indexed store forms advance the address register by the amount
//! they processed, so each `*_advance` function is a single instruction
//! (two for the copy, which has to move the data as well).
//!
//! Every function here requires FEAT_MTE on the executing CPU; the store
//! forms additionally require the destination to be tagging-capable
//! memory. Callers uphold both.

use core::arch::asm;

/// `IRG`: re-tag `ptr` with a random tag not present in `exclude`.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE. No memory is accessed.
#[target_feature(enable = "mte")]
pub(crate) unsafe fn insert_random_tag(ptr: *mut u8, exclude: u64) -> *mut u8 {
    let tagged: *mut u8;
    // SAFETY: register-only instruction.
    unsafe {
        asm!(
            "irg {tagged}, {ptr}, {exclude}",
            tagged = lateout(reg) tagged,
            ptr = in(reg) ptr,
            exclude = in(reg) exclude,
            options(nomem, nostack, preserves_flags),
        );
    }
    tagged
}

/// `GMI`: fold the tag of `ptr` into `mask`.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE. No memory is accessed.
#[target_feature(enable = "mte")]
pub(crate) unsafe fn exclude_tag(ptr: *const u8, mask: u64) -> u64 {
    let folded: u64;
    // SAFETY: register-only instruction.
    unsafe {
        asm!(
            "gmi {folded}, {ptr}, {mask}",
            folded = lateout(reg) folded,
            ptr = in(reg) ptr,
            mask = in(reg) mask,
            options(nomem, nostack, preserves_flags),
        );
    }
    folded
}

/// `LDG`: return `ptr` re-tagged with the tag stored for the granule it
/// addresses.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE and `ptr` must address
/// tagging-capable mapped memory.
#[target_feature(enable = "mte")]
pub(crate) unsafe fn load_tag(ptr: *mut u8) -> *mut u8 {
    let mut tagged = ptr;
    // SAFETY: reads only the out-of-band tag storage for ptr's granule.
    unsafe {
        asm!(
            "ldg {tagged}, [{ptr}]",
            tagged = inout(reg) tagged,
            ptr = in(reg) ptr,
            options(readonly, nostack, preserves_flags),
        );
    }
    tagged
}

/// `STG`: store `ptr`'s tag for one granule, leaving the data untouched.
/// Returns the cursor advanced by one granule.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE and `ptr` must address
/// tagging-capable mapped memory.
#[target_feature(enable = "mte")]
pub(crate) unsafe fn set_tag_advance(mut ptr: *mut u8) -> *mut u8 {
    // SAFETY: writes only the out-of-band tag storage for ptr's granule.
    unsafe {
        asm!(
            "stg {ptr}, [{ptr}], #16",
            ptr = inout(reg) ptr,
            options(nostack, preserves_flags),
        );
    }
    ptr
}

/// `ST2G`: [`set_tag_advance`] over a double granule in one instruction.
///
/// # Safety
///
/// As for [`set_tag_advance`], over both granules.
#[target_feature(enable = "mte")]
pub(crate) unsafe fn set_tag_pair_advance(mut ptr: *mut u8) -> *mut u8 {
    // SAFETY: writes only the out-of-band tag storage for two granules.
    unsafe {
        asm!(
            "st2g {ptr}, [{ptr}], #32",
            ptr = inout(reg) ptr,
            options(nostack, preserves_flags),
        );
    }
    ptr
}

/// `STZG`: store `ptr`'s tag for one granule and zero its data. Returns
/// the cursor advanced by one granule. Faults on a misaligned `ptr`.
///
/// # Safety
///
/// As for [`set_tag_advance`], and `ptr` must be granule-aligned and
/// writable.
#[target_feature(enable = "mte")]
pub(crate) unsafe fn set_tag_zero_advance(mut ptr: *mut u8) -> *mut u8 {
    // SAFETY: writes the granule's data and tag; caller guarantees
    // alignment and writability.
    unsafe {
        asm!(
            "stzg {ptr}, [{ptr}], #16",
            ptr = inout(reg) ptr,
            options(nostack, preserves_flags),
        );
    }
    ptr
}

/// `STZ2G`: [`set_tag_zero_advance`] over a double granule. Needs only
/// granule alignment, not double-granule alignment.
///
/// # Safety
///
/// As for [`set_tag_zero_advance`], over both granules.
#[target_feature(enable = "mte")]
pub(crate) unsafe fn set_tag_zero_pair_advance(mut ptr: *mut u8) -> *mut u8 {
    // SAFETY: writes two granules' data and tags; caller guarantees
    // alignment and writability.
    unsafe {
        asm!(
            "stz2g {ptr}, [{ptr}], #32",
            ptr = inout(reg) ptr,
            options(nostack, preserves_flags),
        );
    }
    ptr
}

/// `LDP` + `STGP`: copy one granule from `src` to `dst`, stamping `dst`'s
/// tag as the data is stored. Returns both cursors advanced by one
/// granule. There is no double-granule form of `STGP`.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE; `src` must be readable for
/// one granule; `dst` must be granule-aligned, writable, tagging-capable,
/// and must not overlap `src`'s granule.
#[target_feature(enable = "mte")]
pub(crate) unsafe fn copy_granule_advance(
    mut dst: *mut u8,
    mut src: *const u8,
) -> (*mut u8, *const u8) {
    // SAFETY: reads one granule from src, writes one granule of data and
    // tag to dst; caller guarantees validity of both.
    unsafe {
        asm!(
            "ldp {lo}, {hi}, [{src}], #16",
            "stgp {lo}, {hi}, [{dst}], #16",
            lo = out(reg) _,
            hi = out(reg) _,
            src = inout(reg) src,
            dst = inout(reg) dst,
            options(nostack, preserves_flags),
        );
    }
    (dst, src)
}
