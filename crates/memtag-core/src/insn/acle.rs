//! Compiler-intrinsic strategy backed by the ACLE `__arm_mte_*` builtins.
//!
//! The builtins are compiler-internal, so `build.rs` compiles a thin C
//! shim (`acle_shim.c`) that exports each one as a callable symbol.
//!
//! ACLE exposes no zeroing, pair-store or double-granule builtins, so this
//! backend composes `__arm_mte_set_tag` with ordinary stores issued
//! through the freshly tagged pointer; the contract is identical to the
//! inline-assembly backend, one granule per step.

use core::ffi::c_void;
use core::ptr;

use crate::granule::GRANULE_SIZE;

unsafe extern "C" {
    fn memtag_acle_create_random_tag(ptr: *mut c_void, exclude: u64) -> *mut c_void;
    fn memtag_acle_exclude_tag(ptr: *const c_void, mask: u64) -> u64;
    fn memtag_acle_get_tag(ptr: *mut c_void) -> *mut c_void;
    fn memtag_acle_set_tag(ptr: *mut c_void);
}

/// `__arm_mte_create_random_tag`.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE. No memory is accessed.
pub(crate) unsafe fn insert_random_tag(ptr: *mut u8, exclude: u64) -> *mut u8 {
    // SAFETY: register-only intrinsic.
    unsafe { memtag_acle_create_random_tag(ptr.cast::<c_void>(), exclude).cast::<u8>() }
}

/// `__arm_mte_exclude_tag`.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE. No memory is accessed.
pub(crate) unsafe fn exclude_tag(ptr: *const u8, mask: u64) -> u64 {
    // SAFETY: register-only intrinsic.
    unsafe { memtag_acle_exclude_tag(ptr.cast::<c_void>(), mask) }
}

/// `__arm_mte_get_tag`.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE and `ptr` must address
/// tagging-capable mapped memory.
pub(crate) unsafe fn load_tag(ptr: *mut u8) -> *mut u8 {
    // SAFETY: reads only the granule's out-of-band tag storage.
    unsafe { memtag_acle_get_tag(ptr.cast::<c_void>()).cast::<u8>() }
}

/// `__arm_mte_set_tag` plus cursor advance.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE and `ptr` must address
/// tagging-capable mapped memory.
pub(crate) unsafe fn set_tag_advance(ptr: *mut u8) -> *mut u8 {
    // SAFETY: writes only the granule's out-of-band tag storage.
    unsafe {
        memtag_acle_set_tag(ptr.cast::<c_void>());
        ptr.add(GRANULE_SIZE)
    }
}

/// Two single-granule tag stores; no pair builtin exists.
///
/// # Safety
///
/// As for [`set_tag_advance`], over both granules.
pub(crate) unsafe fn set_tag_pair_advance(ptr: *mut u8) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { set_tag_advance(set_tag_advance(ptr)) }
}

/// Tag one granule, then zero it through the tagged pointer.
///
/// # Safety
///
/// As for [`set_tag_advance`], and `ptr` must be granule-aligned and
/// writable.
pub(crate) unsafe fn set_tag_zero_advance(ptr: *mut u8) -> *mut u8 {
    // SAFETY: the granule's stored tag matches ptr's tag after set_tag, so
    // the zeroing store through ptr cannot mismatch.
    unsafe {
        memtag_acle_set_tag(ptr.cast::<c_void>());
        ptr.write_bytes(0, GRANULE_SIZE);
        ptr.add(GRANULE_SIZE)
    }
}

/// Two single-granule zero-and-tag steps.
///
/// # Safety
///
/// As for [`set_tag_zero_advance`], over both granules.
pub(crate) unsafe fn set_tag_zero_pair_advance(ptr: *mut u8) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { set_tag_zero_advance(set_tag_zero_advance(ptr)) }
}

/// Tag one granule of `dst`, then copy one granule of data into it through
/// the tagged pointer.
///
/// # Safety
///
/// The executing CPU must implement FEAT_MTE; `src` must be readable for
/// one granule; `dst` must be granule-aligned, writable, tagging-capable,
/// and must not overlap `src`'s granule.
pub(crate) unsafe fn copy_granule_advance(
    dst: *mut u8,
    src: *const u8,
) -> (*mut u8, *const u8) {
    // SAFETY: dst's stored tag matches dst's pointer tag after set_tag;
    // caller guarantees the ranges are valid and disjoint.
    unsafe {
        memtag_acle_set_tag(dst.cast::<c_void>());
        ptr::copy_nonoverlapping(src, dst, GRANULE_SIZE);
        (dst.add(GRANULE_SIZE), src.add(GRANULE_SIZE))
    }
}
