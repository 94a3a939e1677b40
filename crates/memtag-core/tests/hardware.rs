//! End-to-end checks against real MTE hardware.
//!
//! Compiled only for aarch64 Linux. Tests that touch tag storage detect
//! MTE support at runtime and return early when the kernel or CPU lacks
//! it, so the suite is safe to run on any aarch64 box. The contract-check
//! tests at the bottom panic before any instruction executes and need no
//! hardware support at all.

#![cfg(all(target_arch = "aarch64", target_os = "linux"))]

use std::ptr;
use std::sync::Once;

use memtag_core::{ExcludeMask, GRANULE_SIZE, MAX_TAG, region, tag};

// ---------------------------------------------------------------------------
// Linux ABI values (not exported by every libc crate version)
// ---------------------------------------------------------------------------

const PROT_MTE: libc::c_int = 0x20;
const HWCAP2_MTE: libc::c_ulong = 1 << 18;
const PR_SET_TAGGED_ADDR_CTRL: libc::c_int = 55;
const PR_TAGGED_ADDR_ENABLE: libc::c_ulong = 1;
const PR_MTE_TCF_SYNC: libc::c_ulong = 1 << 1;
const PR_MTE_TAG_SHIFT: u32 = 3;

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

fn mte_available() -> bool {
    unsafe { libc::getauxval(libc::AT_HWCAP2) & HWCAP2_MTE != 0 }
}

/// Enables synchronous tag checking for the process, once. Tag 15 is kept
/// out of the kernel's include mask, mirroring its conventional
/// reservation for deliberate-mismatch pointers.
fn enable_tag_checking() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let include = (0xFFFF & !(1u64 << MAX_TAG)) as libc::c_ulong;
        let mode = PR_TAGGED_ADDR_ENABLE | PR_MTE_TCF_SYNC | (include << PR_MTE_TAG_SHIFT);
        let rc = unsafe { libc::prctl(PR_SET_TAGGED_ADDR_CTRL, mode, 0, 0, 0) };
        assert_eq!(rc, 0, "prctl(PR_SET_TAGGED_ADDR_CTRL) failed");
    });
}

/// Maps `len` bytes of anonymous tagging-capable memory.
fn map_tagged(len: usize) -> *mut u8 {
    let mapped = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE | PROT_MTE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    assert_ne!(mapped, libc::MAP_FAILED, "mmap(PROT_MTE) failed");
    mapped.cast()
}

fn unmap(ptr: *mut u8, len: usize) {
    let rc = unsafe { libc::munmap(ptr.cast(), len) };
    assert_eq!(rc, 0, "munmap failed");
}

macro_rules! require_mte {
    () => {
        if !mte_available() {
            eprintln!("skipping: MTE not reported in HWCAP2");
            return;
        }
        enable_tag_checking();
    };
}

/// Reads the stored tag of every granule in `[ptr, ptr + len)`.
fn stored_tags(ptr: *mut u8, len: usize) -> Vec<u8> {
    (0..len / GRANULE_SIZE)
        .map(|i| unsafe { tag::decode(tag::stored(ptr.add(i * GRANULE_SIZE))) })
        .collect()
}

// ---------------------------------------------------------------------------
// Random generation
// ---------------------------------------------------------------------------

#[test]
fn random_tag_never_produces_an_excluded_tag() {
    require_mte!();

    let base = ptr::without_provenance_mut::<u8>(0x7000_0000_0000);
    let mask = ExcludeMask::empty().with_tag(5).with_tag(11).with_tag(15);
    for _ in 0..10_000 {
        let produced = unsafe { tag::decode(tag::random(base, mask)) };
        assert!(
            !mask.contains(produced),
            "random generation produced excluded tag {produced}"
        );
    }
}

#[test]
fn random_tag_preserves_address_bits() {
    require_mte!();

    let base = ptr::without_provenance_mut::<u8>(0x7000_0000_1230);
    let tagged = unsafe { tag::random(base, ExcludeMask::empty()) };
    assert_eq!(tag::encode(tagged, 0).addr(), base.addr());
}

#[test]
fn pointer_tag_folds_into_the_mask() {
    require_mte!();

    let tagged = tag::encode(ptr::without_provenance_mut::<u8>(0x1000), 6);
    let mask = unsafe { ExcludeMask::empty().with_pointer_tag(tagged) };
    assert!(mask.contains(6));

    // A generator fed that mask must now avoid the pointer's tag.
    for _ in 0..1_000 {
        let produced = unsafe { tag::decode(tag::random(tagged, mask)) };
        assert_ne!(produced, 6);
    }
}

// ---------------------------------------------------------------------------
// Bulk operations
// ---------------------------------------------------------------------------

#[test]
fn tagging_a_region_sticks_and_is_idempotent() {
    require_mte!();

    const LEN: usize = 4096;
    let base = map_tagged(LEN);
    let p = tag::encode(base, 3);

    unsafe { region::tag(p, LEN) };
    assert!(stored_tags(p, LEN).iter().all(|&t| t == 3));

    // Writing and reading through the matching pointer must not fault.
    unsafe {
        p.cast::<u64>().write(0xFEED_FACE);
        assert_eq!(p.cast::<u64>().read(), 0xFEED_FACE);
    }

    // Tagging again with the same tag changes nothing.
    unsafe { region::tag(p, LEN) };
    assert!(stored_tags(p, LEN).iter().all(|&t| t == 3));

    unmap(base, LEN);
}

#[test]
fn tagging_an_odd_granule_count_takes_the_leading_granule_path() {
    require_mte!();

    const LEN: usize = 4096;
    let base = map_tagged(LEN);
    let p = tag::encode(base, 8);

    // 48 bytes = 3 granules, not a double-granule multiple.
    unsafe { region::tag(p, 48) };
    assert_eq!(stored_tags(p, 48), vec![8, 8, 8]);
    // The granule after the range keeps its mapping-initial tag.
    assert_eq!(unsafe { tag::decode(tag::stored(p.add(48))) }, 0);

    unmap(base, LEN);
}

#[test]
fn zeroing_retags_and_clears_the_data() {
    require_mte!();

    const LEN: usize = 4096;
    let base = map_tagged(LEN);

    // Seed the region with a known tag and nonzero data.
    let old = tag::encode(base, 1);
    unsafe {
        region::tag(old, LEN);
        old.write_bytes(0xAB, LEN);
    }

    let fresh = tag::encode(base, 4);
    unsafe { region::zero_and_tag(fresh, LEN) };

    assert!(stored_tags(fresh, LEN).iter().all(|&t| t == 4));
    for offset in [0, 8, LEN / 2, LEN - 1] {
        assert_eq!(unsafe { fresh.add(offset).read() }, 0);
    }

    unmap(base, LEN);
}

#[test]
fn copying_moves_the_pattern_and_stamps_the_destination_tag() {
    require_mte!();

    const LEN: usize = 4096;
    let base = map_tagged(LEN);

    // Ordinary untagged memory is a legal source.
    let pattern: Vec<u8> = (0..64).map(|i| i as u8 ^ 0x5A).collect();
    let dst = tag::encode(base, 9);
    unsafe { region::copy_and_tag(dst, pattern.as_ptr(), 64) };

    assert_eq!(stored_tags(dst, 64), vec![9, 9, 9, 9]);
    let copied: Vec<u8> = (0..64).map(|i| unsafe { dst.add(i).read() }).collect();
    assert_eq!(copied, pattern);

    unmap(base, LEN);
}

#[test]
fn copying_accepts_a_misaligned_source() {
    require_mte!();

    const LEN: usize = 4096;
    let base = map_tagged(LEN);

    let backing: Vec<u8> = (0..33).map(|i| i as u8).collect();
    let src = unsafe { backing.as_ptr().add(1) }; // deliberately off-granule
    let dst = tag::encode(base, 2);
    unsafe { region::copy_and_tag(dst, src, 32) };

    let copied: Vec<u8> = (0..32).map(|i| unsafe { dst.add(i).read() }).collect();
    assert_eq!(copied, backing[1..33]);

    unmap(base, LEN);
}

// ---------------------------------------------------------------------------
// Contract enforcement (no hardware needed; the check fires first)
// ---------------------------------------------------------------------------

#[test]
fn empty_ranges_are_no_ops() {
    let dangling = ptr::without_provenance_mut::<u8>(0x1000);
    unsafe {
        region::tag(dangling, 0);
        region::zero_and_tag(dangling, 0);
        region::copy_and_tag(dangling, dangling.cast_const(), 0);
    }
}

#[cfg(not(feature = "disable-alignment-checks"))]
mod contract {
    use super::*;

    #[test]
    #[should_panic(expected = "zeroed region pointer is not granule aligned")]
    fn zeroing_rejects_a_misaligned_pointer() {
        let misaligned = ptr::without_provenance_mut::<u8>(0x1001);
        unsafe { region::zero_and_tag(misaligned, GRANULE_SIZE) };
    }

    #[test]
    #[should_panic(expected = "zeroed region length is not a granule multiple")]
    fn zeroing_rejects_a_ragged_length() {
        let aligned = ptr::without_provenance_mut::<u8>(0x1000);
        unsafe { region::zero_and_tag(aligned, GRANULE_SIZE - 1) };
    }

    #[test]
    #[should_panic(expected = "copy destination pointer is not granule aligned")]
    fn copying_rejects_a_misaligned_destination() {
        let misaligned = ptr::without_provenance_mut::<u8>(0x1001);
        let src = ptr::without_provenance::<u8>(0x2000);
        unsafe { region::copy_and_tag(misaligned, src, GRANULE_SIZE) };
    }

    #[test]
    #[should_panic(expected = "copy length is not a granule multiple")]
    fn copying_rejects_a_ragged_length() {
        let aligned = ptr::without_provenance_mut::<u8>(0x1000);
        let src = ptr::without_provenance::<u8>(0x2000);
        unsafe { region::copy_and_tag(aligned, src, 24) };
    }

    #[test]
    #[should_panic(expected = "region length is not a granule multiple")]
    #[cfg(not(feature = "relaxed-alignment-checks"))]
    fn tagging_rejects_a_ragged_length() {
        let aligned = ptr::without_provenance_mut::<u8>(0x1000);
        unsafe { region::tag(aligned, 7) };
    }
}
