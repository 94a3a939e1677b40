//! Tagging geometry: tag field placement, granule sizes, alignment math.
//!
//! Every other module treats tags as opaque small integers and granules as
//! opaque byte counts; bit offsets and sizes live here and nowhere else.

// ---------------------------------------------------------------------------
// Tag field
// ---------------------------------------------------------------------------

/// Width of the tag field, in bits.
pub const TAG_BITS: u32 = 4;
/// Bit offset of the tag field within a 64-bit address.
pub const TAG_SHIFT: u32 = 56;
/// Largest encodable tag value.
pub const MAX_TAG: u8 = 0xF;
/// Number of distinct tag values.
pub const TAG_COUNT: u32 = 1 << TAG_BITS;

// ---------------------------------------------------------------------------
// Granules
// ---------------------------------------------------------------------------

/// log2 of the granule size.
pub const LOG2_GRANULE_SIZE: u32 = 4;
/// Bytes covered by one allocation tag.
pub const GRANULE_SIZE: usize = 1 << LOG2_GRANULE_SIZE;
/// Mask selecting the sub-granule bits of an address or length.
pub const GRANULE_MASK: usize = GRANULE_SIZE - 1;

/// log2 of the double-granule size.
pub const LOG2_DOUBLE_GRANULE_SIZE: u32 = 5;
/// Unit processed per step by the double-granule store instructions.
pub const DOUBLE_GRANULE_SIZE: usize = 1 << LOG2_DOUBLE_GRANULE_SIZE;
/// Mask selecting the sub-double-granule bits of an address or length.
pub const DOUBLE_GRANULE_MASK: usize = DOUBLE_GRANULE_SIZE - 1;

const _: () = assert!(GRANULE_SIZE == 16, "bad granule size");
const _: () = assert!(DOUBLE_GRANULE_SIZE == 2 * GRANULE_SIZE, "bad double-granule size");
const _: () = assert!(MAX_TAG as u32 == TAG_COUNT - 1, "bad tag field width");
const _: () = assert!(TAG_SHIFT + TAG_BITS <= 64, "tag field past the top of the address");

// ---------------------------------------------------------------------------
// Alignment helpers
// ---------------------------------------------------------------------------

/// Returns true if `addr` sits on a granule boundary.
#[must_use]
pub const fn is_granule_aligned(addr: usize) -> bool {
    addr & GRANULE_MASK == 0
}

/// Returns true if `len` is a whole number of granules.
#[must_use]
pub const fn is_granule_multiple(len: usize) -> bool {
    len & GRANULE_MASK == 0
}

/// Returns true if `len` is a whole number of double granules.
#[must_use]
pub const fn is_double_granule_multiple(len: usize) -> bool {
    len & DOUBLE_GRANULE_MASK == 0
}

/// Rounds `addr` down to the enclosing granule boundary.
#[must_use]
pub const fn granule_align_down(addr: usize) -> usize {
    addr & !GRANULE_MASK
}

/// Rounds `addr` up to the next granule boundary. Wraps at the top of the
/// address space.
#[must_use]
pub const fn granule_align_up(addr: usize) -> usize {
    addr.wrapping_add(GRANULE_MASK) & !GRANULE_MASK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
