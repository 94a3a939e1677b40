//! Exclusion masks for random tag generation.
//!
//! One bit per possible tag value; a set bit means the random generator
//! must never produce that tag. Masks start empty and are composed by
//! value, so a builder chain reads naturally:
//!
//! ```
//! use memtag_core::ExcludeMask;
//!
//! let mask = ExcludeMask::empty().with_tag(3).with_tag(15);
//! assert!(mask.contains(3));
//! assert!(!mask.contains(4));
//! ```

use crate::checks::check_tag;
use crate::granule::TAG_COUNT;

/// Bitset of tag values forbidden from random selection.
///
/// Backed by a `u64` because that is the operand width the hardware
/// generator takes; only the low [`TAG_COUNT`] bits are meaningful.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExcludeMask(u64);

impl ExcludeMask {
    /// The mask excluding nothing.
    pub const EMPTY: Self = Self(0);

    const ALL: u64 = (1 << TAG_COUNT) - 1;

    /// Returns the empty mask.
    #[must_use]
    pub const fn empty() -> Self {
        Self::EMPTY
    }

    /// Returns the mask with bit `tag` additionally set. Idempotent.
    ///
    /// # Panics
    ///
    /// If `tag` exceeds [`MAX_TAG`](crate::granule::MAX_TAG), unless built
    /// with `disable-tag-checks`.
    #[must_use]
    pub const fn with_tag(self, tag: u8) -> Self {
        check_tag!(tag);
        Self(self.0 | 1 << tag)
    }

    /// Returns the mask with bit `tag` cleared. Idempotent.
    ///
    /// # Panics
    ///
    /// If `tag` exceeds [`MAX_TAG`](crate::granule::MAX_TAG), unless built
    /// with `disable-tag-checks`.
    #[must_use]
    pub const fn without_tag(self, tag: u8) -> Self {
        check_tag!(tag);
        Self(self.0 & !(1 << tag))
    }

    /// Returns the mask with the tag of `ptr` additionally folded in, with
    /// hardware assistance (the `GMI` instruction).
    ///
    /// Used to avoid regenerating a tag already in use by a neighboring or
    /// aliased allocation reachable through `ptr`.
    ///
    /// # Safety
    ///
    /// The executing CPU must implement FEAT_MTE.
    #[cfg(target_arch = "aarch64")]
    #[must_use]
    pub unsafe fn with_pointer_tag<T>(self, ptr: *const T) -> Self {
        // SAFETY: GMI manipulates register bits only; caller guarantees
        // the instruction exists.
        Self(unsafe { crate::insn::exclude_tag(ptr.cast::<u8>(), self.0) })
    }

    /// Returns true if bit `tag` is set.
    ///
    /// # Panics
    ///
    /// If `tag` exceeds [`MAX_TAG`](crate::granule::MAX_TAG), unless built
    /// with `disable-tag-checks`.
    #[must_use]
    pub const fn contains(self, tag: u8) -> bool {
        check_tag!(tag);
        self.0 >> tag & 1 == 1
    }

    /// Returns true if no tag is excluded.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & Self::ALL == 0
    }

    /// Returns true if every tag is excluded. Random generation with a
    /// full mask is hardware-defined, see `tag::random`.
    #[must_use]
    pub const fn is_full(self) -> bool {
        self.0 & Self::ALL == Self::ALL
    }

    /// The raw bit pattern, as passed to the hardware generator.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }
}
