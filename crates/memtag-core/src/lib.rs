//! # memtag-core
//!
//! Primitives for the AArch64 Memory Tagging Extension (MTE).
//!
//! MTE reserves four bits near the top of every pointer (bits 56..60) for a
//! *tag* and lets the hardware store a matching tag out-of-band for every
//! 16-byte *granule* of tagging-capable memory. A load or store through a
//! pointer whose tag differs from the destination granule's stored tag is
//! reported by the hardware as a fault.
//!
//! This crate exposes that capability as a small set of composable
//! operations:
//!
//! - [`tag`] — encode/decode a tag in a pointer, draw a random non-excluded
//!   tag, read a granule's stored tag back into a pointer.
//! - [`exclude`] — build masks of tag values the random generator must
//!   never produce.
//! - `region` (aarch64 only) — bulk operations that bring a range's
//!   stored tags into agreement with a pointer's tag: tag-only,
//!   zero-and-tag, copy-and-tag.
//! - [`granule`] — the tagging geometry (field placement, granule sizes)
//!   and alignment math shared by everything above.
//!
//! The crate is stateless: every operation works only on the arguments it
//! is given, never allocates, never blocks, and retains nothing between
//! calls. Concurrent tagging of overlapping ranges must be serialized by
//! the caller.
//!
//! # What this crate does not do
//!
//! Enabling tag checking for the process (`prctl` on Linux), obtaining
//! tagging-capable memory (`PROT_MTE` mappings), and handling the fault a
//! mismatched access raises are the caller's responsibility. A mismatched
//! access is a crash by design, never a recoverable error; this crate's
//! only relationship to it is that correct use of these operations is what
//! prevents it.
//!
//! # Error handling
//!
//! Contract violations (a tag above 15, a misaligned pointer or length
//! where one is required) indicate a caller bug and abort via assertion.
//! They are never reported as values. The checks can be compiled out, see
//! the `disable-tag-checks`, `disable-alignment-checks` and
//! `relaxed-alignment-checks` features.
//!
//! # Execution strategies
//!
//! On aarch64 the MTE instructions are emitted through inline assembly by
//! default. Building with `disable-inline-machine-code` switches to the
//! compiler-provided ACLE intrinsics instead; exactly one strategy is ever
//! compiled in, and disabling both is rejected at build time.

#![no_std]

#[cfg(all(feature = "disable-intrinsics", feature = "disable-inline-machine-code"))]
compile_error!(
    "features `disable-intrinsics` and `disable-inline-machine-code` cannot be combined: \
     no execution strategy would remain"
);

#[cfg(all(feature = "disable-alignment-checks", feature = "relaxed-alignment-checks"))]
compile_error!(
    "features `disable-alignment-checks` and `relaxed-alignment-checks` cannot be combined: \
     relaxed checking keeps the critical checks that `disable-alignment-checks` removes"
);

mod checks;

pub mod exclude;
pub mod granule;
pub mod tag;

#[cfg(target_arch = "aarch64")]
mod insn;
#[cfg(target_arch = "aarch64")]
pub mod region;

pub use exclude::ExcludeMask;
pub use granule::{GRANULE_SIZE, MAX_TAG};
