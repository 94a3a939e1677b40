//! Execution strategies for the MTE instruction set.
//!
//! Two interchangeable backends implement the same crate-private contract:
//!
//! - `emit`: the instructions are emitted directly through inline
//!   assembly. Default.
//! - `acle`: the operations go through the compiler's ACLE
//!   `__arm_mte_*` intrinsics instead (feature
//!   `disable-inline-machine-code`).
//!
//! Exactly one backend is compiled into any given build; the `*_advance`
//! functions process one granule (or one double granule) and return the
//! cursor moved past it, so the bulk loops in [`region`](crate::region)
//! are backend-agnostic.

#[cfg(not(feature = "disable-inline-machine-code"))]
mod emit;
#[cfg(not(feature = "disable-inline-machine-code"))]
pub(crate) use emit::*;

#[cfg(feature = "disable-inline-machine-code")]
mod acle;
#[cfg(feature = "disable-inline-machine-code")]
pub(crate) use acle::*;
