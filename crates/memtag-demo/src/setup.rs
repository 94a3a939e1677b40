//! Process-level MTE enablement and tagged mappings.
//!
//! Everything the core library deliberately leaves to its caller lives
//! here: kernel opt-in via `prctl`, anonymous `PROT_MTE` mappings, and
//! support detection through the hwcaps.

use std::io;
use std::ptr;

use memtag_core::MAX_TAG;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Linux ABI values (not exported by every libc crate version)
// ---------------------------------------------------------------------------

/// Pages track an out-of-band allocation tag per granule.
const PROT_MTE: libc::c_int = 0x20;
/// The kernel and CPU support MTE.
const HWCAP2_MTE: libc::c_ulong = 1 << 18;

const PR_SET_TAGGED_ADDR_CTRL: libc::c_int = 55;
const PR_TAGGED_ADDR_ENABLE: libc::c_ulong = 1;
const PR_MTE_TCF_SYNC: libc::c_ulong = 1 << 1;
const PR_MTE_TCF_ASYNC: libc::c_ulong = 1 << 2;
const PR_MTE_TAG_SHIFT: u32 = 3;

/// A failure in the OS collaboration layer, before any primitive runs.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("prctl(PR_SET_TAGGED_ADDR_CTRL) failed: {0}")]
    Prctl(#[source] io::Error),
    #[error("mmap(PROT_MTE) failed: {0}")]
    Map(#[source] io::Error),
    #[error("sigaction(SIGSEGV) failed: {0}")]
    Sigaction(#[source] io::Error),
}

/// How the kernel reports a tag-check fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggingMode {
    /// Faults are delivered synchronously, at the faulting access.
    Sync,
    /// Faults are accumulated and delivered asynchronously.
    Async,
}

/// Returns true if the kernel reports MTE support for this process.
pub fn mte_supported() -> bool {
    unsafe { libc::getauxval(libc::AT_HWCAP2) & HWCAP2_MTE != 0 }
}

/// Builds the `PR_SET_TAGGED_ADDR_CTRL` argument: tagged-address ABI on,
/// the chosen fault delivery mode, and every tag except [`MAX_TAG`] in the
/// kernel's include mask. Tag 15 stays out so the demo can use it for a
/// pointer the random generator will never hand out.
fn tagged_addr_ctrl(mode: TaggingMode) -> libc::c_ulong {
    let tcf = match mode {
        TaggingMode::Sync => PR_MTE_TCF_SYNC,
        TaggingMode::Async => PR_MTE_TCF_ASYNC,
    };
    let include = (0xFFFF & !(1u64 << MAX_TAG)) as libc::c_ulong;
    PR_TAGGED_ADDR_ENABLE | tcf | (include << PR_MTE_TAG_SHIFT)
}

/// Enables tag checking for the calling process.
pub fn enable(mode: TaggingMode) -> Result<(), SetupError> {
    let rc = unsafe { libc::prctl(PR_SET_TAGGED_ADDR_CTRL, tagged_addr_ctrl(mode), 0, 0, 0) };
    if rc != 0 {
        return Err(SetupError::Prctl(io::Error::last_os_error()));
    }
    Ok(())
}

/// An anonymous tagging-capable mapping, unmapped on drop.
pub struct TaggedMapping {
    ptr: *mut u8,
    len: usize,
}

impl TaggedMapping {
    /// Maps `len` bytes of zero-initialized, zero-tagged memory.
    pub fn new(len: usize) -> Result<Self, SetupError> {
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
        if mapped == libc::MAP_FAILED {
            return Err(SetupError::Map(io::Error::last_os_error()));
        }
        Ok(Self { ptr: mapped.cast(), len })
    }

    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

impl Drop for TaggedMapping {
    fn drop(&mut self) {
        // Nothing useful to do on failure here.
        unsafe { libc::munmap(self.ptr.cast(), self.len) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_word_enables_the_abi_and_the_chosen_mode() {
        let sync = tagged_addr_ctrl(TaggingMode::Sync);
        assert_eq!(sync & PR_TAGGED_ADDR_ENABLE, PR_TAGGED_ADDR_ENABLE);
        assert_eq!(sync & PR_MTE_TCF_SYNC, PR_MTE_TCF_SYNC);
        assert_eq!(sync & PR_MTE_TCF_ASYNC, 0);

        let asynch = tagged_addr_ctrl(TaggingMode::Async);
        assert_eq!(asynch & PR_MTE_TCF_ASYNC, PR_MTE_TCF_ASYNC);
    }

    #[test]
    fn ctrl_word_excludes_tag_fifteen_from_the_include_mask() {
        let ctrl = tagged_addr_ctrl(TaggingMode::Sync);
        let include = (ctrl >> PR_MTE_TAG_SHIFT) & 0xFFFF;
        assert_eq!(include, 0x7FFF);
    }
}
