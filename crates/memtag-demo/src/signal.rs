//! SIGSEGV reporting for the deliberate tag-mismatch access.
//!
//! The handler must stay async-signal-safe: fixed strings through
//! `write(2)`, then `_exit`. Reaching the handler with `SEGV_MTESERR` is
//! the expected end of the demo, so it exits 0.

use std::io;
use std::mem;
use std::ptr;

use crate::setup::SetupError;

/// `si_code`: synchronous MTE tag check fault.
const SEGV_MTESERR: libc::c_int = 9;

/// Installs the SIGSEGV handler with `SA_SIGINFO`.
pub fn install() -> Result<(), SetupError> {
    let mut sa: libc::sigaction = unsafe { mem::zeroed() };
    sa.sa_sigaction = on_segv as usize;
    sa.sa_flags = libc::SA_SIGINFO;
    let rc = unsafe {
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaction(libc::SIGSEGV, &sa, ptr::null_mut())
    };
    if rc != 0 {
        return Err(SetupError::Sigaction(io::Error::last_os_error()));
    }
    Ok(())
}

extern "C" fn on_segv(
    _signo: libc::c_int,
    info: *mut libc::siginfo_t,
    _context: *mut libc::c_void,
) {
    let code = unsafe { (*info).si_code };
    let msg: &[u8] = if code == SEGV_MTESERR {
        b"caught SIGSEGV: synchronous MTE tag check fault, as expected\n"
    } else {
        b"caught SIGSEGV: not an MTE tag fault\n"
    };
    unsafe {
        let _ = libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len());
        libc::_exit(if code == SEGV_MTESERR { 0 } else { 1 });
    }
}
