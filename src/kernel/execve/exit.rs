use crate::process::tracee::Tracee;
use crate::register::{Current, SysResult};

/// Handles the exit stop of a translated `execve`.
///
/// A zero result means the kernel replaced the process image: the
/// registers fetched at this stop belong to the new program's entry point
/// and must reach the tracee untouched, so every pending change (and the
/// restore-original behaviour armed by the generic exit path) is dropped.
///
/// A negative result means the execve failed in the kernel after our
/// rewrites; the generic restore-original behaviour then puts the original
/// argument registers back while the kernel's error stays in the result
/// register.
pub fn translate(tracee: &mut Tracee) {
    let result = tracee.regs.get(Current, SysResult) as i64;

    if result == 0 {
        debug!("-- {}, execve succeeded, keeping the fresh registers", tracee.pid);
        tracee.regs.forget_changes();
    }
}
