use crate::errors::Result;
use crate::kernel::execve;
use crate::kernel::syscall;
use crate::process::supervisor::Session;
use crate::process::tracee::Tracee;
use crate::register::Current;

/// Translates a syscall at its entry stop.
///
/// Program execution is the only syscall this sandbox rewrites; everything
/// else reaches the kernel untouched.
pub fn translate(session: &Session, tracee: &mut Tracee) -> Result<()> {
    let sys_num = tracee.regs.get_sys_num(Current);

    debug!("-- {}, enter {}", tracee.pid, syscall::name(sys_num));

    match sys_num {
        sc::nr::EXECVE => {
            let size = execve::enter(tracee, session.runner.as_ref(), &session.elf_check)?;
            if size > 0 {
                debug!(
                    "-- {}, execve claimed {} bytes of tracee stack for the new argv",
                    tracee.pid, size
                );
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
