use crate::kernel::execve;
use crate::kernel::syscall;
use crate::process::tracee::Tracee;
use crate::register::Current;

/// Translates a syscall at its exit stop.
pub fn translate(tracee: &mut Tracee) {
    let sys_num = tracee.regs.get_sys_num(Current);

    debug!("-- {}, exit {}", tracee.pid, syscall::name(sys_num));

    #[allow(clippy::single_match)]
    match sys_num {
        sc::nr::EXECVE => execve::exit(tracee),
        _ => {}
    }
}
