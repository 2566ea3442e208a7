use crate::process::supervisor::Session;
use crate::process::tracee::Tracee;
use crate::process::translation::SyscallTranslator;
use nix::sys::ptrace::Event as PtraceEvent;

pub trait EventHandler {
    fn handle_syscall_stop_event(&mut self, session: &mut Session);
    fn handle_sigstop_event(&mut self);
    fn handle_exec_vfork_event(&mut self);
    fn handle_new_child_event(&mut self, event: PtraceEvent);
}

impl EventHandler for Tracee {
    /// Standard handling of a syscall stop: translate the syscall's
    /// parameters and restart it.
    fn handle_syscall_stop_event(&mut self, session: &mut Session) {
        self.translate_syscall(session);
    }

    fn handle_sigstop_event(&mut self) {
        debug!("-- {}, sigstop", self.pid);
    }

    fn handle_exec_vfork_event(&mut self) {
        debug!("-- {}, exec or vfork-done event", self.pid);
    }

    fn handle_new_child_event(&mut self, event: PtraceEvent) {
        debug!("-- {}, new child: {:?}", self.pid, event);
    }
}
