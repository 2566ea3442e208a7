use crate::filesystem::FileSystem;
use crate::kernel::execve::{AcceptAllInterpreters, Runner};
use crate::process::event::EventHandler;
use crate::process::tracee::Tracee;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::ffi::CString;

use libc::{c_int, c_void, pid_t, siginfo_t};
use nix::sys::ptrace;
use nix::sys::ptrace::Event as PtraceEvent;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait;
use nix::sys::wait::WaitPidFlag;
use nix::sys::wait::WaitStatus::*;
use nix::unistd::{execvp, fork, getpid, ForkResult, Pid};

/// Global configuration shared by every tracee: set up once in `main`,
/// never mutated afterwards (except the one-shot ptrace-options latch).
#[derive(Debug)]
pub struct Session {
    /// Whether the first raw SIGTRAP has been processed (and so whether
    /// the ptrace options are already set).
    pub ptrace_options_set: bool,
    /// Optional program executed in place of every guest program.
    pub runner: Option<Runner>,
    /// Policy vetting the program about to be executed.
    pub elf_check: AcceptAllInterpreters,
}

impl Session {
    pub fn new(runner: Option<Runner>) -> Session {
        Session {
            ptrace_options_set: false,
            runner,
            elf_check: AcceptAllInterpreters,
        }
    }
}

#[derive(Debug)]
pub struct Supervisor {
    session: Session,
    tracees: HashMap<Pid, Tracee>,
    alive_tracees: Vec<Pid>,
}

impl Supervisor {
    pub fn new(session: Session) -> Supervisor {
        Supervisor {
            session,
            tracees: HashMap::new(),
            alive_tracees: vec![],
        }
    }

    /// Splits the sandbox into a tracer (the parent, this process) and the
    /// first tracee (the child), which declares itself ptrace-able before
    /// executing the guest command.
    pub fn launch_process(&mut self, initial_fs: FileSystem, command: &[CString]) {
        match unsafe { fork() }.expect("fork the first tracee") {
            ForkResult::Parent { child } => {
                self.create_tracee(child, initial_fs);
            }
            ForkResult::Child => {
                ptrace::traceme().expect("ptrace traceme");

                // Synchronise with the supervisor's event loop: stop here
                // until it is ready to trace.
                kill(getpid(), Signal::SIGSTOP).expect("first tracee synchronisation");

                execvp(&command[0], command).expect("execvp the guest command");
            }
        }
    }

    /// Waits for tracee events and handles them until no tracee is left.
    ///
    /// Tracees stop on every syscall; the supervisor rewrites the
    /// syscall's parameters before restarting them.
    pub fn event_loop(&mut self) {
        while !self.alive_tracees.is_empty() {
            match wait::waitpid(Pid::from_raw(-1), Some(WaitPidFlag::__WALL))
                .expect("event loop waitpid")
            {
                Exited(pid, exit_status) => {
                    debug!("-- {}, exited with status {}", pid, exit_status);
                    self.register_tracee_finished(pid);
                }
                Signaled(pid, term_signal, _dumped_core) => {
                    debug!("-- {}, killed by {:?}", pid, term_signal);
                    self.register_tracee_finished(pid);
                }
                // The tracee was stopped by a normal signal (signal
                // delivery stop), or by a syscall while
                // PTRACE_O_TRACESYSGOOD is not in effect yet;
                // PTRACE_GETSIGINFO distinguishes the latter.
                Stopped(pid, stop_signal) => {
                    debug!("-- {}, stopped by {:?}", pid, stop_signal);
                    let session = &mut self.session;
                    let tracee = match self.tracees.get_mut(&pid) {
                        Some(tracee) => tracee,
                        None => {
                            Self::restart_unknown(pid);
                            continue;
                        }
                    };
                    tracee.reset_restart_how();
                    match stop_signal {
                        Signal::SIGSTOP => tracee.handle_sigstop_event(),
                        Signal::SIGTRAP => {
                            // the initial SIGTRAP of the first tracee
                            tracee.set_ptrace_options(session);
                            if let Ok(siginfo) = ptrace::getsiginfo(pid) {
                                if siginfo.si_code == Signal::SIGTRAP as i32
                                    || siginfo.si_code == (Signal::SIGTRAP as i32 | 0x80)
                                {
                                    tracee.handle_syscall_stop_event(session);
                                }
                            }
                        }
                        _ => {}
                    }
                    tracee.restart();
                }
                // SIGTRAP with additional status: a PTRACE_EVENT stop.
                PtraceEvent(pid, _signal, status_additional) => {
                    debug!("-- {}, ptrace event {:?}", pid, status_additional);
                    let tracee = match self.tracees.get_mut(&pid) {
                        Some(tracee) => tracee,
                        None => {
                            Self::restart_unknown(pid);
                            continue;
                        }
                    };
                    tracee.reset_restart_how();

                    if status_additional == PtraceEvent::PTRACE_EVENT_VFORK as i32 {
                        tracee.handle_new_child_event(PtraceEvent::PTRACE_EVENT_VFORK);
                    } else if status_additional == PtraceEvent::PTRACE_EVENT_FORK as i32 {
                        tracee.handle_new_child_event(PtraceEvent::PTRACE_EVENT_FORK);
                    } else if status_additional == PtraceEvent::PTRACE_EVENT_CLONE as i32 {
                        tracee.handle_new_child_event(PtraceEvent::PTRACE_EVENT_CLONE);
                    }
                    if status_additional == PtraceEvent::PTRACE_EVENT_EXEC as i32
                        || status_additional == PtraceEvent::PTRACE_EVENT_VFORK_DONE as i32
                    {
                        tracee.handle_exec_vfork_event();
                    }
                    tracee.restart();
                }
                // A syscall stop under PTRACE_O_TRACESYSGOOD
                // (SIGTRAP | 0x80), unambiguously a syscall.
                PtraceSyscall(pid) => {
                    let session = &mut self.session;
                    let tracee = match self.tracees.get_mut(&pid) {
                        Some(tracee) => tracee,
                        None => {
                            Self::restart_unknown(pid);
                            continue;
                        }
                    };
                    tracee.reset_restart_how();
                    tracee.handle_syscall_stop_event(session);
                    tracee.restart();
                }
                Continued(pid) => {
                    debug!("-- {}, continued", pid);
                }
                StillAlive => {
                    debug!("-- still alive");
                }
            }
        }
    }

    /// A stop from a pid the supervisor never registered: a child the
    /// kernel auto-attached through the TRACE*FORK/CLONE options. Its
    /// syscalls are not translated, it is only kept running.
    fn restart_unknown(pid: Pid) {
        debug!("-- {}, stop from an unregistered tracee", pid);
        let _ = ptrace::syscall(pid, None);
    }

    pub fn create_tracee(&mut self, pid: Pid, fs: FileSystem) -> Option<&Tracee> {
        self.tracees.insert(pid, Tracee::new(pid, fs));
        self.register_alive_tracee(pid);
        self.tracees.get(&pid)
    }

    fn register_alive_tracee(&mut self, pid: Pid) {
        self.alive_tracees.push(pid);
    }

    fn register_tracee_finished(&mut self, finished_pid: Pid) {
        self.alive_tracees.retain(|pid| *pid != finished_pid);
        self.tracees.remove(&finished_pid);
    }
}

/// The supervisor received a fatal signal and must stop the program.
pub extern "C" fn stop_program(sig_num: c_int, _: *mut siginfo_t, _: *mut c_void) {
    let signal = Signal::try_from(sig_num);
    panic!("abnormal signal received: {:?}", signal);
}

pub extern "C" fn show_info(pid: pid_t) {
    info!("showing info for pid {}", pid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::Pid;

    #[test]
    fn test_create_supervisor_and_tracee() {
        let fs = FileSystem::new();
        let mut supervisor = Supervisor::new(Session::new(None));

        // tracee 0 shouldn't exist
        assert!(supervisor.tracees.get_mut(&Pid::from_raw(0)).is_none());

        supervisor.create_tracee(Pid::from_raw(0), fs);

        // tracee 0 should exist now
        assert!(supervisor.tracees.get_mut(&Pid::from_raw(0)).is_some());
        assert_eq!(supervisor.alive_tracees.len(), 1);
    }
}
