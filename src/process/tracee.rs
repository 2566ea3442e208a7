use crate::errors::Error;
use crate::filesystem::FileSystem;
use crate::process::supervisor::Session;
use crate::register::Registers;
use nix::sys::ptrace;
use nix::sys::ptrace::Options;
use nix::unistd::Pid;

#[derive(Debug, PartialEq)]
pub enum TraceeStatus {
    /// Waiting for (or handling) a syscall-entry stop.
    SysEnter,
    /// Waiting for the syscall-exit stop, entry translation went fine.
    SysExit,
    /// Waiting for the syscall-exit stop, entry translation failed.
    Error(Error),
}

#[allow(dead_code)]
impl TraceeStatus {
    pub fn is_err(&self) -> bool {
        matches!(*self, TraceeStatus::Error(_))
    }

    pub fn is_ok(&self) -> bool {
        !self.is_err()
    }
}

#[derive(Debug, PartialEq)]
pub enum TraceeRestartMethod {
    /// Restart the tracee, without going through the exit stage.
    WithoutExitStage, // PTRACE_CONT
    /// Restart the tracee, with the exit stage.
    WithExitStage, // PTRACE_SYSCALL
    /// Do not restart the tracee.
    None,
}

#[derive(Debug)]
pub struct Tracee {
    /// Process identifier.
    pub pid: Pid,
    /// Whether the tracee is in the enter or exit stage.
    pub status: TraceeStatus,
    /// How the tracee will be restarted after the current stop.
    pub restart_how: TraceeRestartMethod,
    /// The tracee's view of the filesystem.
    pub fs: FileSystem,
    /// Cached version of the tracee's general purpose registers.
    pub regs: Registers,
}

impl Tracee {
    pub fn new(pid: Pid, fs: FileSystem) -> Tracee {
        Tracee {
            pid,
            status: TraceeStatus::SysEnter, // it always starts by the enter stage
            restart_how: TraceeRestartMethod::None,
            fs,
            regs: Registers::new(pid),
        }
    }

    /// Every stop is followed by a full syscall round trip: without
    /// seccomp acceleration both stages are always traced.
    #[inline]
    pub fn reset_restart_how(&mut self) {
        self.restart_how = TraceeRestartMethod::WithExitStage;
    }

    #[inline]
    pub fn restart(&mut self) {
        // TODO: deliver the pending signal through ptrace::syscall(pid, sig)
        // instead of swallowing it.
        match self.restart_how {
            TraceeRestartMethod::WithoutExitStage => {
                ptrace::cont(self.pid, None).expect("restart tracee without exit stage");
            }
            TraceeRestartMethod::WithExitStage => {
                ptrace::syscall(self.pid, None).expect("restart tracee with exit stage");
            }
            TraceeRestartMethod::None => {}
        };

        self.restart_how = TraceeRestartMethod::None;
    }

    /// Distinguish some events from others and automatically trace each
    /// new process with the same options.
    ///
    /// Note that only the first bare SIGTRAP is related to the tracing
    /// loop; the subsequent ones carry tracing information because of
    /// TRACE*FORK/CLONE/EXEC.
    pub fn set_ptrace_options(&self, session: &mut Session) {
        if session.ptrace_options_set {
            return;
        }
        session.ptrace_options_set = true;

        let default_options = Options::PTRACE_O_TRACESYSGOOD
            | Options::PTRACE_O_TRACEFORK
            | Options::PTRACE_O_TRACEVFORK
            | Options::PTRACE_O_TRACEVFORKDONE
            | Options::PTRACE_O_TRACEEXEC
            | Options::PTRACE_O_TRACECLONE
            | Options::PTRACE_O_TRACEEXIT;

        ptrace::setoptions(self.pid, default_options).expect("set ptrace options");
    }
}
