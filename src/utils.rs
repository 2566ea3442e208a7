#[cfg(test)]
pub mod tests {
    use crate::filesystem::FileSystem;
    use crate::process::supervisor::Session;
    use crate::process::tracee::Tracee;
    use nix::sys::ptrace;
    use nix::sys::signal::{kill, Signal};
    use nix::sys::wait::WaitStatus::*;
    use nix::sys::wait::{waitpid, WaitPidFlag};
    use nix::unistd::{fork, getpid, ForkResult, Pid};
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Self-cleaning scratch directory for test fixtures.
    pub struct TempDir {
        pub path: PathBuf,
    }

    impl TempDir {
        pub fn new(prefix: &str) -> TempDir {
            let path = env::temp_dir().join(format!(
                "rootbox-test-{}-{}-{}",
                prefix,
                getpid(),
                TEMP_DIR_COUNTER.fetch_add(1, Ordering::SeqCst),
            ));
            fs::create_dir_all(&path).expect("create temp dir");
            TempDir { path }
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            if self.path.exists() {
                let _ = fs::remove_dir_all(&self.path);
            }
        }
    }

    /// Runs `func` in a forked subprocess, so that ptrace tests do not
    /// interfere with each other or with the test runner.
    fn test_in_subprocess<F: FnMut()>(mut func: F) {
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                func();
                std::process::exit(0);
            }
            Ok(ForkResult::Parent { child }) => {
                assert_eq!(waitpid(child, None), Ok(Exited(child, 0)))
            }
            Err(_) => panic!("fork failed"),
        }
    }

    /// Simulates the sandbox by forking a supervisor and a tracee.
    ///
    /// The child declares itself ptrace-able, synchronises with a
    /// SIGSTOP, then runs `func_child`. The parent loops on the tracee's
    /// stops; on each syscall stop it fetches the registers into a
    /// `Tracee` and calls `func_parent`, until that hook returns true.
    /// The tracee then runs to completion and its exit status is compared
    /// with `expected_exit_status`.
    pub fn fork_test<FuncParent, FuncChild>(
        fs: FileSystem,
        mut session: Session,
        expected_exit_status: i32,
        mut func_parent: FuncParent,
        mut func_child: FuncChild,
    ) where
        FuncParent: FnMut(&mut Tracee, &mut Session) -> bool,
        FuncChild: FnMut(),
    {
        test_in_subprocess(|| {
            match unsafe { fork() }.expect("fork in test") {
                ForkResult::Parent { child } => {
                    let mut tracee = Tracee::new(child, fs.clone());

                    // wait for the child's SIGSTOP before setting the
                    // ptrace options
                    assert_eq!(
                        waitpid(child, Some(WaitPidFlag::__WALL)).expect("waitpid sigstop"),
                        Stopped(child, Signal::SIGSTOP)
                    );
                    tracee.set_ptrace_options(&mut session);

                    restart(child);

                    // loop until the parent hook decides to stop
                    loop {
                        match waitpid(child, Some(WaitPidFlag::__WALL)).expect("waitpid loop") {
                            PtraceSyscall(pid) => {
                                assert_eq!(pid, child);
                                tracee.regs.fetch_regs().expect("fetch regs");

                                if func_parent(&mut tracee, &mut session) {
                                    break;
                                }
                            }
                            Exited(_, _) => panic!("the tracee exited too early"),
                            Signaled(_, _, _) => panic!("the tracee was killed"),
                            _ => {}
                        }
                        restart(child);
                    }

                    restart(child);
                    end(child, expected_exit_status);
                }
                ForkResult::Child => {
                    ptrace::traceme().expect("test ptrace traceme");
                    // a SIGSTOP to synchronise both processes
                    kill(getpid(), Signal::SIGSTOP).expect("test child sigstop");

                    func_child();
                    std::process::exit(0);
                }
            }
        });
    }

    /// Restarts a traced child up to its next syscall stop.
    fn restart(child: Pid) {
        ptrace::syscall(child, None).expect("restart tracee");
    }

    /// Lets a traced child run to completion, checking its exit status.
    fn end(child: Pid, expected_exit_status: i32) {
        loop {
            match waitpid(child, Some(WaitPidFlag::__WALL)).expect("waitpid end") {
                Exited(pid, exit_status) => {
                    assert_eq!(pid, child);
                    assert_eq!(exit_status, expected_exit_status);
                    break;
                }
                _ => restart(child),
            }
        }
    }
}
