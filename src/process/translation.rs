use crate::errors::Result;
use crate::kernel::{enter, exit};
use crate::process::supervisor::Session;
use crate::process::tracee::{Tracee, TraceeStatus};
use crate::register::{Modified, Original, SysResult, Word};

pub trait SyscallTranslator {
    fn translate_syscall(&mut self, session: &Session);
    fn translate_syscall_enter(&mut self, session: &Session) -> Result<()>;
    fn translate_syscall_exit(&mut self);
}

impl SyscallTranslator for Tracee {
    /// Retrieves the registers, handles the enter or exit stage of the
    /// current syscall, and pushes the registers back.
    fn translate_syscall(&mut self, session: &Session) {
        // The registers contain the syscall's number, arguments and other
        // register values; nothing can be done without them.
        if self.regs.fetch_regs().is_err() {
            return;
        }

        match self.status {
            TraceeStatus::SysEnter => {
                // A new syscall round begins: clear the state left by the
                // previous one, then snapshot the original registers; they
                // are what the tracee gets back at the exit stage.
                self.regs.forget_changes();
                self.regs.save_current_regs(Original);

                let status = self.translate_syscall_enter(session);

                self.regs.save_current_regs(Modified);

                if let Err(error) = status {
                    info!("-- {}, translation failed: {}", self.pid, error);
                    // Avoid the actual syscall and remember the error for
                    // the exit stage, where it becomes the tracee-visible
                    // result.
                    self.regs
                        .cancel_syscall("following an error during enter translation");
                    self.status = TraceeStatus::Error(error);
                } else {
                    self.status = TraceeStatus::SysExit;
                }

                if let Err(error) = self.regs.push_regs() {
                    warn!("-- {}, cannot push regs at sysenter: {}", self.pid, error);
                }
            }
            TraceeStatus::SysExit | TraceeStatus::Error(_) => {
                // By default, the tracee's register file is restored at
                // the end of this stage.
                self.regs.set_restore_original_regs(true);

                if let TraceeStatus::Error(ref error) = self.status {
                    let errno = error.get_errno();
                    self.regs.set(
                        SysResult,
                        -(errno as i64) as Word,
                        "following an error during enter translation, reporting errno",
                    );
                } else {
                    self.translate_syscall_exit();
                }

                if let Err(error) = self.regs.push_regs() {
                    warn!("-- {}, cannot push regs at sysexit: {}", self.pid, error);
                }

                self.status = TraceeStatus::SysEnter;
            }
        }
    }

    fn translate_syscall_enter(&mut self, session: &Session) -> Result<()> {
        enter::translate(session, self)
    }

    fn translate_syscall_exit(&mut self) {
        exit::translate(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Errno;
    use crate::filesystem::FileSystem;
    use crate::process::supervisor::Session;
    use crate::register::Current;
    use crate::utils::tests::{fork_test, TempDir};
    use nix::unistd::execve;
    use sc::nr::EXECVE;
    use std::ffi::CString;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    /// Full round trip of a failing execve: the entry translation fails
    /// with ENOENT, the syscall is voided, and the exit stage turns the
    /// kernel's -ENOSYS into the remembered errno, which the tracee then
    /// observes as a plain failed execve.
    #[test]
    fn test_translate_syscall_reports_enoent_for_a_missing_program() {
        let mut entered = false;

        fork_test(
            FileSystem::with_root("/"),
            Session::new(None),
            42,
            |tracee, session| {
                if !entered {
                    if tracee.regs.get_sys_num(Current) == EXECVE {
                        tracee.translate_syscall(session);
                        assert!(tracee.status.is_err());
                        entered = true;
                    }
                    false
                } else {
                    // the exit stop of the voided syscall
                    tracee.translate_syscall(session);
                    assert_eq!(tracee.status, TraceeStatus::SysEnter);
                    true
                }
            },
            || {
                let env: [CString; 0] = [];
                let error = execve(
                    &CString::new("/rootbox/no/such/program").unwrap(),
                    &[CString::new("x").unwrap()],
                    &env,
                )
                .unwrap_err();

                if error == nix::Error::Sys(Errno::ENOENT) {
                    std::process::exit(42);
                }
                std::process::exit(1);
            },
        );
    }

    /// Full round trip of a successful script execve through the enter
    /// and exit stages: the exit stop must leave the fresh program's
    /// registers alone and the tracee must run to completion.
    #[test]
    fn test_translate_syscall_execve_success_round_trip() {
        let temp = TempDir::new("translation-exec");
        let script = temp.path.join("run.sh");
        fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let script_c = CString::new(script.to_str().unwrap()).unwrap();
        let mut nb_execve_stops = 0;

        fork_test(
            FileSystem::with_root("/"),
            Session::new(None),
            0,
            |tracee, session| {
                if tracee.regs.get_sys_num(Current) == EXECVE {
                    nb_execve_stops += 1;
                    tracee.translate_syscall(session);

                    match nb_execve_stops {
                        // enter stage: translated, waiting for the exit
                        1 => assert_eq!(tracee.status, TraceeStatus::SysExit),
                        // exit stage: success, back to the enter stage
                        _ => {
                            assert_eq!(tracee.status, TraceeStatus::SysEnter);
                            return true;
                        }
                    }
                }
                false
            },
            move || {
                let env: [CString; 0] = [];
                execve(&script_c, &[CString::new("run.sh").unwrap()], &env)
                    .expect("failed execve script");
            },
        );
    }
}
