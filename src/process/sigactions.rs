use libc::{c_int, c_void, pid_t, siginfo_t};
use nix::sys::signal::Signal::*;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

/// Configures the actions associated with the critical signals.
/// All signals are blocked while a signal handler runs.
pub fn prepare_sigactions(
    stop_program: extern "C" fn(c_int, *mut siginfo_t, *mut c_void),
    show_info: extern "C" fn(pid: pid_t),
) {
    let signal_set: SigSet = SigSet::all();
    // SIGINFO tells us which process signaled us, and RESTART lets
    // waitpid(2) restart seamlessly.
    let sa_flags: SaFlags = SaFlags::SA_SIGINFO | SaFlags::SA_RESTART;

    for signal in Signal::iterator() {
        let mut signal_handler: SigHandler = SigHandler::SigIgn; // default action is ignoring

        match signal {
            SIGQUIT | SIGILL | SIGABRT | SIGFPE | SIGSEGV => {
                // abnormal termination signals
                signal_handler = SigHandler::SigAction(stop_program);
            }
            SIGUSR1 | SIGUSR2 => {
                // can be used for inter-process communication
                signal_handler = SigHandler::Handler(show_info);
            }
            SIGCHLD | SIGCONT | SIGTSTP | SIGTTIN | SIGTTOU | SIGSTOP | SIGKILL => {
                // these signals are related to tty and job control, or
                // cannot be overridden at all (stop and kill), so they
                // keep their default action
                continue;
            }
            _ => {} // all other signals (even ^C) are ignored
        }

        let signal_action = SigAction::new(signal_handler, sa_flags, signal_set);
        let sigaction_result = unsafe { sigaction(signal, &signal_action) };

        if let Err(error) = sigaction_result {
            warn!("sigaction failed for signal {:?}: {:?}", signal, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub extern "C" fn mock_stop_program(_: c_int, _: *mut siginfo_t, _: *mut c_void) {}
    pub extern "C" fn mock_show_info(_: pid_t) {}

    #[test]
    fn test_prepare_sigactions() {
        // should pass without panicking
        prepare_sigactions(mock_stop_program, mock_show_info);
    }
}
