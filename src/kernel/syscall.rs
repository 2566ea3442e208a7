use std::collections::HashMap;

lazy_static! {
    /// Names for the syscalls the supervisor most often reports on; log
    /// lines fall back to the raw number for anything else.
    static ref SYSCALL_NAMES: HashMap<usize, &'static str> = [
        (sc::nr::ACCESS, "access"),
        (sc::nr::BRK, "brk"),
        (sc::nr::CHDIR, "chdir"),
        (sc::nr::CLONE, "clone"),
        (sc::nr::CLOSE, "close"),
        (sc::nr::EXECVE, "execve"),
        (sc::nr::EXIT, "exit"),
        (sc::nr::EXIT_GROUP, "exit_group"),
        (sc::nr::FORK, "fork"),
        (sc::nr::FSTAT, "fstat"),
        (sc::nr::GETCWD, "getcwd"),
        (sc::nr::GETPID, "getpid"),
        (sc::nr::KILL, "kill"),
        (sc::nr::LSTAT, "lstat"),
        (sc::nr::MKDIR, "mkdir"),
        (sc::nr::MMAP, "mmap"),
        (sc::nr::MPROTECT, "mprotect"),
        (sc::nr::MUNMAP, "munmap"),
        (sc::nr::NANOSLEEP, "nanosleep"),
        (sc::nr::OPEN, "open"),
        (sc::nr::OPENAT, "openat"),
        (sc::nr::READ, "read"),
        (sc::nr::READLINK, "readlink"),
        (sc::nr::RT_SIGACTION, "rt_sigaction"),
        (sc::nr::RT_SIGPROCMASK, "rt_sigprocmask"),
        (sc::nr::STAT, "stat"),
        (sc::nr::VFORK, "vfork"),
        (sc::nr::WAIT4, "wait4"),
        (sc::nr::WRITE, "write"),
    ]
    .iter()
    .cloned()
    .collect();
}

/// Printable name of a syscall number.
pub fn name(sysnum: usize) -> String {
    match SYSCALL_NAMES.get(&sysnum) {
        Some(name) => (*name).to_string(),
        None => format!("syscall_{}", sysnum),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_syscall_name() {
        assert_eq!(name(sc::nr::EXECVE), "execve");
    }

    #[test]
    fn test_unknown_syscall_name_falls_back_to_the_number() {
        assert_eq!(name(98765), "syscall_98765");
    }
}
