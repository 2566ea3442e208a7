use crate::errors::*;
use crate::register::{Current, Registers, SysArg, SysArgIndex, Word};
use libc::{c_void, PATH_MAX};
use nix::sys::ptrace;
use nix::unistd::Pid;
use std::mem::size_of;
use std::os::unix::ffi::OsStrExt;
use std::ffi::OsStr;
use std::path::PathBuf;

/// Reads one word from the tracee's memory space.
///
/// Any ptrace failure is reported as `EFAULT`: from the translation's point
/// of view the address simply could not be read.
#[inline]
pub fn peek_word(pid: Pid, addr: Word) -> Result<Word> {
    let word = ptrace::read(pid, addr as *mut c_void).errno(EFAULT)?;
    Ok(word as Word)
}

pub trait PtraceReader {
    fn get_sysarg_path(&self, sys_arg: SysArgIndex) -> Result<PathBuf>;
}

impl PtraceReader for Registers {
    /// Retrieves a path from one of the syscall's arguments.
    ///
    /// Returns `Ok(path)` if successful, `Ok(PathBuf::new())` if the
    /// syscall argument is null, or an error.
    #[inline]
    fn get_sysarg_path(&self, sys_arg: SysArgIndex) -> Result<PathBuf> {
        let src_sysarg = self.get(Current, SysArg(sys_arg));

        if src_sysarg == 0 {
            trace!("{:?}(null) => \"\"", sys_arg);
            // A null path argument is not an error by itself, some
            // syscalls (utimensat(2) for instance) allow it.
            Ok(PathBuf::new())
        } else {
            let path = read_path(self.get_pid(), src_sysarg);
            match &path {
                Ok(path) => trace!("{:?}({:x?}) => {:?}", sys_arg, src_sysarg, path),
                Err(error) => trace!(
                    "{:?}({:x?}) => {:?}",
                    sys_arg,
                    src_sysarg,
                    error.get_errno()
                ),
            }
            path
        }
    }
}

/// Reads a path from the tracee's memory space, `PATH_MAX` bytes at most.
#[inline]
fn read_path(pid: Pid, src_path: Word) -> Result<PathBuf> {
    let bytes = read_string(pid, src_path, PATH_MAX as usize)?;

    if bytes.len() >= PATH_MAX as usize {
        return Err(Error::errno_with_msg(
            ENAMETOOLONG,
            "when reading a sys arg path",
        ));
    }

    // Paths are arbitrary bytes on Linux, no UTF-8 validation wanted.
    Ok(PathBuf::from(OsStr::from_bytes(&bytes)))
}

/// Reads a NUL-terminated string from the tracee's memory space.
///
/// The string is read word by word (ptrace is word-granular) until a NUL
/// byte is found or `max_size` bytes were read. The NUL is not included in
/// the result. A returned vector of length `max_size` therefore means that
/// no terminator was found within the bound, which callers are expected to
/// report as `ENAMETOOLONG`.
pub fn read_string(pid: Pid, src_string: Word, max_size: usize) -> Result<Vec<u8>> {
    let mut bytes: Vec<u8> = Vec::new();

    let word_size = size_of::<Word>();
    let nb_trailing_bytes = max_size % word_size;
    let nb_full_words = (max_size - nb_trailing_bytes) / word_size;

    for i in 0..nb_full_words {
        let word = peek_word(pid, src_string + (i * word_size) as Word)?;

        for &byte in word.to_ne_bytes().iter() {
            if byte == b'\0' {
                return Ok(bytes);
            }
            bytes.push(byte);
        }
    }

    // The bound may stop in the middle of a word; only the bytes within
    // the bound may be looked at.
    if nb_trailing_bytes > 0 {
        let word = peek_word(pid, src_string + (nb_full_words * word_size) as Word)?;

        for &byte in word.to_ne_bytes().iter().take(nb_trailing_bytes) {
            if byte == b'\0' {
                return Ok(bytes);
            }
            bytes.push(byte);
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::regs::RegisterSet;
    use crate::register::*;
    use crate::utils::tests::fork_test;
    use crate::filesystem::FileSystem;
    use crate::process::supervisor::Session;
    use nix::unistd::{execvp, getpid};
    use sc::nr::MKDIR;
    use std::ffi::CString;
    use std::mem;
    use std::path::PathBuf;

    #[test]
    fn test_reader_get_sysarg_path_returns_empty_for_null_arg() {
        let raw_regs: RegisterSet = unsafe { mem::zeroed() };
        let regs = Registers::from(getpid(), raw_regs);
        let args = [SysArg1, SysArg2, SysArg3, SysArg4, SysArg5, SysArg6];

        for arg in args.iter() {
            assert_eq!(regs.get_sysarg_path(*arg).unwrap(), PathBuf::new());
        }
    }

    #[test]
    /// Checks that `get_sysarg_path`, `read_path` and `read_string` all
    /// work on a live tracee, by intercepting a mkdir call and comparing
    /// the path read from the tracee's memory with the one given on the
    /// command line.
    fn test_reader_get_sysarg_path_for_mkdir() {
        let test_path = "my/impossible/test/path";

        fork_test(
            FileSystem::with_root("/"),
            Session::new(None),
            // expecting an error (the path cannot be created)
            1,
            // parent
            |tracee, _| {
                if tracee.regs.get_sys_num(Current) == MKDIR {
                    let dir_path = tracee.regs.get_sysarg_path(SysArg1).unwrap();

                    assert_eq!(dir_path, PathBuf::from(test_path));

                    true
                } else {
                    false
                }
            },
            // child
            || {
                execvp(
                    &CString::new("mkdir").unwrap(),
                    &[CString::new(".").unwrap(), CString::new(test_path).unwrap()],
                )
                .expect("failed execvp mkdir");
            },
        );
    }
}
