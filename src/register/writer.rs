use byteorder::{NativeEndian, ReadBytesExt};
use crate::errors::*;
use crate::register::reader::peek_word;
use crate::register::{Current, Registers, StackPointer, SysArg, SysArgIndex, Word};
use libc::c_void;
use nix::sys::ptrace;
use nix::unistd::Pid;
use std::io::Cursor;
use std::io::Read;
use std::mem::size_of;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Some ABIs reserve an amount of bytes below the stack pointer for the
/// compiler's exclusive use; a stopped tracee may have live data there.
#[cfg(all(
    any(target_os = "linux", target_os = "android"),
    target_arch = "x86_64"
))]
const RED_ZONE_SIZE: Word = 128;
#[cfg(all(
    any(target_os = "linux", target_os = "android"),
    not(target_arch = "x86_64")
))]
const RED_ZONE_SIZE: Word = 0;

/// Writes one word into the tracee's memory space.
///
/// As with `peek_word`, any ptrace failure is reported as `EFAULT`.
#[inline]
pub fn poke_word(pid: Pid, addr: Word, word: Word) -> Result<()> {
    unsafe { ptrace::write(pid, addr as *mut c_void, word as *mut c_void) }.errno(EFAULT)?;
    Ok(())
}

pub trait PtraceWriter {
    fn set_sysarg_path(
        &mut self,
        sys_arg: SysArgIndex,
        path: &Path,
        justification: &'static str,
    ) -> Result<()>;
    fn set_sysarg_data(
        &mut self,
        sys_arg: SysArgIndex,
        data: &[u8],
        justification: &'static str,
    ) -> Result<()>;
    fn write_data(&self, dest_tracee: Word, data: &[u8]) -> Result<()>;
}

impl PtraceWriter for Registers {
    /// Converts `path` into bytes before calling `set_sysarg_data`.
    fn set_sysarg_path(
        &mut self,
        sys_arg: SysArgIndex,
        path: &Path,
        justification: &'static str,
    ) -> Result<()> {
        self.set_sysarg_data(sys_arg, path.as_os_str().as_bytes(), justification)
    }

    /// Copies `data` into scratch space claimed below the tracee's stack
    /// pointer, and makes `sys_arg` point at the copy.
    ///
    /// The stack pointer register itself is left untouched: scratch space
    /// below the stack pointer (past the red zone) is dead memory for a
    /// process that is stopped inside a syscall, so a translation that
    /// writes nothing else leaves the tracee's register file identical.
    /// When a new argv was materialised earlier in the same stop, the stack
    /// pointer has already been lowered below it, which keeps this scratch
    /// from overlapping the argv block.
    fn set_sysarg_data(
        &mut self,
        sys_arg: SysArgIndex,
        data: &[u8],
        justification: &'static str,
    ) -> Result<()> {
        let stack_pointer = self.get(Current, StackPointer);
        let size = (data.len() + 1) as Word;

        // Word-align the scratch so the word-granular copy below stays
        // within the claimed range.
        let scratch =
            (stack_pointer - RED_ZONE_SIZE - size) & !(size_of::<Word>() as Word - 1);

        self.write_data(scratch, data)?;
        self.set(SysArg(sys_arg), scratch, justification);

        Ok(())
    }

    /// Copies `data` plus a trailing NUL byte to `dest_tracee` in the
    /// tracee's memory space.
    fn write_data(&self, dest_tracee: Word, data: &[u8]) -> Result<()> {
        let nul: &[u8] = &[b'\0'];
        let mut buf = Cursor::new(data).chain(Cursor::new(nul));

        let size = data.len() + 1; // + 1 for the trailing NUL
        let word_size = size_of::<Word>();
        let nb_trailing_bytes = size % word_size;
        let nb_full_words = (size - nb_trailing_bytes) / word_size;

        for i in 0..nb_full_words {
            let word = buf.read_uint::<NativeEndian>(word_size).unwrap() as Word;

            poke_word(
                self.get_pid(),
                dest_tracee + (i * word_size) as Word,
                word,
            )?;
        }

        if nb_trailing_bytes == 0 {
            return Ok(());
        }

        // The last word is only partially covered by `data`; merge the new
        // bytes with the ones already present so nothing beyond the buffer
        // is clobbered.
        let last_dest_addr = dest_tracee + (nb_full_words * word_size) as Word;
        let existing_word = peek_word(self.get_pid(), last_dest_addr)?;
        let mut bytes = existing_word.to_ne_bytes();

        for byte in bytes.iter_mut().take(nb_trailing_bytes) {
            *byte = buf.read_u8().unwrap();
        }

        poke_word(self.get_pid(), last_dest_addr, Word::from_ne_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::FileSystem;
    use crate::process::supervisor::Session;
    use crate::register::{Original, PtraceReader, SysArg1};
    use crate::utils::tests::fork_test;
    use nix::unistd::execvp;
    use sc::nr::MKDIR;
    use std::ffi::CString;
    use std::path::PathBuf;

    #[test]
    /// Rewrites the path argument of a mkdir call, reads it back from the
    /// tracee's memory, and checks that the stack pointer register was not
    /// moved by the scratch write.
    fn test_writer_set_sysarg_path_write_same_path() {
        let test_path = "my/impossible/test/path";
        let test_path_2 = "my/second/impossible/test/path";

        fork_test(
            FileSystem::with_root("/"),
            Session::new(None),
            // expecting an error (the first path cannot be created)
            1,
            // parent
            |tracee, _| {
                if tracee.regs.get_sys_num(Current) == MKDIR {
                    tracee.regs.save_current_regs(Original);

                    let dir_path = tracee.regs.get_sysarg_path(SysArg1).unwrap();
                    assert_eq!(dir_path, PathBuf::from(test_path));

                    let sp_before = tracee.regs.get(Current, StackPointer);

                    tracee
                        .regs
                        .set_sysarg_path(
                            SysArg1,
                            &PathBuf::from(test_path_2),
                            "rewriting an impossible path for the writer test",
                        )
                        .expect("set_sysarg_path");

                    // The scratch write must not move the stack pointer.
                    assert_eq!(sp_before, tracee.regs.get(Current, StackPointer));

                    // Reading the argument back must yield the new path.
                    let dir_path_2 = tracee.regs.get_sysarg_path(SysArg1).unwrap();
                    assert_eq!(dir_path_2, PathBuf::from(test_path_2));

                    // the regs are not pushed, we stop here
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
