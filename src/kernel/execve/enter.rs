use crate::errors::*;
use crate::filesystem::Translator;
use crate::kernel::execve::args::Argv;
use crate::kernel::execve::elf::InterpreterCheck;
use crate::kernel::execve::runner::Runner;
use crate::kernel::execve::{shebang, stack};
use crate::process::tracee::Tracee;
use crate::register::{Current, PtraceReader, PtraceWriter, SysArg, SysArg1, SysArg2};

/// Translates the arguments of an `execve` syscall at its entry stop.
///
/// This syscall needs a very special treatment for script files because,
/// according to "man 2 execve", the kernel runs the *interpreter* named by
/// the `#!` line with the script's path as its first argument. Left alone,
/// the kernel would therefore run the interpreter from the host root with
/// the translated script path as argument. We want the opposite: run the
/// translated interpreter with the untranslated script path, so that every
/// path the interpreter sees stays a guest path:
///
/// ```text
///     execve("/bin/script.sh", argv = [ "script.sh", "arg1", ... ], envp)
/// ```
///
/// becomes
///
/// ```text
///     execve("/tmp/new_root/bin/sh",
///            argv = [ "/bin/sh", "/bin/script.sh", "arg1", ... ], envp)
/// ```
///
/// On success, the number of bytes of tracee stack consumed by the
/// rewritten argv is returned (0 when the argv did not have to change).
pub fn translate(
    tracee: &mut Tracee,
    runner: Option<&Runner>,
    elf_check: &dyn InterpreterCheck,
) -> Result<usize> {
    let mut guest_path = tracee.regs.get_sysarg_path(SysArg1)?;
    let argv_addr = tracee.regs.get(Current, SysArg(SysArg2));
    let mut argv = Argv::from_tracee(tracee.pid, argv_addr)?;

    debug!("execve({:?}, {})", guest_path, argv);

    // Expand the shebang iteratively: each round replaces the candidate
    // program with its interpreter, which may itself be a script. The loop
    // stops at the first file that does not start with `#!`.
    let mut nb_shebang = 0;
    loop {
        match shebang::expand(&tracee.fs, &mut guest_path, &mut argv) {
            Ok(true) => nb_shebang += 1,
            Ok(false) => break,
            // The kernel reports EACCES, not EISDIR, for an attempt to
            // execute a directory.
            Err(error) if error.get_errno() == EISDIR => {
                return Err(error.with_errno(EACCES));
            }
            Err(error) => return Err(error),
        }
    }

    let mut host_path = tracee.fs.translate_path(&guest_path, true)?;

    let runner_injected = match runner {
        Some(runner) => {
            runner.check_program(&host_path)?;
            runner.inject(&mut argv, &guest_path);
            host_path = runner.host_path().to_path_buf();
            true
        }
        None => false,
    };

    // Rebuild the tracee's argv only if something has changed.
    let size = if nb_shebang > 0 || runner_injected {
        stack::push_argv(&mut tracee.regs, &argv)?
    } else {
        0
    };

    elf_check.check(&host_path)?;

    tracee.regs.set_sysarg_path(
        SysArg1,
        &host_path,
        "during execve translation, pointing at the program to execute",
    )?;

    Ok(size)
}
