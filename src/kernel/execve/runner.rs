use crate::errors::*;
use crate::filesystem::{FileSystem, Translator};
use crate::kernel::execve::args::Argv;
use nix::unistd::{access, AccessFlags};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// An optional program inserted as the real executable of every `execve`,
/// typically a CPU emulator. Configured once at startup, immutable for the
/// life of the supervisor.
///
/// Unconditional insertion is a deliberately simple scheme; a binfmt_misc
/// style dispatch per binary format would be the richer alternative.
#[derive(Debug)]
pub struct Runner {
    host_path: PathBuf,
}

impl Runner {
    /// Resolves and validates the runner at startup.
    ///
    /// The guest path must translate under the virtual root and the host
    /// result must be executable by the current user. Callers treat any
    /// failure as fatal: a half-configured runner must not survive.
    pub fn new(fs: &FileSystem, guest_path: &Path) -> Result<Runner> {
        let host_path = fs
            .translate_path(guest_path, true)
            .with_context(|| format!("when translating the runner path {:?}", guest_path))?;

        fs.is_path_executable(&host_path)
            .with_context(|| format!("the runner {:?} is not executable", host_path))?;

        Ok(Runner { host_path })
    }

    #[inline]
    pub fn host_path(&self) -> &Path {
        &self.host_path
    }

    /// The runner is only launched if the requested program itself exists
    /// and is readable and executable.
    pub fn check_program(&self, program_host_path: &Path) -> Result<()> {
        access(program_host_path, AccessFlags::F_OK).errno(ENOENT)?;
        access(program_host_path, AccessFlags::R_OK).errno(EACCES)?;
        access(program_host_path, AccessFlags::X_OK).errno(EACCES)?;
        Ok(())
    }

    /// Splices the runner into the argv head: the runner becomes argv[0]
    /// and the program's guest path argv[1], so the runner receives the
    /// program to emulate as its first argument.
    pub fn inject(&self, argv: &mut Argv, program_guest_path: &Path) {
        argv.replace_head(&[
            self.host_path.as_os_str().as_bytes(),
            program_guest_path.as_os_str().as_bytes(),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tests::TempDir;

    #[test]
    fn test_runner_new_requires_an_executable() {
        let fs = FileSystem::with_root("/");

        assert!(Runner::new(&fs, Path::new("/bin/true")).is_ok());
        assert_eq!(
            Runner::new(&fs, Path::new("/no/such/runner"))
                .unwrap_err()
                .get_errno(),
            ENOENT
        );
        assert_eq!(
            Runner::new(&fs, Path::new("/etc/passwd"))
                .unwrap_err()
                .get_errno(),
            EACCES
        );
    }

    #[test]
    fn test_runner_translates_under_the_root() {
        let temp = TempDir::new("runner-root");
        std::fs::create_dir(temp.path.join("bin")).unwrap();
        let host_runner = temp.path.join("bin/emu");
        std::fs::copy("/bin/true", &host_runner).unwrap();

        let fs = FileSystem::with_root(&temp.path);
        let runner = Runner::new(&fs, Path::new("/bin/emu")).unwrap();

        assert_eq!(runner.host_path(), host_runner.as_path());
    }

    #[test]
    fn test_check_program_errnos() {
        let fs = FileSystem::with_root("/");
        let runner = Runner::new(&fs, Path::new("/bin/true")).unwrap();

        assert_eq!(runner.check_program(Path::new("/bin/sh")), Ok(()));
        assert_eq!(
            runner.check_program(Path::new("/no/such/program")),
            Err(Error::errno(ENOENT))
        );
        assert_eq!(
            runner.check_program(Path::new("/etc/passwd")),
            Err(Error::errno(EACCES))
        );
    }

    #[test]
    fn test_inject_prepends_runner_and_guest_path() {
        let fs = FileSystem::with_root("/");
        let runner = Runner::new(&fs, Path::new("/bin/true")).unwrap();

        let mut argv = Argv::from_entries(&["foo", "bar"]);
        runner.inject(&mut argv, Path::new("/bin/foo"));

        assert_eq!(
            argv,
            Argv::from_entries(&[
                runner.host_path().as_os_str().as_bytes(),
                b"/bin/foo",
                b"bar",
            ])
        );
    }
}
