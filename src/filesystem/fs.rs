use std::path::{Path, PathBuf};

use nix::sys;
use nix::unistd::{self, AccessFlags};

use crate::errors::Result;

/// The tracee's view of the filesystem: a host directory substituted for
/// `/`, plus the guest working directory used to resolve relative paths.
#[derive(Debug, Clone)]
pub struct FileSystem {
    /// Host directory acting as the guest root (`chroot` replacement).
    root: PathBuf,
    /// Working directory, as seen from the guest.
    cwd: PathBuf,
}

impl FileSystem {
    pub fn new() -> FileSystem {
        FileSystem {
            root: PathBuf::from("/"),
            cwd: PathBuf::from("/"),
        }
    }

    pub fn with_root<P: AsRef<Path>>(root: P) -> FileSystem {
        let mut file_system = FileSystem::new();

        file_system.set_root(root);
        file_system
    }

    /// Maps an already-canonicalized guest path onto the host side.
    #[inline]
    pub fn host_path_of(&self, canonical_guest_path: &Path) -> PathBuf {
        match canonical_guest_path.strip_prefix("/") {
            Ok(relative_part) => self.root.join(relative_part),
            Err(_) => self.root.join(canonical_guest_path),
        }
    }

    /// Checks that `path` exists and is executable.
    #[inline]
    pub fn is_path_executable(&self, path: &Path) -> Result<()> {
        unistd::access(path, AccessFlags::F_OK)?;
        unistd::access(path, AccessFlags::X_OK)?;
        sys::stat::lstat(path)?;
        Ok(())
    }

    #[inline]
    pub fn set_cwd<P: AsRef<Path>>(&mut self, cwd: P) {
        self.cwd = cwd.as_ref().into();
    }

    #[inline]
    pub fn get_cwd(&self) -> &Path {
        &self.cwd
    }

    #[inline]
    pub fn set_root<P: AsRef<Path>>(&mut self, root: P) {
        self.root = root.as_ref().into();
    }

    #[inline]
    pub fn get_root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EACCES;

    #[test]
    fn test_host_path_of_joins_under_root() {
        let fs = FileSystem::with_root("/tmp/new_root");

        assert_eq!(
            fs.host_path_of(&PathBuf::from("/bin/true")),
            PathBuf::from("/tmp/new_root/bin/true")
        );
        assert_eq!(
            fs.host_path_of(&PathBuf::from("/")),
            PathBuf::from("/tmp/new_root")
        );
    }

    #[test]
    fn test_is_path_executable() {
        let fs = FileSystem::new();

        assert!(fs.is_path_executable(&PathBuf::from("/bin/sh")).is_ok());
        assert_eq!(
            fs.is_path_executable(&PathBuf::from("/etc/passwd"))
                .unwrap_err()
                .get_errno(),
            EACCES
        );
    }
}
