use crate::errors::Result;

use crate::filesystem::canonicalization::Canonicalizer;
use crate::filesystem::FileSystem;
use std::path::{Path, PathBuf};

pub trait Translator {
    fn translate_path<P: AsRef<Path>>(&self, guest_path: P, deref_final: bool) -> Result<PathBuf>;
    fn translate_absolute_path(&self, guest_path: &Path, deref_final: bool) -> Result<PathBuf>;
}

impl Translator for FileSystem {
    /// Translates a path from `guest` to `host`. A relative guest path is
    /// resolved against the guest working directory first.
    fn translate_path<P: AsRef<Path>>(&self, guest_path: P, deref_final: bool) -> Result<PathBuf> {
        if guest_path.as_ref().is_relative() {
            let mut absolute_guest_path = PathBuf::from(self.get_cwd());
            absolute_guest_path.push(guest_path);
            self.translate_absolute_path(&absolute_guest_path, deref_final)
        } else {
            self.translate_absolute_path(guest_path.as_ref(), deref_final)
        }
    }

    /// Translates an absolute path from `guest` to `host`: canonicalize on
    /// the guest side, then reattach the virtual root prefix.
    fn translate_absolute_path(&self, guest_path: &Path, deref_final: bool) -> Result<PathBuf> {
        let canonical_guest_path = self.canonicalize(guest_path, deref_final)?;
        Ok(self.host_path_of(&canonical_guest_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Error, ENOENT};
    use crate::filesystem::FileSystem;
    use crate::utils::tests::TempDir;
    use std::path::PathBuf;

    #[test]
    fn test_translate_path_without_root() {
        let fs = FileSystem::with_root("/");

        // simple canonicalization, the root prefix is "/"
        assert_eq!(
            fs.translate_path("/home/../etc/./../etc", false),
            Ok(PathBuf::from("/etc"))
        );
    }

    #[test]
    fn test_translate_path_with_root() {
        let temp = TempDir::new("translate");
        std::fs::create_dir(temp.path.join("bin")).unwrap();
        std::fs::write(temp.path.join("bin/true"), b"").unwrap();

        let fs = FileSystem::with_root(&temp.path);

        assert_eq!(
            fs.translate_path("/bin/true", false),
            Ok(temp.path.join("bin/true"))
        );

        // a missing guest file does not translate
        assert_eq!(
            fs.translate_path("/bin/impossible", false),
            Err(Error::errno(ENOENT))
        );
    }

    #[test]
    fn test_translate_relative_path_uses_cwd() {
        let temp = TempDir::new("translate-cwd");
        std::fs::create_dir(temp.path.join("bin")).unwrap();
        std::fs::write(temp.path.join("bin/true"), b"").unwrap();

        let mut fs = FileSystem::with_root(&temp.path);
        fs.set_cwd("/bin");

        assert_eq!(fs.translate_path("true", false), Ok(temp.path.join("bin/true")));
    }
}
