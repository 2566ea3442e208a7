use crate::errors::*;
use crate::filesystem::FileSystem;
use std::path::{Component, Path, PathBuf};

/// Upper bound on symlink traversals while canonicalizing one path, in the
/// spirit of the kernel's own MAXSYMLINKS.
const MAX_SYMLINK_DEREFS: usize = 40;

pub trait Canonicalizer {
    fn canonicalize(&self, guest_path: &Path, deref_final: bool) -> Result<PathBuf>;
}

impl Canonicalizer for FileSystem {
    /// Canonicalizes `guest_path` relative to the guest root (see
    /// `man 3 realpath`).
    ///
    /// `.` and `..` are resolved lexically, symlinks are dereferenced
    /// inside the virtual root: an absolute target restarts the walk at the
    /// guest `/`, a relative one is spliced in place. Every intermediate
    /// component must exist on the host side. The final component is
    /// dereferenced only if `deref_final` is true.
    ///
    /// The result is a canonical path on the guest side.
    fn canonicalize(&self, guest_path: &Path, deref_final: bool) -> Result<PathBuf> {
        canonicalize_inner(self, guest_path, deref_final, 0)
    }
}

fn canonicalize_inner(
    fs: &FileSystem,
    guest_path: &Path,
    deref_final: bool,
    nb_derefs: usize,
) -> Result<PathBuf> {
    if guest_path.is_relative() {
        return Err(Error::errno_with_msg(
            EINVAL,
            format!("cannot canonicalize a relative path: {:?}", guest_path),
        ));
    }
    if nb_derefs > MAX_SYMLINK_DEREFS {
        return Err(Error::errno_with_msg(ELOOP, "when canonicalizing a path"));
    }

    let mut canonical_path = PathBuf::from("/");

    // The `next` component is needed to know whether the current one is the
    // last.
    let mut it = guest_path.components();
    let mut next_comp = it.next();
    while let Some(component) = next_comp {
        next_comp = it.next();
        let is_last_component = next_comp.is_none();

        match component {
            Component::RootDir => continue,
            Component::CurDir | Component::Prefix(_) => continue,
            Component::ParentDir => {
                canonical_path.pop();
                continue;
            }
            Component::Normal(path_part) => {
                canonical_path.push(path_part);

                let host_path = fs.host_path_of(&canonical_path);
                let metadata = host_path
                    .symlink_metadata()
                    .with_context(|| format!("when canonicalizing {:?}", guest_path))?;
                let file_type = metadata.file_type();

                if file_type.is_dir() {
                    continue;
                }
                if file_type.is_symlink() {
                    // The link itself is wanted when it is the last
                    // component and dereferencing was not requested.
                    if is_last_component && !deref_final {
                        continue;
                    }

                    let link_target = host_path.read_link()?;
                    let mut new_guest_path = if link_target.is_absolute() {
                        // An absolute target is a guest path: restart from
                        // the guest root.
                        link_target
                    } else {
                        canonical_path.pop();
                        canonical_path.push(&link_target);
                        canonical_path
                    };

                    // Append the components not walked yet.
                    if let Some(comp) = next_comp {
                        new_guest_path.push(comp);
                    }
                    it.for_each(|comp| new_guest_path.push(comp));

                    return canonicalize_inner(fs, &new_guest_path, deref_final, nb_derefs + 1);
                }
                // A regular file can only be the last component.
                if !is_last_component {
                    return Err(Error::errno_with_msg(
                        ENOTDIR,
                        "when canonicalizing an intermediate path",
                    ));
                }
            }
        }
    }

    Ok(canonical_path)
}
