use bstr::BString;
use crate::errors::*;
use crate::register::{peek_word, read_string, Word};
use nix::unistd::Pid;
use std::fmt;
use std::mem::size_of;

/// Upper bound on the size of a single argv entry. Mirrors the kernel's
/// ARG_MAX fallback value.
pub const ARG_MAX: usize = 131072;

/// The supervisor-side mirror of a tracee's argv: an owned sequence of
/// owned byte strings, without the terminating null pointer.
///
/// Argv entries are arbitrary bytes on Linux, hence `BString` rather than
/// `String`.
#[derive(Debug, PartialEq)]
pub struct Argv {
    entries: Vec<BString>,
}

impl Argv {
    #[cfg(test)]
    pub fn from_entries<B: AsRef<[u8]>>(entries: &[B]) -> Argv {
        Argv {
            entries: entries
                .iter()
                .map(|entry| BString::from(entry.as_ref()))
                .collect(),
        }
    }

    /// Copies the tracee's argv, whose pointer table starts at
    /// `table_addr` in the tracee's memory space.
    ///
    /// The table is walked one word at a time until a zero word. Each
    /// entry is a NUL-terminated string of at most `ARG_MAX` bytes; a
    /// longer entry fails the whole copy with `ENAMETOOLONG`, and any
    /// unreadable address fails it with `EFAULT`.
    pub fn from_tracee(pid: Pid, table_addr: Word) -> Result<Argv> {
        let word_size = size_of::<Word>() as Word;
        let mut entries = vec![];

        for i in 0.. {
            let arg_addr = peek_word(pid, table_addr + i * word_size)
                .context("when walking the tracee's argv pointer table")?;

            // End of argv[].
            if arg_addr == 0 {
                break;
            }

            let bytes = read_string(pid, arg_addr, ARG_MAX)?;
            if bytes.len() >= ARG_MAX {
                return Err(Error::errno_with_msg(
                    ENAMETOOLONG,
                    "when copying an argv entry from the tracee",
                ));
            }

            entries.push(BString::from(bytes));
        }

        Ok(Argv { entries })
    }

    /// Replaces the head of the vector: entry 0 is dropped (if any) and
    /// copies of `new_entries` take its place, so that
    ///
    ///   | argv[0] | argv[1] | ... | argv[n] |
    ///
    /// becomes
    ///
    ///   | new[0] | ... | new[k-1] | argv[1] | ... | argv[n] |
    pub fn replace_head<B: AsRef<[u8]>>(&mut self, new_entries: &[B]) {
        let old_head = if self.entries.is_empty() { 0 } else { 1 };

        self.entries.splice(
            0..old_head,
            new_entries.iter().map(|entry| BString::from(entry.as_ref())),
        );
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &BString> {
        self.entries.iter()
    }
}

impl fmt::Display for Argv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", String::from_utf8_lossy(entry.as_ref()))?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_head_without_argument() {
        let mut argv = Argv::from_entries(&["script.sh", "a"]);

        argv.replace_head(&["/bin/sh", "/bin/script.sh"]);

        assert_eq!(
            argv,
            Argv::from_entries(&["/bin/sh", "/bin/script.sh", "a"])
        );
    }

    #[test]
    fn test_replace_head_with_argument() {
        let mut argv = Argv::from_entries(&["foo"]);

        argv.replace_head(&["/usr/bin/env", "python3", "/bin/foo"]);

        assert_eq!(
            argv,
            Argv::from_entries(&["/usr/bin/env", "python3", "/bin/foo"])
        );
    }

    #[test]
    fn test_replace_head_of_empty_vector() {
        let mut argv = Argv::from_entries::<&[u8]>(&[]);

        argv.replace_head(&["/bin/runner", "/bin/foo"]);

        assert_eq!(argv, Argv::from_entries(&["/bin/runner", "/bin/foo"]));
    }

    #[test]
    fn test_replace_head_twice_keeps_the_tail() {
        let mut argv = Argv::from_entries(&["a", "x"]);

        argv.replace_head(&["/b", "/a"]);
        argv.replace_head(&["/c", "arg", "/b"]);

        assert_eq!(argv, Argv::from_entries(&["/c", "arg", "/b", "/a", "x"]));
    }

    #[test]
    fn test_display_is_lossy_and_quoted() {
        let argv = Argv::from_entries(&["sh", "-c"]);

        assert_eq!(format!("{}", argv), r#"["sh", "-c"]"#);
    }
}
