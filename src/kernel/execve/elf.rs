use crate::errors::Result;
use std::path::Path;

/// Policy hook vetting the program (and transitively its ELF interpreter)
/// about to be executed, once its final host path is known.
///
/// The check runs after shebang expansion and runner injection, right
/// before the executable path is committed to the tracee's registers, so
/// an implementation can refuse a program by returning an errno.
pub trait InterpreterCheck {
    fn check(&self, host_path: &Path) -> Result<()>;
}

/// Default policy: every program is accepted.
// TODO: parse PT_INTERP and refuse interpreters that resolve outside the
// virtual root.
#[derive(Debug)]
pub struct AcceptAllInterpreters;

impl InterpreterCheck for AcceptAllInterpreters {
    fn check(&self, _host_path: &Path) -> Result<()> {
        Ok(())
    }
}
