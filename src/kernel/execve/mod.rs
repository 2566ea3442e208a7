mod args;
mod elf;
pub mod enter;
pub mod exit;
mod runner;
mod shebang;
mod stack;

pub use self::args::Argv;
pub use self::elf::{AcceptAllInterpreters, InterpreterCheck};
pub use self::runner::Runner;

use crate::errors::Result;
use crate::process::tracee::Tracee;

pub fn enter(
    tracee: &mut Tracee,
    runner: Option<&Runner>,
    elf_check: &dyn InterpreterCheck,
) -> Result<usize> {
    enter::translate(tracee, runner, elf_check)
}

pub fn exit(tracee: &mut Tracee) {
    exit::translate(tracee)
}
