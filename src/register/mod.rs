#[macro_use]
mod abi;
mod reader;
pub(crate) mod regs;
mod writer;

use libc::c_ulong;

pub type Word = c_ulong;

pub use self::reader::{peek_word, read_string, PtraceReader};
pub use self::regs::RegVersion::{self, *};
pub use self::regs::Register::*;
pub use self::regs::Registers;
pub use self::regs::SysArgIndex;
pub use self::regs::SysArgIndex::*;
pub use self::writer::{poke_word, PtraceWriter};
