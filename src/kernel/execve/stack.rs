use crate::errors::*;
use crate::kernel::execve::args::Argv;
use crate::register::{
    poke_word, Current, PtraceWriter, Registers, StackPointer, SysArg, SysArg2, Word,
};
use std::mem::size_of;

/// Copies `argv` into the tracee's memory space and repoints the registers
/// at it.
///
/// The strings and the new pointer table are packed into the memory just
/// below the stack pointer:
///
/// ```text
///                                           <- stack pointer
///                                                           \
///        argv[]           argv1              argv0           \
///      /                       \                  \           \
///     | argv[0] | argv[1] | ... | "/bin/script.sh" | "/bin/sh" |
/// ```
///
/// Strings are packed unaligned; the pointer table is aligned down to the
/// machine word, since the table is what the kernel dereferences word by
/// word. After the copy, SysArg2 points at the table and the stack pointer
/// register is lowered onto it, so anything else claiming tracee stack in
/// the same stop lands below this argv instead of overwriting it.
///
/// Returns the number of bytes of stack consumed.
pub(super) fn push_argv(regs: &mut Registers, argv: &Argv) -> Result<usize> {
    let word_size = size_of::<Word>() as Word;
    let previous_sp = regs.get(Current, StackPointer);

    let mut argp = previous_sp;
    let mut child_ptrs: Vec<Word> = Vec::with_capacity(argv.len() + 1);

    for (i, entry) in argv.iter().enumerate() {
        trace!("set argv[{}] = {:?}", i, String::from_utf8_lossy(entry.as_ref()));

        argp -= (entry.len() + 1) as Word;
        regs.write_data(argp, entry.as_ref())?;
        child_ptrs.push(argp);
    }
    child_ptrs.push(0);

    // The pointer table grows downward from the lowest string, one aligned
    // word per entry, ending on the address of child_ptrs[0]: the new argv.
    argp &= !(word_size - 1);
    for &child_ptr in child_ptrs.iter().rev() {
        argp -= word_size;
        poke_word(regs.get_pid(), argp, child_ptr)?;
    }

    regs.set(
        SysArg(SysArg2),
        argp,
        "during execve translation, pointing at the rewritten argv",
    );
    regs.set(
        StackPointer,
        argp,
        "during execve translation, protecting the rewritten argv from later stack claims",
    );

    Ok((previous_sp - argp) as usize)
}
