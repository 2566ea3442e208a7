use bstr::BString;
use crate::errors::*;
use crate::filesystem::{FileSystem, Translator};
use crate::kernel::execve::args::{Argv, ARG_MAX};
use libc::PATH_MAX;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Bytes, Read};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// One parsed `#!` header: the interpreter path and its optional single
/// argument, both as the literal bytes found in the file.
///
/// Extract from "man 2 execve":
///
///     On Linux, the entire string following the interpreter name is
///     passed as a *single* argument to the interpreter, and this
///     string can include white space.
#[derive(Debug, PartialEq)]
pub(super) struct Shebang {
    pub interpreter: BString,
    pub argument: Option<BString>,
}

/// Expands in `argv` the shebang of `guest_path`, if any.
///
/// When the file starts with `#!`, the argv head is rewritten to
/// `[interpreter, guest_path, ...]` (or `[interpreter, argument,
/// guest_path, ...]`), `guest_path` is overwritten with the interpreter
/// path, and `true` is returned. The interpreter is stored as the literal
/// bytes from the file, not translated: the caller loops, and the next
/// iteration translates it like any other candidate program.
///
/// Returns `false` when the file is not a script.
pub(super) fn expand(fs: &FileSystem, guest_path: &mut PathBuf, argv: &mut Argv) -> Result<bool> {
    let host_path = fs.translate_path(&*guest_path, true)?;
    let file = File::open(&host_path)
        .with_context(|| format!("when inspecting the executable {:?}", host_path))?;

    let shebang = match parse(BufReader::new(file))? {
        Some(shebang) => shebang,
        None => return Ok(false),
    };

    debug!(
        "expand shebang: {:?} -> {:?} {:?} {:?}",
        guest_path, shebang.interpreter, shebang.argument, guest_path
    );

    let old_guest_path = guest_path.as_os_str().as_bytes().to_vec();
    let interpreter: &[u8] = shebang.interpreter.as_ref();

    let mut replacements: Vec<&[u8]> = vec![interpreter];
    if let Some(ref argument) = shebang.argument {
        replacements.push(argument.as_ref());
    }
    replacements.push(&old_guest_path);
    argv.replace_head(&replacements);

    *guest_path = PathBuf::from(OsStr::from_bytes(interpreter));

    Ok(true)
}

enum State {
    LeadingWhitespace,
    Interpreter,
    Argument,
}

#[inline]
fn next_byte<R: Read>(bytes: &mut Bytes<R>) -> Result<Option<u8>> {
    match bytes.next() {
        Some(Ok(byte)) => Ok(Some(byte)),
        Some(Err(error)) => Err(Error::from(error)),
        None => Ok(None),
    }
}

/// Parses a `#!` header from `reader`.
///
/// Returns `Ok(None)` when the file is not a script. That includes every
/// header that ends before a newline: a truncated shebang line is treated
/// leniently as "not a script" rather than as an error.
fn parse<R: Read>(reader: R) -> Result<Option<Shebang>> {
    let mut bytes = reader.bytes();

    match (next_byte(&mut bytes)?, next_byte(&mut bytes)?) {
        (Some(b'#'), Some(b'!')) => {}
        _ => return Ok(None),
    }

    let mut state = State::LeadingWhitespace;
    // Mirror of the interpreter buffer with its separator NULs: a NUL marks
    // the boundary between the interpreter and its argument, so a byte
    // following a NUL starts the argument. A literal NUL in the file acts
    // as a separator for the same reason.
    let mut interpreter: Vec<u8> = Vec::new();
    let mut argument: Vec<u8> = Vec::new();

    loop {
        let byte = match next_byte(&mut bytes)? {
            Some(byte) => byte,
            None => return Ok(None),
        };

        if let State::LeadingWhitespace = state {
            match byte {
                b' ' | b'\t' => continue,
                _ => state = State::Interpreter,
            }
        }

        match state {
            State::LeadingWhitespace => unreachable!(),

            State::Interpreter => {
                if interpreter.len() == PATH_MAX as usize {
                    return Err(Error::errno_with_msg(
                        ENAMETOOLONG,
                        "when parsing a shebang interpreter",
                    ));
                }
                match byte {
                    b'\n' | b'\r' => {
                        // End of line: there is no argument.
                        return Ok(Some(finish(interpreter, None)));
                    }
                    b' ' | b'\t' => interpreter.push(b'\0'),
                    _ => {
                        if interpreter.len() > 1 && interpreter[interpreter.len() - 1] == b'\0' {
                            state = State::Argument;
                            argument.push(byte);
                        } else {
                            interpreter.push(byte);
                        }
                    }
                }
            }

            State::Argument => {
                if argument.len() == ARG_MAX {
                    // The argument is too long: silently drop it.
                    return Ok(Some(finish(interpreter, None)));
                }
                match byte {
                    b'\n' | b'\r' => {
                        // Remove trailing spaces.
                        while argument.len() > 1 {
                            match argument.last() {
                                Some(b' ') | Some(b'\t') => argument.pop(),
                                _ => break,
                            };
                        }
                        return Ok(Some(finish(interpreter, Some(argument))));
                    }
                    _ => argument.push(byte),
                }
            }
        }
    }
}

/// Truncates the interpreter buffer at its first separator NUL and builds
/// the parse result.
fn finish(mut interpreter: Vec<u8>, argument: Option<Vec<u8>>) -> Shebang {
    if let Some(nul_pos) = interpreter.iter().position(|&byte| byte == b'\0') {
        interpreter.truncate(nul_pos);
    }
    Shebang {
        interpreter: BString::from(interpreter),
        argument: argument.map(BString::from),
    }
}
