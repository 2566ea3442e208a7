use crate::errors::Result;
use crate::register::Word;
use libc::user_regs_struct;
use nix::sys::ptrace;
use nix::unistd::Pid;
use std::fmt;

pub type RegisterSet = user_regs_struct;

/// Value used to void the syscall number, so that the kernel ignores the
/// call and reports `-ENOSYS` at the exit stage.
const VOID: Word = Word::MAX;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RegVersion {
    /// The working copy, the one reads and writes go through.
    Current = 0,
    /// Snapshot taken at the syscall-entry stop, before any translation.
    Original = 1,
    /// Snapshot taken after the entry translation.
    Modified = 2,
}
use self::RegVersion::*;

#[derive(Debug, Copy, Clone)]
#[allow(dead_code)]
pub enum SysArgIndex {
    SysArg1 = 0,
    SysArg2,
    SysArg3,
    SysArg4,
    SysArg5,
    SysArg6,
}
use self::SysArgIndex::*;

#[derive(Debug, Copy, Clone)]
pub enum Register {
    SysNum,
    SysArg(SysArgIndex),
    SysResult,
    StackPointer,
}
use self::Register::*;

/// Cached view of a tracee's general purpose registers.
///
/// The registers are fetched once per ptrace stop, mutated in place by the
/// translation code, and pushed back to the tracee at most once at the end
/// of the stop. Keeping the pending changes on the supervisor side is what
/// makes the whole translation of one syscall atomic from the tracee's
/// point of view.
#[derive(Debug)]
pub struct Registers {
    /// Pid of the tracee these registers belong to.
    pid: Pid,
    registers: [Option<RegisterSet>; 3],
    regs_were_changed: bool,
    restore_original_regs: bool,
}

#[allow(dead_code)]
impl Registers {
    /// Creates an empty register bundle.
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            registers: [None, None, None],
            regs_were_changed: false,
            restore_original_regs: false,
        }
    }

    #[cfg(test)]
    /// Same, but with initial raw values. Useful for tests.
    pub fn from(pid: Pid, raw_regs: RegisterSet) -> Self {
        Self {
            pid,
            registers: [Some(raw_regs), None, None],
            regs_were_changed: false,
            restore_original_regs: false,
        }
    }

    /// Retrieves a value from one of the register versions.
    ///
    /// Panics if the requested version was never populated; that always
    /// denotes a sequencing bug in the caller, and the backtrace is more
    /// useful than a recoverable error would be.
    #[inline]
    pub fn get(&self, version: RegVersion, register: Register) -> Word {
        self.get_raw(self.get_regs(version), register)
    }

    /// Modifies one of the `Current` registers.
    ///
    /// Setting a register to the value it already has does not mark the
    /// registers as changed, so a translation that turns out to be the
    /// identity never triggers a `push_regs`.
    #[inline]
    pub fn set(&mut self, register: Register, new_value: Word, justification: &'static str) {
        let current_value = self.get(Current, register);

        debug!(
            "-- {}, set {:?}: {:#x} -> {:#x} ({})",
            self.pid, register, current_value, new_value, justification
        );

        if current_value == new_value {
            return;
        }
        self.set_raw(register, new_value);
        self.regs_were_changed = true;
    }

    /// Saves the `Current` registers into the given `version` slot.
    ///
    /// This is the only way to populate the `Original` and `Modified`
    /// versions.
    #[inline]
    pub fn save_current_regs(&mut self, version: RegVersion) {
        if version != Current {
            let current_regs = *self.get_regs(Current);

            self.registers[version as usize] = Some(current_regs);
        }
    }

    /// Retrieves the tracee's general purpose registers into `Current`.
    pub fn fetch_regs(&mut self) -> Result<()> {
        let regs: RegisterSet = ptrace::getregs(self.pid)?;

        self.registers[Current as usize] = Some(regs);
        Ok(())
    }

    /// Pushes the `Current` registers back to the tracee, if any of them
    /// was modified since the last `forget_changes`.
    ///
    /// The changed flag deliberately survives a push: a syscall whose
    /// entry was translated still needs its exit stop to push (and usually
    /// restore) registers, even when the exit stage itself changed
    /// nothing. The flag is cleared at the start of the next syscall
    /// round.
    ///
    /// When `restore_original_regs` is armed, every register except the
    /// syscall result is first reset to its `Original` value, so the tracee
    /// resumes with the register file it had before the translation.
    pub fn push_regs(&mut self) -> Result<()> {
        if !self.regs_were_changed {
            return Ok(());
        }

        if self.restore_original_regs {
            self.restore_regs();
        }

        let pid = self.pid;
        let current_regs = self.get_regs(Current);

        debug!("-- {}, push regs", pid);
        ptrace::setregs(pid, *current_regs)?;
        Ok(())
    }

    /// Drops every pending register change and disarms the restore flag.
    ///
    /// Called at the start of each syscall round, and after a successful
    /// `execve`, where the registers fetched at the exit stop belong to
    /// the fresh program image and must reach the tracee untouched.
    #[inline]
    pub fn forget_changes(&mut self) {
        self.regs_were_changed = false;
        self.restore_original_regs = false;
    }

    #[inline]
    fn get_raw(&self, raw_regs: &RegisterSet, register: Register) -> Word {
        match register {
            SysNum => get_reg!(raw_regs, SysNum),
            SysArg(SysArg1) => get_reg!(raw_regs, SysArg1),
            SysArg(SysArg2) => get_reg!(raw_regs, SysArg2),
            SysArg(SysArg3) => get_reg!(raw_regs, SysArg3),
            SysArg(SysArg4) => get_reg!(raw_regs, SysArg4),
            SysArg(SysArg5) => get_reg!(raw_regs, SysArg5),
            SysArg(SysArg6) => get_reg!(raw_regs, SysArg6),
            SysResult => get_reg!(raw_regs, SysResult),
            StackPointer => get_reg!(raw_regs, StackPointer),
        }
    }

    #[inline]
    fn set_raw(&mut self, register: Register, new_value: Word) {
        let raw_regs = self.get_mut_regs(Current);

        match register {
            SysNum => get_reg!(raw_regs, SysNum) = new_value,
            SysArg(SysArg1) => get_reg!(raw_regs, SysArg1) = new_value,
            SysArg(SysArg2) => get_reg!(raw_regs, SysArg2) = new_value,
            SysArg(SysArg3) => get_reg!(raw_regs, SysArg3) = new_value,
            SysArg(SysArg4) => get_reg!(raw_regs, SysArg4) = new_value,
            SysArg(SysArg5) => get_reg!(raw_regs, SysArg5) = new_value,
            SysArg(SysArg6) => get_reg!(raw_regs, SysArg6) = new_value,
            SysResult => get_reg!(raw_regs, SysResult) = new_value,
            StackPointer => get_reg!(raw_regs, StackPointer) = new_value,
        };
    }

    /// Resets the current regs to the original ones, except the syscall
    /// result which carries the kernel's (or the translation's) verdict.
    #[inline]
    fn restore_regs(&mut self) {
        let original_regs = self.registers[Original as usize].unwrap();
        let current_regs = self.registers[Current as usize].as_mut().unwrap();

        get_reg!(current_regs, SysNum) = get_reg!(original_regs, SysNum);
        get_reg!(current_regs, SysArg1) = get_reg!(original_regs, SysArg1);
        get_reg!(current_regs, SysArg2) = get_reg!(original_regs, SysArg2);
        get_reg!(current_regs, SysArg3) = get_reg!(original_regs, SysArg3);
        get_reg!(current_regs, SysArg4) = get_reg!(original_regs, SysArg4);
        get_reg!(current_regs, SysArg5) = get_reg!(original_regs, SysArg5);
        get_reg!(current_regs, SysArg6) = get_reg!(original_regs, SysArg6);
        get_reg!(current_regs, StackPointer) = get_reg!(original_regs, StackPointer);
    }

    #[inline]
    pub fn get_pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    fn get_regs(&self, version: RegVersion) -> &RegisterSet {
        match self.registers[version as usize] {
            Some(ref regs) => regs,
            None => unreachable!(),
        }
    }

    #[inline]
    fn get_mut_regs(&mut self, version: RegVersion) -> &mut RegisterSet {
        match self.registers[version as usize] {
            Some(ref mut regs) => regs,
            None => unreachable!(),
        }
    }

    #[inline]
    pub fn get_sys_num(&self, version: RegVersion) -> usize {
        self.get(version, SysNum) as usize
    }

    #[inline]
    pub fn set_sys_num(&mut self, new_value: usize, justification: &'static str) {
        self.set(SysNum, new_value as Word, justification);
    }

    /// Voids the syscall number; the kernel will skip the call and report
    /// `-ENOSYS` at the exit stage, which the exit translation overwrites.
    #[inline]
    pub fn cancel_syscall(&mut self, justification: &'static str) {
        self.set(SysNum, VOID, justification);
    }

    #[inline]
    pub fn set_restore_original_regs(&mut self, restore_original_regs: bool) {
        self.restore_original_regs = restore_original_regs;
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let regs = self.get_regs(Current);

        write!(
            f,
            "(pid {}: syscall {} - args [{:#x}, {:#x}, {:#x}, {:#x}, {:#x}, {:#x}], result {:#x}, stack-ptr {:#x})",
            self.pid,
            get_reg!(regs, SysNum),
            get_reg!(regs, SysArg1),
            get_reg!(regs, SysArg2),
            get_reg!(regs, SysArg3),
            get_reg!(regs, SysArg4),
            get_reg!(regs, SysArg5),
            get_reg!(regs, SysArg6),
            get_reg!(regs, SysResult),
            get_reg!(regs, StackPointer),
        )
    }
}
