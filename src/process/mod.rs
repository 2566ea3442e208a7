pub mod event;
pub mod sigactions;
pub mod supervisor;
pub mod tracee;
pub mod translation;
