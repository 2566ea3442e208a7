#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod cli;
mod errors;
mod filesystem;
mod kernel;
mod process;
mod register;
mod utils;

use crate::kernel::execve::Runner;
use crate::process::sigactions;
use crate::process::supervisor::{show_info, stop_program, Session, Supervisor};
use std::ffi::CString;
use std::process::exit;

fn main() {
    env_logger::init();

    // step 1: CLI parsing
    let config = cli::parse_config();

    // step 2: validate the runner before anything is traced; a broken
    // runner configuration is fatal
    let runner = match config.runner_guest_path {
        Some(ref guest_path) => match Runner::new(&config.fs, guest_path) {
            Ok(runner) => Some(runner),
            Err(error) => {
                eprintln!("rootbox: cannot set up runner {:?}: {}", guest_path, error);
                exit(1);
            }
        },
        None => None,
    };

    let command: Vec<CString> = config
        .command
        .iter()
        .map(|arg| CString::new(arg.as_str()).expect("command contains a NUL byte"))
        .collect();

    info!(
        "virtual root: {:?}, command: {:?}",
        config.fs.get_root(),
        config.command
    );

    let mut supervisor = Supervisor::new(Session::new(runner));

    // step 3: start the first tracee
    supervisor.launch_process(config.fs, &command);

    // what follows only runs on the supervisor; the child stopped itself
    // and will be resumed by the event loop

    // step 4: configure the signal actions
    sigactions::prepare_sigactions(stop_program, show_info);

    // step 5: listen to and deal with tracee events
    supervisor.event_loop();

    info!("all tracees have exited");
}
