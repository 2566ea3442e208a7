use clap::{App, Arg};
use crate::filesystem::validation::path_validator;
use crate::filesystem::FileSystem;
use std::path::PathBuf;

pub const DEFAULT_ROOTFS: &str = "/";
pub const DEFAULT_CWD: &str = "/";
pub const DEFAULT_COMMAND: &str = "/bin/sh";

/// Everything the command line decides: the tracee's filesystem view, the
/// optional runner, and the guest command to launch.
pub struct Config {
    pub fs: FileSystem,
    pub runner_guest_path: Option<PathBuf>,
    pub command: Vec<String>,
}

pub fn parse_config() -> Config {
    let matches = App::new("rootbox")
        .about("chroot-like sandbox based on ptrace")
        .arg(
            Arg::with_name("rootfs")
                .short("r")
                .long("rootfs")
                .help("Use *path* as the guest root file-system.")
                .takes_value(true)
                .default_value(DEFAULT_ROOTFS)
                .validator(path_validator),
        )
        .arg(
            Arg::with_name("cwd")
                .short("w")
                .long("cwd")
                .help("Set the initial working directory to *path* (a guest path).")
                .takes_value(true)
                .default_value(DEFAULT_CWD),
        )
        .arg(
            Arg::with_name("runner")
                .short("R")
                .long("runner")
                .help(
                    "Execute every guest program through *path* (a guest path), \
                     e.g. a CPU emulator.",
                )
                .takes_value(true),
        )
        .arg(
            Arg::with_name("command")
                .help("Guest command to run, with its arguments.")
                .multiple(true),
        )
        .get_matches();

    // option -r
    let mut fs = FileSystem::new();
    fs.set_root(matches.value_of("rootfs").unwrap());

    // option -w
    fs.set_cwd(PathBuf::from(matches.value_of("cwd").unwrap()));

    // option -R: only recorded here, the validation happens once the
    // filesystem is known (see the runner initialisation in main).
    let runner_guest_path = matches.value_of("runner").map(PathBuf::from);

    let command = match matches.values_of("command") {
        Some(values) => values.map(str::to_string).collect(),
        None => vec![DEFAULT_COMMAND.to_string()],
    };

    Config {
        fs,
        runner_guest_path,
        command,
    }
}
