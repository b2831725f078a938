//! Stylebuild - command-line tool for orchestrating stylesheet compilation

use std::process::ExitCode;

use stylebuild::cli;

fn main() -> ExitCode {
    cli::run()
}
