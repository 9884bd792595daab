// src/lib.rs
//
// Library behind the `kbtinfo` binary: decoder core, transports, sinks and
// the command-line surface that wires them together.

#[macro_use]
mod logging;

pub mod checksums;
mod cli;
pub mod io;
pub mod protocol;
pub mod settings;
pub mod sink;

use clap::Parser;

/// Parse the command line and run the selected subcommand.
pub fn run() -> Result<(), String> {
    let result = cli::execute(cli::Cli::parse());
    if let Err(e) = &result {
        tlog!("[kbtinfo] {}", e);
    }
    logging::stop_file_logging();
    result
}
