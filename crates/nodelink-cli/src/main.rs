//! Binary entrypoint for the node command client.
//!
//! The binary delegates to [`nodelink_cli::run`], which parses the
//! invocation, installs telemetry, and performs one command exchange
//! against the configured node.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    nodelink_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
