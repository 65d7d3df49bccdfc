//! Command-line runtime for the `nodelink` node client.
//!
//! The module owns argument parsing, telemetry bootstrapping, the single
//! command exchange against the configured node, and response rendering.
//! The interface is designed to be exercised both from the binary
//! entrypoint and from tests where IO streams can be substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use thiserror::Error;

use nodelink::{Connection, ConnectionError};
use nodelink_config::Config;

mod cli;
mod telemetry;

use cli::{Cli, coerce_option};
use telemetry::TelemetryError;

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    Usage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("no response from node before the timeout elapsed")]
    NoResponse,
    #[error("failed to render response: {0}")]
    Render(serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(std::io::Error),
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    match execute(args, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<I, W>(args: I, stdout: &mut W) -> Result<(), AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error)
            if matches!(
                error.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = write!(stdout, "{error}");
            return Ok(());
        }
        Err(error) => return Err(AppError::Usage(error)),
    };

    let config = Config::default();
    let endpoint = cli
        .endpoint
        .clone()
        .unwrap_or_else(|| config.endpoint().clone());
    let log_filter = cli.log_filter.as_deref().unwrap_or_else(|| config.log_filter());
    let log_format = cli.log_format.unwrap_or_else(|| config.log_format());
    telemetry::initialise(log_filter, log_format)?;

    let mut connection = Connection::new(endpoint).verbose(cli.verbose);
    if let Some(seconds) = cli.timeout {
        connection = connection.logical_timeout(Duration::from_secs(seconds));
    }

    let options: Vec<Value> = cli.options.iter().map(|token| coerce_option(token)).collect();
    let response = connection.command(&cli.command, &options);
    connection.close();

    let value = response?.ok_or(AppError::NoResponse)?;
    let rendered = serde_json::to_string_pretty(&value).map_err(AppError::Render)?;
    writeln!(stdout, "{rendered}").map_err(AppError::WriteOutput)
}
