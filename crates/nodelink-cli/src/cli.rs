//! Argument parsing for the `nodelink` binary.
//!
//! Everything after the command name is forwarded to the node, one frame
//! per token, so the parser keeps flags strictly before the positionals.

use clap::Parser;
use nodelink_config::{LogFormat, NodeEndpoint};
use serde_json::Value;

/// Sends one command to a remote node and prints the JSON response.
#[derive(Debug, Parser)]
#[command(name = "nodelink", version)]
pub(crate) struct Cli {
    /// Node endpoint, for example `tcp://127.0.0.1:5658`.
    #[arg(long, value_name = "URL")]
    pub(crate) endpoint: Option<NodeEndpoint>,
    /// Emit connection diagnostics while the exchange runs.
    #[arg(long)]
    pub(crate) verbose: bool,
    /// Per-call read/write bound in seconds.
    #[arg(long, value_name = "SECS")]
    pub(crate) timeout: Option<u64>,
    /// Log filter expression, for example `info` or `nodelink=debug`.
    #[arg(long, value_name = "FILTER")]
    pub(crate) log_filter: Option<String>,
    /// Log output format (`compact` or `json`).
    #[arg(long, value_name = "FORMAT")]
    pub(crate) log_format: Option<LogFormat>,
    /// The command name to send.
    #[arg(value_name = "COMMAND")]
    pub(crate) command: String,
    /// Option values sent after the command, each as its own frame.
    #[arg(
        value_name = "OPTION",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) options: Vec<String>,
}

/// Interprets an option token as JSON when it parses, otherwise as a
/// JSON string, so callers can write both `balance '"addr"'` and
/// `balance addr`.
pub(crate) fn coerce_option(token: &str) -> Value {
    serde_json::from_str(token).unwrap_or_else(|_| Value::String(token.to_owned()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::{Cli, coerce_option};

    #[rstest]
    #[case("12", json!(12))]
    #[case("true", json!(true))]
    #[case(r#"{"a":1}"#, json!({"a":1}))]
    #[case(r#""quoted""#, json!("quoted"))]
    #[case("addr1abc", json!("addr1abc"))]
    fn coerces_option_tokens(#[case] token: &str, #[case] expected: Value) {
        assert_eq!(coerce_option(token), expected);
    }

    #[test]
    fn parses_command_and_trailing_options() {
        let cli = Cli::try_parse_from(["nodelink", "balance", "addr", "-1"]).expect("parse");
        assert_eq!(cli.command, "balance");
        assert_eq!(cli.options, vec!["addr".to_owned(), "-1".to_owned()]);
    }

    #[test]
    fn parses_endpoint_flag() {
        let cli = Cli::try_parse_from(["nodelink", "--endpoint", "tcp://10.0.0.1:4242", "height"])
            .expect("parse");
        assert!(matches!(cli.endpoint, Some(ref endpoint) if endpoint.port() == 4242));
    }

    #[test]
    fn rejects_a_missing_command() {
        let parsed = Cli::try_parse_from(["nodelink"]);
        assert!(parsed.is_err());
    }
}
