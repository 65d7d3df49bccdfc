//! Shared configuration types for the node client workspace.
//!
//! Provides the endpoint addressing, logging selection, and defaults that
//! the transport library and the binary agree on.

mod defaults;
mod endpoint;
mod logging;

pub use defaults::{DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_TCP_PORT, default_endpoint};
pub use endpoint::{EndpointParseError, NodeEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

use serde::{Deserialize, Serialize};

/// Aggregate configuration consumed by the binaries.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Endpoint of the node to dial.
    pub endpoint: NodeEndpoint,
    /// Log filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Config {
    /// Endpoint of the node to dial.
    #[must_use]
    pub const fn endpoint(&self) -> &NodeEndpoint {
        &self.endpoint
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
        }
    }
}
