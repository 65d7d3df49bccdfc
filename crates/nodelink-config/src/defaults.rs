use crate::endpoint::NodeEndpoint;

/// Default node host dialled when none is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default node TCP port.
pub const DEFAULT_TCP_PORT: u16 = 5658;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Computes the default node endpoint.
#[must_use]
pub fn default_endpoint() -> NodeEndpoint {
    NodeEndpoint::new(DEFAULT_HOST, DEFAULT_TCP_PORT)
}
