//! Error types for routing oracle calls.
//!
//! Every way a route lookup can fail maps to one [`RoutingError`] so the
//! dispatch matcher can abort an assignment without ever seeing a path
//! without an ETA or an ETA without a path.

/// Errors that can occur while computing a route.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// The request did not complete within the configured timeout.
    #[error("routing request timed out")]
    Timeout,

    /// The request could not be sent or the connection failed.
    #[error("routing transport error: {0}")]
    Transport(String),

    /// The oracle answered with a non-success HTTP status.
    #[error("routing oracle returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for the log.
        body: String,
    },

    /// The response body could not be parsed.
    #[error("malformed routing response: {0}")]
    Malformed(String),

    /// The oracle found no route between the two points.
    #[error("no route between origin and destination")]
    NoRoute,

    /// The route carried no usable duration.
    #[error("route is missing a duration")]
    MissingDuration,

    /// The route carried no usable polyline.
    #[error("route is missing a polyline")]
    MissingPolyline,

    /// The encoded polyline could not be decoded.
    #[error("invalid polyline: {0}")]
    InvalidPolyline(String),

    /// The client could not be constructed from its configuration.
    #[error("routing config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for RoutingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
