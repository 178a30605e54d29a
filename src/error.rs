//! Error taxonomy for the relay.
//!
//! Request-side problems (missing or invalid parameters, exceeded limits) are
//! detected before any network call and map to 4xx responses. Backend-side
//! problems keep their upstream status (`Upstream`) or surface as transport
//! and decoding failures.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Error, Debug)]
pub enum RelayError {
    /// A required request parameter was absent or blank.
    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),

    /// A request parameter was present but unusable.
    #[error("invalid value for {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },

    /// An explicit request value exceeded its configured ceiling.
    #[error("{name} = {value} exceeds the maximum of {max}")]
    LimitExceeded {
        name: &'static str,
        value: u64,
        max: u64,
    },

    /// The retrieval backend answered with a non-success status.
    /// The status and body are passed through unchanged.
    #[error("backend returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The request to the retrieval backend failed at the transport level.
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered 2xx but the body did not match any known shape.
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

impl RelayError {
    /// True for errors caused by the inbound request rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RelayError::MissingParam(_)
                | RelayError::InvalidParam { .. }
                | RelayError::LimitExceeded { .. }
        )
    }
}
