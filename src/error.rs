/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum CloudApiError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Error response returned by the service, with its wire-level name.
    #[error("{name} (http {status}): {message}")]
    Api {
        /// Wire-level error name, e.g. `ThrottlingException`.
        name: String,
        /// Error message text from the service.
        message: String,
        /// HTTP status of the error response.
        status: u16,
    },
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
    /// No region in the options and `AWS_REGION` is unset.
    #[error("missing region: pass ClientOptions::region or set AWS_REGION")]
    MissingRegion,
    /// Client construction failed.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl CloudApiError {
    /// Wire-level name used by the retry decider.
    ///
    /// Transport timeouts map to `TimeoutError` and other transport failures
    /// to `NetworkingError`, the names services use for the same conditions.
    pub fn error_name(&self) -> Option<&str> {
        match self {
            Self::Api { name, .. } => Some(name),
            Self::Transport(err) if err.is_timeout() => Some("TimeoutError"),
            Self::Transport(_) => Some("NetworkingError"),
            _ => None,
        }
    }

    /// True for DNS/connect-level failures, i.e. no usable network path.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_connect())
    }
}
