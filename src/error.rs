/// Boxed error produced by pluggable strategies (transport, token provider).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Failure raised before any HTTP status was available (network, timeout).
    ///
    /// Never retried by the request engine.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// Terminal HTTP failure: non-retryable status or retries exhausted.
    #[error("http error {status}: {status_text}")]
    Http {
        /// Numeric status code of the last attempt.
        status: u16,
        /// Human-readable reason phrase reported by the transport.
        status_text: String,
    },
    /// The token provider failed; the request was not sent anonymously.
    #[error("token provider error: {0}")]
    Token(#[source] BoxError),
    /// Successful response whose body is not valid JSON.
    #[error("decode error: {0}")]
    Decode(String),
    /// Input or request body that cannot be serialized for the wire.
    #[error("encode error: {0}")]
    Encode(String),
}

impl ProviderError {
    /// Returns the HTTP status code for terminal HTTP failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
