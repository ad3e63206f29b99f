use serde_json::Value;
use thiserror::Error;

/// Error taxonomy for the connector.
///
/// Every failure the library can produce is representable as data; nothing
/// in the core panics. The enum is `Clone` because streaming errors fan out
/// to every registered listener.
#[derive(Error, Debug, Clone)]
pub enum ExchangeError {
    /// Signing precondition failed (missing or empty secret, no signer
    /// configured for an authenticated call).
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// No usable HTTP response: the request never completed or the server
    /// answered with a non-200 status.
    #[error("Transport error ({status:?}): {message}")]
    TransportError {
        status: Option<u16>,
        message: String,
    },

    /// HTTP 200 but the exchange reported `success: false`. Carries the
    /// decoded error payload verbatim.
    #[error("API error: {message}")]
    ApiError { message: String, result: Value },

    /// Malformed JSON on the REST or streaming path.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Streaming channel failure: bootstrap, handshake or hub binding.
    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    #[error("Other error: {0}")]
    Other(String),
}
