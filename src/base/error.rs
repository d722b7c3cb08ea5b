use thiserror::Error;

/// Closed tag set attached to every error raised by this crate.
///
/// Lets callers branch on the failure class without matching on message
/// strings. `ResponseParse` is reserved for malformed JSON surfaced by the
/// response accessors; everything else originates in dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ArgumentNull,
    HttpStatusCode,
    RequestTimeout,
    HeaderConstruction,
    UrlParse,
    UserCancelled,
    RequestError,
    ResponseParse,
    Other,
}

/// Error type for request dispatch and response access.
#[derive(Debug, Error)]
pub enum ReqError {
    /// A required parameter or field is missing or empty. The payload names it.
    #[error("required parameter `{0}` is not set or empty")]
    ArgumentNull(&'static str),

    /// The server answered with a non-2xx/3xx status.
    #[error("HTTP status code indicates an error: {0}")]
    HttpStatusCode(u16),

    /// The exchange did not complete within the configured timeout.
    #[error("HTTP request timed out")]
    RequestTimeout,

    /// A recognized or custom header could not be turned into a transport header.
    #[error("failed to construct request header `{name}`: {reason}")]
    HeaderConstruction { name: String, reason: String },

    /// The target URL (or transcript) could not be parsed into a request.
    #[error("failed to build request URL: {0}")]
    UrlParse(String),

    /// The caller cancelled the dispatch. Only ever notified, never returned.
    #[error("request cancelled by the caller")]
    UserCancelled,

    /// A transport-level fault: connect, TLS, proxy, or wire exchange.
    #[error("HTTP request failed: {0}")]
    RequestError(String),

    /// The response body is not valid JSON.
    #[error("response body is not valid JSON")]
    ResponseParse(#[source] serde_json::Error),

    /// Response processing failed after the exchange completed.
    #[error("request processing failed: {0}")]
    Other(String),
}

impl ReqError {
    /// The tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReqError::ArgumentNull(_) => ErrorKind::ArgumentNull,
            ReqError::HttpStatusCode(_) => ErrorKind::HttpStatusCode,
            ReqError::RequestTimeout => ErrorKind::RequestTimeout,
            ReqError::HeaderConstruction { .. } => ErrorKind::HeaderConstruction,
            ReqError::UrlParse(_) => ErrorKind::UrlParse,
            ReqError::UserCancelled => ErrorKind::UserCancelled,
            ReqError::RequestError(_) => ErrorKind::RequestError,
            ReqError::ResponseParse(_) => ErrorKind::ResponseParse,
            ReqError::Other(_) => ErrorKind::Other,
        }
    }
}
