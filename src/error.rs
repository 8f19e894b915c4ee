use http::Method;
use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Tls,
    Read,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Read => "read",
            Self::Other => "other",
        };
        formatter.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidBaseUrl,
    SerializeJson,
    RequestBuild,
    TlsInit,
    Transport,
    Timeout,
    ReadBody,
    HttpStatus,
    Deserialize,
    Cancelled,
    AttemptsExhausted,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidBaseUrl => "invalid_base_url",
            Self::SerializeJson => "serialize_json",
            Self::RequestBuild => "request_build",
            Self::TlsInit => "tls_init",
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::ReadBody => "read_body",
            Self::HttpStatus => "http_status",
            Self::Deserialize => "deserialize",
            Self::Cancelled => "cancelled",
            Self::AttemptsExhausted => "attempts_exhausted",
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error("invalid shortener base url: {url}")]
    InvalidBaseUrl { url: String },
    #[error("failed to serialize request json: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to build http request: {source}")]
    RequestBuild {
        #[source]
        source: http::Error,
    },
    #[error("failed to initialize tls: {message}")]
    TlsInit { message: String },
    #[error("http transport error ({kind}) for {method} {uri}: {source}")]
    Transport {
        kind: TransportErrorKind,
        method: Method,
        uri: String,
        #[source]
        source: BoxError,
    },
    #[error("http request timed out after {timeout_ms}ms for {method} {uri}")]
    Timeout {
        timeout_ms: u128,
        method: Method,
        uri: String,
    },
    #[error("failed to read response body for {method} {uri}: {source}")]
    ReadBody {
        method: Method,
        uri: String,
        #[source]
        source: BoxError,
    },
    #[error("http status error {status} for {method} {uri}: {body}")]
    HttpStatus {
        status: u16,
        method: Method,
        uri: String,
        body: String,
    },
    #[error("failed to decode response json: {source}; body={body}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    #[error("request cancelled for {method} {uri}")]
    Cancelled { method: Method, uri: String },
    #[error("all {attempts} attempts failed for {method} {uri}")]
    AttemptsExhausted {
        attempts: usize,
        method: Method,
        uri: String,
        #[source]
        source: Option<Box<ClientError>>,
    },
    #[error("{operation}: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidBaseUrl { .. } => ErrorCode::InvalidBaseUrl,
            Self::Serialize { .. } => ErrorCode::SerializeJson,
            Self::RequestBuild { .. } => ErrorCode::RequestBuild,
            Self::TlsInit { .. } => ErrorCode::TlsInit,
            Self::Transport { .. } => ErrorCode::Transport,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::ReadBody { .. } => ErrorCode::ReadBody,
            Self::HttpStatus { .. } => ErrorCode::HttpStatus,
            Self::Deserialize { .. } => ErrorCode::Deserialize,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
            Self::AttemptsExhausted { .. } => ErrorCode::AttemptsExhausted,
            Self::Operation { source, .. } => source.code(),
        }
    }

    /// Whether one more attempt could plausibly succeed. Only outcomes where
    /// no response was obtained at all qualify; status-based retry decisions
    /// are made from the response, not from an error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::ReadBody { .. }
        )
    }
}
