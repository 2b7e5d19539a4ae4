use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Race Router Errors
    #[error("All endpoints failed: {0:?}")]
    AllEndpointsFailed(Vec<EndpointFailure>),

    #[error("Race cancelled by caller")]
    RaceCancelled,

    #[error("Malformed JSON-RPC request: {0}")]
    MalformedRequest(String),

    // Aggregator Errors
    #[error("Source decode failed: {0}")]
    SourceDecodeFailed(String),

    // Cache Errors
    #[error("Durable cache tier unavailable: {0}")]
    DurableTierUnavailable(String),

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Background tasks terminated unexpectedly: {0:?}")]
    TasksTerminated(Vec<String>),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why one endpoint's attempt was discarded during a race.
/// Collected into `AllEndpointsFailed` when every attempt is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    HttpStatus(u16),
    Transport(String),
    Timeout,
    InvalidJson,
    RpcError(String),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::HttpStatus(code) => write!(f, "HTTP status {}", code),
            AttemptError::Transport(msg) => write!(f, "transport error: {}", msg),
            AttemptError::Timeout => write!(f, "attempt timed out"),
            AttemptError::InvalidJson => write!(f, "body is not valid JSON"),
            AttemptError::RpcError(msg) => write!(f, "JSON-RPC error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub url: String,
    pub reason: AttemptError,
}

impl std::fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.url, self.reason)
    }
}
