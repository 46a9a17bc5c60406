use std::io;
use thiserror::Error;

/// Every way a single query can fail.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Request timed out")]
    Timeout,
    #[error("Response does not start with a known frame marker")]
    ProtocolViolation,
    #[error("Split packets are not supported")]
    UnsupportedSplitResponse,
    #[error("Server keeps sending new challenges instead of accepting")]
    ChallengeLoopExceeded,
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("{0}")]
    Unknown(String),
}

impl QueryError {
    pub(crate) fn malformed<S: Into<String>>(reason: S) -> Self {
        QueryError::Malformed(reason.into())
    }
}

fn is_timeout(kind: io::ErrorKind) -> bool {
    // A blocking socket with a read timeout reports expiry as either kind.
    matches!(kind, io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

impl From<io::Error> for QueryError {
    fn from(e: io::Error) -> Self {
        if is_timeout(e.kind()) {
            QueryError::Timeout
        } else {
            QueryError::Unknown(e.to_string())
        }
    }
}

impl From<anyhow::Error> for QueryError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<io::Error>() {
            Some(io_err) if is_timeout(io_err.kind()) => QueryError::Timeout,
            _ => QueryError::Unknown(format!("{:#}", e)),
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
