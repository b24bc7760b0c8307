//! Upstream catalog error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TmdbError {
    #[error("TMDB credentials not configured")]
    NotConfigured,

    #[error("TMDB request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TMDB returned {status} for {path}")]
    Status { status: u16, path: String },

    #[error("TMDB resource not found: {0}")]
    NotFound(String),

    #[error("Invalid TMDB response: {0}")]
    Decode(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl TmdbError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Whether retrying the same request may succeed (timeouts, connection
    /// failures, 429 and 5xx)
    pub fn is_transient(&self) -> bool {
        match self {
            TmdbError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            TmdbError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transience() {
        let status = |status| TmdbError::Status {
            status,
            path: "/movie/1".into(),
        };
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(401).is_transient());
    }

    #[test]
    fn test_not_found_is_final() {
        assert!(!TmdbError::NotFound("/movie/0".into()).is_transient());
        assert!(!TmdbError::invalid("bad page").is_transient());
    }

    #[test]
    fn test_status_display() {
        let err = TmdbError::Status {
            status: 502,
            path: "/trending/all/day".into(),
        };
        assert_eq!(err.to_string(), "TMDB returned 502 for /trending/all/day");
    }
}
