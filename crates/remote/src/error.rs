use thiserror::Error;

/// Per-call error from the remote store, classified so callers can decide
/// between retry, record-and-continue, and run abort.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("rate limited (429)")]
    RateLimited {
        /// Server-suggested wait, from a Retry-After header
        retry_after_secs: Option<u64>,
    },

    #[error("timeout during {0}")]
    Timeout(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("authentication rejected ({status})")]
    Auth { status: u16 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Transient faults worth retrying with backoff: 429, 5xx, timeouts,
    /// and transport-level failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::RateLimited { .. } | RemoteError::Timeout(_) => true,
            RemoteError::Server { status, .. } => *status >= 500,
            RemoteError::Transport(_) => true,
            _ => false,
        }
    }

    /// Faults that invalidate the whole run (credential problems).
    pub fn is_fatal(&self) -> bool {
        matches!(self, RemoteError::Auth { .. })
    }
}

impl From<RemoteError> for pricescout_core::Error {
    fn from(e: RemoteError) -> Self {
        if e.is_fatal() {
            pricescout_core::Error::fatal(e.to_string())
        } else {
            pricescout_core::Error::remote(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_of_status_families() {
        assert!(RemoteError::RateLimited {
            retry_after_secs: None
        }
        .is_retryable());
        assert!(RemoteError::Server {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(!RemoteError::Auth { status: 401 }.is_retryable());
        assert!(RemoteError::Auth { status: 403 }.is_fatal());
        assert!(!RemoteError::NotFound("/x".to_string()).is_retryable());
    }

    #[test]
    fn auth_converts_to_fatal_core_error() {
        let core: pricescout_core::Error = RemoteError::Auth { status: 401 }.into();
        assert!(core.is_fatal());

        let core: pricescout_core::Error = RemoteError::Timeout("listing".to_string()).into();
        assert!(!core.is_fatal());
    }
}
