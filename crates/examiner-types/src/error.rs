use thiserror::Error;

/// Errors from repository operations (used by trait definitions in examiner-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the client connection.
///
/// Always terminal for the session that observes them.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),
}

/// Errors from interview session setup.
#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("history window must be at least 2 messages, got {0}")]
    InvalidWindow(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_interview_error_display() {
        let err = InterviewError::InvalidWindow(1);
        assert_eq!(
            err.to_string(),
            "history window must be at least 2 messages, got 1"
        );
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Write("broken pipe".to_string());
        assert_eq!(err.to_string(), "write failed: broken pipe");
    }
}
