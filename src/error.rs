use thiserror::Error;

/// Errors raised while running a conversation session.
///
/// Transport, handshake, protocol and device failures end the session.
/// Playback and scoring failures are reported where they happen and the
/// session carries on.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(std::time::Duration),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("playback error: {0}")]
    Playback(String),

    #[error("scoring error: {0}")]
    Scoring(String),

    /// A session loop panicked
    #[error("internal error: {0}")]
    Internal(String),

    /// The session was asked to stop.
    #[error("session cancelled")]
    Cancelled,
}

impl SessionError {
    /// Whether this error must tear down the whole session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Transport(_)
                | SessionError::HandshakeTimeout(_)
                | SessionError::Protocol(_)
                | SessionError::Device(_)
                | SessionError::Internal(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SessionError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        SessionError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Protocol(e.to_string())
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fatal_classification() {
        assert!(SessionError::Transport("closed".into()).is_fatal());
        assert!(SessionError::HandshakeTimeout(Duration::from_secs(1)).is_fatal());
        assert!(SessionError::Protocol("bad json".into()).is_fatal());
        assert!(SessionError::Device("no mic".into()).is_fatal());
        assert!(!SessionError::Playback("speaker".into()).is_fatal());
        assert!(!SessionError::Scoring("odd".into()).is_fatal());
        assert!(SessionError::Internal("panicked".into()).is_fatal());
        assert!(!SessionError::Cancelled.is_fatal());
    }

    #[test]
    fn json_errors_are_protocol_errors() {
        let err: SessionError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(err, SessionError::Protocol(_)));
    }
}
