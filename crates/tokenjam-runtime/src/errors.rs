//! Session handle errors.

use thiserror::Error;

/// Errors returned by [`SessionHandle`](crate::SessionHandle) calls.
///
/// None of these reach the session actor itself; they only tell the
/// caller its request was not delivered.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The actor has stopped.
    #[error("session is not running")]
    Closed,
    /// The actor's event queue is full; the event was dropped.
    #[error("session event queue is full")]
    Busy,
}

/// Result type for session handle operations.
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(SessionError::Closed.to_string(), "session is not running");
        assert_eq!(SessionError::Busy.to_string(), "session event queue is full");
    }
}
