use thiserror::Error;

/// Errors from driving the gesture state machine
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A second gesture tried to start while one is still being drawn
    #[error("a stroke is already in progress")]
    GestureInProgress,

    /// A move or end arrived with no gesture to apply it to
    #[error("no stroke is in progress")]
    NoGestureInProgress,
}

pub type SessionResult<T> = Result<T, SessionError>;
