use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum AuthError {
    #[error("no bearer token presented")]
    MissingToken,
    #[error("token could not be verified")]
    InvalidToken,
    #[error("token has expired")]
    Expired,
}

#[derive(Debug, Error, Clone)]
pub enum MatchmakingError {
    #[error("player is already queued")]
    AlreadyQueued,
    #[error("player is already in a live match")]
    AlreadyInGame,
    #[error("pairing could not be completed: {0}")]
    PairingFailed(String),
}

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("caller is not a participant of this match")]
    NotAParticipant,
    #[error("frame could not be parsed")]
    MalformedFrame,
}

#[derive(Debug, Error, Clone)]
pub enum PairingError {
    #[error("fewer questions are available than required")]
    InsufficientQuestions,
    #[error("pairing could not be read or committed to storage")]
    PersistenceFailed,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("transient persistence failure: {0}")]
    Transient(#[source] sqlx::Error),
    #[error("unrecoverable persistence failure: {0}")]
    Fatal(#[source] sqlx::Error),
}

impl PersistenceError {
    /// Connection resets and pool-timeout errors are worth retrying;
    /// constraint violations and the like are not.
    pub fn classify(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                PersistenceError::Transient(err)
            }
            _ => PersistenceError::Fatal(err),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PersistenceError::Transient(_))
    }
}
