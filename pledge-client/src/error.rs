use pledge_api::Error as ApiError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered, and refused
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The server could not be reached, or answered something unreadable
    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    /// The control that would trigger this action is disabled in the current state
    #[error("Action unavailable: {0}")]
    Disabled(&'static str),

    #[error("Request cancelled")]
    Cancelled,
}

impl Error {
    pub fn unauthenticated() -> Error {
        Error::Api(ApiError::Unauthenticated)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Error::Disabled(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
