use thiserror::Error;

/// Errors surfaced by the controller API contract.
///
/// Authorization failures are handled globally by the session layer and are
/// never rendered as an inline application error; everything else propagates
/// to the caller for display.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad credentials on login, or a rejected/expired session token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A device configuration violated a schedule invariant at save time.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// Operation on an unmanaged or unknown MAC.
    #[error("not found: {0}")]
    NotFound(String),

    /// A block/unblock/bonus command was rejected by the controller.
    #[error("command rejected: {0}")]
    Command(String),

    /// The controller answered outside the contract (5xx and friends).
    #[error("controller error: {0}")]
    Controller(String),

    /// Network-level failure talking to the controller.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The controller answered 2xx but the body did not parse.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// True for errors that terminate the session rather than the operation.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
