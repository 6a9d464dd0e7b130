use thiserror::Error;

/// Failure talking to the remote store. Carries a human-readable cause.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by a [`StoreHandle`](crate::StoreHandle) call.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("notice store has shut down")]
    Closed,
}
