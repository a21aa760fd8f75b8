use thiserror::Error;

/// Failures a sync or save can hit. Poll cycles recover from every variant
/// locally; only a failed `Persistence` write on an explicit save is handed
/// back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl SyncError {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Network(_) => "network",
            SyncError::Provider(_) => "provider",
            SyncError::MalformedResponse(_) => "malformed",
            SyncError::Persistence(_) => "persistence",
        }
    }
}
