use thiserror::Error;

use super::Stage;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown or empty handover stage: '{0}'")]
    UnknownStage(String),
    #[error("stage {0} is not handled by the handover state machine")]
    UnexpectedStage(Stage),
    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),
    #[error("invalid application name: '{0}'")]
    InvalidAppName(String),
    #[error("at least one application replica is required")]
    NoReplicas,
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error")]
    Io(#[from] std::io::Error),
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}
