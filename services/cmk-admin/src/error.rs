//! Error types for the cmk-admin client

/// Errors that can occur when talking to a Check_MK site
#[derive(Debug, thiserror::Error)]
pub enum CmkError {
    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("invalid target type: {0}")]
    InvalidTargetType(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("page not found")]
    PageNotFound,

    #[error("access denied")]
    AccessDenied,

    #[error("http error, code {0}")]
    HttpError(u16),

    #[error("url error: {0}")]
    UrlError(String),

    #[error("failed to read config file: {0}")]
    ConfigRead(String),

    #[error("config syntax error: {0}")]
    ConfigParse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for cmk-admin operations
pub type Result<T> = std::result::Result<T, CmkError>;
