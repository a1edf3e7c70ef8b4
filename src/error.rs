use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PackhorseError {
    #[error("Local store error: {0}")]
    LocalStore(String),

    #[error("Record not found: {0}")]
    NotFound(i64),

    #[error("Referenced user not found: {0}")]
    MissingParent(i64),

    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, PackhorseError>;

impl From<rusqlite::Error> for PackhorseError {
    fn from(e: rusqlite::Error) -> Self {
        PackhorseError::LocalStore(e.to_string())
    }
}

impl From<serde_json::Error> for PackhorseError {
    fn from(e: serde_json::Error) -> Self {
        PackhorseError::Json(e.to_string())
    }
}

