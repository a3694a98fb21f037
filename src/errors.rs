use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Archive error: {0}")]
    Archive(String),
    #[error("{0}")]
    Precondition(String),
    #[error("Process error: {0}")]
    Process(String),
}

impl LauncherError {
    /// Failures the user can act on by retrying the same request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LauncherError::Network(_) | LauncherError::Http(_) | LauncherError::Io(_)
        )
    }
}

impl From<zip::result::ZipError> for LauncherError {
    fn from(err: zip::result::ZipError) -> Self {
        LauncherError::Archive(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;
