//! Error types for the session and document layer.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("URP protocol error: {0}")]
    Urp(#[from] libreoffice_urp::UrpError),

    #[error("LibreOffice not found: {0}")]
    ToolNotFound(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not connect to {endpoint} after {attempts} attempts: {last_error}")]
    Connection {
        endpoint: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Export to {} failed: {reason}", path.display())]
    Export { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
