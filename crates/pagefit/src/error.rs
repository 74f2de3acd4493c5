//! Conversion error taxonomy.

use pagefit_libreoffice::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The engine or an external tool executable is missing.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// No automation session within the retry budget.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("export failed: {0}")]
    ExportFailed(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An external tool exited successfully but left no output file.
    #[error("output not found: {0}")]
    OutputNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

impl From<SessionError> for ConvertError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ToolNotFound(what) => ConvertError::ToolNotFound(what),
            err @ SessionError::Connection { .. } => ConvertError::Connection(err.to_string()),
            SessionError::Io(err) => ConvertError::Io(err),
            other => ConvertError::ExportFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_session_errors_keep_their_kind() {
        let err: ConvertError = SessionError::ToolNotFound("soffice".into()).into();
        assert!(matches!(err, ConvertError::ToolNotFound(ref s) if s == "soffice"));

        let err: ConvertError = SessionError::Connection {
            endpoint: "127.0.0.1:2002".into(),
            attempts: 30,
            last_error: "connection refused".into(),
        }
        .into();
        match err {
            ConvertError::Connection(detail) => {
                assert!(detail.contains("127.0.0.1:2002"), "{detail}");
                assert!(detail.contains("connection refused"), "{detail}");
            }
            other => panic!("expected Connection, got {other:?}"),
        }

        let err: ConvertError = SessionError::Export {
            path: PathBuf::from("/tmp/out.pdf"),
            reason: "engine wrote an empty file".into(),
        }
        .into();
        assert!(matches!(err, ConvertError::ExportFailed(_)));
    }
}
