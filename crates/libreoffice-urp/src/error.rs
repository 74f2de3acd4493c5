//! Errors raised by the URP client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UrpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("{kind} cache has no entry at index {index}")]
    CacheMiss { kind: &'static str, index: u16 },

    #[error("unknown type class byte {0:#04x}")]
    UnknownTypeClass(u8),

    #[error("no decoder for struct type {0}")]
    UnknownStruct(String),

    #[error("{method}: expected {expected} arguments, got {got}")]
    Arity {
        method: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("remote {type_name}: {message}")]
    RemoteException { type_name: String, message: String },

    #[error("{0} returned a null reference")]
    NullReference(&'static str),

    #[error("invalid UNO URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl UrpError {
    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        UrpError::Malformed(what.into())
    }
}

pub type Result<T> = std::result::Result<T, UrpError>;
