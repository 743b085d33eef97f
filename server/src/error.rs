//! Error types for the listener
//!
//! Every variant is recovered at the connection boundary: the session logs
//! it, hands it to the error reporter and closes the connection.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::backend::{PublishStep, Status};

/// Errors raised while handling a single request
#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("Incorrect HMAC signature")]
    InvalidSignature,

    #[error("Request expired: {age}s old (max: {max_age}s)")]
    Expired { age: i64, max_age: u64 },

    #[error("Unrecognized status byte: 0x{0:02x}")]
    UnrecognizedCommand(u8),

    #[error("Key file error: {0}")]
    KeyFile(#[source] io::Error),

    #[error("Backend {backend} failed: {source}")]
    Backend {
        backend: String,
        #[source]
        source: BackendError,
    },

    #[error("Transport error: {0}")]
    Transport(#[source] io::Error),
}

impl ListenerError {
    /// Short machine-friendly label used in structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ListenerError::InvalidSignature => "invalid_signature",
            ListenerError::Expired { .. } => "expired",
            ListenerError::UnrecognizedCommand(_) => "unrecognized_command",
            ListenerError::KeyFile(_) => "key_file_io",
            ListenerError::Backend { .. } => "backend_io",
            ListenerError::Transport(_) => "transport_io",
        }
    }
}

/// Errors raised by a status backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to {step} {}: {source}", path.display())]
    Publish {
        step: PublishStep,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("publish task for {} did not complete: {source}", path.display())]
    Task {
        path: PathBuf,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("status {0} is not supported by this backend")]
    Unsupported(Status),
}
