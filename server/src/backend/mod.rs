//! Status backends
//!
//! This module handles:
//! - The capability set every backend exposes (open, close, coffee, fire)
//! - Atomic publication of a status file by link-and-rename
//! - The file-based backend that drives a display's status link

mod file;
pub mod publisher;

pub use file::{FileBackend, StatusFiles};
pub use publisher::PublishStep;

use crate::error::BackendError;
use async_trait::async_trait;
use seclab_shared::Command;
use std::fmt;

/// A status that can be shown on the sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Open,
    Closed,
    Coffee,
    Fire,
}

impl Status {
    /// Map a wire command to the status it publishes, if any
    pub fn from_command(command: Command) -> Option<Self> {
        match command {
            Command::Open => Some(Status::Open),
            Command::Close => Some(Status::Closed),
            Command::Coffee => Some(Status::Coffee),
            Command::Fire => Some(Status::Fire),
            Command::KeyRotate => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Open => write!(f, "open"),
            Status::Closed => write!(f, "closed"),
            Status::Coffee => write!(f, "coffee"),
            Status::Fire => write!(f, "fire"),
        }
    }
}

/// A registered handler that publishes statuses somewhere
///
/// Coffee and fire are optional: a backend that cannot show them keeps the
/// default implementations, which fail with [`BackendError::Unsupported`].
#[async_trait]
pub trait StatusBackend: Send + Sync {
    /// Human-readable name for logs and errors
    fn name(&self) -> &str;

    async fn open(&self) -> Result<(), BackendError>;

    async fn close(&self) -> Result<(), BackendError>;

    async fn coffee(&self) -> Result<(), BackendError> {
        Err(BackendError::Unsupported(Status::Coffee))
    }

    async fn fire(&self) -> Result<(), BackendError> {
        Err(BackendError::Unsupported(Status::Fire))
    }

    /// Publish `status` through the matching operation
    async fn apply(&self, status: Status) -> Result<(), BackendError> {
        match status {
            Status::Open => self.open().await,
            Status::Closed => self.close().await,
            Status::Coffee => self.coffee().await,
            Status::Fire => self.fire().await,
        }
    }
}
