//! File backend: publishes the status by swapping a link to a content file

use super::{publisher, Status, StatusBackend};
use crate::error::BackendError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Paths used by one display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFiles {
    /// The published status file that display software reads
    pub link: PathBuf,
    /// Content shown when the lab is open
    pub open: PathBuf,
    /// Content shown when the lab is closed
    pub closed: PathBuf,
    /// Content shown while out for coffee, if this display supports it
    pub coffee: Option<PathBuf>,
    /// Content shown when the lab is on fire, if this display supports it
    pub fire: Option<PathBuf>,
}

impl StatusFiles {
    /// Content file for `status`, if configured
    pub fn content_for(&self, status: Status) -> Option<&Path> {
        match status {
            Status::Open => Some(&self.open),
            Status::Closed => Some(&self.closed),
            Status::Coffee => self.coffee.as_deref(),
            Status::Fire => self.fire.as_deref(),
        }
    }
}

/// Backend that drives one status link on the local file system
#[derive(Debug, Clone)]
pub struct FileBackend {
    name: String,
    files: StatusFiles,
}

impl FileBackend {
    /// Create a backend named after its link path
    pub fn new(files: StatusFiles) -> Self {
        let name = files.link.display().to_string();
        Self { name, files }
    }

    async fn publish(&self, status: Status) -> Result<(), BackendError> {
        let content = self
            .files
            .content_for(status)
            .ok_or(BackendError::Unsupported(status))?
            .to_path_buf();
        let link = self.files.link.clone();

        tokio::task::spawn_blocking(move || publisher::swap(&content, &link))
            .await
            .map_err(|source| BackendError::Task {
                path: self.files.link.clone(),
                source,
            })??;

        info!("[{}] Published status: {}", self.name, status);
        Ok(())
    }
}

#[async_trait]
impl StatusBackend for FileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<(), BackendError> {
        self.publish(Status::Open).await
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.publish(Status::Closed).await
    }

    async fn coffee(&self) -> Result<(), BackendError> {
        self.publish(Status::Coffee).await
    }

    async fn fire(&self) -> Result<(), BackendError> {
        self.publish(Status::Fire).await
    }
}
