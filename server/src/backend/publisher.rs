//! Atomic status publication
//!
//! A status file is published by hard-linking a pre-authored content file to
//! a temporary name, then renaming that name over the link path. Rename is
//! atomic, so a reader of the link sees either the previous content or the
//! new content, never a partial file or a missing one.
//!
//! The temporary directory is created next to the link, and the content file
//! must live on the same volume: hard links cannot cross devices.

use crate::error::BackendError;
use std::fmt;
use std::fs::{self, File, FileTimes};
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Name of the temporary link inside the private directory
const TEMP_LINK_NAME: &str = "templink";

/// The step of a swap that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    TempDir,
    Link,
    Rename,
    Touch,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishStep::TempDir => write!(f, "create temporary directory for"),
            PublishStep::Link => write!(f, "hard-link"),
            PublishStep::Rename => write!(f, "rename onto"),
            PublishStep::Touch => write!(f, "refresh timestamps of"),
        }
    }
}

/// Atomically replace `link` with a hard link to `content` and set its
/// access and modification times to now.
///
/// On failure the link keeps its last published content. Removing the
/// temporary directory is best effort and never undoes a completed rename.
pub fn swap(content: &Path, link: &Path) -> Result<(), BackendError> {
    let parent = match link.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let temp_dir = tempfile::Builder::new()
        .prefix(".seclab-")
        .tempdir_in(parent)
        .map_err(|source| BackendError::Publish {
            step: PublishStep::TempDir,
            path: link.to_path_buf(),
            source,
        })?;

    let temp_link = temp_dir.path().join(TEMP_LINK_NAME);
    fs::hard_link(content, &temp_link).map_err(|source| BackendError::Publish {
        step: PublishStep::Link,
        path: content.to_path_buf(),
        source,
    })?;

    fs::rename(&temp_link, link).map_err(|source| BackendError::Publish {
        step: PublishStep::Rename,
        path: link.to_path_buf(),
        source,
    })?;

    touch(link).map_err(|source| BackendError::Publish {
        step: PublishStep::Touch,
        path: link.to_path_buf(),
        source,
    })?;

    let temp_path = temp_dir.path().to_path_buf();
    if let Err(e) = temp_dir.close() {
        warn!("Failed to remove {}: {}", temp_path.display(), e);
    }

    debug!("Published {} -> {}", content.display(), link.display());
    Ok(())
}

fn touch(path: &Path) -> std::io::Result<()> {
    let now = SystemTime::now();
    let times = FileTimes::new().set_accessed(now).set_modified(now);
    File::open(path)?.set_times(times)
}
