//! File-backed shared secret

use rand::rngs::OsRng;
use rand::RngCore;
use seclab_shared::{now_secs, protocol::KEY_LEN};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// A freshly generated secret and the time it was generated
#[derive(Clone, PartialEq, Eq)]
pub struct RotatedKey {
    pub secret: [u8; KEY_LEN],
    pub timestamp: u64,
}

impl std::fmt::Debug for RotatedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatedKey")
            .field("secret", &"<redacted>")
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Handle to the key file.
///
/// The secret is never cached: every read goes to disk so that a rotation is
/// seen by the very next message, whichever connection carries it.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current secret
    pub async fn read_secret(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Replace the secret with 32 fresh random bytes.
    ///
    /// The new key is written to a temporary file with mode 0600 in the same
    /// directory and renamed over the key path, so a concurrent reader sees
    /// either the old key or the new one. Previous keys are not kept.
    pub async fn rotate(&self) -> io::Result<RotatedKey> {
        let mut secret = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut secret);

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_key(&path, &secret))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

        info!("Rotated key in {}", self.path.display());
        Ok(RotatedKey {
            secret,
            timestamp: now_secs(),
        })
    }
}

fn write_key(path: &Path, secret: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(secret)?;
    file.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))?;
    }

    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_secret() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("key");
        std::fs::write(&path, b"dismykey").expect("write");

        let store = KeyStore::new(&path);
        assert_eq!(store.read_secret().await.expect("read"), b"dismykey");
    }

    #[tokio::test]
    async fn test_read_missing_secret_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = KeyStore::new(dir.path().join("missing"));
        let err = store.read_secret().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rotate_overwrites_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("key");
        std::fs::write(&path, b"dismykey").expect("write");
        let store = KeyStore::new(&path);

        let before = now_secs();
        let rotated = store.rotate().await.expect("rotate");

        assert_eq!(std::fs::read(&path).expect("read"), rotated.secret);
        assert!(rotated.timestamp >= before);
        assert_ne!(rotated.secret.as_slice(), b"dismykey".as_slice());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rotate_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("key");
        std::fs::write(&path, b"dismykey").expect("write");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).expect("chmod");

        KeyStore::new(&path).rotate().await.expect("rotate");

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_rotations_differ() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = KeyStore::new(dir.path().join("key"));

        let first = store.rotate().await.expect("rotate");
        let second = store.rotate().await.expect("rotate");
        assert_ne!(first.secret, second.secret);
        assert_eq!(store.read_secret().await.expect("read"), second.secret);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let key = RotatedKey {
            secret: [0xab; KEY_LEN],
            timestamp: 1,
        };
        let text = format!("{:?}", key);
        assert!(text.contains("redacted"));
        assert!(!text.contains("171"));
    }
}
