//! Signing client for the status listener

use anyhow::{bail, Context, Result};
use seclab_shared::{now_secs, Command, Message, Response, ResponseDecoder};
use std::io::{self, Write};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// A connection to the listener that signs every request with `key`
pub struct Client<S> {
    stream: S,
    key: Vec<u8>,
    decoder: ResponseDecoder,
    read_buf: Vec<u8>,
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, key: Vec<u8>) -> Self {
        Self {
            stream,
            key,
            decoder: ResponseDecoder::new(),
            read_buf: vec![0u8; 64],
        }
    }

    /// Sign subsequent requests with `key` (after a rotation)
    pub fn set_key(&mut self, key: Vec<u8>) {
        self.key = key;
    }

    /// Send `command` stamped with the current time and wait for the reply
    pub async fn send(&mut self, command: Command) -> Result<Response> {
        self.send_at(command, now_secs()).await
    }

    /// Send `command` stamped with `timestamp` and wait for the reply
    pub async fn send_at(&mut self, command: Command, timestamp: u64) -> Result<Response> {
        let message = Message::sign(command.as_byte(), timestamp, &self.key)?;
        self.stream
            .write_all(&message.encode())
            .await
            .context("Failed to send request")?;
        debug!("Sent {} (ts={})", command, timestamp);

        let response = self.recv().await?;
        match (command, &response) {
            (Command::KeyRotate, Response::NewKey { .. }) => {}
            (Command::KeyRotate, _) | (_, Response::NewKey { .. }) => {
                bail!("Unexpected response to {}: {:?}", command, response)
            }
            _ => {}
        }
        Ok(response)
    }

    /// Read the next response.
    /// The listener closes the connection instead of answering a rejected request.
    async fn recv(&mut self) -> Result<Response> {
        loop {
            if let Some(response) = self.decoder.decode_next()? {
                return Ok(response);
            }

            let n = self
                .stream
                .read(&mut self.read_buf)
                .await
                .context("Failed to read response")?;
            if n == 0 {
                bail!("Listener closed the connection without answering (request rejected)");
            }
            self.decoder.extend(&self.read_buf[..n]);
        }
    }
}

/// Read a shared secret from `path`
pub async fn load_key(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read key file {}", path.display()))
}

/// Store a shared secret at `path`, readable by the owner only.
///
/// The secret is written to a 0600 temporary file next to `path` and renamed
/// over it, so the key file is never readable by others or left truncated.
pub async fn save_key(path: &Path, secret: &[u8]) -> Result<()> {
    let target = path.to_path_buf();
    let secret = secret.to_vec();
    tokio::task::spawn_blocking(move || write_key(&target, &secret))
        .await
        .context("Key writer task failed")?
        .with_context(|| format!("Failed to write key file {}", path.display()))
}

fn write_key(path: &Path, secret: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;

    // Set restrictive permissions (owner read/write only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(secret)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Render a secret for printing instead of storing it
pub fn key_to_hex(secret: &[u8]) -> String {
    hex::encode(secret)
}
