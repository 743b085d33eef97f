//! Individual client connection handling

use super::RequestHandler;
use crate::error::ListenerError;
use seclab_shared::{protocol::MESSAGE_LEN, Message};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// One accepted connection carrying a sequence of 41-byte messages
pub struct Session<S> {
    id: u64,
    stream: S,
    handler: Arc<RequestHandler>,
    frame: [u8; MESSAGE_LEN],
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(id: u64, stream: S, handler: Arc<RequestHandler>) -> Self {
        Self {
            id,
            stream,
            handler,
            frame: [0u8; MESSAGE_LEN],
        }
    }

    /// Read the next complete message.
    /// Returns None if the peer closed the connection between messages.
    pub async fn recv(&mut self) -> Result<Option<Message>, ListenerError> {
        let mut filled = 0;
        while filled < MESSAGE_LEN {
            let n = self
                .stream
                .read(&mut self.frame[filled..])
                .await
                .map_err(ListenerError::Transport)?;

            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(ListenerError::Transport(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "connection closed after {} of {} bytes",
                        filled, MESSAGE_LEN
                    ),
                )));
            }
            filled += n;
        }

        Ok(Some(Message::from_frame(&self.frame)))
    }

    /// Serve messages until the peer closes or the first error.
    ///
    /// Returns the number of messages answered. The stream is dropped, and
    /// so closed, when this returns.
    pub async fn run(mut self) -> Result<u64, ListenerError> {
        let mut handled = 0;

        while let Some(message) = self.recv().await? {
            let response = self.handler.handle(&message).await?;
            self.stream
                .write_all(&response.encode())
                .await
                .map_err(ListenerError::Transport)?;
            handled += 1;
        }

        debug!("[conn {}] Peer closed after {} messages", self.id, handled);
        Ok(handled)
    }
}
