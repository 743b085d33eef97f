//! Accept loop: one task per connection

use super::{RequestHandler, Session};
use crate::report::ErrorReporter;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tracing::{debug, error, info};

/// Accepts connections and hands each one to its own session task
pub struct Listener {
    handler: Arc<RequestHandler>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    connection_id: AtomicU64,
}

impl Listener {
    pub fn new(handler: Arc<RequestHandler>) -> Self {
        Self {
            handler,
            reporter: None,
            connection_id: AtomicU64::new(0),
        }
    }

    /// Forward connection errors to `reporter` in addition to the log
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Get the next connection ID
    fn next_connection_id(&self) -> u64 {
        self.connection_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Accept connections until accepting fails.
    ///
    /// An accept failure means the socket itself is broken, so it is returned
    /// to the caller instead of being retried.
    pub async fn serve(&self, listener: UnixListener) -> Result<()> {
        info!(
            "Seclab listener started ({} backends)",
            self.handler.dispatcher().backend_count()
        );

        loop {
            let (stream, _) = listener
                .accept()
                .await
                .context("Failed to accept connection")?;
            let id = self.next_connection_id();
            debug!("[conn {}] Accepted", id);

            let handler = self.handler.clone();
            let reporter = self.reporter.clone();
            tokio::spawn(async move {
                handle_connection(id, stream, handler, reporter).await;
            });
        }
    }
}

/// Run one session to completion, logging and reporting its error, if any
pub async fn handle_connection<S>(
    id: u64,
    stream: S,
    handler: Arc<RequestHandler>,
    reporter: Option<Arc<dyn ErrorReporter>>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match Session::new(id, stream, handler).run().await {
        Ok(handled) => debug!("[conn {}] Closed after {} messages", id, handled),
        Err(e) => {
            error!(connection = id, kind = e.kind(), "{}", e);
            if let Some(reporter) = reporter {
                reporter.report(id, &e);
            }
        }
    }
}
