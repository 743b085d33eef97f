//! Error reporting hook
//!
//! Connection errors are always logged at error level by the listener. In
//! addition they are handed to an [`ErrorReporter`], which forwards them to an
//! external collector. Reporting is fire-and-forget and must never block
//! request handling.

use crate::error::ListenerError;
use tokio::sync::mpsc;
use tracing::debug;

/// A single reported fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Connection the fault happened on
    pub connection_id: u64,
    /// Machine-friendly error kind
    pub kind: &'static str,
    /// Rendered error message
    pub message: String,
}

/// Sink for unexpected faults
pub trait ErrorReporter: Send + Sync {
    /// Queue `error` for reporting. Must return without waiting.
    fn report(&self, connection_id: u64, error: &ListenerError);
}

/// Reporter that queues reports on an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ErrorReport>,
}

impl ChannelReporter {
    /// Create a reporter and the receiving end of its queue
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ErrorReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ErrorReporter for ChannelReporter {
    fn report(&self, connection_id: u64, error: &ListenerError) {
        let report = ErrorReport {
            connection_id,
            kind: error.kind(),
            message: error.to_string(),
        };
        // A closed queue only means nobody collects reports any more
        let _ = self.tx.send(report);
    }
}

/// Drain a report queue into the debug log under the `seclab::report` target.
/// The listener has already logged each error.
pub async fn forward_to_log(mut rx: mpsc::UnboundedReceiver<ErrorReport>) {
    while let Some(report) = rx.recv().await {
        debug!(
            target: "seclab::report",
            connection = report.connection_id,
            kind = report.kind,
            "{}",
            report.message
        );
    }
}
