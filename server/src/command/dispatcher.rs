//! Command dispatcher: maps an authenticated status byte to an action

use crate::auth::KeyStore;
use crate::backend::{Status, StatusBackend};
use crate::error::ListenerError;
use seclab_shared::{Command, Response};
use std::sync::Arc;
use tracing::{info, warn};

/// Applies commands to the registered backends
pub struct CommandDispatcher {
    keys: Arc<KeyStore>,
    /// Backends in registration order
    backends: Vec<Arc<dyn StatusBackend>>,
}

impl CommandDispatcher {
    /// Create a dispatcher with no backends
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self {
            keys,
            backends: Vec::new(),
        }
    }

    /// Register a backend; commands reach backends in the order they were added
    pub fn add_backend(&mut self, backend: Arc<dyn StatusBackend>) {
        self.backends.push(backend);
    }

    /// Number of registered backends
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Act on a status byte that has already been authenticated
    pub async fn dispatch(&self, status_byte: u8) -> Result<Response, ListenerError> {
        let command = Command::try_from(status_byte).map_err(ListenerError::UnrecognizedCommand)?;
        info!("Received request: {}", command);

        match Status::from_command(command) {
            Some(status) => {
                self.apply(status).await?;
                Ok(Response::AllGood)
            }
            None => self.key_rotate().await,
        }
    }

    /// Generate a new shared secret and build the reply carrying it
    pub async fn key_rotate(&self) -> Result<Response, ListenerError> {
        let rotated = self.keys.rotate().await.map_err(ListenerError::KeyFile)?;
        Ok(Response::NewKey {
            timestamp: rotated.timestamp,
            secret: rotated.secret,
        })
    }

    /// Publish `status` on every backend, stopping at the first failure.
    ///
    /// Backends that already succeeded are not rolled back.
    async fn apply(&self, status: Status) -> Result<(), ListenerError> {
        for (index, backend) in self.backends.iter().enumerate() {
            if let Err(source) = backend.apply(status).await {
                if index > 0 {
                    warn!(
                        "Status {} applied on {} of {} backends before {} failed",
                        status,
                        index,
                        self.backends.len(),
                        backend.name()
                    );
                }
                return Err(ListenerError::Backend {
                    backend: backend.name().to_string(),
                    source,
                });
            }
        }
        Ok(())
    }
}
