//! Request pipeline shared by all connections

use crate::auth::MessageAuthenticator;
use crate::command::CommandDispatcher;
use crate::error::ListenerError;
use seclab_shared::{Message, Response};

/// Authenticates a message, then dispatches its command.
///
/// Read-only after startup, so one instance is shared by every connection.
pub struct RequestHandler {
    authenticator: MessageAuthenticator,
    dispatcher: CommandDispatcher,
}

impl RequestHandler {
    pub fn new(authenticator: MessageAuthenticator, dispatcher: CommandDispatcher) -> Self {
        Self {
            authenticator,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Handle one complete message. Nothing is dispatched unless the
    /// message authenticates.
    pub async fn handle(&self, message: &Message) -> Result<Response, ListenerError> {
        self.authenticator.validate(message).await?;
        self.dispatcher.dispatch(message.status()).await
    }
}
