//! Message authentication: HMAC tag and freshness window

use super::KeyStore;
use crate::error::ListenerError;
use seclab_shared::{now_secs, Message};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Validates incoming messages against the current shared secret
pub struct MessageAuthenticator {
    keys: Arc<KeyStore>,
    max_age: Duration,
}

impl MessageAuthenticator {
    pub fn new(keys: Arc<KeyStore>, max_age: Duration) -> Self {
        Self { keys, max_age }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Validate `message` against the wall clock
    pub async fn validate(&self, message: &Message) -> Result<(), ListenerError> {
        self.validate_at(message, now_secs()).await
    }

    /// Validate `message` as if the current time were `now`.
    ///
    /// The tag is checked before the timestamp. A message is expired when it
    /// is strictly older than the maximum age. Timestamps from the future
    /// are accepted.
    pub async fn validate_at(&self, message: &Message, now: u64) -> Result<(), ListenerError> {
        let key = self
            .keys
            .read_secret()
            .await
            .map_err(ListenerError::KeyFile)?;

        if !message.verify(&key) {
            return Err(ListenerError::InvalidSignature);
        }

        let age = message.age_at(now);
        let max_age = self.max_age.as_secs();
        if age > i64::try_from(max_age).unwrap_or(i64::MAX) {
            return Err(ListenerError::Expired { age, max_age });
        }

        debug!("Message 0x{:02x} valid (age {}s)", message.status(), age);
        Ok(())
    }
}
