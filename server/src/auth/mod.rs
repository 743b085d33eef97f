//! Request authentication
//!
//! This module handles:
//! - Reading and rotating the shared secret in the key file
//! - Checking message tags and the replay window

mod authenticator;
mod keystore;

pub use authenticator::MessageAuthenticator;
pub use keystore::KeyStore;
