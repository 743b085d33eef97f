//! Command dispatch for the listener
//!
//! This module handles:
//! - Decoding the status byte of an authenticated request
//! - Applying status changes to every registered backend in order
//! - Key rotation requests

mod dispatcher;

pub use dispatcher::CommandDispatcher;
