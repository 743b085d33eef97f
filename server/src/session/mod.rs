//! Connection handling for the listener
//!
//! This module handles:
//! - Accepting connections on the Unix socket
//! - Reading consecutive fixed-size messages per connection
//! - Authenticating and dispatching each message, writing the response
//! - Logging and reporting the error that ends a connection

mod connection;
mod handler;
mod listener;

pub use connection::Session;
pub use handler::RequestHandler;
pub use listener::Listener;
