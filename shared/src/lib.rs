//! Seclab Shared Protocol Types
//!
//! This crate provides the wire protocol shared by the status listener and
//! the signing client: command codes, the fixed-layout authenticated message,
//! and the response codec.

pub mod codec;
pub mod command;

use std::time::{SystemTime, UNIX_EPOCH};

pub use codec::{CodecError, Message, Response, ResponseDecoder};
pub use command::Command;

/// Get current timestamp in seconds since Unix epoch
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Wire protocol constants
pub mod protocol {
    /// Length of the status byte plus the big-endian timestamp
    pub const PAYLOAD_LEN: usize = 9;

    /// Length of an HMAC-SHA256 tag
    pub const TAG_LEN: usize = 32;

    /// Total length of a request message
    pub const MESSAGE_LEN: usize = PAYLOAD_LEN + TAG_LEN;

    /// Length of a secret generated by key rotation
    pub const KEY_LEN: usize = 32;

    /// Total length of a new-key response
    pub const NEW_KEY_RESPONSE_LEN: usize = PAYLOAD_LEN + KEY_LEN;

    /// Response byte for a successfully applied status command
    pub const RESP_ALL_GOOD: u8 = 0xff;

    /// Marker byte that opens a new-key response
    pub const RESP_NEW_KEY: u8 = 0x55;

    /// Maximum age of a request before it is rejected
    pub const DEFAULT_MAX_AGE_SECS: u64 = 10;
}
