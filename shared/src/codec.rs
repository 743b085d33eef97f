//! Fixed-layout codec for requests and responses
//!
//! Requests are always 41 bytes:
//! ```text
//! [ 1 byte: status ][ 8 bytes: timestamp (u64, big-endian) ][ 32 bytes: HMAC-SHA256 ]
//! ```
//!
//! The tag covers exactly the first 9 bytes. Responses are either the single
//! byte `0xff`, or a 41-byte new-key reply:
//! ```text
//! [ 1 byte: 0x55 ][ 8 bytes: timestamp (u64, big-endian) ][ 32 bytes: secret ]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::protocol::{
    KEY_LEN, MESSAGE_LEN, NEW_KEY_RESPONSE_LEN, PAYLOAD_LEN, RESP_ALL_GOOD, RESP_NEW_KEY,
    TAG_LEN,
};

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid message length: {0} bytes (expected: {MESSAGE_LEN})")]
    InvalidLength(usize),

    #[error("Unknown response marker: 0x{0:02x}")]
    UnknownResponse(u8),

    #[error("Key cannot be used for HMAC")]
    InvalidKey,
}

/// An authenticated request as it travels on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    status: u8,
    timestamp: u64,
    tag: [u8; TAG_LEN],
}

impl Message {
    /// Build and sign a message for `status` at `timestamp` with `key`
    pub fn sign(status: u8, timestamp: u64, key: &[u8]) -> Result<Self, CodecError> {
        let payload = payload_bytes(status, timestamp);
        let mut mac = HmacSha256::new_from_slice(key).map_err(|_| CodecError::InvalidKey)?;
        mac.update(&payload);

        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());

        Ok(Self {
            status,
            timestamp,
            tag,
        })
    }

    /// Split a received frame into its fields
    pub fn from_frame(frame: &[u8; MESSAGE_LEN]) -> Self {
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&frame[1..PAYLOAD_LEN]);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&frame[PAYLOAD_LEN..]);

        Self {
            status: frame[0],
            timestamp: u64::from_be_bytes(timestamp),
            tag,
        }
    }

    /// The command byte
    pub fn status(&self) -> u8 {
        self.status
    }

    /// The embedded Unix timestamp in seconds
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The bytes covered by the tag
    pub fn payload(&self) -> [u8; PAYLOAD_LEN] {
        payload_bytes(self.status, self.timestamp)
    }

    /// Check the tag against `key` in constant time
    pub fn verify(&self, key: &[u8]) -> bool {
        let mut mac = match HmacSha256::new_from_slice(key) {
            Ok(m) => m,
            Err(_) => return false,
        };
        mac.update(&self.payload());
        mac.verify_slice(&self.tag).is_ok()
    }

    /// Seconds elapsed between the embedded timestamp and `now`.
    ///
    /// The timestamp is read as a signed value, so a future-dated message
    /// yields a negative age.
    pub fn age_at(&self, now: u64) -> i64 {
        (now as i64).wrapping_sub(self.timestamp as i64)
    }

    /// Serialize to the 41-byte wire layout
    pub fn to_bytes(&self) -> [u8; MESSAGE_LEN] {
        let mut frame = [0u8; MESSAGE_LEN];
        frame[..PAYLOAD_LEN].copy_from_slice(&self.payload());
        frame[PAYLOAD_LEN..].copy_from_slice(&self.tag);
        frame
    }

    /// Serialize into a buffer ready to write
    pub fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&self.to_bytes())
    }
}

impl TryFrom<&[u8]> for Message {
    type Error = CodecError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let frame: &[u8; MESSAGE_LEN] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidLength(bytes.len()))?;
        Ok(Self::from_frame(frame))
    }
}

fn payload_bytes(status: u8, timestamp: u64) -> [u8; PAYLOAD_LEN] {
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[0] = status;
    payload[1..].copy_from_slice(&timestamp.to_be_bytes());
    payload
}

/// A reply from the listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The status command was applied on every backend
    AllGood,
    /// The shared secret was rotated
    NewKey {
        timestamp: u64,
        secret: [u8; KEY_LEN],
    },
}

impl Response {
    /// Serialize to the wire layout
    pub fn encode(&self) -> Bytes {
        match self {
            Response::AllGood => Bytes::from_static(&[RESP_ALL_GOOD]),
            Response::NewKey { timestamp, secret } => {
                let mut buf = BytesMut::with_capacity(NEW_KEY_RESPONSE_LEN);
                buf.put_u8(RESP_NEW_KEY);
                buf.put_u64(*timestamp);
                buf.put_slice(secret);
                buf.freeze()
            }
        }
    }
}

/// Try to decode a response from a buffer
///
/// Returns:
/// - `Ok(Some(response))` if a complete response was decoded
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the marker byte is unknown
pub fn decode_response(buf: &mut BytesMut) -> Result<Option<Response>, CodecError> {
    let Some(&marker) = buf.first() else {
        return Ok(None);
    };

    match marker {
        RESP_ALL_GOOD => {
            buf.advance(1);
            Ok(Some(Response::AllGood))
        }
        RESP_NEW_KEY => {
            if buf.len() < NEW_KEY_RESPONSE_LEN {
                return Ok(None);
            }
            buf.advance(1);
            let timestamp = buf.get_u64();
            let mut secret = [0u8; KEY_LEN];
            buf.copy_to_slice(&mut secret);
            Ok(Some(Response::NewKey { timestamp, secret }))
        }
        other => Err(CodecError::UnknownResponse(other)),
    }
}

/// Decoder state for reading responses off a stream
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    /// Partial response data being accumulated
    buffer: BytesMut,
}

impl ResponseDecoder {
    /// Create a new response decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(NEW_KEY_RESPONSE_LEN),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next response from the buffer
    pub fn decode_next(&mut self) -> Result<Option<Response>, CodecError> {
        decode_response(&mut self.buffer)
    }

    /// Get the current buffer length (for debugging)
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"dismykey";

    #[test]
    fn test_sign_layout() {
        let msg = Message::sign(0xff, 0x0102_0304_0506_0708, KEY).expect("sign failed");
        let frame = msg.to_bytes();

        assert_eq!(frame[0], 0xff);
        assert_eq!(&frame[1..9], &[1, 2, 3, 4, 5, 6, 7, 8]);

        let mut mac = HmacSha256::new_from_slice(KEY).expect("hmac key");
        mac.update(&frame[..9]);
        assert_eq!(&frame[9..], mac.finalize().into_bytes().as_slice());
    }

    #[test]
    fn test_from_frame_recovers_fields() {
        let msg = Message::sign(0xcc, 1_700_000_000, KEY).expect("sign failed");
        let parsed = Message::from_frame(&msg.to_bytes());
        assert_eq!(parsed, msg);
        assert_eq!(parsed.status(), 0xcc);
        assert_eq!(parsed.timestamp(), 1_700_000_000);
        assert!(parsed.verify(KEY));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let msg = Message::sign(0x00, 42, KEY).expect("sign failed");
        assert!(!msg.verify(b"notmykey"));
    }

    #[test]
    fn test_all_zero_frame_does_not_verify() {
        let msg = Message::from_frame(&[0u8; MESSAGE_LEN]);
        assert!(!msg.verify(KEY));
    }

    #[test]
    fn test_try_from_wrong_length() {
        let result = Message::try_from(&[0u8; 40][..]);
        assert_eq!(result, Err(CodecError::InvalidLength(40)));
    }

    #[test]
    fn test_age_at() {
        let msg = Message::sign(0xff, 1000, KEY).expect("sign failed");
        assert_eq!(msg.age_at(1010), 10);
        assert_eq!(msg.age_at(990), -10);
    }

    #[test]
    fn test_age_at_wraps_for_top_bit_timestamps() {
        // Just below zero when read signed: an old message
        let msg = Message::sign(0xff, u64::MAX, KEY).expect("sign failed");
        assert_eq!(msg.age_at(1000), 1001);

        // Near the signed minimum the subtraction wraps to a negative age
        let msg = Message::sign(0xff, 1 << 63, KEY).expect("sign failed");
        assert_eq!(msg.age_at(1000), i64::MIN + 1000);
    }

    #[test]
    fn test_all_good_encoding() {
        assert_eq!(&Response::AllGood.encode()[..], &[0xff]);
    }

    #[test]
    fn test_new_key_encoding() {
        let secret = [7u8; KEY_LEN];
        let encoded = Response::NewKey {
            timestamp: 5,
            secret,
        }
        .encode();

        assert_eq!(encoded.len(), NEW_KEY_RESPONSE_LEN);
        assert_eq!(encoded[0], 0x55);
        assert_eq!(&encoded[1..9], &5u64.to_be_bytes());
        assert_eq!(&encoded[9..], &secret);
    }

    #[test]
    fn test_partial_new_key_waits_for_more() {
        let encoded = Response::NewKey {
            timestamp: 9,
            secret: [1u8; KEY_LEN],
        }
        .encode();

        let mut decoder = ResponseDecoder::new();
        decoder.extend(&encoded[..20]);
        assert!(decoder.decode_next().expect("decode error").is_none());
        assert_eq!(decoder.buffer_len(), 20);

        decoder.extend(&encoded[20..]);
        let decoded = decoder
            .decode_next()
            .expect("decode error")
            .expect("should have response");
        assert_eq!(
            decoded,
            Response::NewKey {
                timestamp: 9,
                secret: [1u8; KEY_LEN]
            }
        );
        assert_eq!(decoder.buffer_len(), 0);
    }

    #[test]
    fn test_multiple_responses() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(&[0xff, 0xff]);

        assert_eq!(decoder.decode_next(), Ok(Some(Response::AllGood)));
        assert_eq!(decoder.decode_next(), Ok(Some(Response::AllGood)));
        assert_eq!(decoder.decode_next(), Ok(None));
    }

    #[test]
    fn test_unknown_response_marker() {
        let mut buf = BytesMut::from(&[0x12u8][..]);
        assert_eq!(
            decode_response(&mut buf),
            Err(CodecError::UnknownResponse(0x12))
        );
    }
}
