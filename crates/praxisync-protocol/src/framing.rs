//! Length-prefixed message framing for IPC.
//!
//! Messages are framed with a 4-byte big-endian length prefix followed by
//! the JSON payload:
//!
//! ```text
//! +----------------+------------------+
//! | length (4 BE)  |  JSON payload    |
//! +----------------+------------------+
//! ```

use std::io::Read;

use serde::{Serialize, de::DeserializeOwned};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

/// Encodes a message to bytes with length prefix.
///
/// Returns the complete framed message ready for transmission.
pub fn encode_message<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(message)?;
    let len = json.len() as u32;

    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buffer = Vec::with_capacity(4 + json.len());
    buffer.extend_from_slice(&len.to_be_bytes());
    buffer.extend_from_slice(&json);
    Ok(buffer)
}

/// Decodes a message from bytes with length prefix.
///
/// The input must be a complete framed message (length prefix + payload).
pub fn decode_message<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
    if data.len() < 4 {
        return Err(ProtocolError::IncompleteMessage {
            expected: 4,
            received: data.len(),
        });
    }

    let len_bytes: [u8; 4] = data[0..4].try_into().expect("slice length checked");
    let len = u32::from_be_bytes(len_bytes) as usize;

    if len > MAX_MESSAGE_SIZE as usize {
        return Err(ProtocolError::MessageTooLarge {
            size: len as u32,
            max: MAX_MESSAGE_SIZE,
        });
    }

    if data.len() < 4 + len {
        return Err(ProtocolError::IncompleteMessage {
            expected: 4 + len,
            received: data.len(),
        });
    }

    let json = &data[4..4 + len];
    let message = serde_json::from_slice(json)?;
    Ok(message)
}

/// Reads framed messages from a byte stream.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: Read> FrameReader<R> {
    /// Creates a new FrameReader wrapping the given reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads a single framed message.
    ///
    /// Returns `Ok(None)` on a clean EOF before any bytes were read.
    pub fn read_message<T: DeserializeOwned>(&mut self) -> ProtocolResult<Option<T>> {
        let mut len_buf = [0u8; 4];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_be_bytes(len_buf) as usize;

        if len == 0 {
            return Err(ProtocolError::EmptyMessage);
        }

        if len > MAX_MESSAGE_SIZE as usize {
            return Err(ProtocolError::MessageTooLarge {
                size: len as u32,
                max: MAX_MESSAGE_SIZE,
            });
        }

        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload)?;

        let message = serde_json::from_slice(&payload)?;
        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Envelope, Request};

    #[test]
    fn encode_decode_roundtrip() {
        let envelope = Envelope::request("req-1", Request::Ping);
        let bytes = encode_message(&envelope).unwrap();

        assert!(bytes.len() > 4);
        let len = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
        assert_eq!(len, bytes.len() - 4);

        let decoded: Envelope<Request> = decode_message(&bytes).unwrap();
        assert_eq!(decoded.request_id, "req-1");
        assert_eq!(decoded.payload, Request::Ping);
    }

    #[test]
    fn decode_rejects_short_input() {
        let result: ProtocolResult<Envelope<Request>> = decode_message(&[0, 0]);
        assert!(matches!(
            result,
            Err(ProtocolError::IncompleteMessage { .. })
        ));
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let envelope = Envelope::request("req-1", Request::Ping);
        let mut bytes = encode_message(&envelope).unwrap();
        bytes.truncate(bytes.len() - 3);

        let result: ProtocolResult<Envelope<Request>> = decode_message(&bytes);
        assert!(matches!(
            result,
            Err(ProtocolError::IncompleteMessage { .. })
        ));
    }

    #[test]
    fn decode_rejects_oversized_length() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(MAX_MESSAGE_SIZE + 1).to_be_bytes());
        bytes.extend_from_slice(b"{}");

        let result: ProtocolResult<Envelope<Request>> = decode_message(&bytes);
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
    }

    #[test]
    fn frame_reader_reads_sequential_messages() {
        let mut stream = Vec::new();
        stream.extend(encode_message(&Envelope::request("a", Request::Ping)).unwrap());
        stream.extend(encode_message(&Envelope::request("b", Request::Status)).unwrap());

        let mut reader = FrameReader::new(stream.as_slice());

        let first: Envelope<Request> = reader.read_message().unwrap().unwrap();
        assert_eq!(first.request_id, "a");

        let second: Envelope<Request> = reader.read_message().unwrap().unwrap();
        assert_eq!(second.request_id, "b");

        let done: Option<Envelope<Request>> = reader.read_message().unwrap();
        assert!(done.is_none());
    }

    #[test]
    fn frame_reader_rejects_empty_frame() {
        let stream = 0u32.to_be_bytes().to_vec();
        let mut reader = FrameReader::new(stream.as_slice());

        let result: ProtocolResult<Option<Envelope<Request>>> = reader.read_message();
        assert!(matches!(result, Err(ProtocolError::EmptyMessage)));
    }
}
