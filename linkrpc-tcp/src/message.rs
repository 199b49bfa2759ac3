// Copyright © 2025 linkrpc contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

//! # WIRE MESSAGE
//!
//! Every message is framed as a 4-byte big-endian length, followed by a
//! fixed 33-byte header (mirroring the teacher's fixed-size
//! `MessageHeader`, just sized for a 128-bit [Id] instead of a 16-bit
//! session id), followed by an opaque payload:
//!
//! ```text
//! [ length: u32 BE ][ id: 16 bytes ][ has_correlation: u8 ][ correlates_to: 16 bytes ][ payload: .. ]
//! ```
//!
//! `length` covers everything after itself. `correlates_to` is all zero
//! and ignored when `has_correlation` is `0`.

use linkrpc_core::{Error, Id, Message};

/// Size of the fixed header, in bytes: 16 (id) + 1 (flag) + 16 (correlates_to).
pub const HEADER_LEN: usize = 33;

/// ## TCP MESSAGE
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpMessage {
  id: Id,
  correlates_to: Option<Id>,
  pub payload: Vec<u8>,
}

impl TcpMessage {
  /// Builds a fresh request message with a newly generated [Id].
  pub fn request(payload: Vec<u8>) -> Self {
    Self {
      id: Id::new(),
      correlates_to: None,
      payload,
    }
  }

  /// Builds a response correlated to `other`.
  pub fn response_to(other: &Self, payload: Vec<u8>) -> Self {
    Self {
      id: Id::new(),
      correlates_to: Some(other.message_id()),
      payload,
    }
  }

  /// Serializes this message, length prefix included.
  pub fn encode(&self) -> Vec<u8> {
    let length = (HEADER_LEN + self.payload.len()) as u32;
    let mut buffer = Vec::with_capacity(4 + HEADER_LEN + self.payload.len());
    buffer.extend_from_slice(&length.to_be_bytes());
    buffer.extend_from_slice(&self.id.to_bytes());
    match self.correlates_to {
      Some(id) => {
        buffer.push(1);
        buffer.extend_from_slice(&id.to_bytes());
      }
      None => {
        buffer.push(0);
        buffer.extend_from_slice(&[0; 16]);
      }
    }
    buffer.extend_from_slice(&self.payload);
    buffer
  }

  /// Parses the fixed header (not the length prefix, nor the payload,
  /// which the caller reads separately once it knows the length).
  pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<(Id, Option<Id>), Error> {
    let mut id_bytes = [0u8; 16];
    id_bytes.copy_from_slice(&header[0..16]);
    let id = Id::from_bytes(id_bytes);

    let has_correlation = header[16];
    let correlates_to = match has_correlation {
      0 => None,
      1 => {
        let mut correlation_bytes = [0u8; 16];
        correlation_bytes.copy_from_slice(&header[17..33]);
        Some(Id::from_bytes(correlation_bytes))
      }
      other => {
        return Err(Error::ProtocolError(format!(
          "invalid correlation flag byte {other}"
        )))
      }
    };
    Ok((id, correlates_to))
  }

  pub fn from_parts(id: Id, correlates_to: Option<Id>, payload: Vec<u8>) -> Self {
    Self {
      id,
      correlates_to,
      payload,
    }
  }

  /// The id this message claims to be a response to, if any. Used by
  /// the reader thread to route an arrival; not part of the public
  /// [Message] contract (only [Message::is_response_for] is).
  pub(crate) fn correlates_to(&self) -> Option<Id> {
    self.correlates_to
  }
}

impl Message for TcpMessage {
  fn message_id(&self) -> Id {
    self.id
  }

  fn is_response_for(&self, other: &Self) -> bool {
    self.correlates_to == Some(other.id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn request_roundtrips_through_header_and_payload() {
    let request = TcpMessage::request(b"hello".to_vec());
    let encoded = request.encode();

    let length = u32::from_be_bytes(encoded[0..4].try_into().unwrap()) as usize;
    assert_eq!(length, HEADER_LEN + 5);

    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&encoded[4..4 + HEADER_LEN]);
    let (id, correlates_to) = TcpMessage::decode_header(&header).unwrap();
    assert_eq!(id, request.message_id());
    assert_eq!(correlates_to, None);

    let payload = &encoded[4 + HEADER_LEN..];
    assert_eq!(payload, b"hello");
  }

  #[test]
  fn response_carries_correlation() {
    let request = TcpMessage::request(b"ask".to_vec());
    let response = TcpMessage::response_to(&request, b"answer".to_vec());
    assert!(response.is_response_for(&request));

    let encoded = response.encode();
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&encoded[4..4 + HEADER_LEN]);
    let (_, correlates_to) = TcpMessage::decode_header(&header).unwrap();
    assert_eq!(correlates_to, Some(request.message_id()));
  }
}
