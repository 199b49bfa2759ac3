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

//! # ERROR TAXONOMY
//! **Based on §7**
//!
//! A single error type shared by [Transport][crate::Transport],
//! [Handler][crate::Handler], and [Client][crate::Client]. Concrete
//! transports carry their own I/O error type boxed inside
//! [Error::Transport] rather than forcing the core to depend on any one
//! of them.

use std::fmt;

/// The unified failure type returned by every fallible operation in this
/// crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// The client has entered `Closing` or `Closed`. Always fatal at the
  /// call site; the client never recovers from this on its own.
  #[error("client is closed")]
  ClosedClient,

  /// The operation requires a `Connected` handler, but the client is
  /// not currently connected. The caller may retry after `connect`.
  #[error("not connected")]
  NotConnected,

  /// `send_and_wait` exceeded its deadline. The pending correlation
  /// entry has been removed; the transport remains usable.
  #[error("operation timed out")]
  Timeout,

  /// The bounded receive queue rejected an out-of-order message because
  /// it was already holding `capacity` entries. Fatal for the current
  /// `send_and_wait`; the transport remains usable and the caller
  /// should drain it with `receive`.
  #[error("receive queue overflowed (capacity {0})")]
  ReceiveQueueOverflow(usize),

  /// The transport was already closed when the operation was attempted.
  #[error("transport is closed")]
  ClosedTransport,

  /// Cooperative cancellation: the caller's side of a blocking wait hung
  /// up before the operation could complete.
  #[error("operation was interrupted")]
  Interrupted,

  /// A response payload was received and decoded, but was semantically
  /// malformed (e.g. an unparseable login response).
  #[error("protocol error: {0}")]
  ProtocolError(String),

  /// `connect` was attempted on a handler that is already `Connected`.
  #[error("already connected")]
  AlreadyConnected,

  /// A transport-specific error, opaque to the core.
  #[error("transport error: {0}")]
  Transport(#[source] BoxError),
}

/// A type-erased, thread-safe error, used to carry a concrete transport's
/// own error type across the [Transport][crate::Transport] boundary
/// without the core depending on it.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
  /// Wraps an arbitrary transport error as [Error::Transport].
  pub fn transport<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Transport(Box::new(error))
  }
}

/// A minimal string-carrying error used by reference transports and tests
/// that do not warrant their own error enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleError(pub String);

impl fmt::Display for SimpleError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl std::error::Error for SimpleError {}

impl SimpleError {
  pub fn new(message: impl Into<String>) -> Self {
    Self(message.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transport_wraps_source_error() {
    let err = Error::transport(SimpleError::new("broken pipe"));
    assert_eq!(err.to_string(), "transport error: broken pipe");
  }

  #[test]
  fn overflow_carries_capacity() {
    let err = Error::ReceiveQueueOverflow(10);
    assert_eq!(err.to_string(), "receive queue overflowed (capacity 10)");
  }
}
