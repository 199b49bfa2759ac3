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

//! # SETTINGS
//!
//! The handful of knobs that are common to every concrete transport, kept
//! here so the [Client][crate::Client] and [correlation][crate::correlation]
//! layers never need to know a transport's own `ConnectionParameters` type.
//!
//! Mirrors the shape of the teacher's `ParameterSettings`, narrowed to the
//! subset this transport-agnostic core actually consumes (a concrete
//! transport's own parameters type is expected to carry a [Settings] value
//! alongside whatever else it needs — an address, credentials, and so on).

use std::time::Duration;

/// ### DEFAULT STATE BUFFER
///
/// The bounded capacity given to each [Publisher][crate::Publisher]
/// subscriber channel when none is specified. This is the "buffer of the
/// platform default size" referred to in §4.5.
pub const DEFAULT_STATE_BUFFER: usize = 16;

/// ### DEFAULT RECEIVE QUEUE CAPACITY
///
/// The default bound on the number of out-of-order messages a
/// [send_and_wait][crate::Transport::send_and_wait] call will buffer before
/// failing with [ReceiveQueueOverflow][crate::Error::ReceiveQueueOverflow].
pub const DEFAULT_RECEIVE_QUEUE_CAPACITY: usize = 64;

/// ## SETTINGS
///
/// Shared timing and capacity parameters. A concrete
/// `ConnectionParameters` implementation is expected to expose one of
/// these via a `settings()` accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
  /// Upper bound on how long the [Disconnected handler][crate::handler::Handler::Disconnected]
  /// will wait for the login handshake to complete.
  pub connect_timeout: Duration,

  /// Default upper bound applied to an ordinary `send_and_wait` ask, when
  /// the caller does not supply one explicitly.
  pub request_timeout: Duration,

  /// Capacity of the bounded out-of-order receive queue maintained by
  /// `send_and_wait` (see [crate::correlation::ReceiveQueue]).
  pub receive_queue_capacity: usize,
}

impl Default for Settings {
  /// Five-second connect and request timeouts, a 64-entry receive queue —
  /// reasonable defaults for a LAN-speed RPC link.
  fn default() -> Self {
    Self {
      connect_timeout: Duration::from_secs(5),
      request_timeout: Duration::from_secs(5),
      receive_queue_capacity: DEFAULT_RECEIVE_QUEUE_CAPACITY,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_sane() {
    let settings = Settings::default();
    assert!(settings.connect_timeout > Duration::ZERO);
    assert!(settings.receive_queue_capacity > 0);
  }
}
