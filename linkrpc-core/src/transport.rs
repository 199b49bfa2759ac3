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

//! # TRANSPORT
//! **Based on §4.2**
//!
//! The lowest layer of the runtime: byte-level I/O, polymorphic over the
//! capability set `receive`/`send`/`send_and_forget`/`send_and_wait`/
//! `is_closed`/`close`.
//!
//! A concrete transport (TCP, UDP, HTTP, an in-memory stub for tests) binds
//! [Transport::Message] to a protocol-specific message type and implements
//! framing, wire correlation, and reconnection-adjacent teardown however
//! it likes — this trait only fixes the external contract.

use std::time::Duration;

use crate::error::Error;
use crate::message::Message;

/// ## READ OUTCOME
/// **Based on §3 "Read outcome"**
///
/// The result of a single [Transport::receive] call.
#[derive(Clone, Debug)]
pub enum ReadOutcome<M> {
  /// The timeout elapsed with no data available.
  Nothing,

  /// An uncorrelated message arrived. A transport that cannot or does
  /// not attempt correlation is always free to report every arrival
  /// this way — richer correlation is an optimization, not a
  /// requirement (§3).
  Received(M),

  /// A message arrived that the transport was able to correlate to a
  /// previously-sent `original`.
  Response(M, M),
}

impl<M> ReadOutcome<M> {
  pub fn is_nothing(&self) -> bool {
    matches!(self, ReadOutcome::Nothing)
  }
}

/// ## TRANSPORT
/// **Based on §4.2, §6.2**
///
/// The byte-level I/O contract every concrete wire protocol must
/// implement. A closed transport is permanent: every method fails once
/// [Transport::is_closed] would return `true`.
pub trait Transport: Send + Sync {
  /// The protocol-specific message type this transport exchanges.
  type Message: Message;

  /// ### RECEIVE
  ///
  /// Blocks up to `timeout` for an arrival. Returns
  /// [ReadOutcome::Nothing] on timeout, never an error, *unless* the
  /// transport is already closed, in which case this fails with
  /// [Error::ClosedTransport].
  ///
  /// Safe to call concurrently with [Transport::send] and
  /// [Transport::send_and_forget] from another thread (§5).
  fn receive(&self, timeout: Duration) -> Result<ReadOutcome<Self::Message>, Error>;

  /// ### SEND
  ///
  /// Dispatches `message` and remembers the pairing so that a later
  /// arrival correlated to it may be reported as
  /// [ReadOutcome::Response]. Does not block waiting for a response.
  ///
  /// Closes the transport on an unrecoverable write error.
  fn send(&self, message: Self::Message) -> Result<(), Error>;

  /// ### SEND AND FORGET
  ///
  /// Dispatches `message` without remembering it for correlation; any
  /// response that later arrives is surfaced as
  /// [ReadOutcome::Received] (or silently dropped by a reply-only
  /// transport).
  fn send_and_forget(&self, message: Self::Message) -> Result<(), Error>;

  /// ### SEND AND WAIT
  ///
  /// Dispatches `message`, then blocks until a correlated response
  /// arrives or `timeout` elapses.
  ///
  /// Messages that arrive out of order while this call is blocked are
  /// preserved for a later [Transport::receive] (§8, P4), not dropped.
  ///
  /// Fails with [Error::Timeout], [Error::ClosedTransport], or a
  /// transport-specific error wrapped in [Error::Transport].
  fn send_and_wait(
    &self,
    message: Self::Message,
    timeout: Duration,
  ) -> Result<Self::Message, Error>;

  /// Returns `true` once this transport has been permanently torn down.
  fn is_closed(&self) -> bool;

  /// Idempotent teardown. Safe to call more than once or from multiple
  /// threads; only the first call has an effect.
  fn close(&self);
}
