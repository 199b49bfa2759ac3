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

//! # CORRELATION LAYER
//! **Based on §4.2, §5**
//!
//! The pieces a concrete [Transport][crate::Transport] composes to
//! implement `send_and_wait`:
//!
//! - [Outbox] — a map from outgoing [Id] to a one-shot waiter, analogous to
//!   the teacher's `outbox: Mutex<HashMap<MessageID, SendOnce<Option<Message>>>>`.
//!   An entry exists for at most one in-flight request at a time (§3, I4)
//!   and is removed on delivery, on timeout, or when the transport closes.
//! - [ReceiveQueue] — the bounded FIFO that stashes uncorrelated messages
//!   arriving while a `send_and_wait` is in progress, so they remain
//!   observable by a later `receive` (§8, P4).
//!
//! Neither type talks to the network; both are plain, lock-guarded
//! collections meant to be embedded in a transport's own connection state,
//! the same way the teacher embeds its `outbox` field directly in
//! `semi_e37::generic::Client`.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::Error;
use crate::message::Id;

/// ## OUTBOX
///
/// Tracks requests awaiting a correlated response.
pub struct Outbox<M> {
  inner: Mutex<HashMap<Id, oneshot::Sender<M>>>,
}

impl<M> Default for Outbox<M> {
  fn default() -> Self {
    Self {
      inner: Mutex::new(HashMap::new()),
    }
  }
}

impl<M> Outbox<M> {
  /// Creates an empty outbox.
  pub fn new() -> Self {
    Self::default()
  }

  /// ### REGISTER
  ///
  /// Opens a new transaction for `id`, returning the receiving half of a
  /// one-shot channel that resolves when [Outbox::complete] is called
  /// with the same `id`, or that disconnects (resolves to an error) if
  /// the transaction is instead removed via [Outbox::cancel] or
  /// [Outbox::close_all].
  pub fn register(&self, id: Id) -> oneshot::Receiver<M> {
    let (sender, receiver) = oneshot::channel();
    self.inner.lock().unwrap().insert(id, sender);
    receiver
  }

  /// ### COMPLETE
  ///
  /// Finds the transaction matching `id` and delivers `message` to
  /// whichever call is blocked on it.
  ///
  /// Returns `true` if a waiting transaction was found (regardless of
  /// whether the waiter was still listening), `false` if `id` did not
  /// correspond to any open transaction — the caller is expected to
  /// reject the message in that case (protocol-specific "transaction not
  /// open").
  pub fn complete(&self, id: &Id, message: M) -> bool {
    match self.inner.lock().unwrap().remove(id) {
      Some(sender) => {
        let _ = sender.send(message);
        true
      }
      None => false,
    }
  }

  /// ### CANCEL
  ///
  /// Removes the transaction for `id` without delivering anything,
  /// dropping the sender so the waiting `send_and_wait` observes a
  /// disconnected channel. Used on timeout (§7, `Timeout`).
  pub fn cancel(&self, id: &Id) {
    self.inner.lock().unwrap().remove(id);
  }

  /// ### CLOSE ALL
  ///
  /// Drops every outstanding sender, unblocking every in-flight
  /// `send_and_wait` with a disconnected channel. Called when the owning
  /// transport closes (§3, I2 and I4).
  pub fn close_all(&self) {
    self.inner.lock().unwrap().clear();
  }

  /// Number of open transactions. Intended for tests and diagnostics.
  pub fn len(&self) -> usize {
    self.inner.lock().unwrap().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// ## RECEIVE QUEUE
/// **Based on §5 "Bounded queues and backpressure", §8 P6**
///
/// A bounded FIFO of messages that arrived while the caller's attention was
/// elsewhere (most commonly: while a `send_and_wait` was blocked on a
/// different correlation id).
pub struct ReceiveQueue<M> {
  capacity: usize,
  inner: Mutex<VecDeque<M>>,
}

impl<M> ReceiveQueue<M> {
  /// Creates an empty queue bounded at `capacity` entries.
  pub fn new(capacity: usize) -> Self {
    Self {
      capacity,
      inner: Mutex::new(VecDeque::with_capacity(capacity.min(256))),
    }
  }

  /// ### PUSH
  ///
  /// Appends `message` to the back of the queue.
  ///
  /// Fails with [Error::ReceiveQueueOverflow] without enqueuing anything
  /// if the queue is already at capacity — the reader is never blocked
  /// by a full queue (§5).
  pub fn push(&self, message: M) -> Result<(), Error> {
    let mut guard = self.inner.lock().unwrap();
    if guard.len() >= self.capacity {
      return Err(Error::ReceiveQueueOverflow(self.capacity));
    }
    guard.push_back(message);
    Ok(())
  }

  /// ### POP
  ///
  /// Removes and returns the oldest queued message, if any, preserving
  /// arrival order (§5 "Ordering guarantees").
  pub fn pop(&self) -> Option<M> {
    self.inner.lock().unwrap().pop_front()
  }

  pub fn len(&self) -> usize {
    self.inner.lock().unwrap().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn outbox_register_and_complete_roundtrip() {
    let outbox: Outbox<u32> = Outbox::new();
    let id = Id::new();
    let receiver = outbox.register(id);
    assert!(outbox.complete(&id, 42));
    assert_eq!(receiver.recv_timeout(Duration::from_secs(1)), Ok(42));
    assert!(outbox.is_empty());
  }

  #[test]
  fn outbox_complete_unknown_id_returns_false() {
    let outbox: Outbox<u32> = Outbox::new();
    assert!(!outbox.complete(&Id::new(), 1));
  }

  #[test]
  fn outbox_cancel_disconnects_waiter() {
    let outbox: Outbox<u32> = Outbox::new();
    let id = Id::new();
    let receiver = outbox.register(id);
    outbox.cancel(&id);
    assert!(receiver.recv_timeout(Duration::from_millis(100)).is_err());
    assert!(outbox.is_empty());
  }

  #[test]
  fn outbox_close_all_disconnects_every_waiter() {
    let outbox: Outbox<u32> = Outbox::new();
    let receivers: Vec<_> = (0..5).map(|_| outbox.register(Id::new())).collect();
    outbox.close_all();
    for receiver in receivers {
      assert!(receiver.recv_timeout(Duration::from_millis(100)).is_err());
    }
  }

  #[test]
  fn receive_queue_preserves_order() {
    let queue: ReceiveQueue<u32> = ReceiveQueue::new(10);
    queue.push(1).unwrap();
    queue.push(2).unwrap();
    queue.push(3).unwrap();
    assert_eq!(queue.pop(), Some(1));
    assert_eq!(queue.pop(), Some(2));
    assert_eq!(queue.pop(), Some(3));
    assert_eq!(queue.pop(), None);
  }

  #[test]
  fn receive_queue_overflow_rejects_without_enqueuing() {
    let queue: ReceiveQueue<u32> = ReceiveQueue::new(2);
    queue.push(1).unwrap();
    queue.push(2).unwrap();
    let err = queue.push(3).unwrap_err();
    assert!(matches!(err, Error::ReceiveQueueOverflow(2)));
    assert_eq!(queue.len(), 2);
  }
}
