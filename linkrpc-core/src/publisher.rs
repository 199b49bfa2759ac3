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

//! # STATE PUBLICATION
//! **Based on §4.5, §9 "Publisher"**
//!
//! A minimal multicast hot stream: a vector of subscriber channels guarded
//! by a mutex, with the producer submitting to each non-full channel
//! non-blockingly. This is the shape the spec's own design notes call for,
//! and the one the teacher reaches for elsewhere in the codebase whenever
//! it needs to hand a stream of values to a caller (`std::sync::mpsc`
//! rather than an async broadcast crate).

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Mutex;

use crate::settings::DEFAULT_STATE_BUFFER;

/// ## PUBLISHER
/// **Based on §4.5**
///
/// A hot, multicast stream of `S` values. Every call to [Publisher::publish]
/// fans the value out to every live subscriber; subscribers created with
/// [Publisher::subscribe] only observe values published *after* they
/// subscribed (there is no replay buffer).
pub struct Publisher<S> {
  subscribers: Mutex<Vec<SyncSender<S>>>,
  buffer: usize,
}

impl<S: Clone> Publisher<S> {
  /// Creates a publisher whose subscriber channels are each bounded at
  /// [DEFAULT_STATE_BUFFER].
  pub fn new() -> Self {
    Self::with_buffer(DEFAULT_STATE_BUFFER)
  }

  /// Creates a publisher whose subscriber channels are each bounded at
  /// `buffer` entries.
  pub fn with_buffer(buffer: usize) -> Self {
    Self {
      subscribers: Mutex::new(Vec::new()),
      buffer: buffer.max(1),
    }
  }

  /// ### SUBSCRIBE
  ///
  /// Registers a new subscriber and returns the receiving half of its
  /// channel. The subscriber sees every subsequent [Publisher::publish]
  /// call, in order (§4.5 "Ordering").
  pub fn subscribe(&self) -> Receiver<S> {
    let (sender, receiver) = sync_channel(self.buffer);
    self.subscribers.lock().unwrap().push(sender);
    receiver
  }

  /// ### PUBLISH
  ///
  /// Fans `value` out to every live subscriber.
  ///
  /// Delivery is best-effort: a subscriber whose channel is full is
  /// skipped rather than blocking the producer (§4.5 "Delivery" —
  /// "slow subscribers do not delay producers"). A subscriber whose
  /// receiving half has been dropped is pruned from the subscriber
  /// list.
  pub fn publish(&self, value: S) {
    let mut subscribers = self.subscribers.lock().unwrap();
    subscribers.retain(|sender| match sender.try_send(value.clone()) {
      Ok(()) => true,
      Err(TrySendError::Full(_)) => true,
      Err(TrySendError::Disconnected(_)) => false,
    });
  }

  /// Number of currently-registered subscribers. Intended for tests and
  /// diagnostics; a subscriber is only pruned lazily, on the next
  /// [Publisher::publish] after it disconnects.
  pub fn subscriber_count(&self) -> usize {
    self.subscribers.lock().unwrap().len()
  }
}

impl<S: Clone> Default for Publisher<S> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn subscriber_sees_values_in_order() {
    let publisher: Publisher<u32> = Publisher::new();
    let receiver = publisher.subscribe();
    publisher.publish(1);
    publisher.publish(2);
    publisher.publish(3);
    assert_eq!(receiver.recv_timeout(Duration::from_secs(1)), Ok(1));
    assert_eq!(receiver.recv_timeout(Duration::from_secs(1)), Ok(2));
    assert_eq!(receiver.recv_timeout(Duration::from_secs(1)), Ok(3));
  }

  #[test]
  fn late_subscriber_misses_earlier_values() {
    let publisher: Publisher<u32> = Publisher::new();
    publisher.publish(1);
    let receiver = publisher.subscribe();
    publisher.publish(2);
    assert_eq!(receiver.recv_timeout(Duration::from_millis(100)), Ok(2));
  }

  #[test]
  fn full_subscriber_does_not_block_publish() {
    let publisher: Publisher<u32> = Publisher::with_buffer(1);
    let receiver = publisher.subscribe();
    publisher.publish(1);
    // Second publish would block a synchronous channel; it must not.
    publisher.publish(2);
    assert_eq!(receiver.recv_timeout(Duration::from_millis(100)), Ok(1));
  }

  #[test]
  fn dropped_subscriber_is_pruned() {
    let publisher: Publisher<u32> = Publisher::new();
    let receiver = publisher.subscribe();
    drop(receiver);
    publisher.publish(1);
    assert_eq!(publisher.subscriber_count(), 0);
  }
}
