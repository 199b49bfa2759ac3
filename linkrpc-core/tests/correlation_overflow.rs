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

//! A full receive queue is fatal for whichever `send_and_wait` call is in
//! flight when the overflow happens, even though the overflowing message
//! itself has nothing to do with that call.

use std::sync::Arc;
use std::time::Duration;

use linkrpc_core::testing::{LoopbackMessage, LoopbackTransport, PeerReaction};
use linkrpc_core::{Error, Transport};

#[test]
fn arrivals_that_overflow_the_queue_fail_the_in_flight_wait() {
  let capacity = 4;
  let transport = LoopbackTransport::new(
    capacity,
    Arc::new(move |request: &LoopbackMessage| PeerReaction {
      response: Some(LoopbackMessage::response_to(request, b"too-late".to_vec())),
      // One more unrelated arrival than the queue can hold.
      extra: (0..capacity + 1)
        .map(|i| LoopbackMessage::request(vec![i as u8]))
        .collect(),
    }),
  );

  let request = LoopbackMessage::request(b"ask".to_vec());
  let error = transport
    .send_and_wait(request, Duration::from_secs(1))
    .expect_err("overflow should fail the wait");
  assert!(matches!(error, Error::ReceiveQueueOverflow(cap) if cap == capacity));

  // The queue held exactly `capacity` of the staged arrivals; the
  // (capacity+1)-th is what tripped the overflow and was never enqueued.
  for i in 0..capacity {
    match transport.receive(Duration::from_millis(50)).unwrap() {
      linkrpc_core::ReadOutcome::Received(message) => assert_eq!(message.payload, vec![i as u8]),
      other => panic!("expected Received, got {other:?}"),
    }
  }
}
