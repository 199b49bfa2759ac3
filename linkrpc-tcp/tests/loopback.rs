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

//! Exercises [TcpTransport] against itself over a real loopback socket: one
//! thread accepts and echoes, the other connects and asks.

use std::thread;
use std::time::Duration;

use linkrpc_core::{Message, Transport};
use linkrpc_tcp::{ConnectionMode, TcpMessage, TcpTransport};

const ADDRESS: &str = "127.0.0.1:19371";

#[test]
fn round_trips_requests_over_a_real_socket() {
  let server = thread::spawn(|| {
    let transport =
      TcpTransport::connect(ADDRESS, ConnectionMode::Passive, Duration::from_secs(5), 64).unwrap();
    for _ in 0..3 {
      loop {
        match transport.receive(Duration::from_secs(5)).unwrap() {
          linkrpc_core::ReadOutcome::Received(request) => {
            let response = TcpMessage::response_to(&request, request.payload.clone());
            transport.send_and_forget(response).unwrap();
            break;
          }
          linkrpc_core::ReadOutcome::Nothing => continue,
          other => panic!("unexpected outcome: {other:?}"),
        }
      }
    }
    transport.close();
  });

  // Give the passive side a moment to start listening.
  thread::sleep(Duration::from_millis(100));

  let client = TcpTransport::connect(ADDRESS, ConnectionMode::Active, Duration::from_secs(5), 64).unwrap();
  for payload in [b"one".to_vec(), b"two".to_vec(), b"three".to_vec()] {
    let request = TcpMessage::request(payload.clone());
    let response = client.send_and_wait(request.clone(), Duration::from_secs(5)).unwrap();
    assert!(response.is_response_for(&request));
    assert_eq!(response.payload, payload);
  }
  client.close();

  server.join().unwrap();
}
