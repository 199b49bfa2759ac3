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

//! # LOOPBACK TEST DOUBLES
//!
//! Test-only transport and login handler used by this crate's own unit and
//! integration tests (the teacher ships no test server at all, so this is
//! a from-scratch, minimal stand-in for the in-memory test servers the
//! specification treats as an external collaborator — it never leaves
//! `#[cfg(test)]`).
//!
//! [LoopbackTransport] implements the full [Transport] contract without a
//! socket: `send_and_wait` "transmits" by invoking a `responder` closure
//! synchronously, which may hand back a correlated response, stash
//! unrelated messages on the receive queue (to model messages that arrive
//! out of order on a real wire), or do neither (to model a timeout).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::correlation::{Outbox, ReceiveQueue};
use crate::error::{Error, SimpleError};
use crate::handler::{ConnectResult, LoginHandler};
use crate::message::{Id, Message};
use crate::settings::Settings;
use crate::transport::{ReadOutcome, Transport};

/// A login request's payload is this prefix followed by the credential.
const LOGIN_PREFIX: &[u8] = b"LOGIN:";

/// ## LOOPBACK MESSAGE
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopbackMessage {
  id: Id,
  correlates_to: Option<Id>,
  pub payload: Vec<u8>,
}

impl LoopbackMessage {
  pub fn request(payload: Vec<u8>) -> Self {
    Self {
      id: Id::new(),
      correlates_to: None,
      payload,
    }
  }

  pub fn login(credential: &str) -> Self {
    let mut payload = LOGIN_PREFIX.to_vec();
    payload.extend_from_slice(credential.as_bytes());
    Self::request(payload)
  }

  pub fn response_to(other: &Self, payload: Vec<u8>) -> Self {
    Self {
      id: Id::new(),
      correlates_to: Some(other.message_id()),
      payload,
    }
  }
}

impl Message for LoopbackMessage {
  fn message_id(&self) -> Id {
    self.id
  }

  fn is_response_for(&self, other: &Self) -> bool {
    self.correlates_to == Some(other.id)
  }
}

/// What the simulated peer does in reaction to a single transmitted
/// message: optionally hand back a correlated response, and/or deposit
/// unrelated messages as if they had arrived out of order on the wire.
pub struct PeerReaction {
  pub response: Option<LoopbackMessage>,
  pub extra: Vec<LoopbackMessage>,
}

impl PeerReaction {
  pub fn respond(message: LoopbackMessage) -> Self {
    Self {
      response: Some(message),
      extra: Vec::new(),
    }
  }

  pub fn silence() -> Self {
    Self {
      response: None,
      extra: Vec::new(),
    }
  }
}

type Responder = Arc<dyn Fn(&LoopbackMessage) -> PeerReaction + Send + Sync>;

/// ## LOOPBACK TRANSPORT
///
/// An in-memory [Transport] for tests. No socket, no reader thread: the
/// "wire" is a synchronous call into a `responder` closure made from
/// within [LoopbackTransport::send]/[LoopbackTransport::send_and_wait]
/// themselves, which keeps test scenarios deterministic without needing to
/// coordinate a background thread for every case.
pub struct LoopbackTransport {
  outbox: Outbox<LoopbackMessage>,
  queue: ReceiveQueue<LoopbackMessage>,
  pending_responses: Mutex<VecDeque<(LoopbackMessage, LoopbackMessage)>>,
  responder: Responder,
  closed: AtomicBool,
}

impl LoopbackTransport {
  pub fn new(receive_queue_capacity: usize, responder: Responder) -> Self {
    Self {
      outbox: Outbox::new(),
      queue: ReceiveQueue::new(receive_queue_capacity),
      pending_responses: Mutex::new(VecDeque::new()),
      responder,
      closed: AtomicBool::new(false),
    }
  }

  /// A transport whose responder echoes every request's payload back as
  /// a correlated response, except login requests, which it always
  /// accepts.
  pub fn echo(receive_queue_capacity: usize) -> Self {
    Self::new(
      receive_queue_capacity,
      Arc::new(|request: &LoopbackMessage| {
        PeerReaction::respond(LoopbackMessage::response_to(request, request.payload.clone()))
      }),
    )
  }

  /// An already-[Handler::Connected][crate::handler::Handler::Connected]-worthy
  /// transport, for tests that don't care about its behavior.
  pub fn connected() -> Self {
    Self::echo(crate::settings::DEFAULT_RECEIVE_QUEUE_CAPACITY)
  }

  /// Directly deposits `message` on the receive queue, as if it had
  /// arrived out of order on the wire. Used by tests to stage P6/P4
  /// scenarios without threading it through a responder closure.
  pub fn stage_uncorrelated(&self, message: LoopbackMessage) -> Result<(), Error> {
    self.queue.push(message)
  }

  fn react(&self, message: &LoopbackMessage) -> Result<Option<LoopbackMessage>, Error> {
    let reaction = (self.responder)(message);
    for extra in reaction.extra {
      self.queue.push(extra)?;
    }
    Ok(reaction.response)
  }
}

impl Transport for LoopbackTransport {
  type Message = LoopbackMessage;

  fn receive(&self, timeout: Duration) -> Result<ReadOutcome<LoopbackMessage>, Error> {
    if self.is_closed() {
      return Err(Error::ClosedTransport);
    }
    if let Some((original, response)) = self.pending_responses.lock().unwrap().pop_front() {
      return Ok(ReadOutcome::Response(original, response));
    }
    let deadline = Instant::now() + timeout;
    loop {
      if let Some(message) = self.queue.pop() {
        return Ok(ReadOutcome::Received(message));
      }
      if Instant::now() >= deadline {
        return Ok(ReadOutcome::Nothing);
      }
      thread::sleep(Duration::from_millis(2).min(timeout.max(Duration::from_millis(1))));
    }
  }

  fn send(&self, message: LoopbackMessage) -> Result<(), Error> {
    if self.is_closed() {
      return Err(Error::ClosedTransport);
    }
    let original = message.clone();
    let id = message.message_id();
    let receiver = self.outbox.register(id);
    match self.react(&message) {
      Ok(Some(response)) => {
        self.outbox.complete(&id, response);
      }
      Ok(None) => {}
      Err(err) => {
        self.outbox.cancel(&id);
        return Err(err);
      }
    }
    if let Ok(response) = receiver.try_recv() {
      self.pending_responses.lock().unwrap().push_back((original, response));
    }
    Ok(())
  }

  fn send_and_forget(&self, message: LoopbackMessage) -> Result<(), Error> {
    if self.is_closed() {
      return Err(Error::ClosedTransport);
    }
    // No correlation is remembered; any response the peer computes is
    // simply dropped (§4.2, "dropped for response/reply-only transports").
    self.react(&message).map(|_| ())
  }

  fn send_and_wait(&self, message: LoopbackMessage, timeout: Duration) -> Result<LoopbackMessage, Error> {
    if self.is_closed() {
      return Err(Error::ClosedTransport);
    }
    let id = message.message_id();
    let receiver = self.outbox.register(id);
    match self.react(&message) {
      Ok(Some(response)) => {
        self.outbox.complete(&id, response);
      }
      Ok(None) => {}
      Err(err) => {
        self.outbox.cancel(&id);
        return Err(err);
      }
    }
    match receiver.recv_timeout(timeout) {
      Ok(response) => Ok(response),
      Err(_) => {
        self.outbox.cancel(&id);
        Err(Error::Timeout)
      }
    }
  }

  fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  fn close(&self) {
    if !self.closed.swap(true, Ordering::AcqRel) {
      self.outbox.close_all();
    }
  }
}

/// ## LOOPBACK PARAMS
#[derive(Clone, Debug)]
pub struct LoopbackParams {
  pub credential: String,
  pub settings: Settings,
  pub reachable: bool,
}

impl Default for LoopbackParams {
  fn default() -> Self {
    Self {
      credential: String::new(),
      settings: Settings::default(),
      reachable: true,
    }
  }
}

/// ## LOOPBACK LOGIN
///
/// A [LoginHandler] whose handshake accepts exactly one configured
/// credential, for exercising the success/failure/error branches of
/// `connect` (§4.3.1, §8 scenarios 1-3) without a real server.
pub struct LoopbackLogin {
  expected_credential: String,
}

impl LoopbackLogin {
  /// A login handler that accepts the credential `"secret"`.
  pub fn accepting() -> Self {
    Self::accepting_credential("secret")
  }

  pub fn accepting_credential(credential: impl Into<String>) -> Self {
    Self {
      expected_credential: credential.into(),
    }
  }
}

impl LoginHandler<LoopbackTransport> for LoopbackLogin {
  type Params = LoopbackParams;

  fn login(&self, params: &LoopbackParams) -> ConnectResult<LoopbackTransport> {
    if !params.reachable {
      return ConnectResult::Error(Error::transport(SimpleError::new(
        "loopback endpoint unreachable",
      )));
    }

    let expected = self.expected_credential.clone();
    let transport = LoopbackTransport::new(
      params.settings.receive_queue_capacity,
      Arc::new(move |request: &LoopbackMessage| {
        if let Some(credential) = request.payload.strip_prefix(LOGIN_PREFIX) {
          let ok = credential == expected.as_bytes();
          let payload = if ok { b"OK".to_vec() } else { b"DENY".to_vec() };
          PeerReaction::respond(LoopbackMessage::response_to(request, payload))
        } else {
          PeerReaction::respond(LoopbackMessage::response_to(request, request.payload.clone()))
        }
      }),
    );

    let login_request = LoopbackMessage::login(&params.credential);
    match transport.send_and_wait(login_request, params.settings.connect_timeout) {
      Ok(response) if response.payload == b"OK" => ConnectResult::Succeeded(response, transport),
      Ok(response) => {
        transport.close();
        ConnectResult::Failed(response)
      }
      Err(err) => {
        transport.close();
        ConnectResult::Error(err)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn echo_transport_correlates_response() {
    let transport = LoopbackTransport::echo(8);
    let request = LoopbackMessage::request(b"ping".to_vec());
    let response = transport.send_and_wait(request.clone(), Duration::from_secs(1)).unwrap();
    assert!(response.is_response_for(&request));
    assert_eq!(response.payload, b"ping");
  }

  #[test]
  fn silent_responder_times_out() {
    let transport = LoopbackTransport::new(4, Arc::new(|_| PeerReaction::silence()));
    let request = LoopbackMessage::request(b"ping".to_vec());
    let err = transport
      .send_and_wait(request, Duration::from_millis(20))
      .unwrap_err();
    assert!(matches!(err, Error::Timeout));
    assert!(transport.outbox.is_empty());
  }

  #[test]
  fn login_accepts_matching_credential() {
    let login = LoopbackLogin::accepting();
    let params = LoopbackParams {
      credential: "secret".into(),
      ..Default::default()
    };
    match login.login(&params) {
      ConnectResult::Succeeded(response, _transport) => assert_eq!(response.payload, b"OK"),
      _ => panic!("expected Succeeded"),
    }
  }

  #[test]
  fn login_rejects_wrong_credential() {
    let login = LoopbackLogin::accepting();
    let params = LoopbackParams {
      credential: "wrong".into(),
      ..Default::default()
    };
    match login.login(&params) {
      ConnectResult::Failed(response) => assert_eq!(response.payload, b"DENY"),
      _ => panic!("expected Failed"),
    }
  }

  #[test]
  fn login_errors_when_unreachable() {
    let login = LoopbackLogin::accepting();
    let params = LoopbackParams {
      reachable: false,
      ..Default::default()
    };
    assert!(matches!(login.login(&params), ConnectResult::Error(_)));
  }
}
