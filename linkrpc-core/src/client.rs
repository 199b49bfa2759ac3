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

//! # CLIENT
//! **Based on §4.4, §6, §8, §9**
//!
//! [Client] is the facade applications hold: it owns the current
//! [Handler], drives the connection lifecycle [State] machine, and
//! publishes every transition through a [Publisher]. Everything here is a
//! thin orchestration layer over [handler], [correlation], and
//! [publisher][crate::publisher] — the interesting invariants (bounded
//! queues, one correlation per id, non-blocking publish) already live
//! downstream of it.
//!
//! The state mutex and the handler lock are deliberately two different
//! locks (cf. the teacher's single `status: Mutex<ConnectionState>`):
//! a `send_and_wait` can block for the whole of `request_timeout` without
//! holding anything a concurrent `connect`/`disconnect`/`close` needs, and
//! vice versa. Only the brief bookkeeping around a transition — updating
//! `state` and swapping `handler` — ever takes a lock.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::error::Error;
use crate::handler::{ConnectResult, Handler, LoginHandler};
use crate::publisher::Publisher;
use crate::transport::{ReadOutcome, Transport};

/// ## CONNECTION FAILURE
/// **Based on §4.4, §6.2**
///
/// The detail carried by [State::ConnectionFailed]: either the server's
/// own rejection response, or the exception that prevented the handshake
/// from completing at all. Exactly one of the two is ever present.
#[derive(Clone, Debug)]
pub struct ConnectionFailure<M> {
  /// The login response, when the server was reachable and replied with
  /// a well-formed rejection.
  pub response: Option<M>,

  /// The exception that aborted the handshake (timeout, I/O error),
  /// when no response was ever received. Shared via [Arc] because the
  /// same value is also handed back to the caller of [Client::connect]
  /// and [Error] is not [Clone].
  pub exception: Option<Arc<Error>>,
}

/// ## STATE
/// **Based on §4.4, §6.1, §9 "Decision: sum-typed `State`"**
///
/// The full connection lifecycle, one variant per §6.1 state. `M` is the
/// transport's message type; `P` is the login handler's connection
/// parameters type.
#[derive(Clone, Debug)]
pub enum State<M, P> {
  /// No handshake is in progress and no transport is owned. The initial
  /// state, and the state re-entered after [Client::disconnect] or a
  /// failed [Client::connect].
  Disconnected,

  /// A [LoginHandler::login] call is in flight, carrying the parameters
  /// it was given.
  Connecting(P),

  /// The login handshake completed successfully; the handler has not
  /// yet been swapped to [Handler::Connected]. Transient — always
  /// immediately followed by [State::Connected] (§9, scenario 1).
  ConnectionSucceeded(M),

  /// Steady state: the handler is [Handler::Connected] and I/O methods
  /// delegate to its transport.
  Connected,

  /// The handshake failed, either with a server rejection or with an
  /// exception. The handler has reverted (or remained) [Handler::Disconnected].
  ConnectionFailed(ConnectionFailure<M>),

  /// [Client::close] has been called; teardown is in progress. No
  /// further `connect` may be attempted.
  Closing,

  /// Teardown is complete. Terminal: no further state is ever published
  /// after this one (§3, I3).
  Closed,
}

impl<M, P> State<M, P> {
  /// True for [State::Closing] and [State::Closed] (§3, I3's guard
  /// condition — `connect`/`disconnect` are rejected once either holds).
  pub fn is_closing_or_closed(&self) -> bool {
    matches!(self, State::Closing | State::Closed)
  }

  pub fn is_connected(&self) -> bool {
    matches!(self, State::Connected)
  }
}

/// ## CONNECT OUTCOME
/// **Based on §4.4, §6.2**
///
/// What [Client::connect] hands back, mirroring [ConnectResult] but
/// without exposing the transport (which the [Client] has already taken
/// ownership of).
#[derive(Clone, Debug)]
pub enum ConnectOutcome<M> {
  /// Login succeeded; the client is now [State::Connected]. Carries the
  /// server's response message.
  Succeeded(M),

  /// The server rejected the login. Carries its response message.
  Failed(M),

  /// The handshake could not complete. Shared via [Arc] for the same
  /// reason as [ConnectionFailure::exception].
  Error(Arc<Error>),
}

struct Shared<T: Transport, L: LoginHandler<T>> {
  login: L,
  state: Mutex<State<T::Message, L::Params>>,
  handler: RwLock<Arc<Handler<T>>>,
  publisher: Publisher<State<T::Message, L::Params>>,
}

/// ## CLIENT
/// **Based on §4.4**
///
/// The application-facing facade. Generic over a concrete [Transport] `T`
/// and the [LoginHandler] `L` that knows how to open one.
///
/// Cheap to clone (it is itself a handle around an [Arc]); every clone
/// drives the same underlying connection.
pub struct Client<T: Transport, L: LoginHandler<T>> {
  shared: Arc<Shared<T, L>>,
}

impl<T: Transport, L: LoginHandler<T>> Clone for Client<T, L> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T: Transport, L: LoginHandler<T>> Client<T, L> {
  /// Builds a new client in [State::Disconnected]. `login` supplies the
  /// protocol-specific handshake used by every [Client::connect] call.
  pub fn new(login: L) -> Self {
    Self {
      shared: Arc::new(Shared {
        login,
        state: Mutex::new(State::Disconnected),
        handler: RwLock::new(Arc::new(Handler::Disconnected)),
        publisher: Publisher::new(),
      }),
    }
  }

  /// The current lifecycle state, sampled once (§4.4 `state_now`).
  pub fn state_now(&self) -> State<T::Message, L::Params> {
    self.shared.state.lock().unwrap().clone()
  }

  /// Subscribes to every subsequent lifecycle transition (§4.4 `state`,
  /// §4.5). The subscriber does not observe transitions that happened
  /// before it subscribed; pair with [Client::state_now] to avoid
  /// missing the state in effect at subscribe time.
  pub fn state(&self) -> std::sync::mpsc::Receiver<State<T::Message, L::Params>> {
    self.shared.publisher.subscribe()
  }

  pub fn is_closed(&self) -> bool {
    matches!(self.state_now(), State::Closed)
  }

  fn current_handler(&self) -> Arc<Handler<T>> {
    let guard = self.shared.handler.read().unwrap();
    Arc::clone(&*guard)
  }

  /// Publishes `new_state` and records it as current, unless the client
  /// has already reached [State::Closed] — after which nothing further
  /// is ever published (§3, I3). Returns whether the transition was
  /// applied.
  fn set_state(&self, new_state: State<T::Message, L::Params>) -> bool {
    {
      let mut guard = self.shared.state.lock().unwrap();
      if matches!(*guard, State::Closed) {
        return false;
      }
      *guard = new_state.clone();
    }
    self.shared.publisher.publish(new_state);
    true
  }

  fn is_closing_or_closed(&self) -> bool {
    self.shared.state.lock().unwrap().is_closing_or_closed()
  }

  /// Tears the current handler down and reverts to [State::Disconnected],
  /// but only if there is anything connected to tear down. A no-op
  /// (no state published) when already [Handler::Disconnected] — this
  /// is what makes the first call inside [Client::connect] harmless on
  /// the very first connection attempt (§8, scenario 5).
  fn disconnect_quiet(&self) {
    let handler = self.current_handler();
    if handler.is_disconnected() {
      return;
    }
    handler.close();
    *self.shared.handler.write().unwrap() = Arc::new(Handler::Disconnected);
    self.set_state(State::Disconnected);
  }

  /// Reverts a [Error::ClosedTransport] failure by dropping the current
  /// handler back to [Handler::Disconnected] (§7 "the client moves the
  /// handler back to `Disconnected` on next operation attempt").
  fn note_possible_transport_closure(&self, error: &Error) {
    if matches!(error, Error::ClosedTransport) {
      warn!("transport reported closed; reverting to disconnected");
      self.disconnect_quiet();
    }
  }

  /// ### CONNECT
  /// **Based on §4.3.2, §6.2, §8 scenarios 1-3, 5**
  ///
  /// Disconnects any existing connection, then attempts a fresh login
  /// via the configured [LoginHandler]. Publishes, in order:
  /// [State::Disconnected] (only if a prior connection was torn down),
  /// [State::Connecting], and finally one of
  /// [State::ConnectionSucceeded] + [State::Connected], or
  /// [State::ConnectionFailed].
  ///
  /// Returns [Error::ClosedClient] immediately, without touching the
  /// handler, once the client has reached [State::Closing] or
  /// [State::Closed].
  #[instrument(skip(self, params))]
  pub fn connect(&self, params: L::Params) -> Result<ConnectOutcome<T::Message>, Error> {
    // CLOSED GUARD
    //
    // Once the client has entered Closing or Closed, no further lifecycle
    // operation is permitted; the handler is never touched past this point.
    if self.is_closing_or_closed() {
      return Err(Error::ClosedClient);
    }

    // DISCONNECT ANY PRIOR CONNECTION
    //
    // This is what lets connect be called twice in a row: if a transport is
    // already owned, it is torn down and Disconnected is published before we
    // ever announce Connecting. A fresh client has nothing to disconnect, so
    // this is silent on the very first attempt.
    self.disconnect_quiet();
    self.set_state(State::Connecting(params.clone()));

    // ATTEMPT THE HANDSHAKE
    //
    // The current handler is always Disconnected here (do_connect on an
    // already-Connected handler would fail with AlreadyConnected, but that
    // cannot happen immediately after disconnect_quiet). Delegate the actual
    // login negotiation to the configured LoginHandler.
    let handler = self.current_handler();
    match handler.do_connect(&self.shared.login, &params) {
      // SUCCEEDED
      //
      // Swap in the new Connected handler before publishing anything, so a
      // subscriber that reacts to ConnectionSucceeded by sending a request
      // never races the handler replacement.
      ConnectResult::Succeeded(response, transport) => {
        *self.shared.handler.write().unwrap() = Arc::new(Handler::Connected(Arc::new(transport)));
        self.set_state(State::ConnectionSucceeded(response.clone()));
        self.set_state(State::Connected);
        debug!("connected");
        Ok(ConnectOutcome::Succeeded(response))
      }
      // FAILED
      //
      // The server replied, but rejected the login (or the reply was
      // malformed); the handler was already reverted to Disconnected by the
      // LoginHandler, which also closed its own transport.
      ConnectResult::Failed(response) => {
        self.set_state(State::ConnectionFailed(ConnectionFailure {
          response: Some(response.clone()),
          exception: None,
        }));
        warn!("login rejected");
        Ok(ConnectOutcome::Failed(response))
      }
      // ERROR
      //
      // The handshake never produced a response at all: a timeout or an I/O
      // exception. Wrapped in Arc since the same cause is both published and
      // handed back to the caller, and Error itself is not Clone.
      ConnectResult::Error(error) => {
        let error = Arc::new(error);
        self.set_state(State::ConnectionFailed(ConnectionFailure {
          response: None,
          exception: Some(Arc::clone(&error)),
        }));
        warn!(%error, "login failed");
        Ok(ConnectOutcome::Error(error))
      }
    }
  }

  /// ### DISCONNECT
  /// **Based on §4.4, §8 scenario 5**
  ///
  /// Idempotent: returns `Ok(())` immediately if already disconnected.
  /// Fails with [Error::ClosedClient] once closing or closed.
  pub fn disconnect(&self) -> Result<(), Error> {
    if self.is_closing_or_closed() {
      return Err(Error::ClosedClient);
    }
    self.disconnect_quiet();
    Ok(())
  }

  /// ### SEND
  ///
  /// Delegates to the current handler. Fails with [Error::ClosedClient]
  /// if closing or closed, [Error::NotConnected] if disconnected.
  pub fn send(&self, message: T::Message) -> Result<(), Error> {
    if self.is_closing_or_closed() {
      return Err(Error::ClosedClient);
    }
    let result = self.current_handler().send(message);
    if let Err(ref error) = result {
      self.note_possible_transport_closure(error);
    }
    result
  }

  /// ### SEND AND FORGET
  pub fn send_and_forget(&self, message: T::Message) -> Result<(), Error> {
    if self.is_closing_or_closed() {
      return Err(Error::ClosedClient);
    }
    let result = self.current_handler().send_and_forget(message);
    if let Err(ref error) = result {
      self.note_possible_transport_closure(error);
    }
    result
  }

  /// ### SEND AND WAIT
  /// **Based on §8 scenarios 3, 4, 6**
  ///
  /// Blocks up to `timeout` for the correlated response. Holds no
  /// client-level lock while blocked: a concurrent [Client::disconnect]
  /// or [Client::close] can proceed, which will in turn disconnect the
  /// transport this call is waiting on and surface as
  /// [Error::ClosedTransport] or [Error::Timeout].
  pub fn send_and_wait(&self, message: T::Message, timeout: Duration) -> Result<T::Message, Error> {
    if self.is_closing_or_closed() {
      return Err(Error::ClosedClient);
    }
    let result = self.current_handler().send_and_wait(message, timeout);
    if let Err(ref error) = result {
      self.note_possible_transport_closure(error);
    }
    result
  }

  /// ### RECEIVE
  ///
  /// Polls the current handler once for an arrival, blocking up to
  /// `timeout`.
  pub fn receive(&self, timeout: Duration) -> Result<ReadOutcome<T::Message>, Error> {
    if self.is_closing_or_closed() {
      return Err(Error::ClosedClient);
    }
    let result = self.current_handler().receive(timeout);
    if let Err(ref error) = result {
      self.note_possible_transport_closure(error);
    }
    result
  }

  /// ### CLOSE
  /// **Based on §4.4, §8 scenario 7, P5, P7**
  ///
  /// Permanently tears the client down: publishes [State::Closing],
  /// closes the current transport (if any), then publishes
  /// [State::Closed]. Idempotent — a second call observes the guard at
  /// the top and does nothing.
  pub fn close(&self) {
    // IDEMPOTENT GUARD
    //
    // Held only long enough to check and set; close must never publish
    // Closing twice for one client, even if called concurrently from two
    // threads.
    {
      let mut guard = self.shared.state.lock().unwrap();
      if guard.is_closing_or_closed() {
        return;
      }
      *guard = State::Closing;
    }
    self.shared.publisher.publish(State::Closing);

    // TEAR DOWN THE HANDLER
    //
    // Closes whatever transport is currently owned (a no-op if already
    // Disconnected) and replaces it, so no later send/receive can reach a
    // transport this client has given up on.
    self.current_handler().close();
    *self.shared.handler.write().unwrap() = Arc::new(Handler::Disconnected);

    // FINAL STATE
    {
      let mut guard = self.shared.state.lock().unwrap();
      *guard = State::Closed;
    }
    self.shared.publisher.publish(State::Closed);
    debug!("closed");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::settings::Settings;
  use crate::testing::{LoopbackLogin, LoopbackMessage, LoopbackParams};
  use std::time::Duration;

  fn client() -> Client<crate::testing::LoopbackTransport, LoopbackLogin> {
    Client::new(LoopbackLogin::accepting())
  }

  fn params(credential: &str) -> LoopbackParams {
    LoopbackParams {
      credential: credential.into(),
      settings: Settings::default(),
      reachable: true,
    }
  }

  #[test]
  fn fresh_client_is_disconnected() {
    let client = client();
    assert!(matches!(client.state_now(), State::Disconnected));
  }

  #[test]
  fn successful_connect_publishes_connecting_succeeded_connected() {
    let client = client();
    let states = client.state();

    match client.connect(params("secret")).unwrap() {
      ConnectOutcome::Succeeded(response) => assert_eq!(response.payload, b"OK"),
      other => panic!("expected Succeeded, got {other:?}"),
    }

    assert!(matches!(states.recv_timeout(Duration::from_secs(1)).unwrap(), State::Connecting(_)));
    assert!(matches!(
      states.recv_timeout(Duration::from_secs(1)).unwrap(),
      State::ConnectionSucceeded(_)
    ));
    assert!(matches!(states.recv_timeout(Duration::from_secs(1)).unwrap(), State::Connected));
    assert!(matches!(client.state_now(), State::Connected));
  }

  #[test]
  fn rejected_credential_publishes_connection_failed() {
    let client = client();
    let states = client.state();

    match client.connect(params("wrong")).unwrap() {
      ConnectOutcome::Failed(response) => assert_eq!(response.payload, b"DENY"),
      other => panic!("expected Failed, got {other:?}"),
    }

    assert!(matches!(states.recv_timeout(Duration::from_secs(1)).unwrap(), State::Connecting(_)));
    match states.recv_timeout(Duration::from_secs(1)).unwrap() {
      State::ConnectionFailed(failure) => {
        assert!(failure.response.is_some());
        assert!(failure.exception.is_none());
      }
      other => panic!("expected ConnectionFailed, got {other:?}"),
    }
    assert!(matches!(client.state_now(), State::ConnectionFailed(_)));
  }

  #[test]
  fn unreachable_endpoint_publishes_connection_failed_with_exception() {
    let client = client();
    let mut p = params("secret");
    p.reachable = false;

    match client.connect(p).unwrap() {
      ConnectOutcome::Error(_) => {}
      other => panic!("expected Error, got {other:?}"),
    }

    match client.state_now() {
      State::ConnectionFailed(failure) => {
        assert!(failure.exception.is_some());
        assert!(failure.response.is_none());
      }
      other => panic!("expected ConnectionFailed, got {other:?}"),
    }
  }

  #[test]
  fn connected_client_round_trips_requests() {
    let client = client();
    client.connect(params("secret")).unwrap();

    for payload in [b"ping".to_vec(), b"pong".to_vec(), b"hi".to_vec()] {
      let request = LoopbackMessage::request(payload.clone());
      let response = client.send_and_wait(request.clone(), Duration::from_secs(1)).unwrap();
      assert!(response.is_response_for(&request));
      assert_eq!(response.payload, payload);
    }
  }

  #[test]
  fn io_while_disconnected_fails_not_connected() {
    let client = client();
    assert!(matches!(
      client.send_and_wait(LoopbackMessage::request(b"ping".to_vec()), Duration::from_millis(50)),
      Err(Error::NotConnected)
    ));
  }

  #[test]
  fn reconnect_while_connected_publishes_disconnected_between_attempts() {
    let client = client();
    client.connect(params("secret")).unwrap();
    let states = client.state();

    client.connect(params("secret")).unwrap();

    let sequence: Vec<_> = std::iter::from_fn(|| states.recv_timeout(Duration::from_secs(1)).ok())
      .take(4)
      .collect();
    assert!(matches!(sequence[0], State::Disconnected));
    assert!(matches!(sequence[1], State::Connecting(_)));
    assert!(matches!(sequence[2], State::ConnectionSucceeded(_)));
    assert!(matches!(sequence[3], State::Connected));
  }

  #[test]
  fn close_is_idempotent_and_terminal() {
    let client = client();
    client.connect(params("secret")).unwrap();
    let states = client.state();

    client.close();
    client.close();

    assert!(matches!(states.recv_timeout(Duration::from_secs(1)).unwrap(), State::Closing));
    assert!(matches!(states.recv_timeout(Duration::from_secs(1)).unwrap(), State::Closed));
    assert!(states.recv_timeout(Duration::from_millis(50)).is_err());
    assert!(client.is_closed());

    assert!(matches!(client.connect(params("secret")), Err(Error::ClosedClient)));
    assert!(matches!(client.disconnect(), Err(Error::ClosedClient)));
    assert!(matches!(
      client.send_and_wait(LoopbackMessage::request(b"ping".to_vec()), Duration::from_millis(10)),
      Err(Error::ClosedClient)
    ));
  }

  #[test]
  fn out_of_order_arrival_survives_a_concurrent_wait() {
    let client = client();
    client.connect(params("secret")).unwrap();

    // Stage an uncorrelated arrival directly on the connected
    // transport's receive queue, simulating something that showed up
    // on the wire while unrelated to the next ask.
    if let Handler::Connected(transport) = &*client.current_handler() {
      transport
        .stage_uncorrelated(LoopbackMessage::request(b"event".to_vec()))
        .unwrap();
    } else {
      panic!("expected Connected");
    }

    let request = LoopbackMessage::request(b"ping".to_vec());
    let response = client.send_and_wait(request.clone(), Duration::from_secs(1)).unwrap();
    assert!(response.is_response_for(&request));

    match client.receive(Duration::from_millis(50)).unwrap() {
      ReadOutcome::Received(message) => assert_eq!(message.payload, b"event"),
      other => panic!("expected Received, got {other:?}"),
    }
  }
}
