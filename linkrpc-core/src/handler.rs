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

//! # HANDLER
//! **Based on §4.3**
//!
//! A [Handler] is the component that owns a [Transport] and implements the
//! current lifecycle step. It has exactly two variants,
//! [Handler::Disconnected] and [Handler::Connected]; a successful
//! [LoginHandler::login] replaces the former with the latter as a single
//! atomic swap performed by the [Client][crate::Client] (§9 "Handler
//! replacement as state transition").
//!
//! This mirrors the teacher's own `primitive::ConnectionState` /
//! `generic::Client` split, but inverts where the type boundary falls: the
//! teacher has one `Client` struct whose internal `ConnectionState` enum
//! holds or doesn't hold a `TcpStream`. Here the *handler itself* is the
//! enum, so that `send`/`receive`/... are implemented once, generically,
//! by matching on it, and "not connected" is a real variant rather than an
//! internal `Err` path threaded through every method body.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::transport::{ReadOutcome, Transport};

/// ## CONNECT RESULT
/// **Based on §4.3**
///
/// The outcome of [LoginHandler::login].
pub enum ConnectResult<T: Transport> {
  /// Login succeeded. Carries the server's response message and the
  /// now-connected transport, which becomes the [Client][crate::Client]'s
  /// new [Handler::Connected].
  Succeeded(T::Message, T),

  /// The server rejected the login (a well-formed failure response, or a
  /// malformed one). The transport has already been closed by the
  /// [LoginHandler].
  Failed(T::Message),

  /// The handshake could not complete: a timeout or I/O error occurred.
  /// The transport has already been closed by the [LoginHandler].
  Error(Error),
}

/// ## LOGIN HANDLER
/// **Based on §4.3.1**
///
/// The pluggable part of the disconnected-to-connected handshake: opening
/// a fresh transport from `params` and performing the login exchange.
/// A concrete implementation (e.g. `linkrpc-tcp`'s TCP-framed login) knows
/// how to build a transport and what a "login-OK" response looks like;
/// this crate knows only how to sequence the attempt and publish the
/// resulting states.
pub trait LoginHandler<T: Transport>: Send + Sync {
  /// Opaque connection parameters, passed through unexamined by the
  /// core (§3 "Connection parameters").
  type Params: Clone + Send + Sync + 'static;

  /// ### LOGIN
  ///
  /// 1. Opens a fresh transport configured from `params`.
  /// 2. Issues a login message through `send_and_wait` with
  ///    `params`'s connect timeout.
  /// 3. Pattern-matches the response into [ConnectResult::Succeeded] or
  ///    [ConnectResult::Failed], closing the transport on the failure
  ///    path.
  /// 4. On timeout or I/O exception during the handshake, closes the
  ///    transport and returns [ConnectResult::Error].
  fn login(&self, params: &Self::Params) -> ConnectResult<T>;
}

/// ## HANDLER
/// **Based on §4.3**
///
/// Exactly one handler is current at any time inside a
/// [Client][crate::Client]. Ownership of the transport passes from the old
/// handler to the new one as a transaction of `connect` (§3, I2).
pub enum Handler<T: Transport> {
  /// No transport is owned. All I/O methods fail with
  /// [Error::NotConnected]; `connect` may be attempted.
  Disconnected,

  /// Delegates all I/O to the owned transport. `connect` fails with
  /// [Error::AlreadyConnected] — the client's reconnection policy
  /// (§4.4.3) handles re-entry by disconnecting first.
  Connected(Arc<T>),
}

impl<T: Transport> Handler<T> {
  /// True iff this handler is [Handler::Disconnected] (§3, I1).
  pub fn is_disconnected(&self) -> bool {
    matches!(self, Handler::Disconnected)
  }

  /// Attempts the connect negotiation via `login`. Returns
  /// [Error::AlreadyConnected] immediately, without calling `login`, if
  /// this handler is already [Handler::Connected] (§4.3.2).
  pub fn do_connect<L: LoginHandler<T>>(&self, login: &L, params: &L::Params) -> ConnectResult<T> {
    match self {
      // ALREADY CONNECTED
      //
      // login is never called on a live transport; the caller's
      // reconnection policy is responsible for disconnecting first.
      Handler::Connected(_) => ConnectResult::Error(Error::AlreadyConnected),
      // NOT CONNECTED
      //
      // The only state from which a handshake may proceed.
      Handler::Disconnected => login.login(params),
    }
  }

  pub fn receive(&self, timeout: Duration) -> Result<ReadOutcome<T::Message>, Error> {
    match self {
      Handler::Disconnected => Err(Error::NotConnected),
      Handler::Connected(transport) => transport.receive(timeout),
    }
  }

  pub fn send(&self, message: T::Message) -> Result<(), Error> {
    match self {
      Handler::Disconnected => Err(Error::NotConnected),
      Handler::Connected(transport) => transport.send(message),
    }
  }

  pub fn send_and_forget(&self, message: T::Message) -> Result<(), Error> {
    match self {
      Handler::Disconnected => Err(Error::NotConnected),
      Handler::Connected(transport) => transport.send_and_forget(message),
    }
  }

  pub fn send_and_wait(&self, message: T::Message, timeout: Duration) -> Result<T::Message, Error> {
    match self {
      Handler::Disconnected => Err(Error::NotConnected),
      Handler::Connected(transport) => transport.send_and_wait(message, timeout),
    }
  }

  /// Closes the owned transport, if any (§3, I2). A no-op on
  /// [Handler::Disconnected].
  pub fn close(&self) {
    // Only a live transport needs tearing down; Disconnected has nothing
    // to close.
    if let Handler::Connected(transport) = self {
      transport.close();
    }
  }

  pub fn is_closed(&self) -> bool {
    match self {
      Handler::Disconnected => true,
      Handler::Connected(transport) => transport.is_closed(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{LoopbackLogin, LoopbackMessage, LoopbackTransport};

  #[test]
  fn disconnected_handler_rejects_io() {
    let handler: Handler<LoopbackTransport> = Handler::Disconnected;
    assert!(handler.is_disconnected());
    assert!(matches!(
      handler.send(LoopbackMessage::request(b"ping".to_vec())),
      Err(Error::NotConnected)
    ));
    assert!(matches!(
      handler.receive(Duration::from_millis(1)),
      Err(Error::NotConnected)
    ));
  }

  #[test]
  fn connected_handler_rejects_do_connect() {
    let transport = Arc::new(LoopbackTransport::connected());
    let handler: Handler<LoopbackTransport> = Handler::Connected(transport);
    let login = LoopbackLogin::accepting();
    match handler.do_connect(&login, &Default::default()) {
      ConnectResult::Error(Error::AlreadyConnected) => {}
      _ => panic!("expected AlreadyConnected"),
    }
  }
}
