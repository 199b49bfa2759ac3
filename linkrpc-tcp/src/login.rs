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

//! # TCP LOGIN
//!
//! The pluggable half of the disconnected-to-connected handshake
//! (`linkrpc_core::handler::LoginHandler`) for [TcpTransport]: dial or
//! accept per [ConnectParams], send one login request, and judge the
//! response with a caller-supplied predicate. A protocol built on top of
//! this transport supplies its own login payload and acceptance rule —
//! this crate has no opinion on what a "logged in" response looks like.

use std::net::ToSocketAddrs;
use std::time::Duration;

use linkrpc_core::handler::{ConnectResult, LoginHandler};
use linkrpc_core::Settings;

use crate::message::TcpMessage;
use crate::transport::{ConnectionMode, TcpTransport};

/// ## CONNECT PARAMS
///
/// Opaque (from the core's point of view) parameters for one
/// [TcpLoginHandler::login] attempt.
#[derive(Clone, Debug)]
pub struct ConnectParams {
  pub address: String,
  pub mode: ConnectionMode,
  pub settings: Settings,
  /// The payload sent as the body of the login request.
  pub login_payload: Vec<u8>,
}

impl ConnectParams {
  pub fn active(address: impl Into<String>, login_payload: Vec<u8>) -> Self {
    Self {
      address: address.into(),
      mode: ConnectionMode::Active,
      settings: Settings::default(),
      login_payload,
    }
  }
}

type AcceptPredicate = Box<dyn Fn(&TcpMessage) -> bool + Send + Sync>;

/// ## TCP LOGIN HANDLER
pub struct TcpLoginHandler {
  accept: AcceptPredicate,
}

impl TcpLoginHandler {
  /// `accept` judges the login response; `true` means the server
  /// accepted the handshake.
  pub fn new(accept: impl Fn(&TcpMessage) -> bool + Send + Sync + 'static) -> Self {
    Self {
      accept: Box::new(accept),
    }
  }
}

impl LoginHandler<TcpTransport> for TcpLoginHandler {
  type Params = ConnectParams;

  fn login(&self, params: &ConnectParams) -> ConnectResult<TcpTransport> {
    let address: Vec<_> = match params.address.as_str().to_socket_addrs() {
      Ok(iter) => iter.collect(),
      Err(error) => return ConnectResult::Error(linkrpc_core::Error::transport(error)),
    };

    let transport = match TcpTransport::connect(
      address.as_slice(),
      params.mode,
      params.settings.connect_timeout,
      params.settings.receive_queue_capacity,
    ) {
      Ok(transport) => transport,
      Err(error) => return ConnectResult::Error(linkrpc_core::Error::transport(error)),
    };

    let login_request = TcpMessage::request(params.login_payload.clone());
    match transport_login(&transport, login_request, params.settings.connect_timeout, &self.accept) {
      Ok(response) => ConnectResult::Succeeded(response, transport),
      Err(LoginFailure::Rejected(response)) => {
        transport.close();
        ConnectResult::Failed(response)
      }
      Err(LoginFailure::Error(error)) => {
        transport.close();
        ConnectResult::Error(error)
      }
    }
  }
}

enum LoginFailure {
  Rejected(TcpMessage),
  Error(linkrpc_core::Error),
}

fn transport_login(
  transport: &TcpTransport,
  request: TcpMessage,
  timeout: Duration,
  accept: &AcceptPredicate,
) -> Result<TcpMessage, LoginFailure> {
  use linkrpc_core::Transport;

  match transport.send_and_wait(request, timeout) {
    Ok(response) if accept(&response) => Ok(response),
    Ok(response) => Err(LoginFailure::Rejected(response)),
    Err(error) => Err(LoginFailure::Error(error)),
  }
}
