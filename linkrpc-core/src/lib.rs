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

//! # LINKRPC CORE
//!
//! A transport-agnostic RPC client runtime.
//!
//! This crate does not speak any particular wire protocol. Instead it
//! provides the pieces every correlated-request/response client ends up
//! rebuilding on its own:
//!
//! - A [Message] model with a unique [Id] and a response-matching
//!   predicate, leaving payload shape entirely up to the caller.
//! - A [Transport] contract: `receive`, `send`, `send_and_forget`, and
//!   `send_and_wait`, implemented by a concrete byte-level backend (TCP,
//!   UDP, HTTP, or an in-memory stub for tests).
//! - A [Handler] that is either [Disconnected][Handler::Disconnected] or
//!   [Connected][Handler::Connected], whose substitution performs the login
//!   handshake.
//! - A [Client] facade that owns the current handler, runs the connection
//!   lifecycle [State] machine, and publishes every transition through a
//!   [Publisher].
//!
//! ---------------------------------------------------------------------------
//!
//! To use this crate:
//!
//! - Implement [Message] and [Transport] for a concrete wire protocol (or
//!   reuse a published one, e.g. `linkrpc-tcp`).
//! - Implement [LoginHandler] to perform the disconnected-to-connected
//!   handshake for that protocol.
//! - Build a [Client] with [Client::new] and drive it with
//!   [Client::connect], [Client::send_and_wait], and [Client::close].
//! - Subscribe to [Client::state] to observe the connection lifecycle.
//!
//! [Message]:       message::Message
//! [Id]:            message::Id
//! [Transport]:      transport::Transport
//! [Handler]:        handler::Handler
//! [LoginHandler]:   handler::LoginHandler
//! [Client]:         client::Client
//! [State]:          client::State
//! [Publisher]:      publisher::Publisher

pub mod client;
pub mod correlation;
pub mod error;
pub mod handler;
pub mod message;
pub mod publisher;
pub mod settings;
pub mod transport;

/// Loopback test doubles (a [Transport][transport::Transport] and
/// [LoginHandler][handler::LoginHandler] with no socket underneath), used
/// by this crate's own tests and available to downstream crates' tests
/// too rather than duplicating them behind a dev-dependency.
pub mod testing;

pub use client::{Client, State};
pub use error::Error;
pub use handler::{ConnectResult, Handler, LoginHandler};
pub use message::{Id, Message};
pub use publisher::Publisher;
pub use settings::Settings;
pub use transport::{ReadOutcome, Transport};

/// A specialized [Result] using [crate::Error] as its failure type.
pub type Result<T> = std::result::Result<T, Error>;
