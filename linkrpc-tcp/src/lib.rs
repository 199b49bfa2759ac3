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

//! # LINKRPC TCP
//!
//! A reference [linkrpc_core::Transport] implementation: a single
//! length-prefixed TCP stream, read by a dedicated background thread and
//! written to under a mutex, with correlation handled entirely by
//! `linkrpc_core`'s own [Outbox][linkrpc_core::correlation::Outbox] and
//! [ReceiveQueue][linkrpc_core::correlation::ReceiveQueue].
//!
//! Pair [TcpTransport] with [TcpLoginHandler] and a `linkrpc_core::Client`
//! to get a working RPC client over TCP; see `linkrpc-demo` for a
//! complete example against a toy echo server.

mod login;
mod message;
mod transport;

pub use login::{ConnectParams, TcpLoginHandler};
pub use message::TcpMessage;
pub use transport::{ConnectionMode, TcpTransport};
