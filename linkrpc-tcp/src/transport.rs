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

//! # TCP TRANSPORT
//!
//! Implements [linkrpc_core::Transport] over a length-prefixed TCP stream.
//! Structurally this is the teacher's `primitive::Client`: a dedicated
//! reader thread started at connect time that feeds arrivals to the rest
//! of the client, and a `transmit`-style write path guarded against a
//! half-shutdown socket. The two differences are what the reader thread
//! does with an arrival (route it through [linkrpc_core::correlation]'s
//! `Outbox`/`ReceiveQueue` instead of handing every message to the same
//! channel) and that connection establishment is driven by
//! [linkrpc_core::LoginHandler] rather than being a public method on this
//! type.

use std::collections::{HashMap, VecDeque};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use linkrpc_core::correlation::{Outbox, ReceiveQueue};
use linkrpc_core::{Error, Id, Message, ReadOutcome, Transport};

use crate::message::{TcpMessage, HEADER_LEN};

/// How long a read blocks before the reader thread re-checks whether the
/// transport has been closed. Not a protocol parameter — purely an
/// internal responsiveness knob.
const READER_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// ## CONNECTION MODE
///
/// Mirrors the teacher's `primitive::ConnectionMode`: a TCP connection is
/// established either by dialing out ([ConnectionMode::Active]) or by
/// listening for the peer to dial in ([ConnectionMode::Passive]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionMode {
  /// Listen on `address` and accept a single incoming connection.
  Passive,
  /// Dial `address`, waiting up to the given connect timeout.
  Active,
}

struct Inner {
  write_stream: Mutex<TcpStream>,
  outbox: Outbox<TcpMessage>,
  queue: ReceiveQueue<TcpMessage>,
  ready_responses: Mutex<VecDeque<(TcpMessage, TcpMessage)>>,
  originals: Mutex<HashMap<Id, TcpMessage>>,
  notify_tx: SyncSender<()>,
  closed: AtomicBool,
}

impl Inner {
  /// Routes one decoded arrival to whichever of the three places it
  /// belongs.
  ///
  /// NOTE: unlike [linkrpc_core::testing::LoopbackTransport], a
  /// full [ReceiveQueue] here is dropped with a `tracing::warn!` rather
  /// than surfaced as `Error::ReceiveQueueOverflow` to an in-flight
  /// `send_and_wait`. The reader thread has no single in-flight call it
  /// is answering on behalf of, so there is nowhere to return that error
  /// to; this transport is additive scaffolding, not the core's
  /// loopback reference, and P6 in the core itself is still exercised
  /// through `LoopbackTransport`.
  fn route_arrival(&self, message: TcpMessage) {
    // REQUEST/RESPONSE CORRELATION
    //
    // A send_and_wait caller is parked on this id; hand it straight over
    // without ever touching the receive queue.
    if let Some(correlates_to) = message.correlates_to() {
      if self.outbox.complete(&correlates_to, message.clone()) {
        return;
      }
      // UNWAITED RESPONSE
      //
      // Answers a plain send (no waiter registered); pair it with its
      // original so receive() can hand back ReadOutcome::Response.
      if let Some(original) = self.originals.lock().unwrap().remove(&correlates_to) {
        self.ready_responses.lock().unwrap().push_back((original, message));
        return;
      }
    }
    // UNSOLICITED ARRIVAL
    //
    // Not a response to anything we're tracking; queue it for receive().
    if let Err(error) = self.queue.push(message) {
      tracing::warn!(%error, "dropping arrival: receive queue is full");
    }
  }
}

/// ## TCP TRANSPORT
pub struct TcpTransport {
  inner: Arc<Inner>,
  notify_rx: Mutex<Receiver<()>>,
  reader: Mutex<Option<JoinHandle<()>>>,
  peer_addr: SocketAddr,
}

impl TcpTransport {
  /// Establishes a TCP connection per `mode` and starts the background
  /// reader thread. `receive_queue_capacity` bounds the out-of-order
  /// backlog exactly as [linkrpc_core::correlation::ReceiveQueue] does
  /// for any other transport.
  pub fn connect(
    address: impl ToSocketAddrs,
    mode: ConnectionMode,
    connect_timeout: Duration,
    receive_queue_capacity: usize,
  ) -> std::io::Result<Self> {
    let (stream, peer_addr) = match mode {
      ConnectionMode::Passive => {
        let listener = TcpListener::bind(address)?;
        listener.accept()?
      }
      ConnectionMode::Active => {
        let socket = address
          .to_socket_addrs()?
          .next()
          .ok_or_else(|| std::io::Error::new(ErrorKind::AddrNotAvailable, "no address to connect to"))?;
        let stream = TcpStream::connect_timeout(&socket, connect_timeout)?;
        (stream, socket)
      }
    };

    stream.set_read_timeout(Some(READER_POLL_INTERVAL))?;
    stream.set_nodelay(true)?;
    let reader_stream = stream.try_clone()?;

    let (notify_tx, notify_rx) = sync_channel(1);
    let inner = Arc::new(Inner {
      write_stream: Mutex::new(stream),
      outbox: Outbox::new(),
      queue: ReceiveQueue::new(receive_queue_capacity),
      ready_responses: Mutex::new(VecDeque::new()),
      originals: Mutex::new(HashMap::new()),
      notify_tx,
      closed: AtomicBool::new(false),
    });

    let reader_inner = Arc::clone(&inner);
    let reader = thread::spawn(move || reader_loop(reader_inner, reader_stream));

    Ok(Self {
      inner,
      notify_rx: Mutex::new(notify_rx),
      reader: Mutex::new(Some(reader)),
      peer_addr,
    })
  }

  pub fn peer_addr(&self) -> SocketAddr {
    self.peer_addr
  }

  fn write_message(&self, message: &TcpMessage) -> Result<(), Error> {
    let encoded = message.encode();
    let mut stream = self.inner.write_stream.lock().unwrap();
    if stream.write_all(&encoded).is_err() {
      drop(stream);
      self.close();
      return Err(Error::ClosedTransport);
    }
    Ok(())
  }
}

/// Reads one framed message, distinguishing an allowed idle timeout
/// ([Ok]`(None)`) from a fatal read error or malformed frame ([Err]).
fn read_one_message(stream: &mut TcpStream) -> Result<Option<TcpMessage>, Error> {
  let mut length_buffer = [0u8; 4];
  match stream.read_exact(&mut length_buffer) {
    Ok(()) => {}
    Err(error) if error.kind() == ErrorKind::TimedOut || error.kind() == ErrorKind::WouldBlock => {
      return Ok(None)
    }
    Err(error) => return Err(Error::transport(error)),
  }
  let length = u32::from_be_bytes(length_buffer) as usize;
  if length < HEADER_LEN {
    return Err(Error::ProtocolError(format!(
      "frame length {length} shorter than header ({HEADER_LEN} bytes)"
    )));
  }

  let mut header = [0u8; HEADER_LEN];
  stream.read_exact(&mut header).map_err(Error::transport)?;
  let (id, correlates_to) = TcpMessage::decode_header(&header)?;

  let payload_len = length - HEADER_LEN;
  let mut payload = vec![0u8; payload_len];
  if payload_len > 0 {
    stream.read_exact(&mut payload).map_err(Error::transport)?;
  }

  Ok(Some(TcpMessage::from_parts(id, correlates_to, payload)))
}

fn reader_loop(inner: Arc<Inner>, mut stream: TcpStream) {
  // MAIN LOOP
  //
  // Runs until the transport is closed from either side: explicitly via
  // TcpTransport::close, or implicitly here on a fatal read error.
  while !inner.closed.load(Ordering::Acquire) {
    match read_one_message(&mut stream) {
      // ARRIVAL
      //
      // Route it into the outbox/ready-responses/queue, then wake any
      // thread parked in receive()'s recv_timeout. A full notify channel
      // or a disconnected one are both fine: the former means a wakeup
      // is already pending, the latter means nobody is blocked on it.
      Ok(Some(message)) => {
        inner.route_arrival(message);
        match inner.notify_tx.try_send(()) {
          Ok(()) | Err(TrySendError::Full(())) => {}
          Err(TrySendError::Disconnected(())) => {}
        }
      }
      // IDLE TIMEOUT
      //
      // Nothing arrived within READER_POLL_INTERVAL; loop back around to
      // re-check the closed flag.
      Ok(None) => continue,
      // FATAL
      //
      // A real I/O error or a malformed frame. Shut the socket down,
      // fail every outstanding send_and_wait via close_all, and wake
      // receive() so it observes ClosedTransport instead of blocking
      // out its full timeout.
      Err(error) => {
        tracing::debug!(%error, "tcp reader thread exiting");
        inner.closed.store(true, Ordering::Release);
        inner.outbox.close_all();
        let _ = stream.shutdown(Shutdown::Both);
        let _ = inner.notify_tx.try_send(());
        break;
      }
    }
  }
}

impl Transport for TcpTransport {
  type Message = TcpMessage;

  fn receive(&self, timeout: Duration) -> Result<ReadOutcome<TcpMessage>, Error> {
    if self.is_closed() {
      return Err(Error::ClosedTransport);
    }
    if let Some((original, response)) = self.inner.ready_responses.lock().unwrap().pop_front() {
      return Ok(ReadOutcome::Response(original, response));
    }
    if let Some(message) = self.inner.queue.pop() {
      return Ok(ReadOutcome::Received(message));
    }

    let deadline = Instant::now() + timeout;
    loop {
      let remaining = deadline.saturating_duration_since(Instant::now());
      if remaining.is_zero() {
        return Ok(ReadOutcome::Nothing);
      }
      let _ = self.notify_rx.lock().unwrap().recv_timeout(remaining);

      if self.is_closed() {
        return Err(Error::ClosedTransport);
      }
      if let Some((original, response)) = self.inner.ready_responses.lock().unwrap().pop_front() {
        return Ok(ReadOutcome::Response(original, response));
      }
      if let Some(message) = self.inner.queue.pop() {
        return Ok(ReadOutcome::Received(message));
      }
    }
  }

  fn send(&self, message: TcpMessage) -> Result<(), Error> {
    if self.is_closed() {
      return Err(Error::ClosedTransport);
    }
    self.inner.originals.lock().unwrap().insert(message.message_id(), message.clone());
    self.write_message(&message)
  }

  fn send_and_forget(&self, message: TcpMessage) -> Result<(), Error> {
    if self.is_closed() {
      return Err(Error::ClosedTransport);
    }
    self.write_message(&message)
  }

  fn send_and_wait(&self, message: TcpMessage, timeout: Duration) -> Result<TcpMessage, Error> {
    if self.is_closed() {
      return Err(Error::ClosedTransport);
    }
    // REGISTER BEFORE WRITING
    //
    // The waiter must exist in the outbox before the bytes hit the wire,
    // otherwise a response racing back faster than this thread reaches
    // recv_timeout would arrive at route_arrival with nothing to
    // complete and fall through to the receive queue instead.
    let id = message.message_id();
    let receiver = self.inner.outbox.register(id);
    self.write_message(&message)?;
    match receiver.recv_timeout(timeout) {
      // RESPONSE ARRIVED
      Ok(response) => Ok(response),
      // TIMED OUT OR TRANSPORT CLOSED
      //
      // cancel() evicts the now-stale waiter so a response that arrives
      // after this point falls through to route_arrival's
      // unwaited-response path instead of being silently dropped.
      // A closed transport takes priority in the error reported, since
      // ClosedTransport is more actionable than a bare Timeout.
      Err(_) => {
        self.inner.outbox.cancel(&id);
        if self.is_closed() {
          Err(Error::ClosedTransport)
        } else {
          Err(Error::Timeout)
        }
      }
    }
  }

  fn is_closed(&self) -> bool {
    self.inner.closed.load(Ordering::Acquire)
  }

  fn close(&self) {
    if !self.inner.closed.swap(true, Ordering::AcqRel) {
      let _ = self.inner.write_stream.lock().unwrap().shutdown(Shutdown::Both);
      self.inner.outbox.close_all();
      let _ = self.inner.notify_tx.try_send(());
    }
    if let Some(handle) = self.reader.lock().unwrap().take() {
      let _ = handle.join();
    }
  }
}

impl Drop for TcpTransport {
  fn drop(&mut self) {
    self.close();
  }
}
