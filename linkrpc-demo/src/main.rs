use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use linkrpc_core::client::ConnectOutcome;
use linkrpc_core::{Client, ReadOutcome, State};
use linkrpc_tcp::{ConnectParams, ConnectionMode, TcpLoginHandler, TcpMessage, TcpTransport};

const ADDRESS: &str = "127.0.0.1:19372";

/// A minimal server: accepts one connection, accepts any login whose
/// payload is `LOGIN:demo`, then echoes every subsequent request back
/// with its payload reversed.
fn run_toy_server() {
  let transport =
    TcpTransport::connect(ADDRESS, ConnectionMode::Passive, Duration::from_secs(5), 64).unwrap();

  loop {
    match transport.receive(Duration::from_secs(30)) {
      Ok(ReadOutcome::Received(request)) => {
        let accepted = request.payload == b"LOGIN:demo";
        let reply_payload = if request.payload.starts_with(b"LOGIN:") {
          if accepted { b"OK".to_vec() } else { b"DENY".to_vec() }
        } else {
          request.payload.iter().rev().copied().collect()
        };
        let response = TcpMessage::response_to(&request, reply_payload);
        let _ = transport.send_and_forget(response);
      }
      Ok(ReadOutcome::Nothing) => continue,
      Ok(ReadOutcome::Response(_, _)) => continue,
      Err(_) => break,
    }
  }
}

fn main() {
  tracing_subscriber::fmt::init();

  thread::spawn(run_toy_server);
  thread::sleep(Duration::from_millis(100));

  let login = TcpLoginHandler::new(|response| response.payload == b"OK");
  let client: Client<TcpTransport, TcpLoginHandler> = Client::new(login);

  let states: Receiver<State<TcpMessage, ConnectParams>> = client.state();
  let state_watcher: JoinHandle<()> = thread::spawn(move || {
    for state in states {
      tracing::info!(?state, "connection state changed");
      if matches!(state, State::Closed) {
        break;
      }
    }
  });

  let params = ConnectParams::active(ADDRESS, b"LOGIN:demo".to_vec());
  match client.connect(params).expect("client is not closed") {
    ConnectOutcome::Succeeded(response) => {
      tracing::info!(payload = ?response.payload, "login accepted");
    }
    other => panic!("unexpected login outcome: {other:?}"),
  }

  for word in ["ping", "pong", "hello"] {
    let request = TcpMessage::request(word.as_bytes().to_vec());
    let response = client
      .send_and_wait(request, Duration::from_secs(5))
      .expect("request succeeds while connected");
    tracing::info!(sent = word, received = ?response.payload, "round trip");
  }

  client.close();
  state_watcher.join().unwrap();
}
