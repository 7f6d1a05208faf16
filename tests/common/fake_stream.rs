//! Fake tail-stream server for integration tests.
//!
//! Listens on a random loopback TCP port and speaks the subscription
//! protocol: expects a subscribe frame, acks it, then pushes whatever the
//! test feeds through [`FakeStreamServer::push`]. Handshake rejection and
//! server-side disconnects are scriptable so the transport's retry loop can
//! be exercised deterministically.

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tailview_core::LogEntry;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::{Framed, LinesCodec};

#[derive(Default)]
struct StreamState {
    /// Outbound line senders, one per live subscriber.
    clients: Vec<mpsc::UnboundedSender<String>>,
    /// Subscribe handshakes seen, including rejected ones.
    accepted: usize,
    /// When true, answer the next handshakes with an error frame.
    reject_handshake: bool,
}

/// Handle to the running fake stream server.
pub struct FakeStreamServer {
    addr: SocketAddr,
    state: Arc<Mutex<StreamState>>,
}

impl FakeStreamServer {
    /// Start the server on a random port. Returns once it is listening.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(StreamState::default()));

        let accept_state = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else { break };
                tokio::spawn(serve_client(socket, accept_state.clone()));
            }
        });

        Ok(Self { addr, state })
    }

    /// `host:port` for the stream config.
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Push one log frame to every live subscriber.
    pub async fn push(&self, entry: &LogEntry) {
        let frame = serde_json::json!({"type": "log", "entry": entry});
        self.push_raw(&frame.to_string()).await;
    }

    /// Push a raw line verbatim — for malformed-frame tests.
    pub async fn push_raw(&self, line: &str) {
        let mut state = self.state.lock().await;
        state.clients.retain(|tx| tx.send(line.to_string()).is_ok());
    }

    /// Subscribe handshakes seen so far, including rejected ones.
    pub async fn handshakes(&self) -> usize {
        self.state.lock().await.accepted
    }

    /// Live subscriber count.
    pub async fn connections(&self) -> usize {
        let mut state = self.state.lock().await;
        state.clients.retain(|tx| !tx.is_closed());
        state.clients.len()
    }

    /// Make subsequent handshakes fail with an error frame.
    pub async fn set_reject_handshake(&self, reject: bool) {
        self.state.lock().await.reject_handshake = reject;
    }

    /// Close every live subscriber connection from the server side.
    pub async fn drop_clients(&self) {
        self.state.lock().await.clients.clear();
    }
}

async fn serve_client(socket: TcpStream, state: Arc<Mutex<StreamState>>) {
    let mut framed = Framed::new(socket, LinesCodec::new());

    // Handshake: one subscribe frame, then ack or reject.
    let Some(Ok(line)) = framed.next().await else { return };
    let topic = match serde_json::from_str::<serde_json::Value>(&line) {
        Ok(frame) if frame["type"] == "subscribe" => {
            frame["topic"].as_str().unwrap_or("logs").to_string()
        }
        _ => return,
    };

    let reject = {
        let mut state = state.lock().await;
        state.accepted += 1;
        state.reject_handshake
    };
    if reject {
        let _ = framed
            .send(r#"{"type":"error","message":"subscription refused"}"#.to_string())
            .await;
        return;
    }

    // Register before acking so a push that races the client's state change
    // still reaches this subscriber.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.lock().await.clients.push(tx);

    let ack = serde_json::json!({"type": "subscribed", "topic": topic});
    if framed.send(ack.to_string()).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            line = rx.recv() => match line {
                Some(line) => {
                    if framed.send(line).await.is_err() {
                        break;
                    }
                }
                // Sender cleared by drop_clients — close from our side.
                None => break,
            },
            frame = framed.next() => {
                if frame.is_none() {
                    break;
                }
            }
        }
    }
}
