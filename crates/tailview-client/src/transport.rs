//! Stream transport — one logical subscription over a reconnecting socket.
//!
//! An actor task owns the socket, the connection state, and the single
//! reconnect timer; [`StreamTransport`] is the cheap handle the session
//! holds. Commands travel over a channel, so `connect`/`disconnect` are
//! idempotent from every state and a reconnect timer can never be armed
//! twice: the actor is in exactly one phase at a time.
//!
//! ```text
//! Idle ──connect──► establish ──ok──► Open ──lost──► Retry(3s) ─┐
//!  ▲                    │fail            │                      │
//!  │                    ▼                │disconnect            │timer
//!  │                 Retry(3s) ◄─────────┼──────────────────────┘
//!  └──────disconnect────┴────────────────┘
//! ```
//!
//! Delivery is at-most-once: frames sent while disconnected are simply never
//! seen, and no replay is requested on reconnect.

use crate::error::TransportError;
use crate::protocol::{self, ClientFrame, ServerFrame};
use futures::{SinkExt, StreamExt};
use tailview_core::config::StreamConfig;
use tailview_core::LogEntry;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration, Instant};
use tokio_util::codec::{Framed, LinesCodec};

/// Connection lifecycle state. Written only by the transport actor; the
/// session observes it through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Connect,
    Disconnect,
}

/// Handle to the transport actor. Dropping every handle shuts the actor
/// down; `disconnect()` first for a clean teardown.
pub struct StreamTransport {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl StreamTransport {
    /// Spawn the actor. Returns the handle and the inbound-entry channel;
    /// the transport starts out `Disconnected` and does nothing until
    /// [`connect`](Self::connect).
    pub fn spawn(config: StreamConfig) -> (Self, mpsc::UnboundedReceiver<LogEntry>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (entry_tx, entry_rx) = mpsc::unbounded_channel();

        let actor = Actor {
            config,
            commands: command_rx,
            state: state_tx,
            entries: entry_tx,
        };
        tokio::spawn(actor.run());

        (Self { commands: command_tx, state: state_rx }, entry_rx)
    }

    /// Ask the actor to establish the subscription. No-op while already
    /// connecting, connected, or waiting on the reconnect timer — the
    /// pending timer stands, a second one is never armed.
    pub fn connect(&self) {
        let _ = self.commands.send(Command::Connect);
    }

    /// Tear down the subscription and socket and cancel any pending
    /// reconnect timer. Safe to call repeatedly and from any state.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A watch receiver that yields on every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

type FramedSocket = Framed<TcpStream, LinesCodec>;

/// What the actor is doing right now. One phase at a time is the whole
/// no-stacked-timers argument.
enum Phase {
    /// Down on purpose; waiting for a `connect()`.
    Idle,
    /// Down after a failure; the single reconnect timer fires at the instant.
    Retry(Instant),
    /// Subscribed; pumping frames.
    Open(FramedSocket),
    /// Every handle dropped; unwind.
    Shutdown,
}

struct Actor {
    config: StreamConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionState>,
    entries: mpsc::UnboundedSender<LogEntry>,
}

impl Actor {
    async fn run(mut self) {
        let mut phase = Phase::Idle;
        loop {
            phase = match phase {
                Phase::Idle => match self.commands.recv().await {
                    None => Phase::Shutdown,
                    Some(Command::Connect) => self.establish().await,
                    Some(Command::Disconnect) => Phase::Idle,
                },
                Phase::Retry(at) => {
                    tokio::select! {
                        _ = time::sleep_until(at) => self.establish().await,
                        cmd = self.commands.recv() => match cmd {
                            None => Phase::Shutdown,
                            // Already going to reconnect; the pending timer stands.
                            Some(Command::Connect) => Phase::Retry(at),
                            Some(Command::Disconnect) => {
                                tracing::debug!("reconnect cancelled");
                                Phase::Idle
                            }
                        },
                    }
                }
                Phase::Open(mut framed) => {
                    tokio::select! {
                        frame = framed.next() => match frame {
                            Some(Ok(line)) => {
                                self.dispatch(&line);
                                Phase::Open(framed)
                            }
                            Some(Err(err)) => {
                                tracing::warn!(error = %err, "stream socket error");
                                self.set_state(ConnectionState::Disconnected);
                                Phase::Retry(self.retry_at())
                            }
                            None => {
                                tracing::warn!("stream closed by server");
                                self.set_state(ConnectionState::Disconnected);
                                Phase::Retry(self.retry_at())
                            }
                        },
                        cmd = self.commands.recv() => match cmd {
                            None => Phase::Shutdown,
                            Some(Command::Connect) => Phase::Open(framed),
                            Some(Command::Disconnect) => {
                                drop(framed);
                                self.set_state(ConnectionState::Disconnected);
                                Phase::Idle
                            }
                        },
                    }
                }
                Phase::Shutdown => {
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
            };
        }
    }

    /// Dial, subscribe, await the ack. Interruptible by `disconnect()` at
    /// any point; a failure arms the reconnect timer.
    async fn establish(&mut self) -> Phase {
        self.set_state(ConnectionState::Connecting);

        let handshake = handshake(&self.config);
        tokio::pin!(handshake);

        loop {
            tokio::select! {
                result = &mut handshake => {
                    return match result {
                        Ok(framed) => {
                            tracing::info!(addr = %self.config.addr, topic = %self.config.topic, "subscribed");
                            self.set_state(ConnectionState::Connected);
                            Phase::Open(framed)
                        }
                        Err(err) => {
                            tracing::warn!(
                                addr = %self.config.addr,
                                error = %err,
                                retry_in_secs = self.config.reconnect_delay_secs,
                                "stream connect failed"
                            );
                            self.set_state(ConnectionState::Disconnected);
                            Phase::Retry(self.retry_at())
                        }
                    };
                }
                cmd = self.commands.recv() => match cmd {
                    None => return Phase::Shutdown,
                    Some(Command::Connect) => continue,
                    Some(Command::Disconnect) => {
                        tracing::debug!("connect aborted");
                        self.set_state(ConnectionState::Disconnected);
                        return Phase::Idle;
                    }
                },
            }
        }
    }

    fn retry_at(&self) -> Instant {
        Instant::now() + Duration::from_secs(self.config.reconnect_delay_secs)
    }

    /// Route one inbound line. A frame that fails to parse is dropped with a
    /// warning — it never takes the stream down.
    fn dispatch(&self, line: &str) {
        match protocol::decode(line) {
            Ok(ServerFrame::Log { entry }) => {
                let _ = self.entries.send(entry);
            }
            Ok(ServerFrame::Subscribed { topic }) => {
                tracing::debug!(%topic, "redundant subscribe ack");
            }
            Ok(ServerFrame::Error { message }) => {
                tracing::warn!(%message, "server error frame");
            }
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed frame");
            }
        }
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                tracing::debug!(from = %current, to = %next, "connection state");
                *current = next;
                true
            }
        });
    }
}

/// Open the socket and complete the subscribe handshake under the configured
/// timeout. Strict: during the handshake any answer other than the matching
/// ack is a failure (leniency starts once the stream is open).
async fn handshake(config: &StreamConfig) -> Result<FramedSocket, TransportError> {
    let deadline = Duration::from_secs(config.handshake_timeout_secs);
    time::timeout(deadline, async {
        let socket = TcpStream::connect(&config.addr)
            .await
            .map_err(TransportError::Dial)?;
        let mut framed = Framed::new(socket, LinesCodec::new());

        let subscribe = protocol::encode(&ClientFrame::Subscribe { topic: config.topic.clone() })
            .map_err(TransportError::Encode)?;
        framed.send(subscribe).await?;

        match framed.next().await {
            None => Err(TransportError::Handshake("closed before ack".to_string())),
            Some(Err(err)) => Err(err.into()),
            Some(Ok(line)) => match protocol::decode(&line) {
                Ok(ServerFrame::Subscribed { topic }) if topic == config.topic => Ok(framed),
                Ok(ServerFrame::Error { message }) => Err(TransportError::Handshake(message)),
                Ok(other) => {
                    Err(TransportError::Handshake(format!("unexpected frame {other:?}")))
                }
                Err(err) => Err(TransportError::Handshake(format!("unreadable ack: {err}"))),
            },
        }
    })
    .await
    .map_err(|_| TransportError::Timeout(deadline))?
}
