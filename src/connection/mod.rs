//! WebSocket connection management.
//!
//! [`ConnectionManager`] is the UI-thread handle: it issues commands to
//! the background transport task and drains its events via
//! [`ConnectionManager::poll_events`]. Consumers can also register
//! callbacks with [`ConnectionManager::on`] and remove them with
//! [`ConnectionManager::off`]; callbacks fire during the drain, on the
//! calling thread.

pub mod backoff;
pub mod transport;

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::{Inbound, Outbound};

pub use backoff::RetryPolicy;
pub use transport::SETTLE_DELAY;

/// Lifecycle state of the websocket link, as mirrored on the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Instruction from the manager to the transport task.
#[derive(Debug)]
pub enum Command {
    Connect,
    Disconnect,
    /// A pre-serialized outbound frame.
    Send(String),
}

/// Event emitted by the transport task.
#[derive(Debug)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    Message(Inbound),
    /// A transport-level failure. Always followed by `Disconnected`;
    /// reconnect scheduling is reported separately.
    Error(String),
    RetryScheduled { attempt: u32, delay: Duration },
}

/// Handle returned by [`ConnectionManager::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type EventCallback = Box<dyn FnMut(&ConnectionEvent)>;

/// UI-thread handle to the background websocket transport.
pub struct ConnectionManager {
    cmd_tx: mpsc::UnboundedSender<Command>,
    event_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    state: ConnectionState,
    subscribers: Vec<(SubscriptionId, EventCallback)>,
    next_subscription: u64,
}

impl ConnectionManager {
    /// Spawn the transport task for `url`. The link starts disconnected;
    /// call [`connect`](Self::connect) to bring it up.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(url: impl Into<String>, policy: RetryPolicy) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(transport::run(url.into(), policy, cmd_rx, event_tx));
        Self {
            cmd_tx,
            event_rx,
            state: ConnectionState::Disconnected,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Begin connecting. Idempotent: does nothing unless disconnected.
    pub fn connect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            return;
        }
        self.state = ConnectionState::Connecting;
        let _ = self.cmd_tx.send(Command::Connect);
    }

    /// Tear the link down and cancel any pending retry.
    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
        let _ = self.cmd_tx.send(Command::Disconnect);
    }

    /// Send a frame if connected. Returns false when the frame was not
    /// sent, either because the link is down or serialization failed.
    pub fn send(&self, message: &Outbound) -> bool {
        if self.state != ConnectionState::Connected {
            debug!(state = ?self.state, "dropping outbound frame, link not up");
            return false;
        }
        match serde_json::to_string(message) {
            Ok(payload) => self.cmd_tx.send(Command::Send(payload)).is_ok(),
            Err(_) => false,
        }
    }

    /// Register a callback invoked for every drained event.
    pub fn on(&mut self, callback: impl FnMut(&ConnectionEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a previously registered callback. Returns false for ids
    /// that were never registered (or already removed).
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Drain all pending transport events, updating the mirrored state
    /// and fanning each event out to subscribers before returning them.
    pub fn poll_events(&mut self) -> Vec<ConnectionEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            match &event {
                ConnectionEvent::Connected => self.state = ConnectionState::Connected,
                ConnectionEvent::Disconnected => self.state = ConnectionState::Disconnected,
                ConnectionEvent::RetryScheduled { .. } => {
                    self.state = ConnectionState::Connecting;
                }
                ConnectionEvent::Message(_) | ConnectionEvent::Error(_) => {}
            }
            for (_, callback) in &mut self.subscribers {
                callback(&event);
            }
            drained.push(event);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tokio::net::TcpListener;

    async fn manager_for_echo_server() -> (ConnectionManager, std::net::SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else { return };
                tokio::spawn(async move {
                    let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
                    use futures_util::StreamExt;
                    while let Some(Ok(_)) = ws.next().await {}
                });
            }
        });
        (
            ConnectionManager::spawn(format!("ws://{addr}"), RetryPolicy::default()),
            addr,
        )
    }

    async fn drain_until_connected(manager: &mut ConnectionManager) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                manager.poll_events();
                if manager.state() == ConnectionState::Connected {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("never reached Connected");
    }

    #[tokio::test]
    async fn test_state_transitions_and_send_gating() {
        let (mut manager, _addr) = manager_for_echo_server().await;
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        // Down links drop frames.
        assert!(!manager.send(&Outbound::GetInitialData));

        manager.connect();
        assert_eq!(manager.state(), ConnectionState::Connecting);
        drain_until_connected(&mut manager).await;

        assert!(manager.send(&Outbound::GetInitialData));

        manager.disconnect();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(!manager.send(&Outbound::GetInitialData));
    }

    #[tokio::test]
    async fn test_connect_is_idempotent_while_connecting() {
        let (mut manager, _addr) = manager_for_echo_server().await;
        manager.connect();
        manager.connect();
        manager.connect();
        drain_until_connected(&mut manager).await;

        // A single Connected event: the extra connect() calls were no-ops.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let connects = manager
            .poll_events()
            .iter()
            .filter(|e| matches!(e, ConnectionEvent::Connected))
            .count();
        assert_eq!(connects, 0);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_subscribers_see_drained_events_and_off_removes() {
        let (mut manager, _addr) = manager_for_echo_server().await;
        let seen = Rc::new(RefCell::new(0u32));

        let counter = Rc::clone(&seen);
        let id = manager.on(move |_event| *counter.borrow_mut() += 1);

        manager.connect();
        drain_until_connected(&mut manager).await;
        assert!(*seen.borrow() >= 1);

        assert!(manager.off(id));
        assert!(!manager.off(id));
        let before = *seen.borrow();
        manager.disconnect();
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.poll_events();
        assert_eq!(*seen.borrow(), before);
    }
}
