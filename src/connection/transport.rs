//! Background WebSocket transport task.
//!
//! The task owns the socket and the retry state machine; it communicates
//! with [`ConnectionManager`](super::ConnectionManager) exclusively
//! through channels, so all consumer-side mutation stays on the UI
//! thread. Malformed inbound frames are logged and dropped without
//! closing the socket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{Command, ConnectionEvent};
use crate::connection::backoff::RetryPolicy;
use crate::protocol::{Inbound, Outbound};

/// How long after connecting before the initial-state request is sent.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a connected session ended.
enum SessionEnd {
    /// The peer closed or the socket failed; eligible for retry.
    Remote,
    /// An explicit `disconnect()`; no retry.
    Local,
    /// The manager was dropped; the task exits.
    Shutdown,
}

/// Run the transport state machine until the manager is dropped.
pub(super) async fn run(
    url: String,
    policy: RetryPolicy,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
) {
    let mut attempt: u32 = 0;
    let mut active = false;

    loop {
        if !active {
            // Idle until an explicit connect.
            match cmd_rx.recv().await {
                None => return,
                Some(Command::Connect) => {
                    active = true;
                    attempt = 0;
                }
                Some(Command::Disconnect) | Some(Command::Send(_)) => continue,
            }
        }

        match connect_async(url.as_str()).await {
            Ok((ws, _response)) => {
                attempt = 0;
                info!(url = %url, "websocket connected");
                if event_tx.send(ConnectionEvent::Connected).is_err() {
                    return;
                }
                let end = drive(ws, &mut cmd_rx, &event_tx).await;
                if event_tx.send(ConnectionEvent::Disconnected).is_err() {
                    return;
                }
                match end {
                    SessionEnd::Remote => {}
                    SessionEnd::Local => {
                        active = false;
                        continue;
                    }
                    SessionEnd::Shutdown => return,
                }
            }
            Err(err) => {
                debug!(url = %url, error = %err, "websocket connect failed");
                if event_tx.send(ConnectionEvent::Error(err.to_string())).is_err() {
                    return;
                }
                if event_tx.send(ConnectionEvent::Disconnected).is_err() {
                    return;
                }
            }
        }

        // Schedule the next attempt, or give up once the budget is spent.
        if policy.exhausted(attempt) {
            info!(attempts = attempt, "retry budget exhausted, staying offline");
            active = false;
            continue;
        }
        let delay = policy.delay(attempt);
        attempt += 1;
        if event_tx
            .send(ConnectionEvent::RetryScheduled { attempt, delay })
            .is_err()
        {
            return;
        }
        tokio::select! {
            _ = sleep(delay) => {}
            cmd = cmd_rx.recv() => match cmd {
                None => return,
                // Cancels the pending retry.
                Some(Command::Disconnect) => active = false,
                Some(Command::Connect) => attempt = 0,
                Some(Command::Send(_)) => {}
            },
        }
    }
}

/// Drive one connected session until it ends.
async fn drive(
    ws: WsStream,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    event_tx: &mpsc::UnboundedSender<ConnectionEvent>,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();

    let settle = sleep(SETTLE_DELAY);
    tokio::pin!(settle);
    let mut settled = false;

    loop {
        tokio::select! {
            // After the settle delay, ask the server for the initial state.
            _ = &mut settle, if !settled => {
                settled = true;
                if let Ok(payload) = serde_json::to_string(&Outbound::GetInitialData) {
                    if sink.send(Message::text(payload)).await.is_err() {
                        return SessionEnd::Remote;
                    }
                }
            }

            cmd = cmd_rx.recv() => match cmd {
                None => return SessionEnd::Shutdown,
                Some(Command::Disconnect) => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::Local;
                }
                Some(Command::Send(payload)) => {
                    if sink.send(Message::text(payload)).await.is_err() {
                        return SessionEnd::Remote;
                    }
                }
                // Already connected; connect() is idempotent.
                Some(Command::Connect) => {}
            },

            msg = stream.next() => match msg {
                None => return SessionEnd::Remote,
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<Inbound>(&text) {
                        Ok(inbound) => {
                            if event_tx.send(ConnectionEvent::Message(inbound)).is_err() {
                                return SessionEnd::Shutdown;
                            }
                        }
                        // Dropped per-message; the socket stays open.
                        Err(err) => warn!(error = %err, "dropping malformed frame"),
                    }
                }
                Some(Ok(Message::Close(_))) => return SessionEnd::Remote,
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    // Emit the error only; retry is driven by the close path.
                    let _ = event_tx.send(ConnectionEvent::Error(err.to_string()));
                    return SessionEnd::Remote;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn recv_event(
        rx: &mut mpsc::UnboundedReceiver<ConnectionEvent>,
    ) -> ConnectionEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_connect_receive_and_remote_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();
            ws.send(Message::text(r#"{"type":"summary","summary":{}}"#))
                .await
                .unwrap();
            ws.send(Message::text("not json")).await.unwrap();
            ws.send(Message::text(r#"{"type":"test_complete","message":"done"}"#))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        });

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let policy = RetryPolicy { max_attempts: 0, ..RetryPolicy::default() };
        tokio::spawn(run(format!("ws://{addr}"), policy, cmd_rx, event_tx));
        cmd_tx.send(Command::Connect).unwrap();

        assert!(matches!(recv_event(&mut event_rx).await, ConnectionEvent::Connected));
        assert!(matches!(
            recv_event(&mut event_rx).await,
            ConnectionEvent::Message(Inbound::Summary { .. })
        ));
        // The malformed frame is dropped, not surfaced.
        assert!(matches!(
            recv_event(&mut event_rx).await,
            ConnectionEvent::Message(Inbound::TestComplete { .. })
        ));
        assert!(matches!(
            recv_event(&mut event_rx).await,
            ConnectionEvent::Disconnected
        ));
    }

    #[tokio::test]
    async fn test_connect_failure_schedules_retry_within_budget() {
        // Nothing is listening on this port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let policy = RetryPolicy {
            base: Duration::from_millis(10),
            cap: Duration::from_millis(50),
            max_attempts: 2,
        };
        tokio::spawn(run(format!("ws://{addr}"), policy, cmd_rx, event_tx));
        cmd_tx.send(Command::Connect).unwrap();

        let mut retries = Vec::new();
        let mut disconnects = 0;
        loop {
            match recv_event(&mut event_rx).await {
                ConnectionEvent::RetryScheduled { attempt, delay } => {
                    retries.push((attempt, delay));
                }
                ConnectionEvent::Disconnected => {
                    disconnects += 1;
                    // One failed connect per scheduled retry, plus the
                    // final one that exhausts the budget.
                    if disconnects == 3 {
                        break;
                    }
                }
                ConnectionEvent::Error(_) => {}
                other => panic!("unexpected event: {other:?}"),
            }
        }

        assert_eq!(retries.len(), 2);
        assert_eq!(retries[0].0, 1);
        assert_eq!(retries[1].0, 2);
        // Non-decreasing delays.
        assert!(retries[0].1 <= retries[1].1);
    }

    #[tokio::test]
    async fn test_backoff_resets_after_successful_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let policy = RetryPolicy {
            base: Duration::from_millis(10),
            cap: Duration::from_millis(100),
            max_attempts: 5,
        };
        tokio::spawn(run(format!("ws://{addr}"), policy, cmd_rx, event_tx));
        cmd_tx.send(Command::Connect).unwrap();

        // Let two attempts fail so the delay has grown past the base.
        let mut last_delay = Duration::ZERO;
        let mut retries = 0;
        while retries < 2 {
            if let ConnectionEvent::RetryScheduled { delay, .. } =
                recv_event(&mut event_rx).await
            {
                last_delay = delay;
                retries += 1;
            }
        }
        assert!(last_delay > Duration::from_millis(10));

        // Bring a server up on the same port; a later attempt succeeds
        // and the session is closed from the remote side.
        let listener = TcpListener::bind(addr).await.unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();
            ws.close(None).await.unwrap();
        });
        loop {
            if matches!(recv_event(&mut event_rx).await, ConnectionEvent::Connected) {
                break;
            }
        }
        server.await.unwrap();

        // The very next retry is back at the base delay, attempt 1.
        loop {
            match recv_event(&mut event_rx).await {
                ConnectionEvent::RetryScheduled { attempt, delay } => {
                    assert_eq!(attempt, 1);
                    assert_eq!(delay, Duration::from_millis(10));
                    break;
                }
                ConnectionEvent::Disconnected | ConnectionEvent::Error(_) => {}
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_initial_state_requested_after_settle_delay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => return text.to_string(),
                    Some(Ok(_)) => continue,
                    _ => panic!("connection ended before request"),
                }
            }
        });

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        tokio::spawn(run(
            format!("ws://{addr}"),
            RetryPolicy::default(),
            cmd_rx,
            event_tx,
        ));
        cmd_tx.send(Command::Connect).unwrap();

        assert!(matches!(recv_event(&mut event_rx).await, ConnectionEvent::Connected));
        let request = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request, r#"{"type":"get_initial_data"}"#);
    }

    #[tokio::test]
    async fn test_disconnect_cancels_pending_retry() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let policy = RetryPolicy {
            base: Duration::from_secs(60),
            cap: Duration::from_secs(60),
            max_attempts: 5,
        };
        tokio::spawn(run(format!("ws://{addr}"), policy, cmd_rx, event_tx));
        cmd_tx.send(Command::Connect).unwrap();

        // Wait until the long retry is scheduled, then cancel it.
        loop {
            if let ConnectionEvent::RetryScheduled { .. } = recv_event(&mut event_rx).await {
                break;
            }
        }
        cmd_tx.send(Command::Disconnect).unwrap();

        // No further connect attempts: the channel stays quiet.
        let quiet =
            tokio::time::timeout(Duration::from_millis(200), event_rx.recv()).await;
        assert!(quiet.is_err(), "expected no events after cancel, got {quiet:?}");
    }
}
