/**
 * Connection Pumps
 *
 * One admitted WebSocket session. The socket is split in two and each half
 * has exactly one owner:
 *
 * - the read pump (runs on the upgrade task) decodes inbound frames and hands
 *   them to the dispatcher, one at a time, in arrival order;
 * - the write pump (spawned) drains the bounded outbound queue into the sink.
 *
 * The hub owns the queue's only sender. When the hub drops it, the write pump
 * flushes what is left, sends a close frame and exits.
 *
 * # Lifecycle
 *
 * 1. register with the hub, broadcast `newUser`
 * 2. pump until a read error, a close frame, or the idle timeout
 * 3. broadcast `disconnectUser`, unregister, wait for the write pump to close the socket
 *
 * Ping/pong frames count as activity, and the write pump pings on
 * `ping_interval`, so a healthy client never trips the idle timeout.
 */

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{timeout, MissedTickBehavior};

use crate::backend::chat::{Dispatcher, Origin};
use crate::backend::error::BackendError;
use crate::backend::realtime::hub::{ConnectionHandle, HubHandle};
use crate::backend::realtime::presence;
use crate::backend::server::state::AppState;
use crate::shared::UserId;

/// How long the write pump gets to flush and close after unregistration.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Why the read pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ClientClosed,
    StreamEnded,
    ReadError,
    IdleTimeout,
}

/// Drive an admitted socket until it terminates.
pub async fn run_connection(socket: WebSocket, user_id: UserId, state: AppState) {
    let (sink, stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.outbound_queue_capacity);

    let handle = ConnectionHandle::new(user_id, outbound_tx);
    let origin = Origin {
        connection_id: handle.id,
        user_id,
    };

    if let Err(e) = state.hub.register(handle).await {
        tracing::error!(user_id, error = %e, "[Connection] Could not register");
        return;
    }
    presence::announce_connected(&state.hub, user_id).await;

    tracing::info!(user_id, connection_id = %origin.connection_id, "[Connection] Admitted");

    let writer = tokio::spawn(write_pump(sink, outbound_rx, state.config.ping_interval));

    let reason = read_pump(stream, origin, &state.dispatcher, state.config.idle_timeout).await;

    terminate(&state.hub, origin).await;

    let abort = writer.abort_handle();
    if timeout(CLOSE_GRACE, writer).await.is_err() {
        tracing::warn!(connection_id = %origin.connection_id, "[Connection] Writer did not finish, aborting");
        abort.abort();
    }

    tracing::info!(
        user_id,
        connection_id = %origin.connection_id,
        ?reason,
        "[Connection] Closed"
    );
}

/// Presence first, then unregistration (which closes the outbound queue).
async fn terminate(hub: &HubHandle, origin: Origin) {
    presence::announce_disconnected(hub, origin.user_id).await;
    if let Err(e) = hub.unregister(origin.connection_id).await {
        tracing::warn!(connection_id = %origin.connection_id, error = %e, "[Connection] Unregister failed");
    }
}

async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    origin: Origin,
    dispatcher: &Dispatcher,
    idle_timeout: Duration,
) -> Termination {
    loop {
        let next = match timeout(idle_timeout, stream.next()).await {
            Ok(next) => next,
            Err(_) => {
                tracing::info!(connection_id = %origin.connection_id, "[Connection] Idle timeout");
                return Termination::IdleTimeout;
            }
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                tracing::debug!(connection_id = %origin.connection_id, len = text.len(), "[Connection] Frame received");
                if let Err(e) = dispatcher.dispatch_frame(origin, text.as_str()).await {
                    log_dispatch_error(origin, &e);
                }
            }
            Some(Ok(Message::Binary(data))) => {
                tracing::debug!(connection_id = %origin.connection_id, len = data.len(), "[Connection] Ignoring binary frame");
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!(connection_id = %origin.connection_id, ?frame, "[Connection] Client initiated close");
                return Termination::ClientClosed;
            }
            Some(Err(e)) => {
                tracing::debug!(connection_id = %origin.connection_id, error = %e, "[Connection] Read error");
                return Termination::ReadError;
            }
            None => return Termination::StreamEnded,
        }
    }
}

fn log_dispatch_error(origin: Origin, error: &BackendError) {
    match error {
        BackendError::ProtocolError { .. } | BackendError::SharedError(_) => {
            tracing::warn!(
                user_id = origin.user_id,
                connection_id = %origin.connection_id,
                error = %error,
                "[Connection] Dropping frame"
            );
        }
        _ => {
            tracing::error!(
                user_id = origin.user_id,
                connection_id = %origin.connection_id,
                error = %error,
                "[Connection] Frame handling failed"
            );
        }
    }
}

async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    ping_interval: Duration,
) {
    let mut ping = tokio::time::interval(ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ping.tick().await;

    loop {
        tokio::select! {
            item = outbound.recv() => match item {
                Some(first) => {
                    let frame = coalesce(first, &mut outbound);
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            _ = ping.tick() => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
}

/// Join `first` with whatever is already queued, one payload per line.
fn coalesce(first: String, outbound: &mut mpsc::Receiver<String>) -> String {
    let queued = outbound.len();
    let mut frame = first;
    for _ in 0..queued {
        match outbound.try_recv() {
            Ok(next) => {
                frame.push('\n');
                frame.push_str(&next);
            }
            Err(_) => break,
        }
    }
    frame
}
