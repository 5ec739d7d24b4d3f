/**
 * Connection Hub
 *
 * The hub is the single owner of the set of live connections. It runs as one
 * task that processes `HubCommand`s strictly in arrival order; register,
 * unregister, broadcast and targeted sends are all just commands. Nothing
 * outside this task ever touches the registry, so there is no lock on it.
 *
 * # Registry
 *
 * - `connections`: `ConnectionId` → outbound queue sender
 * - `by_user`: `UserId` → set of `ConnectionId` (one per device/tab)
 *
 * The hub holds the only sender of every outbound queue. Removing an entry
 * drops that sender, which closes the queue; the connection's write pump
 * then drains what is left and closes the socket. A queue therefore closes
 * exactly once, however many times unregister is requested.
 *
 * # Backpressure
 *
 * Every push is a `try_send`. A queue that is full or already closed marks
 * its connection dead: it is removed from the registry on the spot and does
 * not receive the payload. Slow consumers never block the hub or each other.
 */

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::shared::UserId;

/// Opaque identity of one admitted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Sender half of a connection's outbound queue.
pub type OutboundSender = mpsc::Sender<String>;

/// What the hub needs to know about a connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub user_id: UserId,
    outbound: OutboundSender,
}

impl ConnectionHandle {
    /// Wrap the outbound sender of a freshly admitted connection.
    ///
    /// Ownership of the sender moves into the hub on registration.
    pub fn new(user_id: UserId, outbound: OutboundSender) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id,
            outbound,
        }
    }
}

/// Registry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct HubStats {
    /// Live connections
    pub connections: usize,
    /// Distinct users with at least one live connection
    pub users: usize,
}

/// Requests the hub loop understands.
#[derive(Debug)]
pub enum HubCommand {
    Register(ConnectionHandle),
    Unregister(ConnectionId),
    Broadcast(String),
    SendToUser {
        user_id: UserId,
        payload: String,
        delivered: oneshot::Sender<usize>,
    },
    SendToConnection {
        id: ConnectionId,
        payload: String,
    },
    Stats(oneshot::Sender<HubStats>),
    SessionCount {
        user_id: UserId,
        reply: oneshot::Sender<usize>,
    },
}

struct Registered {
    user_id: UserId,
    outbound: OutboundSender,
}

/// The hub task state. Construct with [`Hub::new`] and drive with [`Hub::run`].
pub struct Hub {
    commands: mpsc::Receiver<HubCommand>,
    connections: HashMap<ConnectionId, Registered>,
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
}

impl Hub {
    /// Create a hub and the handle used to reach it.
    pub fn new(queue_capacity: usize) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let hub = Self {
            commands: rx,
            connections: HashMap::new(),
            by_user: HashMap::new(),
        };
        (hub, HubHandle { commands: tx })
    }

    /// Create a hub and run it on a background task.
    pub fn spawn(queue_capacity: usize) -> HubHandle {
        let (hub, handle) = Self::new(queue_capacity);
        tokio::spawn(hub.run());
        handle
    }

    /// Process commands until every `HubHandle` has been dropped.
    pub async fn run(mut self) {
        tracing::info!("[Hub] Started");
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        tracing::info!(
            connections = self.connections.len(),
            "[Hub] All handles dropped, stopping"
        );
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(handle) => self.register(handle),
            HubCommand::Unregister(id) => {
                if self.remove(id) {
                    tracing::debug!(connection_id = %id, "[Hub] Connection unregistered");
                }
            }
            HubCommand::Broadcast(payload) => self.broadcast(&payload),
            HubCommand::SendToUser {
                user_id,
                payload,
                delivered,
            } => {
                let count = self.send_to_user(user_id, &payload);
                let _ = delivered.send(count);
            }
            HubCommand::SendToConnection { id, payload } => {
                if !self.push(id, payload) {
                    tracing::debug!(connection_id = %id, "[Hub] Reply target is gone");
                }
            }
            HubCommand::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            HubCommand::SessionCount { user_id, reply } => {
                let count = self.by_user.get(&user_id).map_or(0, HashSet::len);
                let _ = reply.send(count);
            }
        }
    }

    fn register(&mut self, handle: ConnectionHandle) {
        let ConnectionHandle {
            id,
            user_id,
            outbound,
        } = handle;

        if let Some(previous) = self.connections.insert(id, Registered { user_id, outbound }) {
            tracing::warn!(connection_id = %id, "[Hub] Connection registered twice, replacing entry");
            if previous.user_id != user_id {
                self.detach_user(previous.user_id, id);
            }
        }
        self.by_user.entry(user_id).or_default().insert(id);

        tracing::debug!(
            connection_id = %id,
            user_id,
            sessions = self.by_user.get(&user_id).map_or(0, HashSet::len),
            "[Hub] Connection registered"
        );
    }

    /// Drop a connection's entry, closing its queue. Returns whether it was present.
    fn remove(&mut self, id: ConnectionId) -> bool {
        match self.connections.remove(&id) {
            Some(entry) => {
                self.detach_user(entry.user_id, id);
                true
            }
            None => false,
        }
    }

    fn detach_user(&mut self, user_id: UserId, id: ConnectionId) {
        if let Some(ids) = self.by_user.get_mut(&user_id) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_user.remove(&user_id);
            }
        }
    }

    /// Non-blocking push to one connection. On a full or closed queue the
    /// connection is evicted and `false` is returned.
    fn push(&mut self, id: ConnectionId, payload: String) -> bool {
        let Some(entry) = self.connections.get(&id) else {
            return false;
        };

        match entry.outbound.try_send(payload) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %id, user_id = entry.user_id, "[Hub] Outbound queue full, dropping connection");
                self.remove(id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(connection_id = %id, "[Hub] Outbound queue closed, dropping connection");
                self.remove(id);
                false
            }
        }
    }

    fn broadcast(&mut self, payload: &str) {
        let ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        let mut delivered = 0;
        for id in ids {
            if self.push(id, payload.to_owned()) {
                delivered += 1;
            }
        }
        tracing::debug!(delivered, "[Hub] Broadcast");
    }

    fn send_to_user(&mut self, user_id: UserId, payload: &str) -> usize {
        let ids: Vec<ConnectionId> = match self.by_user.get(&user_id) {
            Some(ids) => ids.iter().copied().collect(),
            None => return 0,
        };
        ids.into_iter()
            .filter(|id| self.push(*id, payload.to_owned()))
            .count()
    }

    fn stats(&self) -> HubStats {
        HubStats {
            connections: self.connections.len(),
            users: self.by_user.len(),
        }
    }
}

/// Cloneable handle to a running hub.
///
/// All methods enqueue a command and return once the hub has accepted it
/// (or, for the query methods, answered it).
#[derive(Clone, Debug)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    async fn send(&self, command: HubCommand) -> Result<(), BackendError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| BackendError::HubUnavailable)
    }

    /// Add a connection to the live set.
    pub async fn register(&self, handle: ConnectionHandle) -> Result<(), BackendError> {
        self.send(HubCommand::Register(handle)).await
    }

    /// Remove a connection and close its queue. Safe to repeat.
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), BackendError> {
        self.send(HubCommand::Unregister(id)).await
    }

    /// Push `payload` to every live connection.
    pub async fn broadcast(&self, payload: String) -> Result<(), BackendError> {
        self.send(HubCommand::Broadcast(payload)).await
    }

    /// Push `payload` to every live connection of `user_id`; returns how many accepted it.
    pub async fn send_to_user(&self, user_id: UserId, payload: String) -> Result<usize, BackendError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::SendToUser {
            user_id,
            payload,
            delivered: tx,
        })
        .await?;
        rx.await.map_err(|_| BackendError::HubUnavailable)
    }

    /// Push `payload` to a single connection.
    pub async fn send_to_connection(&self, id: ConnectionId, payload: String) -> Result<(), BackendError> {
        self.send(HubCommand::SendToConnection { id, payload }).await
    }

    pub async fn stats(&self) -> Result<HubStats, BackendError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Stats(tx)).await?;
        rx.await.map_err(|_| BackendError::HubUnavailable)
    }

    /// Number of live connections owned by `user_id`.
    pub async fn session_count(&self, user_id: UserId) -> Result<usize, BackendError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::SessionCount { user_id, reply: tx }).await?;
        rx.await.map_err(|_| BackendError::HubUnavailable)
    }
}
