//! Live connections: outbound senders and heartbeat tracking.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::ServerMessage;

pub type ConnectionId = Uuid;

/// Unanswered probes tolerated before a connection is dropped
pub const MAX_MISSED_HEARTBEATS: u32 = 2;

/// Frames the send task writes to a socket
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(ServerMessage),
    Ping,
}

/// Mapping from connection ID to its outbound channel, shared between the
/// connection tasks and the coordinator.
#[derive(Default)]
pub struct ConnectionManager {
    senders: DashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: ConnectionId, sender: mpsc::UnboundedSender<Outbound>) {
        self.senders.insert(id, sender);
    }

    pub fn unregister(&self, id: ConnectionId) {
        self.senders.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Send a message to a specific connection. A closed connection is not an
    /// error; the message is dropped.
    pub fn send(&self, id: ConnectionId, msg: ServerMessage) {
        self.push(id, Outbound::Message(msg));
    }

    /// Ask the connection's send task to write a ping frame
    pub fn ping(&self, id: ConnectionId) {
        self.push(id, Outbound::Ping);
    }

    /// Send the same message to every listed connection, in order.
    pub fn broadcast<I>(&self, ids: I, msg: &ServerMessage)
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        for id in ids {
            self.send(id, msg.clone());
        }
    }

    fn push(&self, id: ConnectionId, frame: Outbound) {
        match self.senders.get(&id) {
            Some(sender) => {
                if sender.send(frame).is_err() {
                    debug!(connection = %id, "dropping frame for closed connection");
                }
            }
            None => debug!(connection = %id, "dropping frame for unknown connection"),
        }
    }
}

/// Result of a heartbeat tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Send another probe
    Alive,
    /// Too many probes went unanswered
    Expired,
}

/// Per-connection liveness probe state
#[derive(Debug, Default)]
pub struct Heartbeat {
    missed: u32,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval elapsed: either probe again or give up
    pub fn on_tick(&mut self) -> Liveness {
        if self.missed >= MAX_MISSED_HEARTBEATS {
            return Liveness::Expired;
        }
        self.missed += 1;
        Liveness::Alive
    }

    /// Any sign of life from the peer
    pub fn on_activity(&mut self) {
        self.missed = 0;
    }
}
