//! Connection registry and outbound event delivery
//!
//! This module tracks every connected participant, including:
//! - Connection lifecycle (register on accept, unregister on disconnect)
//! - The joined display name associated with each connection
//! - Per-connection outbound channels for event delivery
//!
//! Delivery is fire-and-forget: events are pushed onto an unbounded channel
//! drained by the connection's writer task, so the session loop never waits
//! on socket I/O.

use log::{debug, info};
use shared::ServerEvent;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Identifier assigned to each accepted connection, unique for the lifetime
/// of the process.
pub type ConnId = u32;

/// A connected participant.
///
/// Holds the outbound channel to the connection's writer task and, once the
/// participant has joined, the sanitized display name used for turn
/// ownership and departure handling.
#[derive(Debug)]
struct ClientConn {
    /// Outbound events destined for this connection.
    sender: mpsc::UnboundedSender<ServerEvent>,
    /// Display name registered by a successful join; `None` for spectators.
    name: Option<String>,
}

/// Tracks all live connections and routes outbound events
///
/// The registry is owned by the session task and only touched from there,
/// so it needs no internal synchronization. It answers the two questions the
/// state machine keeps asking: "who is this connection?" and "how do I reach
/// everyone?".
pub struct ClientRegistry {
    clients: HashMap<ConnId, ClientConn>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Registers a freshly accepted connection with its outbound channel.
    pub fn register(&mut self, conn: ConnId, sender: mpsc::UnboundedSender<ServerEvent>) {
        info!("Connection {} registered", conn);
        self.clients.insert(conn, ClientConn { sender, name: None });
    }

    /// Removes a connection entirely. Returns true if it was present.
    pub fn unregister(&mut self, conn: ConnId) -> bool {
        if self.clients.remove(&conn).is_some() {
            info!("Connection {} unregistered", conn);
            true
        } else {
            false
        }
    }

    /// Associates a joined display name with a connection so later presses
    /// and departures can be attributed to it.
    pub fn associate_name(&mut self, conn: ConnId, name: String) {
        if let Some(client) = self.clients.get_mut(&conn) {
            debug!("Connection {} assigned name {}", conn, name);
            client.name = Some(name);
        }
    }

    /// Detaches and returns the name associated with a connection.
    ///
    /// Leaves the connection registered, so an explicit exit followed by the
    /// transport-level disconnect of the same connection is processed once:
    /// the second call finds no name and the caller treats it as a no-op.
    pub fn clear_name(&mut self, conn: ConnId) -> Option<String> {
        self.clients.get_mut(&conn).and_then(|c| c.name.take())
    }

    /// The name a connection joined under, if any.
    pub fn name_of(&self, conn: ConnId) -> Option<&str> {
        self.clients.get(&conn).and_then(|c| c.name.as_deref())
    }

    /// Sends an event to one connection. A closed channel means the writer
    /// task is already gone; the disconnect event is on its way, so the
    /// failure is only worth a debug line.
    pub fn send_to(&self, conn: ConnId, event: ServerEvent) {
        if let Some(client) = self.clients.get(&conn) {
            if client.sender.send(event).is_err() {
                debug!("Connection {} outbound channel closed", conn);
            }
        }
    }

    /// Sends an event to every connected participant, joined or not.
    pub fn broadcast(&self, event: &ServerEvent) {
        for (conn, client) in &self.clients {
            if client.sender.send(event.clone()).is_err() {
                debug!("Connection {} outbound channel closed", conn);
            }
        }
    }

    /// Returns the number of live connections.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
