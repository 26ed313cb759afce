//! Connection tracking for the game server
//!
//! This module handles the server-side bookkeeping of open connections:
//! - Connection lifecycle (connect, join, disconnect, idle timeout)
//! - The per-connection session state machine
//! - Outbound packet routing to one connection or all joined connections
//! - Connection capacity and address tracking
//!
//! Game-level identity lives in the player registry; a connection only
//! learns its player id once a join succeeds.

use log::{debug, info};
use shared::{Packet, PlayerId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

/// Session state of a single connection.
///
/// A connection starts `Connected`, becomes `Joined` after a successful join
/// and is removed from the manager when it disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Joined(PlayerId),
}

/// An open connection and the channel feeding its writer task
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: u32,
    /// Remote address, for logging
    pub addr: SocketAddr,
    /// Last time we received any packet from this connection
    pub last_seen: Instant,
    pub state: ConnectionState,
    outbound: mpsc::UnboundedSender<Packet>,
    /// Fired on removal so the session stops reading the socket
    stop: oneshot::Sender<()>,
}

impl Client {
    pub fn new(
        id: u32,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Packet>,
        stop: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            state: ConnectionState::Connected,
            outbound,
            stop,
        }
    }

    /// Queues a packet for the writer task. Fails once the writer is gone.
    pub fn send(&self, packet: Packet) -> bool {
        self.outbound.send(packet).is_ok()
    }

    /// Checks if the connection has been silent longer than `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        match self.state {
            ConnectionState::Joined(id) => Some(id),
            ConnectionState::Connected => None,
        }
    }
}

/// Manages all open connections
///
/// Owned by the server loop alongside the game state, so connection
/// bookkeeping and game mutations happen in one processing order.
pub struct ClientManager {
    /// Open connections indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available connection ID
    next_client_id: u32,
    /// Maximum number of concurrent connections allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates a new client manager with the specified capacity limit
    ///
    /// Connection IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new connection
    ///
    /// Returns Some(client_id) if successful, None if the server is at its
    /// connection limit. `stop` is fired when the connection is removed.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Packet>,
        stop: oneshot::Sender<()>,
    ) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Connection {} opened from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, outbound, stop));

        Some(client_id)
    }

    /// Removes a connection and tells its session to close the socket,
    /// returning its final session state
    pub fn remove_client(&mut self, client_id: &u32) -> Option<ConnectionState> {
        let client = self.clients.remove(client_id)?;
        info!("Connection {} from {} closed", client.id, client.addr);
        let _ = client.stop.send(());
        Some(client.state)
    }

    /// Refreshes a connection's idle timer
    pub fn touch(&mut self, client_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    pub fn state(&self, client_id: u32) -> Option<ConnectionState> {
        self.clients.get(&client_id).map(|client| client.state)
    }

    /// Binds a connection to the player it joined as
    pub fn mark_joined(&mut self, client_id: u32, player_id: PlayerId) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.state = ConnectionState::Joined(player_id);
                true
            }
            None => false,
        }
    }

    /// Sends a packet to one connection
    pub fn send(&self, client_id: u32, packet: Packet) -> bool {
        match self.clients.get(&client_id) {
            Some(client) => client.send(packet),
            None => false,
        }
    }

    /// Sends a packet to every joined connection except `exclude`
    ///
    /// Connections that have not joined yet receive nothing. Returns the
    /// number of connections the packet was queued for.
    pub fn broadcast(&self, packet: &Packet, exclude: Option<u32>) -> usize {
        let mut delivered = 0;
        for client in self.clients.values() {
            if Some(client.id) == exclude || client.player_id().is_none() {
                continue;
            }
            if client.send(packet.clone()) {
                delivered += 1;
            } else {
                debug!("Writer for connection {} is gone", client.id);
            }
        }
        delivered
    }

    /// Lists connections silent for longer than `timeout`
    ///
    /// The caller disconnects them through the normal path so that joined
    /// players are released.
    pub fn check_timeouts(&self, timeout: Duration) -> Vec<u32> {
        let mut timed_out: Vec<u32> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(timeout))
            .map(|client| client.id)
            .collect();
        timed_out.sort();
        timed_out
    }

    /// Returns the number of open connections
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no connections are open
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn joined_count(&self) -> usize {
        self.clients
            .values()
            .filter(|client| client.player_id().is_some())
            .count()
    }
}
