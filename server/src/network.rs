//! Server network layer: TCP sessions, command routing and broadcasts

use crate::client_manager::{ClientManager, ConnectionState};
use crate::error::ServerError;
use crate::game::{GameConfig, GameState, Move};
use log::{debug, error, info, warn};
use shared::codec::{read_frame, write_frame};
use shared::{get_timestamp, Coord, GameError, Packet, PlayerId};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    NewConnection {
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Packet>,
        stop: oneshot::Sender<()>,
        reply: oneshot::Sender<Option<u32>>,
    },
    PacketReceived {
        client_id: u32,
        packet: Packet,
    },
    MalformedPacket {
        client_id: u32,
    },
    ConnectionLost {
        client_id: u32,
    },
    Shutdown,
}

/// Network knobs that do not affect game rules
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_connections: usize,
    pub idle_timeout: Duration,
    pub housekeeping_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 256,
            idle_timeout: Duration::from_secs(30),
            housekeeping_interval: Duration::from_secs(1),
        }
    }
}

/// Main server owning the game state and every connection's session
pub struct Server {
    listener: Option<TcpListener>,
    acceptor: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
    clients: ClientManager,
    game_state: GameState,
    config: ServerConfig,
    housekeeping_ticks: u64,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        game_config: GameConfig,
        config: ServerConfig,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            acceptor: None,
            local_addr,
            clients: ClientManager::new(config.max_connections),
            game_state: GameState::new(game_config),
            config,
            housekeeping_ticks: 0,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sender for injecting messages, e.g. `ServerMessage::Shutdown`
    pub fn handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Spawns task that accepts connections and starts a session per socket
    fn spawn_acceptor(&mut self) -> Result<(), ServerError> {
        let listener = self.listener.take().ok_or(ServerError::AlreadyRunning)?;
        let server_tx = self.server_tx.clone();

        let acceptor = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let server_tx = server_tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = run_session(stream, addr, server_tx).await {
                                debug!("Session with {} ended: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
        self.acceptor = Some(acceptor);
        Ok(())
    }

    /// Processes one message to completion. Returns false on shutdown.
    pub fn handle_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::NewConnection {
                addr,
                outbound,
                stop,
                reply,
            } => {
                let client_id = self.clients.add_client(addr, outbound, stop);
                if client_id.is_none() {
                    warn!("Refusing connection from {}: connection limit reached", addr);
                }
                let _ = reply.send(client_id);
            }
            ServerMessage::PacketReceived { client_id, packet } => {
                self.handle_packet(client_id, packet);
            }
            ServerMessage::MalformedPacket { client_id } => {
                warn!("Malformed packet from connection {}", client_id);
                self.clients.touch(client_id);
                self.clients.send(
                    client_id,
                    Packet::Rejected {
                        reason: GameError::IllegalPattern,
                    },
                );
            }
            ServerMessage::ConnectionLost { client_id } => {
                self.disconnect(client_id, "connection lost");
            }
            ServerMessage::Shutdown => {
                info!("Server shutting down");
                return false;
            }
        }
        true
    }

    /// Routes a packet according to the sender's session state
    fn handle_packet(&mut self, client_id: u32, packet: Packet) {
        let state = match self.clients.state(client_id) {
            Some(state) => state,
            None => {
                debug!(
                    "Dropping {} from closed connection {}",
                    packet.name(),
                    client_id
                );
                return;
            }
        };
        self.clients.touch(client_id);

        match (packet, state) {
            (Packet::Join { name }, ConnectionState::Connected) => {
                self.handle_join(client_id, name);
            }
            (Packet::Join { .. }, ConnectionState::Joined(_)) => {
                self.reject(client_id, GameError::AlreadyJoined);
            }

            (
                Packet::Move {
                    from_x,
                    from_y,
                    to_x,
                    to_y,
                },
                ConnectionState::Joined(player_id),
            ) => {
                let mv = Move::new(Coord::new(from_x, from_y), Coord::new(to_x, to_y));
                self.handle_move(client_id, player_id, mv);
            }
            (Packet::Move { .. }, ConnectionState::Connected) => {
                self.clients.send(
                    client_id,
                    Packet::InvalidMove {
                        reason: GameError::UnknownPlayer,
                    },
                );
            }

            (Packet::QuerySection { bounds }, ConnectionState::Joined(_)) => {
                let pieces = self.game_state.query_section(&bounds);
                self.clients
                    .send(client_id, Packet::Section { bounds, pieces });
            }
            (Packet::QuerySection { .. }, ConnectionState::Connected) => {
                self.reject(client_id, GameError::UnknownPlayer);
            }

            (Packet::Heartbeat { .. }, _) => {}

            (Packet::Leave, _) => {
                self.disconnect(client_id, "left");
            }

            (other, _) => {
                warn!(
                    "Unexpected {} packet from connection {}",
                    other.name(),
                    client_id
                );
                self.reject(client_id, GameError::IllegalPattern);
            }
        }
    }

    fn handle_join(&mut self, client_id: u32, name: Option<String>) {
        match self.game_state.join(name.as_deref(), get_timestamp()) {
            Ok(outcome) => {
                let player_id = outcome.player.id;
                self.clients.mark_joined(client_id, player_id);

                let joined = Packet::Joined {
                    player_id,
                    player: outcome.player.clone(),
                    board: self.game_state.snapshot(),
                    players: self.game_state.registry().active_players(),
                };
                self.clients.send(client_id, joined);

                let notice = Packet::JoinedNotice {
                    player: outcome.player,
                    pieces: outcome.pieces,
                };
                self.clients.broadcast(&notice, Some(client_id));
            }
            Err(GameError::CapacityExceeded) => {
                info!("Connection {} tried to join a full game", client_id);
                self.clients.send(client_id, Packet::Full);
            }
            Err(e) => {
                warn!("Join from connection {} failed: {}", client_id, e);
                self.reject(client_id, e);
            }
        }
    }

    fn handle_move(&mut self, client_id: u32, player_id: PlayerId, mv: Move) {
        match self.game_state.apply_move(mv, player_id, get_timestamp()) {
            Ok(outcome) => {
                let moved = Packet::Moved {
                    player_id: outcome.player_id,
                    from_x: outcome.from.x,
                    from_y: outcome.from.y,
                    to_x: outcome.to.x,
                    to_y: outcome.to.y,
                    piece: outcome.piece,
                    captured: outcome.captured,
                };
                self.clients.broadcast(&moved, None);
            }
            Err(reason) => {
                self.clients
                    .send(client_id, Packet::InvalidMove { reason });
            }
        }
    }

    fn reject(&self, client_id: u32, reason: GameError) {
        self.clients.send(client_id, Packet::Rejected { reason });
    }

    /// Ends a session; a joined player leaves and everyone else is told
    fn disconnect(&mut self, client_id: u32, reason: &str) {
        let state = match self.clients.remove_client(&client_id) {
            Some(state) => state,
            None => return,
        };
        debug!("Connection {} disconnected: {}", client_id, reason);

        if let ConnectionState::Joined(player_id) = state {
            if self.game_state.leave(player_id, get_timestamp()).is_some() {
                self.clients
                    .broadcast(&Packet::LeftNotice { player_id }, None);
            }
        }
    }

    /// Idle timeouts, orphan sweeping and periodic stats
    fn housekeeping(&mut self) {
        for client_id in self.clients.check_timeouts(self.config.idle_timeout) {
            self.disconnect(client_id, "idle timeout");
        }

        for (player_id, removed) in self.game_state.sweep_orphans(get_timestamp()) {
            self.clients
                .broadcast(&Packet::PiecesCleared { player_id, removed }, None);
        }

        self.housekeeping_ticks += 1;
        if self.housekeeping_ticks % 60 == 0 && !self.clients.is_empty() {
            debug!(
                "{} connections ({} joined), {} players, {} pieces on board",
                self.clients.len(),
                self.clients.joined_count(),
                self.game_state.registry().active_count(),
                self.game_state.board().len()
            );
        }
    }

    /// Main server loop: the only place game state is mutated
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.spawn_acceptor()?;

        let mut housekeeping = interval(self.config.housekeeping_interval);
        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => {
                            if !self.handle_message(message) {
                                break;
                            }
                        }
                        None => break,
                    }
                },
                _ = housekeeping.tick() => {
                    self.housekeeping();
                },
            }
        }

        if let Some(acceptor) = self.acceptor.take() {
            acceptor.abort();
        }
        Ok(())
    }
}

/// Drives one TCP connection: registers it, then pumps frames both ways
async fn run_session(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) -> Result<(), ServerError> {
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let (stop, mut stop_rx) = oneshot::channel();
    let (reply, reply_rx) = oneshot::channel();

    if server_tx
        .send(ServerMessage::NewConnection {
            addr,
            outbound,
            stop,
            reply,
        })
        .is_err()
    {
        return Ok(());
    }

    let client_id = match reply_rx.await {
        Ok(Some(client_id)) => client_id,
        _ => {
            write_frame(&mut writer, &Packet::Full).await?;
            return Ok(());
        }
    };

    tokio::spawn(pump_outbound(client_id, writer, outbound_rx));
    tokio::select! {
        _ = pump_inbound(client_id, &mut reader, &server_tx) => {},
        // Removed by the server (idle timeout, leave): stop reading so the socket closes.
        _ = &mut stop_rx => {
            debug!("Connection {} stopped by server", client_id);
        },
    }
    Ok(())
}

/// Writes queued packets until the server drops the connection's sender
async fn pump_outbound(
    client_id: u32,
    mut writer: OwnedWriteHalf,
    mut outbound_rx: mpsc::UnboundedReceiver<Packet>,
) {
    while let Some(packet) = outbound_rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &packet).await {
            error!("Failed to send to connection {}: {}", client_id, e);
            break;
        }
    }
}

/// Forwards decoded frames to the server loop until the stream ends
async fn pump_inbound(
    client_id: u32,
    reader: &mut OwnedReadHalf,
    server_tx: &mpsc::UnboundedSender<ServerMessage>,
) {
    loop {
        let message = match read_frame(reader).await {
            Ok(packet) => {
                let leaving = packet == Packet::Leave;
                let message = ServerMessage::PacketReceived { client_id, packet };
                if server_tx.send(message).is_err() || leaving {
                    return;
                }
                continue;
            }
            Err(e) if e.is_recoverable() => ServerMessage::MalformedPacket { client_id },
            Err(e) => {
                debug!("Connection {} read ended: {}", client_id, e);
                let _ = server_tx.send(ServerMessage::ConnectionLost { client_id });
                return;
            }
        };

        if server_tx.send(message).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Bounds, PieceType};

    struct TestConnection {
        id: u32,
        rx: mpsc::UnboundedReceiver<Packet>,
        stopped: oneshot::Receiver<()>,
    }

    impl TestConnection {
        fn drain(&mut self) -> Vec<Packet> {
            let mut packets = Vec::new();
            while let Ok(packet) = self.rx.try_recv() {
                packets.push(packet);
            }
            packets
        }
    }

    async fn test_server(game_config: GameConfig) -> Server {
        Server::new("127.0.0.1:0", game_config, ServerConfig::default())
            .await
            .unwrap()
    }

    fn no_cooldown() -> GameConfig {
        GameConfig {
            move_cooldown: Duration::ZERO,
            ..GameConfig::default()
        }
    }

    fn connect(server: &mut Server) -> TestConnection {
        let (outbound, rx) = mpsc::unbounded_channel();
        let (stop, stopped) = oneshot::channel();
        let (reply, mut reply_rx) = oneshot::channel();
        server.handle_message(ServerMessage::NewConnection {
            addr: "127.0.0.1:9000".parse().unwrap(),
            outbound,
            stop,
            reply,
        });
        let id = reply_rx.try_recv().unwrap().unwrap();
        TestConnection { id, rx, stopped }
    }

    fn send(server: &mut Server, conn: &TestConnection, packet: Packet) {
        server.handle_message(ServerMessage::PacketReceived {
            client_id: conn.id,
            packet,
        });
    }

    fn join(server: &mut Server, name: &str) -> (TestConnection, PlayerId) {
        let mut conn = connect(server);
        send(
            server,
            &conn,
            Packet::Join {
                name: Some(name.to_string()),
            },
        );
        let player_id = match conn.drain().into_iter().next() {
            Some(Packet::Joined { player_id, .. }) => player_id,
            other => panic!("Expected joined, got {:?}", other),
        };
        (conn, player_id)
    }

    #[tokio::test]
    async fn test_join_reply_and_notice() {
        let mut server = test_server(no_cooldown()).await;
        let (mut alice, alice_id) = join(&mut server, "Alice");
        let mut bob = connect(&mut server);
        send(
            &mut server,
            &bob,
            Packet::Join {
                name: Some("Bob".to_string()),
            },
        );

        match bob.drain().as_slice() {
            [Packet::Joined {
                player, board, players, ..
            }] => {
                assert_eq!(player.name, "Bob");
                assert_eq!(board.len(), 32);
                assert_eq!(players.len(), 2);
                assert_eq!(players[0].id, alice_id);
            }
            other => panic!("Unexpected packets {:?}", other),
        }
        match alice.drain().as_slice() {
            [Packet::JoinedNotice { player, pieces }] => {
                assert_eq!(player.name, "Bob");
                assert_eq!(pieces.len(), 16);
            }
            other => panic!("Unexpected packets {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_commands_before_join_are_rejected() {
        let mut server = test_server(no_cooldown()).await;
        let mut conn = connect(&mut server);

        send(&mut server, &conn, Packet::move_between(Coord::new(0, 1), Coord::new(0, 2)));
        send(
            &mut server,
            &conn,
            Packet::QuerySection {
                bounds: Bounds::new(0, 1, 0, 1),
            },
        );

        assert_eq!(
            conn.drain(),
            vec![
                Packet::InvalidMove {
                    reason: GameError::UnknownPlayer
                },
                Packet::Rejected {
                    reason: GameError::UnknownPlayer
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_second_join_is_rejected() {
        let mut server = test_server(no_cooldown()).await;
        let (mut alice, _) = join(&mut server, "Alice");
        send(&mut server, &alice, Packet::Join { name: None });

        assert_eq!(
            alice.drain(),
            vec![Packet::Rejected {
                reason: GameError::AlreadyJoined
            }]
        );
        assert_eq!(server.game_state().registry().active_count(), 1);
    }

    #[tokio::test]
    async fn test_move_broadcast_and_invalid_move_to_sender_only() {
        let mut server = test_server(no_cooldown()).await;
        let (mut alice, alice_id) = join(&mut server, "Alice");
        let (mut bob, _) = join(&mut server, "Bob");
        alice.drain();

        send(&mut server, &alice, Packet::move_between(Coord::new(0, 1), Coord::new(0, 2)));
        for conn in [&mut alice, &mut bob] {
            match conn.drain().as_slice() {
                [Packet::Moved {
                    player_id,
                    to_y,
                    piece,
                    captured,
                    ..
                }] => {
                    assert_eq!(*player_id, alice_id);
                    assert_eq!(*to_y, 2);
                    assert_eq!(piece.kind, PieceType::Pawn);
                    assert!(captured.is_none());
                }
                other => panic!("Unexpected packets {:?}", other),
            }
        }

        send(&mut server, &bob, Packet::move_between(Coord::new(0, 2), Coord::new(0, 3)));
        assert_eq!(
            bob.drain(),
            vec![Packet::InvalidMove {
                reason: GameError::NotOwner
            }]
        );
        assert!(alice.drain().is_empty());
    }

    #[tokio::test]
    async fn test_full_game() {
        let mut server = test_server(GameConfig {
            max_players: 1,
            ..no_cooldown()
        })
        .await;
        join(&mut server, "Alice");
        let mut late = connect(&mut server);
        send(&mut server, &late, Packet::Join { name: None });

        assert_eq!(late.drain(), vec![Packet::Full]);
        assert_eq!(server.game_state().registry().active_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_notifies_others_and_hides_pieces() {
        let mut server = test_server(no_cooldown()).await;
        let (mut alice, _) = join(&mut server, "Alice");
        let (bob, bob_id) = join(&mut server, "Bob");
        alice.drain();

        server.handle_message(ServerMessage::ConnectionLost { client_id: bob.id });
        assert_eq!(
            alice.drain(),
            vec![Packet::LeftNotice { player_id: bob_id }]
        );

        send(
            &mut server,
            &alice,
            Packet::QuerySection {
                bounds: Bounds::new(-100, 100, -100, 100),
            },
        );
        match alice.drain().as_slice() {
            [Packet::Section { pieces, .. }] => assert_eq!(pieces.len(), 16),
            other => panic!("Unexpected packets {:?}", other),
        }
        assert_eq!(server.game_state().board().len(), 32);
    }

    #[tokio::test]
    async fn test_malformed_packet_is_answered() {
        let mut server = test_server(no_cooldown()).await;
        let mut conn = connect(&mut server);
        server.handle_message(ServerMessage::MalformedPacket { client_id: conn.id });

        assert_eq!(
            conn.drain(),
            vec![Packet::Rejected {
                reason: GameError::IllegalPattern
            }]
        );
    }

    #[tokio::test]
    async fn test_leave_then_packets_are_ignored() {
        let mut server = test_server(no_cooldown()).await;
        let (alice, alice_id) = join(&mut server, "Alice");
        send(&mut server, &alice, Packet::Leave);
        send(&mut server, &alice, Packet::move_between(Coord::new(0, 1), Coord::new(0, 2)));

        assert!(!server.game_state().registry().is_active(alice_id));
        assert!(server.game_state().board().get(Coord::new(0, 1)).is_some());
    }

    #[tokio::test]
    async fn test_full_at_default_capacity() {
        let mut server = test_server(GameConfig::default()).await;
        for i in 0..shared::DEFAULT_MAX_PLAYERS {
            join(&mut server, &format!("Player {}", i));
        }
        let mut late = connect(&mut server);
        send(&mut server, &late, Packet::Join { name: None });

        assert_eq!(late.drain(), vec![Packet::Full]);
        assert_eq!(
            server.game_state().registry().active_count(),
            shared::DEFAULT_MAX_PLAYERS
        );
        assert!(server.game_state().registry().get(PlayerId(101)).is_none());
        assert_eq!(
            server.game_state().board().len(),
            shared::DEFAULT_MAX_PLAYERS * shared::PIECES_PER_PLAYER
        );
    }

    #[tokio::test]
    async fn test_idle_timeout_stops_session() {
        let mut server = Server::new(
            "127.0.0.1:0",
            no_cooldown(),
            ServerConfig {
                idle_timeout: Duration::ZERO,
                ..ServerConfig::default()
            },
        )
        .await
        .unwrap();
        let (mut alice, alice_id) = join(&mut server, "Alice");
        std::thread::sleep(Duration::from_millis(5));

        server.housekeeping();

        assert!(alice.stopped.try_recv().is_ok());
        assert!(!server.game_state().registry().is_active(alice_id));
        assert!(server.clients.is_empty());
    }

    #[tokio::test]
    async fn test_leave_stops_session() {
        let mut server = test_server(no_cooldown()).await;
        let (mut alice, _) = join(&mut server, "Alice");
        assert!(alice.stopped.try_recv().is_err());

        send(&mut server, &alice, Packet::Leave);
        assert!(alice.stopped.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_message_stops_loop() {
        let mut server = test_server(no_cooldown()).await;
        assert!(!server.handle_message(ServerMessage::Shutdown));
    }
}
