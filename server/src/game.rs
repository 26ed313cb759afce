use crate::board::Board;
use crate::moves;
use crate::registry::PlayerRegistry;
use crate::spawn;
use log::{debug, info};
use shared::{
    Bounds, Coord, GameError, Piece, PlacedPiece, Player, PlayerId, DEFAULT_MAX_PLAYERS,
    DEFAULT_MIN_SPAWN_DISTANCE, DEFAULT_MOVE_COOLDOWN_MS,
};
use std::collections::HashMap;
use std::time::Duration;

/// What happens to a departed player's pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanPolicy {
    KeepForever,
    ExpireAfter(Duration),
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub max_players: usize,
    pub min_spawn_distance: f64,
    pub move_cooldown: Duration,
    pub orphan_policy: OrphanPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            min_spawn_distance: DEFAULT_MIN_SPAWN_DISTANCE,
            move_cooldown: Duration::from_millis(DEFAULT_MOVE_COOLDOWN_MS),
            orphan_policy: OrphanPolicy::KeepForever,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Coord,
    pub to: Coord,
}

impl Move {
    pub fn new(from: Coord, to: Coord) -> Self {
        Self { from, to }
    }
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub player: Player,
    pub pieces: Vec<PlacedPiece>,
}

#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub player_id: PlayerId,
    pub from: Coord,
    pub to: Coord,
    pub piece: Piece,
    pub captured: Option<Piece>,
}

/// Authoritative game state: board, players and per-player move timing.
///
/// Owned by exactly one task; every command runs to completion before the
/// next one starts.
pub struct GameState {
    board: Board,
    registry: PlayerRegistry,
    config: GameConfig,
    last_move_at: HashMap<PlayerId, u64>,
    departed_at: HashMap<PlayerId, u64>,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            board: Board::new(),
            registry: PlayerRegistry::new(config.max_players),
            config,
            last_move_at: HashMap::new(),
            departed_at: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    /// Creates a player and places a full set around a fresh spawn anchor.
    pub fn join(&mut self, name: Option<&str>, now: u64) -> Result<JoinOutcome, GameError> {
        if !self.registry.has_capacity() {
            return Err(GameError::CapacityExceeded);
        }

        let anchors = self.registry.active_anchors();
        let board = &self.board;
        let anchor = spawn::find_anchor(&anchors, self.config.min_spawn_distance, |at| {
            board.is_empty_at(at)
        })
        .ok_or(GameError::NoSpawnSpace)?;

        let player = self.registry.join(name, anchor, now)?;

        let mut pieces = Vec::with_capacity(shared::PIECES_PER_PLAYER);
        for (at, kind) in spawn::formation(anchor) {
            let piece = Piece::new(kind, player.color.clone(), Some(player.id));
            if self.board.place(at, piece.clone()) {
                pieces.push(PlacedPiece { at, piece });
            }
        }
        pieces.sort_by_key(|placed| (placed.at.y, placed.at.x));

        Ok(JoinOutcome { player, pieces })
    }

    /// Deactivates a player. Their pieces stay on the board.
    pub fn leave(&mut self, id: PlayerId, now: u64) -> Option<Player> {
        let player = self.registry.leave(id)?;
        self.last_move_at.remove(&id);
        self.departed_at.insert(id, now);
        info!(
            "{} pieces of player {} are now orphaned",
            self.board.count_owned_by(id),
            id
        );
        Some(player)
    }

    pub fn is_move_legal(&self, mv: &Move, player_id: PlayerId, now: u64) -> Result<(), GameError> {
        if !self.registry.is_active(player_id) {
            return Err(GameError::UnknownPlayer);
        }

        let cooldown = self.config.move_cooldown.as_millis() as u64;
        if let Some(last) = self.last_move_at.get(&player_id) {
            if now.saturating_sub(*last) < cooldown {
                return Err(GameError::RateLimited);
            }
        }

        let piece = self.board.get(mv.from).ok_or(GameError::NoPieceAtSource)?;
        if piece.owner != Some(player_id) {
            return Err(GameError::NotOwner);
        }

        moves::validate(piece, mv.from, mv.to, &self.board)
    }

    /// Validates and applies a move for `player_id`.
    pub fn apply_move(
        &mut self,
        mv: Move,
        player_id: PlayerId,
        now: u64,
    ) -> Result<MoveOutcome, GameError> {
        if let Err(e) = self.is_move_legal(&mv, player_id, now) {
            debug!(
                "Rejected move {} -> {} by player {}: {}",
                mv.from, mv.to, player_id, e
            );
            return Err(e);
        }

        let captured = self.board.apply_move(mv.from, mv.to)?;
        self.last_move_at.insert(player_id, now);

        let piece = self
            .board
            .get(mv.to)
            .cloned()
            .ok_or(GameError::NoPieceAtSource)?;

        if let Some(taken) = &captured {
            info!(
                "Player {} {} captured {} at {}",
                player_id, piece.kind, taken.kind, mv.to
            );
        }

        Ok(MoveOutcome {
            player_id,
            from: mv.from,
            to: mv.to,
            piece,
            captured,
        })
    }

    fn owned_by_active(&self, piece: &Piece) -> bool {
        piece
            .owner
            .map_or(false, |owner| self.registry.is_active(owner))
    }

    /// Active players' pieces inside `bounds`.
    pub fn query_section(&self, bounds: &Bounds) -> Vec<PlacedPiece> {
        self.board
            .pieces_in(bounds, |piece| self.owned_by_active(piece))
    }

    /// Every active player's pieces.
    pub fn snapshot(&self) -> Vec<PlacedPiece> {
        self.board.pieces_where(|piece| self.owned_by_active(piece))
    }

    /// Removes pieces of players who left at least the orphan TTL ago.
    ///
    /// Returns each swept player with the number of pieces removed.
    pub fn sweep_orphans(&mut self, now: u64) -> Vec<(PlayerId, usize)> {
        let ttl = match self.config.orphan_policy {
            OrphanPolicy::KeepForever => return Vec::new(),
            OrphanPolicy::ExpireAfter(ttl) => ttl.as_millis() as u64,
        };

        let mut swept = Vec::new();
        for id in self.registry.inactive_ids() {
            let expired = self
                .departed_at
                .get(&id)
                .map_or(false, |left| now.saturating_sub(*left) >= ttl);
            if !expired {
                continue;
            }

            let removed = self.board.remove_owned_by(id);
            self.registry.forget(id);
            self.departed_at.remove(&id);
            info!("Swept {} orphaned pieces of player {}", removed, id);
            swept.push((id, removed));
        }
        swept
    }
}
