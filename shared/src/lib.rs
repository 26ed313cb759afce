use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod codec;
pub mod error;

pub use error::GameError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_PLAYERS: usize = 100;
pub const DEFAULT_MIN_SPAWN_DISTANCE: f64 = 20.0;
pub const DEFAULT_MOVE_COOLDOWN_MS: u64 = 500;
pub const PIECES_PER_PLAYER: usize = 16;
pub const MAX_NAME_LEN: usize = 24;

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// A cell on the unbounded board.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: i64,
    pub y: i64,
}

impl Coord {
    pub const ORIGIN: Coord = Coord { x: 0, y: 0 };

    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Component-wise delta `to - self`, widened so no pair of cells can overflow.
    pub fn delta_to(&self, to: Coord) -> (i128, i128) {
        (to.x as i128 - self.x as i128, to.y as i128 - self.y as i128)
    }

    pub fn distance(&self, other: Coord) -> f64 {
        let (dx, dy) = self.delta_to(other);
        (dx as f64).hypot(dy as f64)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    pub fn name(&self) -> &'static str {
        match self {
            PieceType::Pawn => "pawn",
            PieceType::Knight => "knight",
            PieceType::Bishop => "bishop",
            PieceType::Rook => "rook",
            PieceType::Queen => "queen",
            PieceType::King => "king",
        }
    }
}

impl fmt::Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A piece as stored on the board. Its position is the board key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceType,
    pub color: String,
    pub owner: Option<PlayerId>,
}

impl Piece {
    pub fn new(kind: PieceType, color: impl Into<String>, owner: Option<PlayerId>) -> Self {
        Self {
            kind,
            color: color.into(),
            owner,
        }
    }
}

/// A board entry on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlacedPiece {
    pub at: Coord,
    pub piece: Piece,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub color_index: u32,
    pub active: bool,
    pub joined_at: u64,
    pub anchor: Coord,
}

/// Inclusive rectangle of cells.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
}

impl Bounds {
    pub fn new(min_x: i64, max_x: i64, min_y: i64, max_y: i64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn around(center: Coord, radius: i64) -> Self {
        Self::new(
            center.x.saturating_sub(radius),
            center.x.saturating_add(radius),
            center.y.saturating_sub(radius),
            center.y.saturating_add(radius),
        )
    }

    pub fn contains(&self, at: Coord) -> bool {
        (self.min_x..=self.max_x).contains(&at.x) && (self.min_y..=self.max_y).contains(&at.y)
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // client -> server
    Join {
        name: Option<String>,
    },
    Move {
        from_x: i64,
        from_y: i64,
        to_x: i64,
        to_y: i64,
    },
    QuerySection {
        bounds: Bounds,
    },
    Heartbeat {
        timestamp: u64,
    },
    Leave,

    // server -> client
    Joined {
        player_id: PlayerId,
        player: Player,
        board: Vec<PlacedPiece>,
        players: Vec<Player>,
    },
    Full,
    Moved {
        player_id: PlayerId,
        from_x: i64,
        from_y: i64,
        to_x: i64,
        to_y: i64,
        piece: Piece,
        captured: Option<Piece>,
    },
    InvalidMove {
        reason: GameError,
    },
    Section {
        bounds: Bounds,
        pieces: Vec<PlacedPiece>,
    },
    JoinedNotice {
        player: Player,
        pieces: Vec<PlacedPiece>,
    },
    LeftNotice {
        player_id: PlayerId,
    },
    PiecesCleared {
        player_id: PlayerId,
        removed: usize,
    },
    Rejected {
        reason: GameError,
    },
}

impl Packet {
    pub fn move_between(from: Coord, to: Coord) -> Self {
        Packet::Move {
            from_x: from.x,
            from_y: from.y,
            to_x: to.x,
            to_y: to.y,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Packet::Join { .. } => "join",
            Packet::Move { .. } => "move",
            Packet::QuerySection { .. } => "querySection",
            Packet::Heartbeat { .. } => "heartbeat",
            Packet::Leave => "leave",
            Packet::Joined { .. } => "joined",
            Packet::Full => "full",
            Packet::Moved { .. } => "moved",
            Packet::InvalidMove { .. } => "invalidMove",
            Packet::Section { .. } => "section",
            Packet::JoinedNotice { .. } => "joinedNotice",
            Packet::LeftNotice { .. } => "leftNotice",
            Packet::PiecesCleared { .. } => "piecesCleared",
            Packet::Rejected { .. } => "rejected",
        }
    }
}
