//! Recoverable game errors, reported only to the connection that caused them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameError {
    #[error("game is full")]
    CapacityExceeded,
    #[error("connection has not joined the game")]
    UnknownPlayer,
    #[error("no piece at source square")]
    NoPieceAtSource,
    #[error("piece belongs to another player")]
    NotOwner,
    #[error("piece cannot move that way")]
    IllegalPattern,
    #[error("path is blocked")]
    PathBlocked,
    #[error("move cooldown has not elapsed")]
    RateLimited,
    #[error("destination holds one of your own pieces")]
    OwnPieceAtDestination,
    #[error("connection has already joined")]
    AlreadyJoined,
    #[error("no free space to spawn a new set")]
    NoSpawnSpace,
}
