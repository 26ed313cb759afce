//! Random pawn stepper used by `--bot` mode

use crate::game::ClientBoard;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{Coord, PieceType};

const DIRECTIONS: [(i64, i64); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Picks one of our pawns and a neighbouring cell it could step to.
///
/// Only our own pieces are avoided; stepping onto someone else's piece is a
/// capture and is left for the server to judge.
pub fn pick_pawn_step<R: Rng>(board: &ClientBoard, rng: &mut R) -> Option<(Coord, Coord)> {
    let me = board.me()?;
    let pawns = board.my_pieces(Some(PieceType::Pawn));

    let mut candidates = Vec::new();
    for placed in &pawns {
        for (dx, dy) in DIRECTIONS {
            let to = match (placed.at.x.checked_add(dx), placed.at.y.checked_add(dy)) {
                (Some(x), Some(y)) => Coord::new(x, y),
                _ => continue,
            };
            let blocked = board
                .piece_at(to)
                .map_or(false, |piece| piece.owner == Some(me));
            if !blocked {
                candidates.push((placed.at, to));
            }
        }
    }

    candidates.choose(rng).copied()
}
