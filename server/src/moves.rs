//! Movement rules for pieces on the unbounded board.
//!
//! There is no fixed orientation, so pawns step one cell in any cardinal
//! direction. Sliding pieces need every cell strictly between origin and
//! destination to be empty, whoever owns the blocker. King safety is not
//! considered.

use crate::board::Board;
use shared::{Coord, GameError, Piece, PieceType};

/// Validates the movement pattern, path and destination for `piece` on `from`.
///
/// Ownership of the moving piece is the caller's concern; see
/// [`crate::game::GameState::is_move_legal`].
pub fn validate(piece: &Piece, from: Coord, to: Coord, board: &Board) -> Result<(), GameError> {
    let (dx, dy) = from.delta_to(to);
    if dx == 0 && dy == 0 {
        return Err(GameError::IllegalPattern);
    }

    let (adx, ady) = (dx.abs(), dy.abs());
    let slides = match piece.kind {
        PieceType::Pawn => {
            if adx + ady != 1 {
                return Err(GameError::IllegalPattern);
            }
            false
        }
        PieceType::Knight => {
            if !((adx == 2 && ady == 1) || (adx == 1 && ady == 2)) {
                return Err(GameError::IllegalPattern);
            }
            false
        }
        PieceType::King => {
            if adx.max(ady) != 1 {
                return Err(GameError::IllegalPattern);
            }
            false
        }
        PieceType::Rook => {
            if !is_straight(dx, dy) {
                return Err(GameError::IllegalPattern);
            }
            true
        }
        PieceType::Bishop => {
            if !is_diagonal(dx, dy) {
                return Err(GameError::IllegalPattern);
            }
            true
        }
        PieceType::Queen => {
            if !is_straight(dx, dy) && !is_diagonal(dx, dy) {
                return Err(GameError::IllegalPattern);
            }
            true
        }
    };

    if slides && !path_is_clear(from, to, board) {
        return Err(GameError::PathBlocked);
    }

    match board.get(to) {
        Some(occupant) if occupant.owner == piece.owner => Err(GameError::OwnPieceAtDestination),
        _ => Ok(()),
    }
}

fn is_straight(dx: i128, dy: i128) -> bool {
    (dx == 0) != (dy == 0)
}

fn is_diagonal(dx: i128, dy: i128) -> bool {
    dx != 0 && dx.abs() == dy.abs()
}

/// Checks the cells strictly between `from` and `to` on a straight or
/// diagonal line.
///
/// Short slides step cell by cell. When the line is longer than the number of
/// occupied cells, the occupied cells are tested against the line instead, so
/// a move across billions of empty cells stays cheap.
pub fn path_is_clear(from: Coord, to: Coord, board: &Board) -> bool {
    let (dx, dy) = from.delta_to(to);
    let (step_x, step_y) = (dx.signum(), dy.signum());
    let steps = dx.abs().max(dy.abs());
    if steps <= 1 || board.is_empty() {
        return true;
    }

    if steps - 1 <= board.len() as i128 {
        let (mut x, mut y) = (from.x as i128, from.y as i128);
        for _ in 1..steps {
            x += step_x;
            y += step_y;
            // Strictly between two i64 coordinates, so always representable.
            if !board.is_empty_at(Coord::new(x as i64, y as i64)) {
                return false;
            }
        }
        return true;
    }

    !board
        .iter()
        .any(|(at, _)| lies_strictly_between(from, *at, (step_x, step_y), steps))
}

fn lies_strictly_between(from: Coord, at: Coord, step: (i128, i128), steps: i128) -> bool {
    let (ox, oy) = from.delta_to(at);
    let k = if step.0 != 0 { ox * step.0 } else { oy * step.1 };
    k > 0 && k < steps && ox == k * step.0 && oy == k * step.1
}
