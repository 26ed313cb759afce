//! Sparse board store: the single source of truth for occupancy.

use shared::{Bounds, Coord, GameError, Piece, PlacedPiece, PlayerId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Board {
    cells: HashMap<Coord, Piece>,
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    pub fn get(&self, at: Coord) -> Option<&Piece> {
        self.cells.get(&at)
    }

    pub fn is_empty_at(&self, at: Coord) -> bool {
        !self.cells.contains_key(&at)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Coord, &Piece)> {
        self.cells.iter()
    }

    /// Puts a piece on an empty cell. Never overwrites.
    pub fn place(&mut self, at: Coord, piece: Piece) -> bool {
        if self.cells.contains_key(&at) {
            return false;
        }
        self.cells.insert(at, piece);
        true
    }

    /// Moves the piece on `from` to `to`, returning whatever was captured there.
    ///
    /// Callers validate first; this only guarantees that the source exists and
    /// that the destination ends up holding exactly the moved piece.
    pub fn apply_move(&mut self, from: Coord, to: Coord) -> Result<Option<Piece>, GameError> {
        if from == to {
            return Err(GameError::IllegalPattern);
        }
        let piece = self.cells.remove(&from).ok_or(GameError::NoPieceAtSource)?;
        let captured = self.cells.remove(&to);
        self.cells.insert(to, piece);
        Ok(captured)
    }

    /// Pieces inside `bounds` that pass `keep`, ordered by row then column.
    pub fn pieces_in<F>(&self, bounds: &Bounds, keep: F) -> Vec<PlacedPiece>
    where
        F: Fn(&Piece) -> bool,
    {
        if bounds.is_empty() {
            return Vec::new();
        }
        self.collect_sorted(|at, piece| bounds.contains(*at) && keep(piece))
    }

    pub fn pieces_where<F>(&self, keep: F) -> Vec<PlacedPiece>
    where
        F: Fn(&Piece) -> bool,
    {
        self.collect_sorted(|_, piece| keep(piece))
    }

    pub fn count_owned_by(&self, owner: PlayerId) -> usize {
        self.cells
            .values()
            .filter(|piece| piece.owner == Some(owner))
            .count()
    }

    pub fn remove_owned_by(&mut self, owner: PlayerId) -> usize {
        let before = self.cells.len();
        self.cells.retain(|_, piece| piece.owner != Some(owner));
        before - self.cells.len()
    }

    fn collect_sorted<F>(&self, keep: F) -> Vec<PlacedPiece>
    where
        F: Fn(&Coord, &Piece) -> bool,
    {
        let mut pieces: Vec<PlacedPiece> = self
            .cells
            .iter()
            .filter(|(at, piece)| keep(at, piece))
            .map(|(at, piece)| PlacedPiece {
                at: *at,
                piece: piece.clone(),
            })
            .collect();
        pieces.sort_by_key(|placed| (placed.at.y, placed.at.x));
        pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PieceType;

    fn pawn(owner: u32) -> Piece {
        Piece::new(PieceType::Pawn, "red", Some(PlayerId(owner)))
    }

    #[test]
    fn test_place_refuses_occupied_cell() {
        let mut board = Board::new();
        assert!(board.place(Coord::new(1, 1), pawn(1)));
        assert!(!board.place(Coord::new(1, 1), pawn(2)));
        assert_eq!(board.len(), 1);
        assert_eq!(board.get(Coord::new(1, 1)).unwrap().owner, Some(PlayerId(1)));
    }

    #[test]
    fn test_apply_move_to_empty_cell() {
        let mut board = Board::new();
        board.place(Coord::new(0, 0), pawn(1));

        let captured = board.apply_move(Coord::new(0, 0), Coord::new(0, 1)).unwrap();

        assert!(captured.is_none());
        assert!(board.is_empty_at(Coord::new(0, 0)));
        assert!(!board.is_empty_at(Coord::new(0, 1)));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_apply_move_returns_capture() {
        let mut board = Board::new();
        board.place(Coord::new(0, 0), pawn(1));
        board.place(Coord::new(0, 1), pawn(2));

        let captured = board.apply_move(Coord::new(0, 0), Coord::new(0, 1)).unwrap();

        assert_eq!(captured.unwrap().owner, Some(PlayerId(2)));
        assert_eq!(board.get(Coord::new(0, 1)).unwrap().owner, Some(PlayerId(1)));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_apply_move_without_source() {
        let mut board = Board::new();
        assert_eq!(
            board.apply_move(Coord::new(5, 5), Coord::new(5, 6)),
            Err(GameError::NoPieceAtSource)
        );
    }

    #[test]
    fn test_apply_move_in_place_is_rejected() {
        let mut board = Board::new();
        board.place(Coord::new(5, 5), pawn(1));
        assert_eq!(
            board.apply_move(Coord::new(5, 5), Coord::new(5, 5)),
            Err(GameError::IllegalPattern)
        );
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_pieces_in_bounds_sorted() {
        let mut board = Board::new();
        board.place(Coord::new(2, 1), pawn(1));
        board.place(Coord::new(-1, 1), pawn(1));
        board.place(Coord::new(0, 0), pawn(2));
        board.place(Coord::new(50, 50), pawn(1));

        let pieces = board.pieces_in(&Bounds::new(-5, 5, -5, 5), |_| true);
        let cells: Vec<Coord> = pieces.iter().map(|p| p.at).collect();
        assert_eq!(
            cells,
            vec![Coord::new(0, 0), Coord::new(-1, 1), Coord::new(2, 1)]
        );

        let owned = board.pieces_in(&Bounds::new(-5, 5, -5, 5), |p| {
            p.owner == Some(PlayerId(2))
        });
        assert_eq!(owned.len(), 1);
    }

    #[test]
    fn test_remove_owned_by() {
        let mut board = Board::new();
        board.place(Coord::new(0, 0), pawn(1));
        board.place(Coord::new(1, 0), pawn(1));
        board.place(Coord::new(2, 0), pawn(2));

        assert_eq!(board.count_owned_by(PlayerId(1)), 2);
        assert_eq!(board.remove_owned_by(PlayerId(1)), 2);
        assert_eq!(board.count_owned_by(PlayerId(1)), 0);
        assert_eq!(board.len(), 1);
    }
}
