//! Local, non-authoritative mirror of the board built from server events

use log::debug;
use shared::{Bounds, Coord, Packet, Piece, PieceType, PlacedPiece, Player, PlayerId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ClientBoard {
    pieces: HashMap<Coord, Piece>,
    players: HashMap<PlayerId, Player>,
    me: Option<PlayerId>,
}

impl ClientBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn me(&self) -> Option<PlayerId> {
        self.me
    }

    pub fn piece_at(&self, at: Coord) -> Option<&Piece> {
        self.pieces.get(&at)
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Our own pieces of `kind`, sorted by position
    pub fn my_pieces(&self, kind: Option<PieceType>) -> Vec<PlacedPiece> {
        let me = match self.me {
            Some(me) => me,
            None => return Vec::new(),
        };
        let mut mine: Vec<PlacedPiece> = self
            .pieces
            .iter()
            .filter(|(_, piece)| piece.owner == Some(me))
            .filter(|(_, piece)| kind.map_or(true, |kind| piece.kind == kind))
            .map(|(at, piece)| PlacedPiece {
                at: *at,
                piece: piece.clone(),
            })
            .collect();
        mine.sort_by_key(|placed| (placed.at.y, placed.at.x));
        mine
    }

    fn name_of(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map_or_else(|| id.to_string(), |player| player.name.clone())
    }

    fn remove_owned_by(&mut self, id: PlayerId) {
        self.pieces.retain(|_, piece| piece.owner != Some(id));
    }

    /// Updates the mirror from a server packet and describes what happened.
    pub fn apply(&mut self, packet: &Packet) -> Option<String> {
        match packet {
            Packet::Joined {
                player_id,
                player,
                board,
                players,
            } => {
                self.me = Some(*player_id);
                self.pieces = board
                    .iter()
                    .map(|placed| (placed.at, placed.piece.clone()))
                    .collect();
                self.players = players.iter().map(|p| (p.id, p.clone())).collect();
                Some(format!(
                    "Joined as {} ({}) at {}; {} players, {} pieces visible",
                    player.name,
                    player.color,
                    player.anchor,
                    self.players.len(),
                    self.pieces.len()
                ))
            }
            Packet::Full => Some("Server is full".to_string()),
            Packet::JoinedNotice { player, pieces } => {
                for placed in pieces {
                    self.pieces.insert(placed.at, placed.piece.clone());
                }
                self.players.insert(player.id, player.clone());
                Some(format!("{} joined at {}", player.name, player.anchor))
            }
            Packet::Moved {
                player_id,
                from_x,
                from_y,
                to_x,
                to_y,
                piece,
                captured,
            } => {
                let from = Coord::new(*from_x, *from_y);
                let to = Coord::new(*to_x, *to_y);
                self.pieces.remove(&from);
                self.pieces.insert(to, piece.clone());
                let mut line = format!(
                    "{} moved {} {} -> {}",
                    self.name_of(*player_id),
                    piece.kind,
                    from,
                    to
                );
                if let Some(taken) = captured {
                    line.push_str(&format!(", capturing a {}", taken.kind));
                }
                Some(line)
            }
            Packet::InvalidMove { reason } => Some(format!("Move rejected: {}", reason)),
            Packet::Rejected { reason } => Some(format!("Request rejected: {}", reason)),
            Packet::Section { bounds, pieces } => {
                self.replace_section(bounds, pieces);
                Some(format!("{} pieces in section", pieces.len()))
            }
            Packet::LeftNotice { player_id } => {
                let name = self.name_of(*player_id);
                // Departed players' pieces are no longer part of the visible board.
                self.remove_owned_by(*player_id);
                self.players.remove(player_id);
                Some(format!("{} left", name))
            }
            Packet::PiecesCleared { player_id, removed } => {
                self.remove_owned_by(*player_id);
                Some(format!(
                    "{} orphaned pieces of {} removed",
                    removed, player_id
                ))
            }
            other => {
                debug!("Ignoring {} packet", other.name());
                None
            }
        }
    }

    fn replace_section(&mut self, bounds: &Bounds, pieces: &[PlacedPiece]) {
        self.pieces.retain(|at, _| !bounds.contains(*at));
        for placed in pieces {
            self.pieces.insert(placed.at, placed.piece.clone());
        }
    }

    /// Draws the cells inside `bounds` as text, top row first.
    ///
    /// Our pieces are upper case, everyone else's lower case.
    pub fn render(&self, bounds: &Bounds) -> String {
        let mut out = String::new();
        if bounds.is_empty() {
            return out;
        }
        for y in (bounds.min_y..=bounds.max_y).rev() {
            for x in bounds.min_x..=bounds.max_x {
                let symbol = match self.pieces.get(&Coord::new(x, y)) {
                    Some(piece) => {
                        let symbol = symbol_for(piece.kind);
                        if piece.owner.is_some() && piece.owner == self.me {
                            symbol.to_ascii_uppercase()
                        } else {
                            symbol
                        }
                    }
                    None => '.',
                };
                out.push(symbol);
            }
            out.push('\n');
        }
        out
    }
}

fn symbol_for(kind: PieceType) -> char {
    match kind {
        PieceType::Pawn => 'p',
        PieceType::Knight => 'n',
        PieceType::Bishop => 'b',
        PieceType::Rook => 'r',
        PieceType::Queen => 'q',
        PieceType::King => 'k',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::GameError;

    fn player(id: u32, name: &str) -> Player {
        Player {
            id: PlayerId(id),
            name: name.to_string(),
            color: "#ff0000".to_string(),
            color_index: id,
            active: true,
            joined_at: 0,
            anchor: Coord::ORIGIN,
        }
    }

    fn placed(x: i64, y: i64, kind: PieceType, owner: u32) -> PlacedPiece {
        PlacedPiece {
            at: Coord::new(x, y),
            piece: Piece::new(kind, "#ff0000", Some(PlayerId(owner))),
        }
    }

    fn joined_board() -> ClientBoard {
        let mut board = ClientBoard::new();
        board.apply(&Packet::Joined {
            player_id: PlayerId(1),
            player: player(1, "Alice"),
            board: vec![
                placed(0, 0, PieceType::Rook, 1),
                placed(0, 1, PieceType::Pawn, 1),
                placed(5, 5, PieceType::Pawn, 2),
            ],
            players: vec![player(1, "Alice"), player(2, "Bob")],
        });
        board
    }

    #[test]
    fn test_joined_replaces_state() {
        assert!(ClientBoard::new().is_empty());
        let board = joined_board();
        assert!(!board.is_empty());
        assert_eq!(board.me(), Some(PlayerId(1)));
        assert_eq!(board.len(), 3);
        assert_eq!(board.player_count(), 2);
        assert_eq!(board.my_pieces(None).len(), 2);
        assert_eq!(board.my_pieces(Some(PieceType::Pawn)).len(), 1);
    }

    #[test]
    fn test_moved_relocates_and_describes_capture() {
        let mut board = joined_board();
        board.apply(&Packet::Moved {
            player_id: PlayerId(2),
            from_x: 5,
            from_y: 5,
            to_x: 0,
            to_y: 5,
            piece: placed(0, 0, PieceType::Pawn, 2).piece,
            captured: None,
        });
        let line = board
            .apply(&Packet::Moved {
                player_id: PlayerId(1),
                from_x: 0,
                from_y: 0,
                to_x: 0,
                to_y: 5,
                piece: placed(0, 0, PieceType::Rook, 1).piece,
                captured: Some(placed(0, 5, PieceType::Pawn, 2).piece),
            })
            .unwrap();

        assert!(line.starts_with("Alice moved rook"));
        assert!(line.contains("capturing a pawn"));
        assert!(board.piece_at(Coord::new(0, 0)).is_none());
        assert_eq!(board.piece_at(Coord::new(0, 5)).unwrap().kind, PieceType::Rook);
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn test_left_notice_hides_pieces() {
        let mut board = joined_board();
        assert_eq!(
            board.apply(&Packet::LeftNotice {
                player_id: PlayerId(2)
            }),
            Some("Bob left".to_string())
        );
        assert!(board.piece_at(Coord::new(5, 5)).is_none());
        assert!(board.player(PlayerId(2)).is_none());
    }

    #[test]
    fn test_section_replaces_only_inside_bounds() {
        let mut board = joined_board();
        board.apply(&Packet::Section {
            bounds: Bounds::new(4, 10, 4, 10),
            pieces: vec![placed(6, 6, PieceType::Knight, 2)],
        });

        assert!(board.piece_at(Coord::new(5, 5)).is_none());
        assert_eq!(board.piece_at(Coord::new(6, 6)).unwrap().kind, PieceType::Knight);
        assert!(board.piece_at(Coord::new(0, 0)).is_some());
    }

    #[test]
    fn test_rejections_are_described() {
        let mut board = ClientBoard::new();
        assert_eq!(
            board.apply(&Packet::InvalidMove {
                reason: GameError::PathBlocked
            }),
            Some("Move rejected: path is blocked".to_string())
        );
        assert!(board.apply(&Packet::Heartbeat { timestamp: 0 }).is_none());
    }

    #[test]
    fn test_render_marks_own_pieces() {
        let board = joined_board();
        assert_eq!(board.render(&Bounds::new(0, 1, 0, 1)), "P.\nR.\n");
        assert_eq!(board.render(&Bounds::new(5, 5, 5, 5)), "p\n");
        assert_eq!(board.render(&Bounds::new(1, 0, 0, 0)), "");
    }
}
