//! # Chess Server Library
//!
//! This library provides the authoritative server for the shared infinite
//! chessboard. It owns the canonical board, validates every move a client
//! asks for, and broadcasts the results so that all connected clients see
//! the same board.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Board
//! The server holds the only writable copy of the board. Clients submit move
//! requests; the server decides whether they are legal and either applies
//! them or tells the requesting client why not.
//!
//! ### Player Lifecycle
//! Handles the complete lifecycle of a player:
//! - Joining, with a display name, a distinct colour and a spawn anchor
//! - Placing a standard sixteen piece set around that anchor
//! - Leaving, after which their pieces stay on the board as orphans
//! - Optional expiry of orphaned pieces after a configured time
//!
//! ### Change Broadcasting
//! Every accepted move, join and departure is pushed to all joined clients.
//! Rejections are only ever sent back to the client that caused them.
//!
//! ## Architecture Design
//!
//! ### Single-Writer Event Loop
//! Connection tasks decode frames and forward them over a channel to one
//! server loop. That loop owns the game state and processes each command to
//! completion before the next, so validation and application of a move can
//! never interleave with another move.
//!
//! ### TCP Framing
//! Each packet travels as a big-endian length prefix followed by its bincode
//! encoding, capped at one mebibyte per frame.
//!
//! ## Module Organization
//!
//! ### Board (`board`) and Moves (`moves`)
//! The sparse board keyed by coordinate, and the movement rules for each
//! piece type including path blocking for sliding pieces.
//!
//! ### Spawn (`spawn`)
//! The spiral search that finds an anchor far enough from every active
//! player, and the starting formation placed around it.
//!
//! ### Registry (`registry`) and Game (`game`)
//! Player identities and capacity, and the game state tying board, players
//! and move cooldowns together.
//!
//! ### Client Manager (`client_manager`) and Network (`network`)
//! Connection bookkeeping, and the TCP listener plus main server loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::GameConfig;
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         GameConfig::default(),
//!         ServerConfig::default(),
//!     )
//!     .await?;
//!
//!     // Accepts connections and processes commands until shutdown
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod client_manager;
pub mod error;
pub mod game;
pub mod moves;
pub mod network;
pub mod registry;
pub mod spawn;
pub mod utils;
