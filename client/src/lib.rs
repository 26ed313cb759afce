//! # Chess Client Library
//!
//! Headless client for the shared infinite chessboard. It connects to the
//! authoritative server over TCP, sends join, move and section requests, and
//! keeps a local mirror of the board from the events the server pushes.
//!
//! ## Architecture Overview
//!
//! ### Network Layer (`network`)
//! Owns the TCP connection. A background task decodes incoming frames into
//! a queue so that receiving can be raced against user input without losing
//! half-read frames.
//!
//! ### Board Mirror (`game`)
//! A non-authoritative copy of the visible board. It never validates moves;
//! it only applies what the server reports and renders small regions as text.
//!
//! ### Input (`input`) and Bot (`bot`)
//! The prompt command parser, and the random pawn stepper used to put load
//! on a server without a human at the keyboard.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientBoard;
//! use client::network::Client;
//! use shared::Packet;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect("127.0.0.1:8080").await?;
//!     let mut board = ClientBoard::new();
//!
//!     client.send(&Packet::Join { name: Some("Ada".to_string()) }).await?;
//!     loop {
//!         let packet = client.recv().await?;
//!         if let Some(event) = board.apply(&packet) {
//!             println!("{}", event);
//!         }
//!     }
//! }
//! ```

pub mod bot;
pub mod error;
pub mod game;
pub mod input;
pub mod network;
