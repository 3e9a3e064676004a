//! # Game Session Server Library
//!
//! This library provides the authoritative session server for the multiplayer
//! arcade game. It owns the single active game, assigns joining players to it,
//! and broadcasts lifecycle events so every connected client converges on the
//! same roster.
//!
//! ## Core Responsibilities
//!
//! ### Roster Authority
//! The server is the single source of truth for which players belong to the
//! active game. Scores and levels are tracked by clients during play and only
//! written back to the game's data blob on save or finish, where the last
//! write wins.
//!
//! ### Game Rotation
//! Exactly one game is active at a time. When the active game grows past its
//! capacity, or is finished, the next request opens a fresh game.
//!
//! ### Broadcasting
//! Every mutating action answers with a broadcast on a topic: the global
//! `commands` topic for snapshots and lifecycle commands, and a per-identity
//! `commands-<identity>` topic for acknowledgements. There is no request
//! correlation and no replay; clients resync by fetching a snapshot.
//!
//! ## Architecture Design
//!
//! ### Single Owner Event Loop
//! One main loop task owns the [`channel::GamesChannel`] and applies actions
//! one at a time, so avatar/color allocation never races. Helper tasks receive
//! datagrams, send queued frames, and expire silent subscribers; they talk to
//! the main loop over channels.
//!
//! ### UDP-Based Communication
//! Each datagram carries one bincode-encoded [`shared::Packet`]. Action and
//! broadcast bodies inside the frame are JSON so the game data blob can stay
//! schemaless.
//!
//! ## Module Organization
//!
//! - `game`: game, player and device records plus snapshot projection
//! - `store`: the in-memory game store and its fallback rules
//! - `channel`: action dispatch producing broadcasts
//! - `broadcaster`: queueing of topic broadcasts and direct frames
//! - `client_manager`: subscriber registry and topic routing
//! - `network`: socket tasks and the main loop
//! - `config`: runtime settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "127.0.0.1:8080".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     let mut server = Server::new(&config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcaster;
pub mod channel;
pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
pub mod store;
