//! # Spaceblazer Client Library
//!
//! Client-side half of the game session: subscribing to the server's topics,
//! performing channel actions, and keeping a local model of every player in
//! the current game.
//!
//! ## Architecture Overview
//!
//! The server is the source of truth for who is in the game; everything that
//! happens during play (shots, hits, power-ups) is tracked locally and only
//! written back when the client saves or finishes the game. The two sides
//! converge through full snapshots rather than request/response pairs.
//!
//! ### Session
//! [`session::SessionProxy`] owns the subscription state and three handler
//! slots (connected, received, disconnected). It never touches a socket;
//! [`network::NetworkClient`] carries its packets over UDP.
//!
//! ### Players
//! [`player::PlayerController`] holds one player's spawn point, score, level
//! and bullets. Damage starts a tick-counted invulnerability window during
//! which all collisions are ignored.
//!
//! ### Placement
//! [`spawn::SpawnAllocator`] tiles spawn points over the screen, column by
//! column, recycling positions once the grid is full.
//!
//! ### Game State
//! [`game::ClientGameState`] applies server broadcasts, routes collisions,
//! runs the game clock and builds the data blob submitted with
//! `save_game`/`finish_game`.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::config::ClientConfig;
//! use client::network::NetworkClient;
//! use shared::Action;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let mut game = config.build_game_state();
//! let mut network = NetworkClient::new(&config.server_addr).await?;
//!
//! network.proxy_mut().set_on_received(|message| {
//!     println!("received {:?}", message.body);
//! });
//! network.connect(&config.device_id).await?;
//! network
//!     .perform(&Action::CreatePlayer {
//!         device_id: config.device_id.clone(),
//!     })
//!     .await?;
//!
//! loop {
//!     network.receive().await?;
//!     network.flush().await?;
//!     game.tick();
//! }
//! # }
//! ```

pub mod bot;
pub mod config;
pub mod game;
pub mod network;
pub mod player;
pub mod session;
pub mod spawn;
