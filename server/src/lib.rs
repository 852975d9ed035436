//! Tower Clash: a two-player, turn-based tower-attack game served over a
//! line-oriented TCP protocol.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod game;
pub mod matchmaking;
pub mod net;
pub mod protocol;
