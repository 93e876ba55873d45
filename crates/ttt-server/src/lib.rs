//! ttt-server
//!
//! Multi-client async TCP server for the tic-tac-toe lobby.

pub mod auth;
pub mod config;
pub mod lobby;
pub mod rooms;
pub mod server;
pub mod types;

// internal I/O plumbing, not re-exported
mod client;
