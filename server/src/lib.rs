//! Quadpong server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod ball;
pub mod config;
pub mod game_loop;
pub mod geometry;
pub mod paddle;
pub mod player;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod ws;
