//! Tabletop host library.
//!
//! The host is the single writer for seats, colors and the active player.
//! This module exposes its components for use in tests and binaries.

pub mod colors;
pub mod config;
pub mod ledger;
pub mod session_loop;
pub mod state;
pub mod ws;
