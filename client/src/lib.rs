//! Tabletop participant library.
//!
//! A replica of host state plus everything a local participant needs on top
//! of it: change events, seat requests, viewpoint moves and a stored color
//! preference.

pub mod connection;
pub mod events;
pub mod participant;
pub mod preferences;
pub mod replica;
pub mod seat_request;
pub mod viewpoint;
