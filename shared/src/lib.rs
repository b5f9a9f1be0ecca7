//! Types shared by the tabletop host and its participants: wire protocol,
//! seat layout math, colors and table configuration.

pub mod color;
pub mod config;
pub mod error;
pub mod layout;
pub mod presence;
pub mod protocol;
pub mod seat;
pub mod vec3;
