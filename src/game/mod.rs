//! Game simulation modules

pub mod collision;
pub mod player;
pub mod registry;
pub mod room;
pub mod server;
pub mod snapshot;
pub mod trail;

pub use server::{Command, GameServer, ServerStats, Transport};
