//! WebSocket transport collaborator

pub mod handler;
pub mod hub;
pub mod protocol;
