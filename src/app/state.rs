//! Application state shared across routes

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::game::{Command, ServerStats};
use crate::ws::hub::SessionHub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Outbound fan-out table, shared with the game loop
    pub hub: Arc<SessionHub>,
    /// Inbound command channel into the game loop
    pub commands: mpsc::Sender<Command>,
    /// Counters maintained by the game loop for /health
    pub stats: Arc<ServerStats>,
}

impl AppState {
    pub fn new(
        config: Config,
        hub: Arc<SessionHub>,
        commands: mpsc::Sender<Command>,
        stats: Arc<ServerStats>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            hub,
            commands,
            stats,
        }
    }
}
