//! Session hub - routes outgoing messages to connected sessions
//!
//! The game loop's `Transport` implementation. Each WebSocket session
//! registers an unbounded channel here; sends never block the
//! simulation, and a dead session's failure is contained to itself.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::game::Transport;
use crate::ws::protocol::ServerMsg;

/// Table of live sessions and their outbound channels
#[derive(Debug, Default)]
pub struct SessionHub {
    sessions: DashMap<Uuid, mpsc::UnboundedSender<String>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session; the returned receiver feeds its writer task
    pub fn register(&self, session: Uuid) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.insert(session, tx);
        rx
    }

    pub fn unregister(&self, session: Uuid) {
        self.sessions.remove(&session);
    }

    pub fn connected_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn send_raw(&self, session: Uuid, json: String) {
        if let Some(tx) = self.sessions.get(&session) {
            if tx.send(json).is_err() {
                debug!(session = %session, "Outbound channel closed, dropping message");
            }
        }
    }
}

impl Transport for Arc<SessionHub> {
    fn send(&self, session: Uuid, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(json) => self.send_raw(session, json),
            Err(e) => warn!(error = %e, "Failed to serialize outbound message"),
        }
    }

    fn broadcast(&self, sessions: &[Uuid], msg: &ServerMsg) {
        // Serialize once, fan the string out.
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize broadcast");
                return;
            }
        };
        for session in sessions {
            self.send_raw(*session, json.clone());
        }
    }
}
