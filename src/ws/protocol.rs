//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Field and tag names are pinned to the legacy client schema; both
//! deployment variants speak exactly this shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Create a new room and become its host
    #[serde(rename = "create")]
    Create { name: String },

    /// Join an existing room by code
    #[serde(rename = "join")]
    Join { code: String, name: String },

    /// Host: begin the match countdown
    #[serde(rename = "start")]
    Start,

    /// Host: restart after match end
    #[serde(rename = "restart")]
    Restart,

    /// Non-host: signal readiness after match end
    #[serde(rename = "readyUp")]
    ReadyUp,

    /// Steering intent: -1 left, 0 straight, 1 right
    #[serde(rename = "turn")]
    Turn { dir: i8 },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    /// Session id assigned on connect
    #[serde(rename = "init")]
    Init { id: Uuid },

    /// Room created; code is relayed to friends out of band
    #[serde(rename = "roomCreated")]
    RoomCreated { code: String },

    /// Join confirmed
    #[serde(rename = "joined")]
    Joined { code: String },

    /// Protocol violation, human-readable
    #[serde(rename = "error")]
    Error { message: String },

    /// Current room roster
    #[serde(rename = "playerList")]
    PlayerList {
        players: HashMap<Uuid, PlayerListEntry>,
    },

    /// Match countdown has begun
    #[serde(rename = "gameStart")]
    GameStart {
        #[serde(rename = "hostId")]
        host_id: Uuid,
    },

    /// Host restarted the match
    #[serde(rename = "matchRestart")]
    MatchRestart,

    /// Ready tally after match end
    #[serde(rename = "readyCount")]
    ReadyCount { ready: usize, total: usize },

    /// Throttled room state broadcast (full or delta)
    #[serde(rename = "state")]
    State(StateSync),
}

/// Roster entry for `playerList`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerListEntry {
    pub name: String,
    pub color: String,
}

/// Room-level snapshot accompanying every state broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSync {
    /// Per-player snapshots keyed by session id
    pub p: HashMap<Uuid, PlayerSnapshot>,
    /// Match winner name, "DRAW", or absent while the match runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<String>,
    /// Host session id
    pub hid: Uuid,
    /// Room is in its pre-round countdown display phase
    pub cn: bool,
    /// Countdown value
    pub cd: u8,
    /// Current room speed, units per tick
    pub sp: f64,
    /// Seconds since round start
    pub el: u64,
    /// This broadcast is a full sync (trails restart from scratch)
    pub f: bool,
}

/// Per-player snapshot inside `state.p`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Position, quantized to 0.1
    pub x: f64,
    pub y: f64,
    /// Heading in radians, quantized to 0.01
    pub a: f64,
    pub alive: bool,
    pub score: u32,
    pub lives: u8,
    pub color: String,
    pub name: String,
    /// Sender's true stored trail length; receivers compare against
    /// their reconstruction to detect a dropped delta
    pub tl: usize,
    /// Trail points: everything stored (full) or newly appended (delta)
    pub t: Vec<[f64; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_tags_match_legacy_schema() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"create","name":"neo"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Create { ref name } if name == "neo"));

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"join","code":"0042","name":"sam"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Join { ref code, .. } if code == "0042"));

        assert!(matches!(
            serde_json::from_str(r#"{"type":"start"}"#).unwrap(),
            ClientMsg::Start
        ));
        assert!(matches!(
            serde_json::from_str(r#"{"type":"readyUp"}"#).unwrap(),
            ClientMsg::ReadyUp
        ));
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"turn","dir":-1}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Turn { dir: -1 }));
    }

    #[test]
    fn malformed_input_fails_to_parse() {
        assert!(serde_json::from_str::<ClientMsg>("not json").is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"warp"}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"dir":1}"#).is_err());
    }

    #[test]
    fn outbound_tags_match_legacy_schema() {
        let json = serde_json::to_string(&ServerMsg::RoomCreated {
            code: "1234".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"roomCreated","code":"1234"}"#);

        let host = Uuid::new_v4();
        let json = serde_json::to_string(&ServerMsg::GameStart { host_id: host }).unwrap();
        assert_eq!(json, format!(r#"{{"type":"gameStart","hostId":"{host}"}}"#));

        let json = serde_json::to_string(&ServerMsg::MatchRestart).unwrap();
        assert_eq!(json, r#"{"type":"matchRestart"}"#);
    }

    #[test]
    fn state_sync_omits_unset_winner() {
        let sync = StateSync {
            p: HashMap::new(),
            w: None,
            hid: Uuid::new_v4(),
            cn: true,
            cd: 3,
            sp: 2.5,
            el: 0,
            f: true,
        };
        let value = serde_json::to_value(ServerMsg::State(sync)).unwrap();
        assert_eq!(value["type"], "state");
        assert!(value.get("w").is_none());
        assert_eq!(value["cn"], true);
        assert_eq!(value["cd"], 3);
        assert_eq!(value["f"], true);
    }
}
