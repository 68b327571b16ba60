//! State broadcast encoding
//!
//! Builds the throttled `state` message for a room in one of two
//! modes: full (every stored trail point, after round start or a
//! mid-match join) or delta (only points appended since the previous
//! flush, using each trail's sent watermark).

use std::collections::HashMap;

use crate::ws::protocol::{PlayerListEntry, PlayerSnapshot, ServerMsg, StateSync};

use super::room::{Room, RoomPhase};
use super::trail::{quantize_hundredth, quantize_tenth};

/// Tick divisor for broadcasts, decoupling send rate from the
/// simulation rate
pub struct SnapshotCadence {
    ticks_since_send: u32,
    interval: u32,
}

impl SnapshotCadence {
    pub fn new(interval: u32) -> Self {
        Self {
            ticks_since_send: 0,
            interval: interval.max(1),
        }
    }

    /// Check if this tick is a broadcast tick
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_send += 1;
        if self.ticks_since_send >= self.interval {
            self.ticks_since_send = 0;
            true
        } else {
            false
        }
    }
}

/// Encode a room's visible state and advance every trail's sent
/// watermark. Consumes the room's full-sync flag.
pub fn build_state(room: &mut Room) -> ServerMsg {
    let full = room.full_sync;
    let mut snapshots = HashMap::with_capacity(room.players.len());

    for player in &mut room.players {
        let from = if full { 0 } else { player.trail.sent_count() };
        let points: Vec<[f64; 2]> = player.trail.slice(from, player.trail.len()).collect();
        player.trail.mark_flushed();

        snapshots.insert(
            player.id,
            PlayerSnapshot {
                x: quantize_tenth(player.x),
                y: quantize_tenth(player.y),
                a: quantize_hundredth(player.angle),
                alive: player.alive,
                score: player.score,
                lives: player.lives,
                color: player.color.to_string(),
                name: player.name.clone(),
                tl: player.trail.len(),
                t: points,
            },
        );
    }

    room.full_sync = false;

    ServerMsg::State(StateSync {
        p: snapshots,
        w: room.winner.clone(),
        hid: room.host,
        cn: room.phase == RoomPhase::Countdown,
        cd: room.countdown,
        sp: room.speed,
        el: room.elapsed_secs,
        f: full,
    })
}

/// Current roster for `playerList` broadcasts
pub fn build_roster(room: &Room) -> ServerMsg {
    ServerMsg::PlayerList {
        players: room
            .players
            .iter()
            .map(|p| {
                (
                    p.id,
                    PlayerListEntry {
                        name: p.name.clone(),
                        color: p.color.to_string(),
                    },
                )
            })
            .collect(),
    }
}
