//! Room state and lifecycle state machine
//!
//! One room is one match: lobby, countdown, active round, inter-round
//! delay, match end. All timing is deadline fields checked by the tick
//! loop, so destroying a room cancels its pending transitions with it.

use std::collections::HashSet;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::time::{Duration, Instant};

use tracing::info;
use uuid::Uuid;

use crate::config::GameConfig;

use super::collision::detect_eliminations;
use super::player::{PlayerEntity, STARTING_LIVES};

/// Room capacity
pub const MAX_PLAYERS: usize = 8;

/// Pre-round countdown, decremented once per second
pub const COUNTDOWN_TICKS: u8 = 3;

/// Delay between a round ending and the next countdown
const ROUND_RESTART_DELAY: Duration = Duration::from_secs(2);

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// Name reported when nobody retains lives at match end
pub const DRAW_SENTINEL: &str = "DRAW";

/// Fixed spawn slots (x, y, heading), cycled among eligible players
const SPAWN_TABLE: [(f64, f64, f64); 8] = [
    (100.0, 450.0, 0.0),
    (1300.0, 450.0, PI),
    (700.0, 100.0, FRAC_PI_2),
    (700.0, 800.0, -FRAC_PI_2),
    (100.0, 100.0, FRAC_PI_4),
    (1300.0, 100.0, 3.0 * FRAC_PI_4),
    (1300.0, 800.0, -3.0 * FRAC_PI_4),
    (100.0, 800.0, -FRAC_PI_4),
];

/// Room lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Waiting for the host to start
    Lobby,
    /// Pre-round countdown, no physics
    Countdown,
    /// Round in progress
    Active,
    /// Round over, waiting out the inter-round delay
    RoundEnd,
    /// Match over, waiting for host restart
    MatchEnd,
}

/// Protocol violations surfaced to the offending client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room not found")]
    NotFound,

    #[error("Room is full (max {MAX_PLAYERS})")]
    Full,

    #[error("Need at least 2 players to start")]
    NotEnoughPlayers,

    #[error("Only the host can do that")]
    NotHost,
}

/// One match instance
#[derive(Debug)]
pub struct Room {
    pub code: String,
    /// Session with start/restart authority
    pub host: Uuid,
    /// Insertion order is join order
    pub players: Vec<PlayerEntity>,
    pub phase: RoomPhase,
    pub countdown: u8,
    countdown_next: Option<Instant>,
    round_start: Option<Instant>,
    restart_at: Option<Instant>,
    /// Players seated when the current round began
    round_participants: usize,
    /// Winner name or the draw sentinel, set at match end
    pub winner: Option<String>,
    /// Non-host sessions that signalled ready after match end
    pub ready: HashSet<Uuid>,
    /// Next broadcast must be a full sync
    pub full_sync: bool,
    /// Interpolated room speed, units per tick
    pub speed: f64,
    /// Whole seconds since round start
    pub elapsed_secs: u64,
    /// Monotonic join counter, indexes the palette
    next_slot: usize,
}

impl Room {
    pub fn new(code: String, host: Uuid, host_name: &str) -> Self {
        let mut room = Self {
            code,
            host,
            players: Vec::with_capacity(MAX_PLAYERS),
            phase: RoomPhase::Lobby,
            countdown: 0,
            countdown_next: None,
            round_start: None,
            restart_at: None,
            round_participants: 0,
            winner: None,
            ready: HashSet::new(),
            full_sync: true,
            speed: 0.0,
            elapsed_secs: 0,
            next_slot: 0,
        };
        room.insert_player(host, host_name);
        room
    }

    /// Add a player. Mid-match joins are allowed while there is
    /// capacity; the joiner spectates until the next round seats it.
    pub fn join(&mut self, session: Uuid, name: &str) -> Result<(), RoomError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::Full);
        }
        self.insert_player(session, name);
        self.full_sync = true;
        Ok(())
    }

    fn insert_player(&mut self, session: Uuid, name: &str) {
        self.players
            .push(PlayerEntity::new(session, name, self.next_slot));
        self.next_slot += 1;
    }

    /// Host command: begin the match. Returns false when the room is
    /// not in the lobby (a stale command, ignored without error).
    pub fn start(&mut self, requester: Uuid, now: Instant) -> Result<bool, RoomError> {
        if self.phase != RoomPhase::Lobby {
            return Ok(false);
        }
        if requester != self.host {
            return Err(RoomError::NotHost);
        }
        if self.players.len() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }
        info!(room = %self.code, players = self.players.len(), "Match starting");
        self.enter_countdown(now);
        Ok(true)
    }

    /// Host command: fresh match after match end. Everyone's lives are
    /// restored; cumulative scores carry over.
    pub fn restart(&mut self, requester: Uuid, now: Instant) -> Result<bool, RoomError> {
        if self.phase != RoomPhase::MatchEnd {
            return Ok(false);
        }
        if requester != self.host {
            return Err(RoomError::NotHost);
        }
        for p in &mut self.players {
            p.lives = STARTING_LIVES;
            p.alive = false;
            p.turning = 0;
            p.trail.clear();
        }
        self.winner = None;
        self.ready.clear();
        info!(room = %self.code, "Match restarting");
        self.enter_countdown(now);
        Ok(true)
    }

    /// Non-host ready signal after match end. Returns the updated
    /// (ready, total non-host) tally, or None if not counted.
    pub fn ready_up(&mut self, session: Uuid) -> Option<(usize, usize)> {
        if self.phase != RoomPhase::MatchEnd || session == self.host {
            return None;
        }
        self.players.iter().find(|p| p.id == session)?;
        self.ready.insert(session);
        Some((self.ready.len(), self.players.len().saturating_sub(1)))
    }

    /// Steering intent. Silently ignored for dead or unknown players
    /// and out-of-range values; those are expected latency races.
    pub fn set_turning(&mut self, session: Uuid, dir: i8) {
        if !(-1..=1).contains(&dir) {
            return;
        }
        if let Some(p) = self.players.iter_mut().find(|p| p.id == session) {
            if p.alive {
                p.turning = dir;
            }
        }
    }

    /// Remove a disconnecting session. Host authority migrates to the
    /// longest-joined remaining player.
    pub fn remove_player(&mut self, session: Uuid) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != session);
        if self.players.len() == before {
            return false;
        }
        self.ready.remove(&session);
        if self.host == session {
            if let Some(next) = self.players.first() {
                self.host = next.id;
                info!(room = %self.code, host = %next.id, "Host migrated");
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn session_ids(&self) -> Vec<Uuid> {
        self.players.iter().map(|p| p.id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    /// Advance the room by one scheduler tick
    pub fn tick(&mut self, now: Instant, cfg: &GameConfig) {
        match self.phase {
            RoomPhase::Lobby | RoomPhase::MatchEnd => {}
            RoomPhase::Countdown => self.tick_countdown(now),
            RoomPhase::Active => self.tick_round(now, cfg),
            RoomPhase::RoundEnd => {
                if self.restart_at.is_some_and(|at| now >= at) {
                    self.enter_countdown(now);
                }
            }
        }
    }

    fn tick_countdown(&mut self, now: Instant) {
        let Some(next) = self.countdown_next else {
            return;
        };
        if now < next {
            return;
        }
        self.countdown -= 1;
        if self.countdown == 0 {
            self.start_round(now);
        } else {
            self.countdown_next = Some(next + COUNTDOWN_STEP);
        }
    }

    fn tick_round(&mut self, now: Instant, cfg: &GameConfig) {
        let elapsed = self
            .round_start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO);
        self.elapsed_secs = elapsed.as_secs();

        // Shared, escalating speed curve: every room-wide interval adds
        // an increment, up to the ceiling.
        let steps = (elapsed.as_secs_f64() / cfg.speed_interval_secs).floor();
        self.speed = (cfg.base_speed + steps * cfg.speed_increment).min(cfg.max_speed);

        for p in self.players.iter_mut().filter(|p| p.alive) {
            p.advance(self.speed, cfg.turn_rate);
        }

        for id in detect_eliminations(&self.players) {
            if let Some(p) = self.players.iter_mut().find(|p| p.id == id) {
                p.alive = false;
            }
        }

        if self.round_participants >= 2 && self.alive_count() <= 1 {
            self.finish_round(now);
        }
    }

    fn enter_countdown(&mut self, now: Instant) {
        self.phase = RoomPhase::Countdown;
        self.countdown = COUNTDOWN_TICKS;
        self.countdown_next = Some(now + COUNTDOWN_STEP);
        self.restart_at = None;
    }

    /// Seat every player that retains lives at a spawn slot and open
    /// the round. Eliminated players keep spectating and consume no
    /// spawn slot.
    fn start_round(&mut self, now: Instant) {
        let mut seat = 0;
        for p in &mut self.players {
            if p.lives > 0 {
                let (x, y, angle) = SPAWN_TABLE[seat % SPAWN_TABLE.len()];
                p.respawn(x, y, angle);
                seat += 1;
            } else {
                p.alive = false;
                p.turning = 0;
                p.trail.clear();
            }
        }
        self.round_participants = seat;
        self.round_start = Some(now);
        self.elapsed_secs = 0;
        self.full_sync = true;
        self.phase = RoomPhase::Active;
        info!(room = %self.code, participants = seat, "Round started");
    }

    /// Round bookkeeping: dock a life from everyone who fell, credit
    /// the sole survivor, then either end the match or schedule the
    /// next round.
    fn finish_round(&mut self, now: Instant) {
        let mut survivor: Option<usize> = None;
        for (i, p) in self.players.iter_mut().enumerate() {
            if p.alive {
                survivor = Some(i);
            } else {
                p.lives = p.lives.saturating_sub(1);
            }
        }
        if let Some(i) = survivor {
            self.players[i].score += 1;
        }

        let mut remaining = self.players.iter().filter(|p| p.lives > 0);
        match (remaining.next(), remaining.next()) {
            (winner, None) => {
                self.winner = Some(
                    winner
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| DRAW_SENTINEL.to_string()),
                );
                self.ready.clear();
                self.round_start = None;
                self.phase = RoomPhase::MatchEnd;
                info!(room = %self.code, winner = ?self.winner, "Match over");
            }
            _ => {
                self.restart_at = Some(now + ROUND_RESTART_DELAY);
                self.phase = RoomPhase::RoundEnd;
            }
        }
    }
}
