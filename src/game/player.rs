//! Player entity and per-tick kinematics

use uuid::Uuid;

use super::trail::TrailBuffer;

/// Arena bounds in logical units
pub const ARENA_WIDTH: f64 = 1400.0;
pub const ARENA_HEIGHT: f64 = 900.0;

/// Lives each player starts a match with
pub const STARTING_LIVES: u8 = 6;

/// Display name length cap
const MAX_NAME_LEN: usize = 24;

/// Fixed 8-entry cycle color palette, assigned by join order
pub const PALETTE: [&str; 8] = [
    "#00e5ff", "#ff9100", "#d500f9", "#76ff03", "#ffea00", "#2979ff", "#ff1744", "#f5f5f5",
];

/// One participant's authoritative state
#[derive(Debug)]
pub struct PlayerEntity {
    pub id: Uuid,
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Heading in radians
    pub angle: f64,
    /// Turn intent: -1, 0 or 1
    pub turning: i8,
    pub alive: bool,
    pub lives: u8,
    /// Cumulative round wins across the match
    pub score: u32,
    pub color: &'static str,
    /// Join-order slot, indexes the palette
    pub slot: usize,
    pub trail: TrailBuffer,
}

impl PlayerEntity {
    /// Create a player for the given join-order slot. The player is
    /// dead until the next round start seats it at a spawn point.
    pub fn new(id: Uuid, name: &str, slot: usize) -> Self {
        Self {
            id,
            name: sanitize_name(name),
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            turning: 0,
            alive: false,
            lives: STARTING_LIVES,
            score: 0,
            color: PALETTE[slot % PALETTE.len()],
            slot,
            trail: TrailBuffer::new(),
        }
    }

    /// Seat the player at a spawn point for a new round
    pub fn respawn(&mut self, x: f64, y: f64, angle: f64) {
        self.x = x;
        self.y = y;
        self.angle = angle;
        self.turning = 0;
        self.alive = true;
        self.trail.clear();
    }

    /// One physics tick: integrate heading and position, extend the
    /// trail, then kill on arena exit. Callers only invoke this for
    /// alive players; speed is the room-wide speed for this tick.
    pub fn advance(&mut self, speed: f64, turn_rate: f64) {
        self.angle += f64::from(self.turning) * turn_rate;
        self.x += self.angle.cos() * speed;
        self.y += self.angle.sin() * speed;
        self.trail.push(self.x, self.y);

        if self.x < 0.0 || self.x > ARENA_WIDTH || self.y < 0.0 || self.y > ARENA_HEIGHT {
            self.alive = false;
        }
    }
}

/// Trim, cap length, and fall back to a default for empty names
pub fn sanitize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_at(x: f64, y: f64, angle: f64) -> PlayerEntity {
        let mut p = PlayerEntity::new(Uuid::new_v4(), "test", 0);
        p.respawn(x, y, angle);
        p
    }

    #[test]
    fn advance_moves_along_heading() {
        let mut p = player_at(100.0, 100.0, 0.0);
        p.advance(3.0, 0.1);
        assert!((p.x - 103.0).abs() < 1e-9);
        assert!((p.y - 100.0).abs() < 1e-9);
        assert_eq!(p.trail.len(), 1);
        assert!(p.alive);
    }

    #[test]
    fn turn_intent_bends_the_path() {
        let mut p = player_at(100.0, 100.0, 0.0);
        p.turning = 1;
        p.advance(2.0, std::f64::consts::FRAC_PI_2);
        // Heading rotated a quarter turn before integrating.
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 102.0).abs() < 1e-9);
    }

    #[test]
    fn leaving_the_arena_kills() {
        let mut p = player_at(ARENA_WIDTH - 1.0, 450.0, 0.0);
        p.advance(2.5, 0.1);
        assert!(!p.alive);
        // The exit point is still recorded for rendering.
        assert_eq!(p.trail.len(), 1);
    }

    #[test]
    fn boundary_is_inclusive() {
        let mut p = player_at(ARENA_WIDTH - 2.0, 450.0, 0.0);
        p.advance(2.0, 0.1);
        assert!(p.alive, "exactly on the edge is still in");
    }

    #[test]
    fn respawn_resets_trail_and_intent() {
        let mut p = player_at(10.0, 10.0, 0.0);
        p.turning = -1;
        p.advance(2.0, 0.1);
        p.alive = false;
        p.respawn(50.0, 60.0, 1.0);
        assert!(p.alive);
        assert_eq!(p.turning, 0);
        assert_eq!(p.trail.len(), 0);
    }

    #[test]
    fn name_sanitation() {
        assert_eq!(sanitize_name("  neo  "), "neo");
        assert_eq!(sanitize_name("   "), "Player");
        assert_eq!(sanitize_name(""), "Player");
        assert_eq!(sanitize_name(&"x".repeat(40)).len(), 24);
    }

    #[test]
    fn palette_cycles_by_slot() {
        let a = PlayerEntity::new(Uuid::new_v4(), "a", 0);
        let i = PlayerEntity::new(Uuid::new_v4(), "i", 8);
        assert_eq!(a.color, i.color);
    }
}
