//! Trail collision detection
//!
//! Runs once per tick per room, after physics and before lifecycle
//! checks. Evaluates every alive head against every alive trail on a
//! consistent snapshot, then reports eliminations for the room to
//! apply, so the outcome is independent of player iteration order.

use uuid::Uuid;

use super::player::PlayerEntity;
use super::trail::TrailBuffer;

/// Hit radius around each trail point
pub const COLLISION_RADIUS: f64 = 4.0;

/// Most recent own-trail points exempt from self-collision
pub const SELF_TRAIL_SKIP: usize = 20;

/// Most recent foreign-trail points exempt (near-coincident heads)
pub const OTHER_TRAIL_SKIP: usize = 2;

/// Padded axis-aligned bounding box over a trail
#[derive(Debug, Clone, Copy)]
struct TrailBounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl TrailBounds {
    fn of(trail: &TrailBuffer, pad: f64) -> Option<Self> {
        let mut points = trail.iter();
        let first = points.next()?;
        let mut b = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in points {
            b.min_x = b.min_x.min(p.x);
            b.min_y = b.min_y.min(p.y);
            b.max_x = b.max_x.max(p.x);
            b.max_y = b.max_y.max(p.y);
        }
        b.min_x -= pad;
        b.min_y -= pad;
        b.max_x += pad;
        b.max_y += pad;
        Some(b)
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Find every player whose head intersects a hazard trail this tick.
///
/// Dead players are skipped entirely: their trails are frozen scenery,
/// neither hazard nor target. Returns the ids to eliminate; the caller
/// applies them after the scan so a tick's outcomes never cascade.
pub fn detect_eliminations(players: &[PlayerEntity]) -> Vec<Uuid> {
    // Cheap pre-pass: one padded box per alive trail lets us reject a
    // whole trail before the point scan.
    let bounds: Vec<Option<TrailBounds>> = players
        .iter()
        .map(|p| {
            if p.alive {
                TrailBounds::of(&p.trail, COLLISION_RADIUS)
            } else {
                None
            }
        })
        .collect();

    let mut eliminated = Vec::new();

    for subject in players.iter().filter(|p| p.alive) {
        'targets: for (other, other_bounds) in players.iter().zip(&bounds) {
            if !other.alive {
                continue;
            }
            let Some(bbox) = other_bounds else { continue };
            if !bbox.contains(subject.x, subject.y) {
                continue;
            }

            let skip = if other.id == subject.id {
                SELF_TRAIL_SKIP
            } else {
                OTHER_TRAIL_SKIP
            };
            let scan_end = other.trail.len().saturating_sub(skip);

            for point in other.trail.iter().take(scan_end) {
                let dx = subject.x - point.x;
                let dy = subject.y - point.y;
                if dx.abs() > COLLISION_RADIUS || dy.abs() > COLLISION_RADIUS {
                    continue;
                }
                if dx * dx + dy * dy <= COLLISION_RADIUS * COLLISION_RADIUS {
                    eliminated.push(subject.id);
                    break 'targets;
                }
            }
        }
    }

    eliminated
}
