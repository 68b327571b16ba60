//! Fixed-capacity circular trail buffer
//!
//! Each player owns one of these. It is the backing store for both
//! collision detection (raw points) and incremental state sync (the
//! `sent` watermark tracks how much of the trail clients have seen).

/// A single trail position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Maximum stored points per player
pub const TRAIL_CAPACITY: usize = 600;

/// Ring buffer of trail points.
///
/// Invariant: `sent <= len <= capacity`. Logical index 0 is the oldest
/// stored point. Pushing past capacity evicts the oldest point and
/// pulls the `sent` watermark back with it.
#[derive(Debug)]
pub struct TrailBuffer {
    points: Box<[Point]>,
    start: usize,
    len: usize,
    sent: usize,
}

impl TrailBuffer {
    pub fn new() -> Self {
        Self::with_capacity(TRAIL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: vec![Point { x: 0.0, y: 0.0 }; capacity].into_boxed_slice(),
            start: 0,
            len: 0,
            sent: 0,
        }
    }

    /// Number of points currently stored
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.points.len()
    }

    /// Points already flushed to clients (delta watermark)
    pub fn sent_count(&self) -> usize {
        self.sent
    }

    /// Append a point. O(1), no allocation. Once full, the oldest point
    /// is overwritten and the sent watermark shifts back by one.
    pub fn push(&mut self, x: f64, y: f64) {
        let cap = self.points.len();
        if self.len < cap {
            let slot = (self.start + self.len) % cap;
            self.points[slot] = Point { x, y };
            self.len += 1;
        } else {
            self.points[self.start] = Point { x, y };
            self.start = (self.start + 1) % cap;
            self.sent = self.sent.saturating_sub(1);
        }
    }

    /// Point at logical index (0 = oldest), if stored
    pub fn get(&self, index: usize) -> Option<Point> {
        if index >= self.len {
            return None;
        }
        let cap = self.points.len();
        Some(self.points[(self.start + index) % cap])
    }

    /// Lazy iterator over logical range `[from, to)`, quantized to one
    /// decimal place for wire encoding. Out-of-range bounds are clamped.
    pub fn slice(&self, from: usize, to: usize) -> impl Iterator<Item = [f64; 2]> + '_ {
        let to = to.min(self.len);
        let from = from.min(to);
        let cap = self.points.len();
        (from..to).map(move |i| {
            let p = self.points[(self.start + i) % cap];
            [quantize_tenth(p.x), quantize_tenth(p.y)]
        })
    }

    /// Iterate all stored points, oldest first (collision scan)
    pub fn iter(&self) -> impl Iterator<Item = Point> + '_ {
        let cap = self.points.len();
        (0..self.len).map(move |i| self.points[(self.start + i) % cap])
    }

    /// Advance the sent watermark to the current length
    pub fn mark_flushed(&mut self) {
        self.sent = self.len;
    }

    /// Drop all points and reset the watermark (round start)
    pub fn clear(&mut self) {
        self.start = 0;
        self.len = 0;
        self.sent = 0;
    }
}

impl Default for TrailBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Round to the nearest 0.1 unit
pub fn quantize_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Round to the nearest 0.01 unit (headings)
pub fn quantize_hundredth(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
