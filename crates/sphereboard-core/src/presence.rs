//! Remote participant cursors.

use kurbo::{Point, Size};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cursors with no update for this long are dropped.
pub const CURSOR_TTL: Duration = Duration::from_millis(4000);

/// Last known pointer of another participant.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub participant_id: String,
    /// Position as a fraction of the sender's viewport.
    pub x: f64,
    pub y: f64,
    pub name: String,
    pub color: String,
    pub received: Instant,
}

impl RemoteCursor {
    /// Name tag shown next to the dot: the part of the name before any `@`.
    pub fn label(&self) -> &str {
        display_label(&self.name)
    }

    /// Screen position for a viewer with the given viewport size.
    pub fn screen_position(&self, viewport: Size) -> Point {
        Point::new(self.x * viewport.width, self.y * viewport.height)
    }
}

/// Cut an email-style display name down to its local part.
pub fn display_label(name: &str) -> &str {
    name.split('@').next().unwrap_or(name)
}

/// Live remote cursors keyed by participant id.
#[derive(Debug, Default)]
pub struct CursorTable {
    cursors: HashMap<String, RemoteCursor>,
}

impl CursorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a cursor.
    pub fn upsert(&mut self, cursor: RemoteCursor) {
        self.cursors.insert(cursor.participant_id.clone(), cursor);
    }

    pub fn remove(&mut self, participant_id: &str) {
        self.cursors.remove(participant_id);
    }

    /// Drop cursors older than [`CURSOR_TTL`]. Returns how many were dropped.
    pub fn purge(&mut self, now: Instant) -> usize {
        let before = self.cursors.len();
        self.cursors
            .retain(|_, c| now.saturating_duration_since(c.received) <= CURSOR_TTL);
        before - self.cursors.len()
    }

    /// Cursors still fresh at `now`, ordered by participant id.
    pub fn live(&self, now: Instant) -> Vec<&RemoteCursor> {
        let mut live: Vec<_> = self
            .cursors
            .values()
            .filter(|c| now.saturating_duration_since(c.received) <= CURSOR_TTL)
            .collect();
        live.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        live
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
    }
}
