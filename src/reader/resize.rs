use super::layout::Viewport;
use std::time::Duration;
use tokio::time::Instant;

/// Width changes smaller than this are toolbar noise, not a new layout.
pub const RESIZE_THRESHOLD: f64 = 10.0;
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(150);

/// Collapses a burst of viewport changes into a single rebuild.
#[derive(Debug)]
pub struct ResizeDebouncer {
    last_width: f64,
    pending: Option<(Instant, Viewport)>,
}

impl ResizeDebouncer {
    pub fn new(initial_width: f64) -> Self {
        Self {
            last_width: initial_width,
            pending: None,
        }
    }

    /// Returns whether the event was accepted and (re)armed the timer.
    pub fn observe(&mut self, viewport: Viewport, now: Instant) -> bool {
        if (viewport.width - self.last_width).abs() < RESIZE_THRESHOLD {
            return false;
        }
        self.last_width = viewport.width;
        self.pending = Some((now + RESIZE_DEBOUNCE, viewport));
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(deadline, _)| deadline)
    }

    /// Takes the pending viewport once its quiet period has passed.
    pub fn fire(&mut self, now: Instant) -> Option<Viewport> {
        match self.pending {
            Some((deadline, viewport)) if deadline <= now => {
                self.pending = None;
                Some(viewport)
            }
            _ => None,
        }
    }
}
