//! Waiting-room display state.
//!
//! Events arrive from two producers at once, the push subscription and the
//! local fallback bus, so the controller is the single merge point: it
//! filters events for this monitor, suppresses duplicates and stale
//! arrivals by timestamp, and keeps the short announcement history the
//! screen renders.

use llamador_types::{CallEvent, MonitorId};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Most recent announcements kept, current call included.
pub const HISTORY_LIMIT: usize = 4;

/// How long an accepted call stays visually highlighted before the screen
/// returns to its ambient state.
pub const HIGHLIGHT_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct MonitorController {
    monitor_id: MonitorId,
    last_seen_timestamp: i64,
    current: Option<CallEvent>,
    history: VecDeque<CallEvent>,
    highlight_until: Option<Instant>,
}

impl MonitorController {
    pub fn new(monitor_id: MonitorId) -> Self {
        Self {
            monitor_id,
            last_seen_timestamp: 0,
            current: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            highlight_until: None,
        }
    }

    pub fn monitor_id(&self) -> &MonitorId {
        &self.monitor_id
    }

    /// Offers one event from either channel. Returns whether it was
    /// accepted as the current call.
    ///
    /// Rejected silently: events for other monitors (the local bus is not
    /// server-filtered) and events at or below the last seen timestamp
    /// (duplicates from the second channel, or stale arrivals).
    pub fn offer(&mut self, event: CallEvent) -> bool {
        if !event.monitor_id.matches(&self.monitor_id) {
            tracing::debug!(
                target_id = %event.monitor_id,
                monitor_id = %self.monitor_id,
                "ignoring call for another monitor"
            );
            return false;
        }
        if event.timestamp <= self.last_seen_timestamp {
            return false;
        }

        self.last_seen_timestamp = event.timestamp;
        self.history.push_front(event.clone());
        self.history.truncate(HISTORY_LIMIT);
        self.current = Some(event);
        self.highlight_until = Some(Instant::now() + HIGHLIGHT_WINDOW);
        true
    }

    /// The call currently on screen, if any.
    pub fn current_call(&self) -> Option<&CallEvent> {
        self.current.as_ref()
    }

    /// Announcement history, most recent first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &CallEvent> {
        self.history.iter()
    }

    pub fn last_seen_timestamp(&self) -> i64 {
        self.last_seen_timestamp
    }

    /// Whether the primary announcement pulse is still active.
    pub fn is_highlighting(&self) -> bool {
        self.highlight_until
            .map(|deadline| Instant::now() < deadline)
            .unwrap_or(false)
    }

    /// When the screen should fall back to its ambient state.
    pub fn highlight_deadline(&self) -> Option<Instant> {
        self.highlight_until
    }
}
