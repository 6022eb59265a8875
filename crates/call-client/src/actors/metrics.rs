//! Mailbox monitoring for the call actor.
//!
//! Depth thresholds scale with the configured mailbox capacity:
//!
//! | Level    | Depth                   |
//! |----------|-------------------------|
//! | Normal   | <= capacity / 5         |
//! | Warning  | up to capacity          |
//! | Critical | > capacity (send waits) |
//!
//! The handle records an enqueue before sending and the actor records the
//! dequeue after processing, so the depth counts queued plus in-flight
//! commands.

use crate::observability::metrics;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Mailbox depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    /// At or below the normal threshold.
    Normal,
    /// Between the normal threshold and capacity.
    Warning,
    /// Above capacity.
    Critical,
}

/// Mailbox monitor shared between a call actor and its handles.
#[derive(Debug)]
pub struct MailboxMonitor {
    call_id: String,
    normal_threshold: usize,
    warning_threshold: usize,
    depth: AtomicUsize,
    peak_depth: AtomicUsize,
    messages_processed: AtomicU64,
    messages_dropped: AtomicU64,
}

impl MailboxMonitor {
    /// Create a monitor for a mailbox bounded at `capacity`.
    #[must_use]
    pub fn new(call_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            call_id: call_id.into(),
            normal_threshold: (capacity / 5).max(1),
            warning_threshold: capacity,
            depth: AtomicUsize::new(0),
            peak_depth: AtomicUsize::new(0),
            messages_processed: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
        }
    }

    /// Record a command being added to the mailbox.
    pub fn record_enqueue(&self) {
        let new_depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_depth.fetch_max(new_depth, Ordering::Relaxed);
        metrics::set_mailbox_depth(new_depth);

        match self.level_for_depth(new_depth) {
            MailboxLevel::Critical => warn!(
                target: "call.actor.mailbox",
                call_id = %self.call_id,
                depth = new_depth,
                threshold = self.warning_threshold,
                "Mailbox depth critical"
            ),
            MailboxLevel::Warning if new_depth == self.normal_threshold + 1 => debug!(
                target: "call.actor.mailbox",
                call_id = %self.call_id,
                depth = new_depth,
                "Mailbox depth elevated"
            ),
            _ => {}
        }
    }

    /// Record a command having been processed.
    pub fn record_dequeue(&self) {
        let previous = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| Some(d.saturating_sub(1)))
            .unwrap_or(0);
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        metrics::set_mailbox_depth(previous.saturating_sub(1));
    }

    /// Record a command that never reached the actor.
    pub fn record_drop(&self) {
        self.depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| Some(d.saturating_sub(1)))
            .ok();
        let dropped = self.messages_dropped.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            target: "call.actor.mailbox",
            call_id = %self.call_id,
            dropped,
            "Command dropped, actor gone"
        );
    }

    /// Get current mailbox depth.
    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Get peak mailbox depth since creation.
    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    /// Get total commands processed.
    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    /// Get total commands that never reached the actor.
    #[must_use]
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    /// Get the level for the current depth.
    #[must_use]
    pub fn current_level(&self) -> MailboxLevel {
        self.level_for_depth(self.current_depth())
    }

    fn level_for_depth(&self, depth: usize) -> MailboxLevel {
        if depth > self.warning_threshold {
            MailboxLevel::Critical
        } else if depth > self.normal_threshold {
            MailboxLevel::Warning
        } else {
            MailboxLevel::Normal
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_dequeue_tracks_depth_and_peak() {
        let monitor = MailboxMonitor::new("call-1", 500);

        monitor.record_enqueue();
        monitor.record_enqueue();
        monitor.record_enqueue();
        assert_eq!(monitor.current_depth(), 3);

        monitor.record_dequeue();
        assert_eq!(monitor.current_depth(), 2);
        assert_eq!(monitor.peak_depth(), 3);
        assert_eq!(monitor.messages_processed(), 1);
    }

    #[test]
    fn test_levels_scale_with_capacity() {
        let monitor = MailboxMonitor::new("call-1", 10);
        assert_eq!(monitor.current_level(), MailboxLevel::Normal);

        for _ in 0..3 {
            monitor.record_enqueue();
        }
        assert_eq!(monitor.current_level(), MailboxLevel::Warning);

        for _ in 0..8 {
            monitor.record_enqueue();
        }
        assert_eq!(monitor.current_level(), MailboxLevel::Critical);
    }

    #[test]
    fn test_drop_and_dequeue_never_underflow() {
        let monitor = MailboxMonitor::new("call-1", 500);
        monitor.record_dequeue();
        monitor.record_drop();
        assert_eq!(monitor.current_depth(), 0);
        assert_eq!(monitor.messages_dropped(), 1);
    }
}
