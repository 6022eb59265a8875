//! Metric recording functions.
//!
//! All metrics follow Prometheus naming conventions:
//! - `call_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a processed transport notification.
///
/// Metric: `call_events_total`
/// Labels: `event` (bounded by `CallEvent` variants, 9 values)
pub fn record_event(event: &'static str) {
    counter!("call_events_total", "event" => event).increment(1);
}

/// Record a notification that was ignored.
///
/// Metric: `call_events_ignored_total`
/// Labels: `reason` (missing_payload, unknown_participant, not_joined,
/// malformed_payload, queue_full)
pub fn record_event_ignored(reason: &'static str) {
    counter!("call_events_ignored_total", "reason" => reason).increment(1);
}

/// Record how long applying one notification took.
///
/// Metric: `call_event_latency_seconds`
/// Labels: `event`
pub fn record_event_latency(event: &'static str, duration: Duration) {
    histogram!("call_event_latency_seconds", "event" => event).record(duration.as_secs_f64());
}

/// Set the number of participant views.
///
/// Metric: `call_participants_active`
pub fn set_participants_active(count: usize) {
    // usize to f64 conversion is safe for realistic participant counts
    #[allow(clippy::cast_precision_loss)]
    gauge!("call_participants_active").set(count as f64);
}

/// Record a chat line appended to the log.
///
/// Metric: `call_chat_messages_total`
/// Labels: `direction` (inbound, outbound)
pub fn record_chat_message(direction: &'static str) {
    counter!("call_chat_messages_total", "direction" => direction).increment(1);
}

/// Record a user intent forwarded to the transport.
///
/// Metric: `call_intents_total`
/// Labels: `intent` (toggle_video, toggle_audio, leave, chat)
pub fn record_intent(intent: &'static str) {
    counter!("call_intents_total", "intent" => intent).increment(1);
}

/// Set the actor mailbox depth.
///
/// Metric: `call_actor_mailbox_depth`
pub fn set_mailbox_depth(depth: usize) {
    // usize to f64 conversion is safe for realistic mailbox depths
    #[allow(clippy::cast_precision_loss)]
    gauge!("call_actor_mailbox_depth").set(depth as f64);
}
