//! Observability for the call client.
//!
//! Logging uses `tracing` with `call.*` targets. Metrics go through the
//! `metrics` facade; the library never installs a recorder, so without one
//! every call is a no-op.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `call_events_total` | Counter | `event` | Transport notifications processed |
//! | `call_events_ignored_total` | Counter | `reason` | Notifications dropped (no payload, unknown participant, before join) |
//! | `call_event_latency_seconds` | Histogram | `event` | Time to apply one notification |
//! | `call_participants_active` | Gauge | none | Views in the participant collection |
//! | `call_chat_messages_total` | Counter | `direction` | Chat lines appended |
//! | `call_intents_total` | Counter | `intent` | User intents forwarded to the transport |
//! | `call_actor_mailbox_depth` | Gauge | none | Backpressure indicator |
//!
//! All labels are bounded by enums in this crate.

pub mod metrics;
