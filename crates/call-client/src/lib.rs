//! Call Client State Layer
//!
//! This library keeps local view-models in step with an opaque real-time
//! call transport and forwards user intents back to it:
//!
//! - Participant tiles with per-kind media readiness
//! - Playable stream wrappers that survive track replacement
//! - In-call chat over the transport's application-message channel
//! - Join intake and the shell that owns the call lifecycle
//!
//! # Architecture
//!
//! ```text
//! CallShell
//! ├── JoinIntake (pre-join form)
//! └── CallActor (one per call)
//!     └── CallSynchronizer
//!         ├── CallTransport (injected, owned)
//!         ├── ParticipantCollection
//!         ├── StreamRegistry
//!         └── ChatSynchronizer
//! ```
//!
//! # Key Design Decisions
//!
//! - **Injected transport**: a [`transport::TransportFactory`] creates one
//!   transport per call; nothing is global
//! - **Closed event set**: transport notifications are a single
//!   [`transport::CallEvent`] enum
//! - **One mailbox**: notifications and intents are applied one at a time by
//!   the call actor
//! - **Explicit early-track policy**: see [`config::EarlyTrackPolicy`]
//!
//! # Modules
//!
//! - [`actors`] - Call actor and its handle
//! - [`chat`] - Chat log synchronizer
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types with display-safe messages
//! - [`intake`] - Join intake form
//! - [`media`] - Playable stream wrappers
//! - [`observability`] - Metrics
//! - [`participants`] - Participant view-models
//! - [`replay`] - Scripted replay against the loopback transport
//! - [`shell`] - Owning UI shell
//! - [`synchronizer`] - Per-call state and event handling
//! - [`transport`] - Transport capability and loopback implementation

pub mod actors;
pub mod chat;
pub mod config;
pub mod errors;
pub mod intake;
pub mod media;
pub mod observability;
pub mod participants;
pub mod replay;
pub mod shell;
pub mod synchronizer;
pub mod transport;
