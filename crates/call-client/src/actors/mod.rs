//! Actor wrapper around the synchronizer.
//!
//! ```text
//! CallShell
//! └── CallActor (one per call)
//!     ├── owns CallSynchronizer (transport, participants, streams, chat)
//!     ├── reads transport notifications from its event stream
//!     └── reads UI commands from a bounded mailbox
//! ```
//!
//! Both inputs feed one `tokio::select!` loop, so every notification and
//! every intent is applied to completion before the next one starts.
//!
//! # Modules
//!
//! - [`call`] - `CallActor` and its `CallActorHandle`
//! - [`messages`] - Mailbox command types
//! - [`metrics`] - Mailbox depth monitoring

pub mod call;
pub mod messages;
pub mod metrics;

pub use call::{CallActor, CallActorHandle};
pub use messages::CallMessage;
pub use metrics::{MailboxLevel, MailboxMonitor};
