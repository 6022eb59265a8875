//! # Call Client Test Utilities
//!
//! Shared test utilities for the call client state layer.
//!
//! This crate provides a scriptable transport and fixtures so the
//! synchronizer, actor and shell can be tested without a real SDK.
//!
//! ## Modules
//!
//! - `mock_transport` - `CallTransport` that records commands and lets tests
//!   deliver notifications by hand
//! - `fixtures` - Participant record builder and event constructors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use call_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let transport = MockTransport::builder().build();
//!     let probe = transport.clone();
//!
//!     // Move `transport` into the code under test, then drive it:
//!     probe.emit(joined_meeting(TestParticipant::new("alice").local().build()));
//!     probe.emit(participant_joined(
//!         TestParticipant::new("bob").video_playable("bob-v1").build(),
//!     ));
//!
//!     assert_eq!(probe.destroy_count(), 0);
//! }
//! ```

pub mod fixtures;
pub mod mock_transport;

pub use fixtures::*;
pub use mock_transport::{MockTransport, MockTransportBuilder, MockTransportFactory, TransportCommand};
