//! Ring-group call distribution for Rust.
//!
//! A ring group hands one inbound call to whichever of a set of extensions
//! picks up first. While the extensions ring, the caller hears hold prompts
//! and music; if the caller gives up, or the queue wait runs out, every
//! outgoing call is hung up again.
//!
//! # Example
//!
//! ```rust,ignore
//! use ringflow::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RingGroupError> {
//!     let events = CallEvents::new();
//!     // Any TelephonyClient implementation; publish its webhooks to `events`.
//!     let ring_group = RingGroup::new(Arc::new(MyProvider::new()), events.clone());
//!
//!     let request = RingGroupRequest::builder("caller-leg", "session-1")
//!         .extensions(["101", "102", "103"])
//!         .strategy(RingGroupStrategy::RingAll)
//!         .max_queue_wait_time(Duration::from_secs(120))
//!         .hold_music_url("https://example.com/hold.mp3")
//!         .build()?;
//!
//!     match ring_group.run(&request).await? {
//!         ActivityOutcome::Connected(bridge) => println!("Connected to {}", bridge.call_control_id_b),
//!         ActivityOutcome::NoResponse => println!("Nobody answered"),
//!     }
//!     Ok(())
//! }
//! ```

mod activity;
mod cleanup;
mod episode;
mod events;
mod hold;
mod request;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
mod state;
mod strategy;

// Re-export core types
pub use ringflow_core::*;

pub use activity::RingGroupActivity;
pub use cleanup::exit_cleanup;
pub use episode::RingGroup;
pub use events::{CallEventStream, CallEvents};
pub use hold::HoldExperience;
pub use request::{
    RingGroupRequest, RingGroupRequestBuilder, RingGroupStrategy, SpeechSettings,
    DEFAULT_HOLD_INTERVAL, DEFAULT_INITIAL_HOLD_TEXT, DEFAULT_PERIODIC_HOLD_TEXT,
    DEFAULT_RING_TIME,
};
pub use state::{AnsweredCall, OutgoingAttempt, RingGroupState};
pub use strategy::{RingResult, RingStrategyEngine};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Activity, ActivityOutcome, CallControlId, CallEvent, CallEvents, CallSessionId,
        ExtensionId, ExtensionResolver, Journal, RingGroup, RingGroupActivity, RingGroupError,
        RingGroupRequest, RingGroupState, RingGroupStrategy, TelephonyClient, TelephonyError,
    };
}
