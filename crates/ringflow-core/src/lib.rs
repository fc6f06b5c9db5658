//! Core types and collaborator traits for ringflow.
//!
//! This crate provides the contracts without runtime dependencies.
//! Telephony providers and hosting engines depend on this crate to plug into
//! a ring group.
//!
//! # Core Types
//!
//! - [`TelephonyClient`] - Dial, bridge, hangup, speech and audio against call legs
//! - [`ExtensionResolver`] - Maps extensions to dialable destinations
//! - [`CallEvent`] - Answer and hangup notifications from the provider
//! - [`Activity`] - The entry point a workflow engine drives
//! - [`Journal`] - Diagnostic data recorded during an activity
//! - [`RingGroupError`] / [`TelephonyError`] - Error types

mod activity;
mod error;
mod event;
mod ids;
pub mod journal;
mod telephony;

pub use activity::{Activity, ActivityName, ActivityOutcome, CONNECTED, NO_RESPONSE};
pub use error::{RingGroupError, TelephonyError};
pub use event::CallEvent;
pub use ids::{CallControlId, CallSessionId, ExtensionId};
pub use journal::{Journal, JournalKey};
pub use telephony::{
    AnsweringMachineDetection, BridgeOutput, DialRequest, DialResponse, ExtensionResolver,
    PassthroughResolver, ResolvedExtension, SpeakRequest, TelephonyClient,
};
