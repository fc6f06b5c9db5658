//! Activity trait: the boundary a hosting workflow engine drives.

use crate::error::RingGroupError;
use crate::journal::Journal;
use crate::telephony::BridgeOutput;
use async_trait::async_trait;
use std::fmt::{self, Debug};

/// Outcome name for a caller connected to a destination.
pub const CONNECTED: &str = "Connected";
/// Outcome name for a caller nobody answered.
pub const NO_RESPONSE: &str = "NoResponse";

/// Type-safe activity name wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivityName(String);

impl ActivityName {
    /// Creates a new ActivityName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the activity name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal outcome of an activity.
///
/// The hosting engine follows the transition named by
/// [`outcome_name`](ActivityOutcome::outcome_name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityOutcome {
    /// The caller was bridged with a destination.
    Connected(BridgeOutput),
    /// Nobody answered, the queue wait ran out or the caller hung up.
    NoResponse,
}

impl ActivityOutcome {
    /// Returns the transition name for this outcome.
    pub fn outcome_name(&self) -> &'static str {
        match self {
            ActivityOutcome::Connected(_) => CONNECTED,
            ActivityOutcome::NoResponse => NO_RESPONSE,
        }
    }

    /// Returns the bridge output for a connected outcome.
    pub fn bridge_output(&self) -> Option<&BridgeOutput> {
        match self {
            ActivityOutcome::Connected(output) => Some(output),
            ActivityOutcome::NoResponse => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ActivityOutcome::Connected(_))
    }
}

/// An activity a workflow engine can execute.
///
/// # Examples
///
/// ```
/// use ringflow_core::{Activity, ActivityName, ActivityOutcome, Journal, RingGroupError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Voicemail;
///
/// #[async_trait]
/// impl Activity for Voicemail {
///     async fn execute(&self, journal: &mut Journal) -> Result<ActivityOutcome, RingGroupError> {
///         journal.insert("Voicemail", true);
///         Ok(ActivityOutcome::NoResponse)
///     }
///
///     fn name(&self) -> ActivityName {
///         ActivityName::new("Voicemail")
///     }
/// }
/// ```
#[async_trait]
pub trait Activity: Send + Sync + Debug {
    /// Runs the activity to its terminal outcome.
    ///
    /// # Returns
    ///
    /// - `Ok(outcome)` - The activity finished; follow `outcome.outcome_name()`
    /// - `Err(error)` - The activity was aborted by an unrecoverable fault
    async fn execute(&self, journal: &mut Journal) -> Result<ActivityOutcome, RingGroupError>;

    /// Returns the activity name.
    fn name(&self) -> ActivityName;
}
