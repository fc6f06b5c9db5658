//! Call events delivered by the telephony provider.

use crate::ids::{CallControlId, CallSessionId};
use serde::{Deserialize, Serialize};

/// A provider event relevant to a ring group episode.
///
/// Events are correlated by exact id match only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum CallEvent {
    /// An outgoing leg was picked up.
    Answered { call_control_id: CallControlId },
    /// A call leg hung up.
    Hangup {
        call_control_id: CallControlId,
        call_session_id: CallSessionId,
    },
}

impl CallEvent {
    /// The call leg the event is about.
    pub fn call_control_id(&self) -> &CallControlId {
        match self {
            CallEvent::Answered { call_control_id } => call_control_id,
            CallEvent::Hangup {
                call_control_id, ..
            } => call_control_id,
        }
    }

    /// Returns `true` for a hangup belonging to `session`.
    pub fn is_hangup_of_session(&self, session: &CallSessionId) -> bool {
        matches!(self, CallEvent::Hangup { call_session_id, .. } if call_session_id == session)
    }
}
