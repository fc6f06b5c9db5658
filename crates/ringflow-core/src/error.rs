//! Error types.

use crate::ids::CallControlId;
use thiserror::Error;

/// Errors reported by a [`TelephonyClient`](crate::TelephonyClient) or
/// [`ExtensionResolver`](crate::ExtensionResolver).
///
/// Most of these are business-level outcomes rather than faults: a call that
/// hung up before we could speak to it, or a provider rejecting a dial. Only
/// [`TelephonyError::Transport`] is treated as fatal by the ring group.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TelephonyError {
    /// The call leg no longer exists at the provider.
    #[error("Call is no longer active: {call_control_id}")]
    CallNoLongerActive {
        /// The call leg the command was addressed to.
        call_control_id: CallControlId,
    },

    /// The provider rejected the command.
    #[error("Telephony API error ({status}): {message}")]
    Api {
        /// HTTP-style status code returned by the provider.
        status: u16,
        /// Provider error message.
        message: String,
    },

    /// The connection to the provider failed.
    #[error("Telephony transport failure: {0}")]
    Transport(String),
}

impl TelephonyError {
    /// Returns `true` if the addressed call leg has disappeared.
    pub fn is_call_gone(&self) -> bool {
        matches!(self, TelephonyError::CallNoLongerActive { .. })
    }

    /// Returns `true` if the error should abort the whole episode.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TelephonyError::Transport(_))
    }
}

/// Errors that end a ring group episode without an outcome.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RingGroupError {
    /// The ring group request is invalid.
    #[error("Invalid ring group configuration: {0}")]
    Configuration(String),

    /// An unrecoverable telephony fault.
    #[error(transparent)]
    Telephony(#[from] TelephonyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = TelephonyError::CallNoLongerActive {
            call_control_id: CallControlId::new("leg-1"),
        };
        assert_eq!(error.to_string(), "Call is no longer active: leg-1");

        let error = TelephonyError::Api {
            status: 422,
            message: "Invalid destination".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Telephony API error (422): Invalid destination"
        );

        let error = RingGroupError::Configuration("ring_time must be positive".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid ring group configuration: ring_time must be positive"
        );
    }

    #[test]
    fn test_error_classification() {
        let gone = TelephonyError::CallNoLongerActive {
            call_control_id: CallControlId::new("leg-1"),
        };
        assert!(gone.is_call_gone());
        assert!(!gone.is_fatal());

        let transport = TelephonyError::Transport("connection reset".to_string());
        assert!(transport.is_fatal());
        assert!(!transport.is_call_gone());

        let wrapped: RingGroupError = transport.into();
        assert!(matches!(wrapped, RingGroupError::Telephony(e) if e.is_fatal()));
    }
}
