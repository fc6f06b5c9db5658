//! Collaborator contracts: the telephony provider and extension lookup.

use crate::error::TelephonyError;
use crate::ids::{CallControlId, CallSessionId, ExtensionId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Answering machine detection mode passed through to dial attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnsweringMachineDetection {
    #[default]
    Disabled,
    Detect,
    DetectBeep,
    DetectWords,
    GreetingEnd,
}

impl AnsweringMachineDetection {
    /// Provider wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnsweringMachineDetection::Disabled => "disabled",
            AnsweringMachineDetection::Detect => "detect",
            AnsweringMachineDetection::DetectBeep => "detect_beep",
            AnsweringMachineDetection::DetectWords => "detect_words",
            AnsweringMachineDetection::GreetingEnd => "greeting_end",
        }
    }
}

impl fmt::Display for AnsweringMachineDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnsweringMachineDetection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(AnsweringMachineDetection::Disabled),
            "detect" => Ok(AnsweringMachineDetection::Detect),
            "detect_beep" => Ok(AnsweringMachineDetection::DetectBeep),
            "detect_words" => Ok(AnsweringMachineDetection::DetectWords),
            "greeting_end" => Ok(AnsweringMachineDetection::GreetingEnd),
            other => Err(format!("unknown answering machine detection mode: {}", other)),
        }
    }
}

/// An outgoing call to place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialRequest {
    /// Call control application used to place the call.
    pub connection_id: Option<String>,
    /// Resolved destination.
    pub to: String,
    /// Caller id number presented to the destination.
    pub from: Option<String>,
    /// Caller id name presented to the destination.
    pub from_display_name: Option<String>,
    /// Seconds the provider lets the call ring before giving up.
    pub timeout_secs: u64,
    pub answering_machine_detection: AnsweringMachineDetection,
    /// Whether the dialing flow waits on this call's answer before moving on.
    pub suspend_caller: bool,
}

/// Provider acknowledgement of an issued dial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialResponse {
    pub call_control_id: CallControlId,
    pub call_leg_id: Option<String>,
    pub call_session_id: Option<CallSessionId>,
}

impl DialResponse {
    pub fn new(call_control_id: impl Into<CallControlId>) -> Self {
        Self {
            call_control_id: call_control_id.into(),
            call_leg_id: None,
            call_session_id: None,
        }
    }
}

/// Result of bridging the caller with an answered destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeOutput {
    /// The caller leg.
    pub call_control_id_a: CallControlId,
    /// The answered outgoing leg.
    pub call_control_id_b: CallControlId,
}

/// Text-to-speech command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakRequest {
    pub payload: String,
    pub voice: String,
    pub language: String,
}

impl SpeakRequest {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            voice: "female".to_string(),
            language: "en-US".to_string(),
        }
    }
}

/// Destination an extension maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedExtension {
    pub destination: String,
}

/// Call control operations against the telephony provider.
///
/// `dial` returns as soon as the provider has accepted the outgoing call; the
/// answer arrives later as a [`CallEvent`](crate::CallEvent). `speak` and
/// `stop_audio` complete once the provider reports speaking or playback
/// ended. Commands addressed to a call that has gone away fail with
/// [`TelephonyError::CallNoLongerActive`].
#[async_trait]
pub trait TelephonyClient: Send + Sync {
    async fn dial(&self, request: DialRequest) -> Result<DialResponse, TelephonyError>;

    /// Connects two live call legs.
    async fn bridge(
        &self,
        call_control_id_a: &CallControlId,
        call_control_id_b: &CallControlId,
    ) -> Result<BridgeOutput, TelephonyError>;

    async fn hangup(&self, call_control_id: &CallControlId) -> Result<(), TelephonyError>;

    async fn speak(
        &self,
        call_control_id: &CallControlId,
        request: SpeakRequest,
    ) -> Result<(), TelephonyError>;

    /// Starts audio playback, optionally looping until stopped.
    async fn play_audio(
        &self,
        call_control_id: &CallControlId,
        audio_url: &str,
        looped: bool,
    ) -> Result<(), TelephonyError>;

    async fn stop_audio(&self, call_control_id: &CallControlId) -> Result<(), TelephonyError>;
}

/// Maps ring group extensions to dialable destinations.
#[async_trait]
pub trait ExtensionResolver: Send + Sync {
    /// Looks up an extension. `Ok(None)` means the extension is dialed as-is.
    async fn resolve(
        &self,
        extension: &ExtensionId,
    ) -> Result<Option<ResolvedExtension>, TelephonyError>;
}

/// Resolver that dials every extension verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughResolver;

#[async_trait]
impl ExtensionResolver for PassthroughResolver {
    async fn resolve(
        &self,
        _extension: &ExtensionId,
    ) -> Result<Option<ResolvedExtension>, TelephonyError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amd_wire_names() {
        for mode in [
            AnsweringMachineDetection::Disabled,
            AnsweringMachineDetection::Detect,
            AnsweringMachineDetection::DetectBeep,
            AnsweringMachineDetection::DetectWords,
            AnsweringMachineDetection::GreetingEnd,
        ] {
            assert_eq!(mode.as_str().parse::<AnsweringMachineDetection>(), Ok(mode));
            let json = serde_json::to_string(&mode).expect("serialize");
            assert_eq!(json, format!("\"{}\"", mode));
        }
        assert!("beep".parse::<AnsweringMachineDetection>().is_err());
        assert_eq!(
            AnsweringMachineDetection::default(),
            AnsweringMachineDetection::Disabled
        );
    }

    #[test]
    fn test_speak_request_defaults() {
        let request = SpeakRequest::new("Please hold");
        assert_eq!(request.voice, "female");
        assert_eq!(request.language, "en-US");
    }
}
