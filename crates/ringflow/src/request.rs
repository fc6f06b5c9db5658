//! Ring group request: the immutable input of an episode.

use ringflow_core::{
    AnsweringMachineDetection, CallControlId, CallSessionId, ExtensionId, RingGroupError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How long each destination rings by default.
pub const DEFAULT_RING_TIME: Duration = Duration::from_secs(20);
/// How often the periodic hold text is spoken by default.
pub const DEFAULT_HOLD_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_INITIAL_HOLD_TEXT: &str = "Please hold while we are trying to connect you";
pub const DEFAULT_PERIODIC_HOLD_TEXT: &str = "We're still trying to connect you. Please hold.";

const MAX_DISPLAY_NAME_LEN: usize = 128;

/// Call distribution strategy, fixed for the whole episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RingGroupStrategy {
    /// Ring extensions one at a time, in order.
    #[default]
    PrioritizedHunt,
    /// Ring every extension at once; first answer wins.
    RingAll,
}

impl fmt::Display for RingGroupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingGroupStrategy::PrioritizedHunt => write!(f, "PrioritizedHunt"),
            RingGroupStrategy::RingAll => write!(f, "RingAll"),
        }
    }
}

impl FromStr for RingGroupStrategy {
    type Err = RingGroupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PrioritizedHunt" => Ok(RingGroupStrategy::PrioritizedHunt),
            "RingAll" => Ok(RingGroupStrategy::RingAll),
            other => Err(RingGroupError::Configuration(format!(
                "unknown ring group strategy: {}",
                other
            ))),
        }
    }
}

/// Voice settings for hold prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechSettings {
    pub voice: String,
    pub language: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            voice: "female".to_string(),
            language: "en-US".to_string(),
        }
    }
}

/// Everything needed to distribute one inbound call across a ring group.
///
/// Durations are (de)serialized as whole seconds. Construct with
/// [`RingGroupRequest::builder`], or deserialize and call
/// [`validate`](RingGroupRequest::validate).
///
/// # Examples
///
/// ```
/// use ringflow::{RingGroupRequest, RingGroupStrategy};
/// use std::time::Duration;
///
/// let request = RingGroupRequest::builder("caller-leg", "session-1")
///     .extensions(["101", "102", "103"])
///     .strategy(RingGroupStrategy::RingAll)
///     .max_queue_wait_time(Duration::from_secs(120))
///     .build()?;
///
/// assert_eq!(request.ring_time, Duration::from_secs(20));
/// assert_eq!(request.queue_wait(), Some(Duration::from_secs(120)));
/// # Ok::<(), ringflow::RingGroupError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingGroupRequest {
    /// The inbound caller leg, used for hold feedback and bridging.
    pub call_control_id: CallControlId,
    /// Session of the inbound call; caller hangups are correlated on it.
    pub call_session_id: CallSessionId,
    /// Call control application used for outgoing dials.
    #[serde(default)]
    pub connection_id: Option<String>,
    /// Extensions to ring. Order matters for prioritized hunting.
    #[serde(default)]
    pub extensions: Vec<ExtensionId>,
    #[serde(default)]
    pub strategy: RingGroupStrategy,
    #[serde(default)]
    pub caller_id_from: Option<String>,
    #[serde(default)]
    pub caller_id_display_name: Option<String>,
    /// Ring time per hunt attempt, or per ring-all round.
    #[serde(default = "default_ring_time", with = "duration_secs")]
    pub ring_time: Duration,
    /// Upper bound on the whole dialing phase. `None` or zero waits
    /// indefinitely, but then the extension list is only tried once.
    #[serde(default, with = "optional_duration_secs")]
    pub max_queue_wait_time: Option<Duration>,
    /// Music played to the caller between prompts.
    #[serde(default)]
    pub hold_music_url: Option<String>,
    #[serde(default = "default_initial_hold_text")]
    pub initial_hold_text: String,
    #[serde(default = "default_periodic_hold_text")]
    pub periodic_hold_text: String,
    #[serde(default = "default_hold_interval", with = "duration_secs")]
    pub periodic_hold_interval: Duration,
    #[serde(default)]
    pub answering_machine_detection: AnsweringMachineDetection,
    #[serde(default)]
    pub speech: SpeechSettings,
}

fn default_ring_time() -> Duration {
    DEFAULT_RING_TIME
}

fn default_hold_interval() -> Duration {
    DEFAULT_HOLD_INTERVAL
}

fn default_initial_hold_text() -> String {
    DEFAULT_INITIAL_HOLD_TEXT.to_string()
}

fn default_periodic_hold_text() -> String {
    DEFAULT_PERIODIC_HOLD_TEXT.to_string()
}

impl RingGroupRequest {
    /// Creates a builder for the given caller leg and session.
    pub fn builder(
        call_control_id: impl Into<CallControlId>,
        call_session_id: impl Into<CallSessionId>,
    ) -> RingGroupRequestBuilder {
        RingGroupRequestBuilder::new(call_control_id.into(), call_session_id.into())
    }

    /// The queue wait bound, with zero normalized to `None`.
    pub fn queue_wait(&self) -> Option<Duration> {
        self.max_queue_wait_time.filter(|wait| !wait.is_zero())
    }

    /// Ring time in whole seconds, as the provider expects it.
    pub fn ring_timeout_secs(&self) -> u64 {
        self.ring_time.as_secs()
    }

    /// Checks the request for values an episode cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`RingGroupError::Configuration`] if:
    /// - the caller leg or session id is empty
    /// - `ring_time` is shorter than one second
    /// - `periodic_hold_interval` is zero
    /// - `caller_id_display_name` is longer than 128 characters or contains
    ///   characters other than letters, digits, spaces and `-_~!.+`
    pub fn validate(&self) -> Result<(), RingGroupError> {
        if self.call_control_id.is_empty() {
            return Err(RingGroupError::Configuration(
                "call_control_id must not be empty".to_string(),
            ));
        }
        if self.call_session_id.is_empty() {
            return Err(RingGroupError::Configuration(
                "call_session_id must not be empty".to_string(),
            ));
        }
        if self.ring_time < Duration::from_secs(1) {
            return Err(RingGroupError::Configuration(
                "ring_time must be at least one second".to_string(),
            ));
        }
        if self.periodic_hold_interval.is_zero() {
            return Err(RingGroupError::Configuration(
                "periodic_hold_interval must be greater than zero".to_string(),
            ));
        }
        if let Some(name) = &self.caller_id_display_name {
            if name.chars().count() > MAX_DISPLAY_NAME_LEN {
                return Err(RingGroupError::Configuration(format!(
                    "caller_id_display_name must be {} characters or less",
                    MAX_DISPLAY_NAME_LEN
                )));
            }
            if let Some(c) = name.chars().find(|c| !is_display_name_char(*c)) {
                return Err(RingGroupError::Configuration(format!(
                    "caller_id_display_name contains invalid character '{}'",
                    c
                )));
            }
        }
        Ok(())
    }
}

fn is_display_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '~' | '!' | '.' | '+')
}

/// Builder for [`RingGroupRequest`].
#[derive(Debug, Clone)]
pub struct RingGroupRequestBuilder {
    request: RingGroupRequest,
}

impl RingGroupRequestBuilder {
    fn new(call_control_id: CallControlId, call_session_id: CallSessionId) -> Self {
        Self {
            request: RingGroupRequest {
                call_control_id,
                call_session_id,
                connection_id: None,
                extensions: Vec::new(),
                strategy: RingGroupStrategy::default(),
                caller_id_from: None,
                caller_id_display_name: None,
                ring_time: DEFAULT_RING_TIME,
                max_queue_wait_time: None,
                hold_music_url: None,
                initial_hold_text: default_initial_hold_text(),
                periodic_hold_text: default_periodic_hold_text(),
                periodic_hold_interval: DEFAULT_HOLD_INTERVAL,
                answering_machine_detection: AnsweringMachineDetection::default(),
                speech: SpeechSettings::default(),
            },
        }
    }

    /// Appends a single extension.
    pub fn extension(mut self, extension: impl Into<ExtensionId>) -> Self {
        self.request.extensions.push(extension.into());
        self
    }

    /// Replaces the extension list.
    pub fn extensions<I, E>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<ExtensionId>,
    {
        self.request.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn strategy(mut self, strategy: RingGroupStrategy) -> Self {
        self.request.strategy = strategy;
        self
    }

    pub fn connection_id(mut self, connection_id: impl Into<String>) -> Self {
        self.request.connection_id = Some(connection_id.into());
        self
    }

    /// Sets the caller id number and, optionally, its display name.
    pub fn caller_id(mut self, from: impl Into<String>, display_name: Option<String>) -> Self {
        self.request.caller_id_from = Some(from.into());
        self.request.caller_id_display_name = display_name;
        self
    }

    pub fn ring_time(mut self, ring_time: Duration) -> Self {
        self.request.ring_time = ring_time;
        self
    }

    pub fn max_queue_wait_time(mut self, wait: Duration) -> Self {
        self.request.max_queue_wait_time = Some(wait);
        self
    }

    pub fn hold_music_url(mut self, url: impl Into<String>) -> Self {
        self.request.hold_music_url = Some(url.into());
        self
    }

    pub fn initial_hold_text(mut self, text: impl Into<String>) -> Self {
        self.request.initial_hold_text = text.into();
        self
    }

    pub fn periodic_hold_text(mut self, text: impl Into<String>) -> Self {
        self.request.periodic_hold_text = text.into();
        self
    }

    pub fn periodic_hold_interval(mut self, interval: Duration) -> Self {
        self.request.periodic_hold_interval = interval;
        self
    }

    pub fn answering_machine_detection(mut self, mode: AnsweringMachineDetection) -> Self {
        self.request.answering_machine_detection = mode;
        self
    }

    pub fn speech(mut self, speech: SpeechSettings) -> Self {
        self.request.speech = speech;
        self
    }

    /// Validates and returns the request.
    pub fn build(self) -> Result<RingGroupRequest, RingGroupError> {
        self.request.validate()?;
        Ok(self.request)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod optional_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
