//! In-memory telephony provider for demos and tests.
//!
//! [`SimulatedTelephony`] answers, rejects or ignores dials according to a
//! per-destination script and publishes the resulting events on a
//! [`CallEvents`] hub, the way a provider's webhooks would. Every command it
//! receives is recorded for inspection.

use crate::events::CallEvents;
use async_trait::async_trait;
use parking_lot::Mutex;
use ringflow_core::{
    BridgeOutput, CallControlId, CallEvent, CallSessionId, DialRequest, DialResponse,
    SpeakRequest, TelephonyClient, TelephonyError,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a destination does when dialed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationBehavior {
    /// Picks up after the delay, unless the dial's ring limit runs out first.
    AnswerAfter(Duration),
    /// Declines after the delay.
    RejectAfter(Duration),
    /// Rings until the provider gives up at the dial's ring limit.
    NoAnswer,
    /// The provider refuses the dial.
    DialFails(TelephonyError),
}

/// A command received by the simulated provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelephonyCommand {
    Dial(DialRequest),
    Bridge {
        call_control_id_a: CallControlId,
        call_control_id_b: CallControlId,
    },
    Hangup(CallControlId),
    Speak {
        call_control_id: CallControlId,
        text: String,
    },
    PlayAudio {
        call_control_id: CallControlId,
        audio_url: String,
        looped: bool,
    },
    StopAudio(CallControlId),
}

#[derive(Debug)]
pub struct SimulatedTelephony {
    events: CallEvents,
    behaviors: HashMap<String, DestinationBehavior>,
    default_behavior: DestinationBehavior,
    failing_bridges: HashSet<String>,
    speak_duration: Duration,
    bridge_delay: Duration,
    hangup_error: Mutex<Option<TelephonyError>>,
    caller_gone: AtomicBool,
    commands: Mutex<Vec<TelephonyCommand>>,
    legs: Mutex<HashMap<CallControlId, String>>,
    hung_up_legs: Arc<Mutex<HashSet<CallControlId>>>,
    next_leg: AtomicU64,
}

impl SimulatedTelephony {
    /// Creates a provider whose destinations never answer.
    pub fn new(events: CallEvents) -> Self {
        Self {
            events,
            behaviors: HashMap::new(),
            default_behavior: DestinationBehavior::NoAnswer,
            failing_bridges: HashSet::new(),
            speak_duration: Duration::ZERO,
            bridge_delay: Duration::ZERO,
            hangup_error: Mutex::new(None),
            caller_gone: AtomicBool::new(false),
            commands: Mutex::new(Vec::new()),
            legs: Mutex::new(HashMap::new()),
            hung_up_legs: Arc::new(Mutex::new(HashSet::new())),
            next_leg: AtomicU64::new(0),
        }
    }

    pub fn with_behavior(mut self, destination: &str, behavior: DestinationBehavior) -> Self {
        self.behaviors.insert(destination.to_string(), behavior);
        self
    }

    pub fn with_default_behavior(mut self, behavior: DestinationBehavior) -> Self {
        self.default_behavior = behavior;
        self
    }

    /// Makes bridging with calls to `destination` fail.
    pub fn with_failing_bridge(mut self, destination: &str) -> Self {
        self.failing_bridges.insert(destination.to_string());
        self
    }

    /// How long each prompt takes to speak.
    pub fn with_speak_duration(mut self, duration: Duration) -> Self {
        self.speak_duration = duration;
        self
    }

    /// How long the provider takes to answer a bridge request.
    pub fn with_bridge_delay(mut self, delay: Duration) -> Self {
        self.bridge_delay = delay;
        self
    }

    /// Marks the caller leg as gone; caller-leg commands then fail.
    pub fn set_caller_gone(&self, gone: bool) {
        self.caller_gone.store(gone, Ordering::SeqCst);
    }

    /// Makes every subsequent hangup fail with `error`.
    pub fn fail_hangups(&self, error: TelephonyError) {
        *self.hangup_error.lock() = Some(error);
    }

    /// The caller hangs up: the caller leg goes away and a hangup event for
    /// its session is published.
    pub fn hangup_caller(&self, call_control_id: &CallControlId, call_session_id: &CallSessionId) {
        self.set_caller_gone(true);
        self.events.publish(CallEvent::Hangup {
            call_control_id: call_control_id.clone(),
            call_session_id: call_session_id.clone(),
        });
    }

    pub fn commands(&self) -> Vec<TelephonyCommand> {
        self.commands.lock().clone()
    }

    pub fn dials(&self) -> Vec<DialRequest> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                TelephonyCommand::Dial(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Destinations dialed, in order.
    pub fn dialed_destinations(&self) -> Vec<String> {
        self.dials().into_iter().map(|request| request.to).collect()
    }

    /// Legs hangups were issued for, in order.
    pub fn hung_up(&self) -> Vec<CallControlId> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                TelephonyCommand::Hangup(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn bridges(&self) -> Vec<(CallControlId, CallControlId)> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                TelephonyCommand::Bridge {
                    call_control_id_a,
                    call_control_id_b,
                } => Some((call_control_id_a.clone(), call_control_id_b.clone())),
                _ => None,
            })
            .collect()
    }

    /// Legs created by dials to `destination`.
    pub fn legs_to(&self, destination: &str) -> Vec<CallControlId> {
        let mut legs: Vec<_> = self
            .legs
            .lock()
            .iter()
            .filter(|(_, to)| to.as_str() == destination)
            .map(|(id, _)| id.clone())
            .collect();
        legs.sort();
        legs
    }

    fn record(&self, command: TelephonyCommand) {
        self.commands.lock().push(command);
    }

    fn check_caller(&self, call_control_id: &CallControlId) -> Result<(), TelephonyError> {
        if self.caller_gone.load(Ordering::SeqCst) {
            return Err(TelephonyError::CallNoLongerActive {
                call_control_id: call_control_id.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TelephonyClient for SimulatedTelephony {
    async fn dial(&self, request: DialRequest) -> Result<DialResponse, TelephonyError> {
        self.record(TelephonyCommand::Dial(request.clone()));

        let behavior = self
            .behaviors
            .get(&request.to)
            .cloned()
            .unwrap_or_else(|| self.default_behavior.clone());
        let ring_limit = Duration::from_secs(request.timeout_secs);
        let (delay, answers) = match behavior {
            DestinationBehavior::DialFails(e) => return Err(e),
            DestinationBehavior::AnswerAfter(delay) if delay < ring_limit => (delay, true),
            DestinationBehavior::AnswerAfter(_) | DestinationBehavior::NoAnswer => {
                (ring_limit, false)
            }
            DestinationBehavior::RejectAfter(delay) => (delay.min(ring_limit), false),
        };

        let n = self.next_leg.fetch_add(1, Ordering::SeqCst) + 1;
        // Zero-padded so leg ids sort in dial order.
        let leg = CallControlId::new(format!("leg-{:04}-{}", n, request.to));
        let session = CallSessionId::new(format!("outbound-{}", n));
        self.legs.lock().insert(leg.clone(), request.to.clone());

        let events = self.events.clone();
        let hung_up_legs = Arc::clone(&self.hung_up_legs);
        let response = DialResponse {
            call_control_id: leg.clone(),
            call_leg_id: Some(format!("call-leg-{}", n)),
            call_session_id: Some(session.clone()),
        };

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if hung_up_legs.lock().contains(&leg) {
                return;
            }
            let event = if answers {
                CallEvent::Answered {
                    call_control_id: leg,
                }
            } else {
                CallEvent::Hangup {
                    call_control_id: leg,
                    call_session_id: session,
                }
            };
            events.publish(event);
        });

        Ok(response)
    }

    async fn bridge(
        &self,
        call_control_id_a: &CallControlId,
        call_control_id_b: &CallControlId,
    ) -> Result<BridgeOutput, TelephonyError> {
        self.record(TelephonyCommand::Bridge {
            call_control_id_a: call_control_id_a.clone(),
            call_control_id_b: call_control_id_b.clone(),
        });
        if !self.bridge_delay.is_zero() {
            tokio::time::sleep(self.bridge_delay).await;
        }
        self.check_caller(call_control_id_a)?;

        let destination = self.legs.lock().get(call_control_id_b).cloned();
        if destination.is_some_and(|to| self.failing_bridges.contains(&to)) {
            return Err(TelephonyError::Api {
                status: 422,
                message: "Call cannot be bridged".to_string(),
            });
        }
        if self.hung_up_legs.lock().contains(call_control_id_b) {
            return Err(TelephonyError::CallNoLongerActive {
                call_control_id: call_control_id_b.clone(),
            });
        }

        Ok(BridgeOutput {
            call_control_id_a: call_control_id_a.clone(),
            call_control_id_b: call_control_id_b.clone(),
        })
    }

    async fn hangup(&self, call_control_id: &CallControlId) -> Result<(), TelephonyError> {
        self.record(TelephonyCommand::Hangup(call_control_id.clone()));
        self.hung_up_legs.lock().insert(call_control_id.clone());
        match self.hangup_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn speak(
        &self,
        call_control_id: &CallControlId,
        request: SpeakRequest,
    ) -> Result<(), TelephonyError> {
        self.record(TelephonyCommand::Speak {
            call_control_id: call_control_id.clone(),
            text: request.payload,
        });
        self.check_caller(call_control_id)?;
        if !self.speak_duration.is_zero() {
            tokio::time::sleep(self.speak_duration).await;
        }
        self.check_caller(call_control_id)
    }

    async fn play_audio(
        &self,
        call_control_id: &CallControlId,
        audio_url: &str,
        looped: bool,
    ) -> Result<(), TelephonyError> {
        self.record(TelephonyCommand::PlayAudio {
            call_control_id: call_control_id.clone(),
            audio_url: audio_url.to_string(),
            looped,
        });
        self.check_caller(call_control_id)
    }

    async fn stop_audio(&self, call_control_id: &CallControlId) -> Result<(), TelephonyError> {
        self.record(TelephonyCommand::StopAudio(call_control_id.clone()));
        self.check_caller(call_control_id)
    }
}
