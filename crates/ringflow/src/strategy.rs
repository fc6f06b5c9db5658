//! Ring strategy engine: dials the ring group until someone is bridged.

use crate::events::CallEvents;
use crate::request::{RingGroupRequest, RingGroupStrategy};
use crate::state::{AnsweredCall, OutgoingAttempt, RingGroupState};
use futures::stream::{FuturesUnordered, StreamExt};
use ringflow_core::{
    BridgeOutput, CallControlId, CallEvent, DialRequest, ExtensionId, ExtensionResolver,
    TelephonyClient, TelephonyError,
};
use std::collections::HashSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Result of running the ring strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingResult {
    /// A destination answered and was bridged with the caller.
    Bridged(BridgeOutput),
    /// Dialing stopped without a connection.
    Exhausted,
}

enum RoundResult {
    Bridged(BridgeOutput),
    /// Nobody answered; another round may follow.
    NoAnswer,
    /// Stop dialing for good.
    Abandoned,
}

/// Drives one of the [`RingGroupStrategy`] variants over the extension list.
///
/// The engine is the only writer of `outgoing_attempts` and `answered_call`.
/// It checks [`RingGroupState::dialing_stopped`] before every new attempt.
pub struct RingStrategyEngine<'a> {
    request: &'a RingGroupRequest,
    state: &'a RingGroupState,
    telephony: &'a dyn TelephonyClient,
    resolver: &'a dyn ExtensionResolver,
    events: &'a CallEvents,
}

impl<'a> RingStrategyEngine<'a> {
    pub fn new(
        request: &'a RingGroupRequest,
        state: &'a RingGroupState,
        telephony: &'a dyn TelephonyClient,
        resolver: &'a dyn ExtensionResolver,
        events: &'a CallEvents,
    ) -> Self {
        Self {
            request,
            state,
            telephony,
            resolver,
            events,
        }
    }

    /// Rings the group until a destination is bridged or dialing gives up.
    ///
    /// Without a queue wait the extension list gets a single round. With one,
    /// rounds repeat until the caller hangs up or the queue wait runs out.
    ///
    /// # Errors
    ///
    /// Only fatal telephony faults are returned; unanswered, rejected and
    /// failed dials are part of normal hunting.
    pub async fn execute(&self) -> Result<RingResult, TelephonyError> {
        if self.request.extensions.is_empty() {
            info!("Ring group has no extensions to dial");
            return Ok(RingResult::Exhausted);
        }

        let strategy = self.request.strategy;
        let repeat = self.request.queue_wait().is_some();
        let mut round = 0u32;

        while !self.state.dialing_stopped() {
            round += 1;
            debug!("Starting {} round {}", strategy, round);
            let attempts_before = self.state.attempt_count();

            let result = match strategy {
                RingGroupStrategy::PrioritizedHunt => self.hunt_round().await?,
                RingGroupStrategy::RingAll => self.ring_all_round().await?,
            };

            match result {
                RoundResult::Bridged(output) => return Ok(RingResult::Bridged(output)),
                RoundResult::Abandoned => break,
                RoundResult::NoAnswer if !repeat => {
                    info!("No answer after one {} round, giving up", strategy);
                    break;
                }
                RoundResult::NoAnswer if self.state.attempt_count() == attempts_before => {
                    // Every dial failed; wait out a ring period before redialing.
                    warn!(
                        "No dial succeeded in round {}, retrying in {:?}",
                        round, self.request.ring_time
                    );
                    tokio::time::sleep(self.request.ring_time).await;
                }
                RoundResult::NoAnswer => {
                    debug!("No answer in round {}, ringing again", round);
                }
            }
        }

        Ok(RingResult::Exhausted)
    }

    /// One pass over the extensions, one at a time.
    async fn hunt_round(&self) -> Result<RoundResult, TelephonyError> {
        for extension in &self.request.extensions {
            if self.state.dialing_stopped() {
                return Ok(RoundResult::Abandoned);
            }
            if let Some(output) = self.hunt_attempt(extension).await? {
                return Ok(RoundResult::Bridged(output));
            }
        }
        Ok(RoundResult::NoAnswer)
    }

    async fn hunt_attempt(
        &self,
        extension: &ExtensionId,
    ) -> Result<Option<BridgeOutput>, TelephonyError> {
        let mut events = self.events.subscribe();

        let Some(attempt) = self.dial(extension, true).await? else {
            return Ok(None);
        };

        match timeout(
            self.request.ring_time,
            events.wait_for_answer(&attempt.call_control_id),
        )
        .await
        {
            Ok(true) => self.connect(&attempt).await,
            Ok(false) => {
                debug!("Extension '{}' did not pick up", extension);
                Ok(None)
            }
            Err(_) => {
                debug!("Extension '{}' rang out", extension);
                Ok(None)
            }
        }
    }

    /// Rings every extension at once and bridges the first answer.
    async fn ring_all_round(&self) -> Result<RoundResult, TelephonyError> {
        let mut events = self.events.subscribe();
        let mut dials: FuturesUnordered<_> = self
            .request
            .extensions
            .iter()
            .map(|extension| self.dial(extension, false))
            .collect();

        let deadline = tokio::time::sleep(self.request.ring_time);
        tokio::pin!(deadline);

        // Answers that beat their own dial acknowledgement.
        let mut early_answers: HashSet<CallControlId> = HashSet::new();

        let winner = loop {
            tokio::select! {
                Some(dialed) = dials.next(), if !dials.is_empty() => {
                    if let Some(attempt) = dialed? {
                        if early_answers.remove(&attempt.call_control_id) {
                            self.accept(&attempt);
                            break Some(attempt);
                        }
                    }
                }
                event = events.next() => match event {
                    Some(CallEvent::Answered { call_control_id }) => {
                        if let Some(attempt) = self.state.find_attempt(&call_control_id) {
                            self.accept(&attempt);
                            break Some(attempt);
                        }
                        if !dials.is_empty() {
                            early_answers.insert(call_control_id);
                        }
                    }
                    Some(_) => {}
                    None => {
                        (&mut deadline).await;
                        break None;
                    }
                },
                _ = &mut deadline => break None,
            }
        };

        // Acknowledged dials still in flight are recorded so cleanup sees them.
        while let Some(dialed) = dials.next().await {
            dialed?;
        }

        match winner {
            Some(attempt) => match self.connect(&attempt).await? {
                Some(output) => Ok(RoundResult::Bridged(output)),
                None => {
                    // Recorded as answered, so exit cleanup skips it.
                    self.hang_up_refused(&attempt).await;
                    Ok(RoundResult::Abandoned)
                }
            },
            None => {
                debug!("Nobody answered within {:?}", self.request.ring_time);
                Ok(RoundResult::NoAnswer)
            }
        }
    }

    /// Issues a dial and records the attempt.
    ///
    /// Non-fatal dial errors are logged and reported as `None`.
    async fn dial(
        &self,
        extension: &ExtensionId,
        suspend_caller: bool,
    ) -> Result<Option<OutgoingAttempt>, TelephonyError> {
        let destination = self.resolve(extension).await;
        let request = DialRequest {
            connection_id: self.request.connection_id.clone(),
            to: destination.clone(),
            from: self.request.caller_id_from.clone(),
            from_display_name: self.request.caller_id_display_name.clone(),
            timeout_secs: self.request.ring_timeout_secs(),
            answering_machine_detection: self.request.answering_machine_detection,
            suspend_caller,
        };

        match self.telephony.dial(request).await {
            Ok(response) => {
                let attempt = OutgoingAttempt {
                    extension: extension.clone(),
                    destination,
                    call_control_id: response.call_control_id,
                };
                debug!(
                    "Dialed extension '{}' at {} ({})",
                    extension, attempt.destination, attempt.call_control_id
                );
                self.state.record_attempt(attempt.clone());
                Ok(Some(attempt))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Dialing extension '{}' failed: {}", extension, e);
                Ok(None)
            }
        }
    }

    /// Resolves an extension, falling back to the raw id.
    async fn resolve(&self, extension: &ExtensionId) -> String {
        match self.resolver.resolve(extension).await {
            Ok(Some(resolved)) => resolved.destination,
            Ok(None) => extension.to_string(),
            Err(e) => {
                warn!("Resolving extension '{}' failed: {}", extension, e);
                extension.to_string()
            }
        }
    }

    /// Records the winning ring-all answer before anything else is awaited.
    fn accept(&self, attempt: &OutgoingAttempt) {
        self.state.record_answer(AnsweredCall {
            extension: attempt.extension.clone(),
            call_control_id: attempt.call_control_id.clone(),
        });
    }

    /// Stops hold music and bridges the caller with an answered attempt.
    ///
    /// Returns `None` if the bridge was refused.
    async fn connect(
        &self,
        attempt: &OutgoingAttempt,
    ) -> Result<Option<BridgeOutput>, TelephonyError> {
        self.state.set_bridging(true);
        let result = self.bridge(attempt).await;
        self.state.set_bridging(false);
        result
    }

    async fn bridge(
        &self,
        attempt: &OutgoingAttempt,
    ) -> Result<Option<BridgeOutput>, TelephonyError> {
        if self.request.hold_music_url.is_some() {
            match self.telephony.stop_audio(&self.request.call_control_id).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!("Stopping hold music before bridging failed: {}", e),
            }
        }

        match self
            .telephony
            .bridge(&self.request.call_control_id, &attempt.call_control_id)
            .await
        {
            Ok(output) => {
                self.state.record_answer(AnsweredCall {
                    extension: attempt.extension.clone(),
                    call_control_id: attempt.call_control_id.clone(),
                });
                info!(
                    "Bridged caller with extension '{}' ({})",
                    attempt.extension, attempt.call_control_id
                );
                Ok(Some(output))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(
                    "Bridging with extension '{}' failed: {}",
                    attempt.extension, e
                );
                Ok(None)
            }
        }
    }

    async fn hang_up_refused(&self, attempt: &OutgoingAttempt) {
        if let Err(e) = self.telephony.hangup(&attempt.call_control_id).await {
            debug!(
                "Error while trying to hang up refused call {}: {}",
                attempt.call_control_id, e
            );
        }
    }
}
