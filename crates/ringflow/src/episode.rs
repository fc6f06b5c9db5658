//! Race coordinator: runs one ring group episode to its outcome.

use crate::cleanup::exit_cleanup;
use crate::events::{CallEventStream, CallEvents};
use crate::hold::HoldExperience;
use crate::request::RingGroupRequest;
use crate::state::RingGroupState;
use crate::strategy::{RingResult, RingStrategyEngine};
use ringflow_core::journal::COLLECTED_DIAL_RESPONSES;
use ringflow_core::{
    ActivityOutcome, CallSessionId, ExtensionResolver, Journal, PassthroughResolver,
    RingGroupError, TelephonyClient, TelephonyError,
};
use std::fmt;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};

/// Which of the racing branches finished first.
enum Winner {
    Call(RingResult),
    CallerHungUp,
}

/// Distributes inbound calls across ring groups.
///
/// Each [`run`](RingGroup::run) is one episode: the call branch (ring
/// strategy, bounded by the queue wait), the hold branch (prompts and music)
/// and the hangup branch (waiting for the caller to give up) race, and the
/// first to finish decides the outcome. Exit cleanup then hangs up every
/// outgoing call other than the answered one.
///
/// # Examples
///
/// ```
/// use ringflow::prelude::*;
/// use ringflow::sim::{DestinationBehavior, SimulatedTelephony};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() -> Result<(), RingGroupError> {
/// let events = CallEvents::new();
/// let telephony = Arc::new(
///     SimulatedTelephony::new(events.clone())
///         .with_behavior("102", DestinationBehavior::AnswerAfter(Duration::from_secs(3))),
/// );
/// let ring_group = RingGroup::new(telephony, events);
///
/// let request = RingGroupRequest::builder("caller-leg", "session-1")
///     .extensions(["101", "102"])
///     .build()?;
///
/// let outcome = ring_group.run(&request).await?;
/// assert_eq!(outcome.outcome_name(), "Connected");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RingGroup {
    telephony: Arc<dyn TelephonyClient>,
    resolver: Arc<dyn ExtensionResolver>,
    events: CallEvents,
}

impl fmt::Debug for RingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingGroup")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl RingGroup {
    /// Creates a ring group dialing extensions verbatim.
    pub fn new(telephony: Arc<dyn TelephonyClient>, events: CallEvents) -> Self {
        Self {
            telephony,
            resolver: Arc::new(PassthroughResolver),
            events,
        }
    }

    /// Uses `resolver` to map extensions to destinations.
    pub fn with_resolver(mut self, resolver: Arc<dyn ExtensionResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The hub the hosting engine publishes provider events to.
    pub fn events(&self) -> &CallEvents {
        &self.events
    }

    /// Runs an episode to its outcome.
    pub async fn run(&self, request: &RingGroupRequest) -> Result<ActivityOutcome, RingGroupError> {
        let mut journal = Journal::new();
        self.run_with_journal(request, &mut journal).await
    }

    /// Runs an episode, recording diagnostics in `journal`.
    pub async fn run_with_journal(
        &self,
        request: &RingGroupRequest,
        journal: &mut Journal,
    ) -> Result<ActivityOutcome, RingGroupError> {
        let state = RingGroupState::new();
        self.run_episode(request, &state, journal).await
    }

    /// Runs an episode against caller-provided state.
    ///
    /// `state` must be fresh; it is left in its terminal form for inspection.
    ///
    /// # Errors
    ///
    /// - [`RingGroupError::Configuration`] if the request is invalid; nothing
    ///   is dialed
    /// - [`RingGroupError::Telephony`] on a fatal telephony fault; exit
    ///   cleanup has still run
    pub async fn run_episode(
        &self,
        request: &RingGroupRequest,
        state: &RingGroupState,
        journal: &mut Journal,
    ) -> Result<ActivityOutcome, RingGroupError> {
        request.validate()?;

        let span = info_span!(
            "ring_group",
            call_session_id = %request.call_session_id,
            strategy = %request.strategy
        );

        async {
            info!(
                "Ringing {} extensions ({})",
                request.extensions.len(),
                request.strategy
            );

            let result = match self.race(request, state).await {
                Ok(Winner::Call(RingResult::Bridged(output))) => {
                    Ok(ActivityOutcome::Connected(output))
                }
                Ok(Winner::Call(RingResult::Exhausted)) => Ok(ActivityOutcome::NoResponse),
                Ok(Winner::CallerHungUp) => {
                    info!("Caller hung up while waiting");
                    Ok(ActivityOutcome::NoResponse)
                }
                Err(e) => {
                    warn!("Ring group aborted: {}", e);
                    Err(RingGroupError::from(e))
                }
            };

            if matches!(result, Ok(ActivityOutcome::NoResponse)) {
                self.stop_hold_music(request).await;
            }

            journal.insert(COLLECTED_DIAL_RESPONSES, state.outgoing_attempts());
            exit_cleanup(state, self.telephony.as_ref(), journal).await;

            if let Ok(outcome) = &result {
                info!(
                    "Ring group finished with {} after {} attempts",
                    outcome.outcome_name(),
                    state.attempt_count()
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Races the call, hold and hangup branches. Losers are dropped, which
    /// cancels their timers; issued dials stay up until exit cleanup.
    async fn race(
        &self,
        request: &RingGroupRequest,
        state: &RingGroupState,
    ) -> Result<Winner, TelephonyError> {
        // Subscribed up front so a hangup during setup is not missed.
        let mut hangups = self.events.subscribe();

        let engine = RingStrategyEngine::new(
            request,
            state,
            self.telephony.as_ref(),
            self.resolver.as_ref(),
            &self.events,
        );
        let hold = HoldExperience::new(request, state, self.telephony.as_ref());

        tokio::select! {
            result = call_branch(request, state, &engine) => result.map(Winner::Call),
            result = hold_branch(&hold) => result,
            () = hangup_branch(&mut hangups, &request.call_session_id, state) => {
                Ok(Winner::CallerHungUp)
            }
        }
    }

    async fn stop_hold_music(&self, request: &RingGroupRequest) {
        if request.hold_music_url.is_none() {
            return;
        }
        if let Err(e) = self.telephony.stop_audio(&request.call_control_id).await {
            debug!("Stopping hold music on exit failed: {}", e);
        }
    }
}

/// Rings the group, bounded by the queue wait if one is configured.
///
/// The queue wait bounds ringing only. A bridge under way when it runs out
/// is allowed to finish; no new attempt starts afterwards.
async fn call_branch(
    request: &RingGroupRequest,
    state: &RingGroupState,
    engine: &RingStrategyEngine<'_>,
) -> Result<RingResult, TelephonyError> {
    let Some(wait) = request.queue_wait() else {
        return engine.execute().await;
    };

    let ringing = engine.execute();
    tokio::pin!(ringing);

    match timeout(wait, &mut ringing).await {
        Ok(result) => result,
        Err(_) => {
            state.mark_queue_wait_elapsed();
            if state.connecting() {
                info!("Queue wait of {:?} elapsed while bridging", wait);
                ringing.await
            } else {
                info!("Queue wait of {:?} elapsed", wait);
                Ok(RingResult::Exhausted)
            }
        }
    }
}

/// Keeps the caller entertained. Never wins the race by finishing; if hold
/// feedback ends early the branch just idles.
async fn hold_branch(hold: &HoldExperience<'_>) -> Result<Winner, TelephonyError> {
    hold.run().await?;
    std::future::pending().await
}

/// Waits for the caller's own hangup, ignoring events of other sessions.
async fn hangup_branch(
    events: &mut CallEventStream,
    call_session_id: &CallSessionId,
    state: &RingGroupState,
) {
    while let Some(event) = events.next().await {
        if event.is_hangup_of_session(call_session_id) {
            state.mark_caller_hung_up();
            return;
        }
    }
    std::future::pending::<()>().await;
}
