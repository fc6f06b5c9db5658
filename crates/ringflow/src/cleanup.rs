//! Exit cleanup: hangs up every outgoing call other than the answered one.

use crate::state::RingGroupState;
use futures::future::join_all;
use ringflow_core::journal::{EXITING, OUTGOING_CALLS};
use ringflow_core::{Journal, TelephonyClient};
use tracing::{debug, info};

/// Hangs up the losing attempts of an episode.
///
/// Runs at most once per state; later calls do nothing and return 0. Hangup
/// failures are logged and swallowed. Returns the number of hangups issued.
pub async fn exit_cleanup(
    state: &RingGroupState,
    telephony: &dyn TelephonyClient,
    journal: &mut Journal,
) -> usize {
    if !state.begin_cleanup() {
        debug!("Exit cleanup already ran");
        return 0;
    }
    journal.insert(EXITING, true);

    let losing = state.losing_attempts();
    journal.insert(OUTGOING_CALLS, losing.clone());

    join_all(losing.iter().map(|attempt| async move {
        if let Err(e) = telephony.hangup(&attempt.call_control_id).await {
            debug!(
                "Error while trying to hang up outgoing call {}: {}",
                attempt.call_control_id, e
            );
        }
    }))
    .await;

    if !losing.is_empty() {
        info!("Hung up {} outgoing calls", losing.len());
    }
    losing.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CallEvents;
    use crate::sim::SimulatedTelephony;
    use crate::state::{AnsweredCall, OutgoingAttempt};
    use ringflow_core::{CallControlId, ExtensionId, TelephonyError};

    fn record(state: &RingGroupState, id: &str) {
        state.record_attempt(OutgoingAttempt {
            extension: ExtensionId::new(id),
            destination: id.to_string(),
            call_control_id: CallControlId::new(id),
        });
    }

    #[tokio::test]
    async fn test_hangs_up_all_but_answered() {
        let telephony = SimulatedTelephony::new(CallEvents::new());
        let state = RingGroupState::new();
        record(&state, "leg-1");
        record(&state, "leg-2");
        record(&state, "leg-3");
        state.record_answer(AnsweredCall {
            extension: ExtensionId::new("leg-2"),
            call_control_id: CallControlId::new("leg-2"),
        });

        let mut journal = Journal::new();
        let issued = exit_cleanup(&state, &telephony, &mut journal).await;

        assert_eq!(issued, 2);
        let mut hung_up = telephony.hung_up();
        hung_up.sort();
        assert_eq!(
            hung_up,
            vec![CallControlId::new("leg-1"), CallControlId::new("leg-3")]
        );
        assert_eq!(journal.get::<bool>(EXITING), Some(&true));
        assert_eq!(
            journal
                .get::<Vec<OutgoingAttempt>>(OUTGOING_CALLS)
                .map(Vec::len),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_second_run_issues_nothing() {
        let telephony = SimulatedTelephony::new(CallEvents::new());
        let state = RingGroupState::new();
        record(&state, "leg-1");

        let mut journal = Journal::new();
        assert_eq!(exit_cleanup(&state, &telephony, &mut journal).await, 1);
        assert_eq!(exit_cleanup(&state, &telephony, &mut journal).await, 0);
        assert_eq!(telephony.hung_up().len(), 1);
    }

    #[tokio::test]
    async fn test_hangup_failures_are_swallowed() {
        let telephony = SimulatedTelephony::new(CallEvents::new());
        telephony.fail_hangups(TelephonyError::Api {
            status: 404,
            message: "Call not found".to_string(),
        });
        let state = RingGroupState::new();
        record(&state, "leg-1");
        record(&state, "leg-2");

        let mut journal = Journal::new();
        assert_eq!(exit_cleanup(&state, &telephony, &mut journal).await, 2);
        assert!(state.is_cleaned_up());
    }
}
