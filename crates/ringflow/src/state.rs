//! Mutable state of one ring group episode.
//!
//! Each field has a single writer: the ring strategy engine records attempts,
//! the answered call and `bridging`, the hangup branch flips
//! `caller_hung_up`, the call branch flips `queue_wait_elapsed`, and exit
//! cleanup latches `cleaned_up`. Everyone else only reads.

use parking_lot::Mutex;
use ringflow_core::{CallControlId, ExtensionId};
use std::sync::atomic::{AtomicBool, Ordering};

/// One issued dial, whatever became of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingAttempt {
    pub extension: ExtensionId,
    /// Destination the extension resolved to.
    pub destination: String,
    pub call_control_id: CallControlId,
}

/// The destination whose answer was accepted.
///
/// Ring-all records the first answer as soon as it wins, before the bridge is
/// requested. A prioritized hunt records it once the bridge succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsweredCall {
    pub extension: ExtensionId,
    pub call_control_id: CallControlId,
}

#[derive(Debug, Default)]
pub struct RingGroupState {
    answered_call: Mutex<Option<AnsweredCall>>,
    outgoing_attempts: Mutex<Vec<OutgoingAttempt>>,
    caller_hung_up: AtomicBool,
    queue_wait_elapsed: AtomicBool,
    bridging: AtomicBool,
    cleaned_up: AtomicBool,
}

impl RingGroupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answered_call(&self) -> Option<AnsweredCall> {
        self.answered_call.lock().clone()
    }

    /// Records the answered call. Returns `false` if one is already recorded.
    pub(crate) fn record_answer(&self, call: AnsweredCall) -> bool {
        let mut answered = self.answered_call.lock();
        if answered.is_some() {
            return false;
        }
        *answered = Some(call);
        true
    }

    pub(crate) fn set_bridging(&self, bridging: bool) {
        self.bridging.store(bridging, Ordering::SeqCst);
    }

    /// Whether an answer is being or has been connected to the caller.
    ///
    /// Hold feedback pauses and the queue wait no longer interrupts while
    /// this holds.
    pub fn connecting(&self) -> bool {
        self.bridging.load(Ordering::SeqCst) || self.answered_call.lock().is_some()
    }

    /// Snapshot of every attempt issued so far, in issuance order.
    pub fn outgoing_attempts(&self) -> Vec<OutgoingAttempt> {
        self.outgoing_attempts.lock().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.outgoing_attempts.lock().len()
    }

    pub(crate) fn record_attempt(&self, attempt: OutgoingAttempt) {
        self.outgoing_attempts.lock().push(attempt);
    }

    pub(crate) fn find_attempt(&self, call_control_id: &CallControlId) -> Option<OutgoingAttempt> {
        self.outgoing_attempts
            .lock()
            .iter()
            .find(|attempt| &attempt.call_control_id == call_control_id)
            .cloned()
    }

    pub fn caller_hung_up(&self) -> bool {
        self.caller_hung_up.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_caller_hung_up(&self) {
        self.caller_hung_up.store(true, Ordering::SeqCst);
    }

    /// Whether the queue wait ran out. No new attempt starts afterwards.
    pub fn queue_wait_elapsed(&self) -> bool {
        self.queue_wait_elapsed.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_queue_wait_elapsed(&self) {
        self.queue_wait_elapsed.store(true, Ordering::SeqCst);
    }

    /// Whether dialing must stop: the caller left or the queue wait ran out.
    pub fn dialing_stopped(&self) -> bool {
        self.caller_hung_up() || self.queue_wait_elapsed()
    }

    /// Latches cleanup. Returns `true` only for the first caller.
    pub(crate) fn begin_cleanup(&self) -> bool {
        !self.cleaned_up.swap(true, Ordering::SeqCst)
    }

    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }

    /// Attempts other than the answered call; all of them if none answered.
    pub fn losing_attempts(&self) -> Vec<OutgoingAttempt> {
        let answered = self.answered_call().map(|call| call.call_control_id);
        self.outgoing_attempts
            .lock()
            .iter()
            .filter(|attempt| Some(&attempt.call_control_id) != answered.as_ref())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(extension: &str, id: &str) -> OutgoingAttempt {
        OutgoingAttempt {
            extension: ExtensionId::new(extension),
            destination: extension.to_string(),
            call_control_id: CallControlId::new(id),
        }
    }

    #[test]
    fn test_answer_recorded_once() {
        let state = RingGroupState::new();
        assert!(state.answered_call().is_none());

        assert!(state.record_answer(AnsweredCall {
            extension: ExtensionId::new("101"),
            call_control_id: CallControlId::new("leg-1"),
        }));
        assert!(!state.record_answer(AnsweredCall {
            extension: ExtensionId::new("102"),
            call_control_id: CallControlId::new("leg-2"),
        }));

        let answered = state.answered_call().expect("answer recorded");
        assert_eq!(answered.call_control_id.as_str(), "leg-1");
    }

    #[test]
    fn test_losing_attempts_exclude_answered() {
        let state = RingGroupState::new();
        state.record_attempt(attempt("101", "leg-1"));
        state.record_attempt(attempt("102", "leg-2"));
        state.record_attempt(attempt("103", "leg-3"));

        assert_eq!(state.losing_attempts().len(), 3);

        state.record_answer(AnsweredCall {
            extension: ExtensionId::new("102"),
            call_control_id: CallControlId::new("leg-2"),
        });

        let losing: Vec<_> = state
            .losing_attempts()
            .into_iter()
            .map(|a| a.call_control_id.to_string())
            .collect();
        assert_eq!(losing, vec!["leg-1", "leg-3"]);
        assert_eq!(state.attempt_count(), 3);
    }

    #[test]
    fn test_connecting_while_bridging_or_answered() {
        let state = RingGroupState::new();
        assert!(!state.connecting());

        state.set_bridging(true);
        assert!(state.connecting());
        state.set_bridging(false);
        assert!(!state.connecting());

        state.record_answer(AnsweredCall {
            extension: ExtensionId::new("101"),
            call_control_id: CallControlId::new("leg-1"),
        });
        assert!(state.connecting());
    }

    #[test]
    fn test_flags_are_monotonic() {
        let state = RingGroupState::new();
        assert!(!state.caller_hung_up());
        state.mark_caller_hung_up();
        state.mark_caller_hung_up();
        assert!(state.caller_hung_up());
        assert!(state.dialing_stopped());

        let state = RingGroupState::new();
        assert!(!state.dialing_stopped());
        state.mark_queue_wait_elapsed();
        assert!(state.queue_wait_elapsed());
        assert!(state.dialing_stopped());

        assert!(state.begin_cleanup());
        assert!(!state.begin_cleanup());
        assert!(state.is_cleaned_up());
    }

    #[test]
    fn test_find_attempt() {
        let state = RingGroupState::new();
        state.record_attempt(attempt("101", "leg-1"));

        assert!(state.find_attempt(&CallControlId::new("leg-1")).is_some());
        assert!(state.find_attempt(&CallControlId::new("leg-9")).is_none());
    }
}
