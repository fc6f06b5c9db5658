//! Hold experience: prompts and music for the waiting caller.

use crate::request::RingGroupRequest;
use crate::state::RingGroupState;
use ringflow_core::{SpeakRequest, TelephonyClient, TelephonyError};
use std::convert::Infallible;
use tracing::{debug, warn};

/// Speaks hold prompts and plays hold music on the caller leg.
///
/// The cycle is: speak the initial text, start music, then forever wait the
/// hold interval, stop music, speak the periodic text and restart music.
/// Without a music url only the prompts are spoken, on the same cadence.
///
/// While an answer is being connected the caller leg belongs to the bridge:
/// music is not restarted and prompts are skipped. A refused bridge hands
/// the caller back.
pub struct HoldExperience<'a> {
    request: &'a RingGroupRequest,
    state: &'a RingGroupState,
    telephony: &'a dyn TelephonyClient,
}

impl<'a> HoldExperience<'a> {
    pub fn new(
        request: &'a RingGroupRequest,
        state: &'a RingGroupState,
        telephony: &'a dyn TelephonyClient,
    ) -> Self {
        Self {
            request,
            state,
            telephony,
        }
    }

    /// Runs until cancelled by dropping the future.
    ///
    /// Returns `Ok(())` early when hold feedback can no longer be given, most
    /// commonly because the caller leg is gone. Only fatal telephony faults
    /// are returned as errors.
    pub async fn run(&self) -> Result<(), TelephonyError> {
        match self.cycle().await {
            Ok(never) => match never {},
            Err(e) if e.is_fatal() => Err(e),
            Err(e) if e.is_call_gone() => {
                debug!("Caller leg is gone, ending hold feedback");
                Ok(())
            }
            Err(e) => {
                warn!("Hold feedback stopped: {}", e);
                Ok(())
            }
        }
    }

    async fn cycle(&self) -> Result<Infallible, TelephonyError> {
        self.speak(&self.request.initial_hold_text).await?;
        if !self.connecting() {
            self.start_music().await?;
        }

        loop {
            tokio::time::sleep(self.request.periodic_hold_interval).await;
            if self.connecting() {
                continue;
            }
            self.stop_music().await?;
            self.speak(&self.request.periodic_hold_text).await?;
            if !self.connecting() {
                self.start_music().await?;
            }
        }
    }

    fn connecting(&self) -> bool {
        self.state.connecting()
    }

    async fn speak(&self, text: &str) -> Result<(), TelephonyError> {
        let request = SpeakRequest {
            payload: text.to_string(),
            voice: self.request.speech.voice.clone(),
            language: self.request.speech.language.clone(),
        };
        self.telephony
            .speak(&self.request.call_control_id, request)
            .await
    }

    async fn start_music(&self) -> Result<(), TelephonyError> {
        match &self.request.hold_music_url {
            Some(url) => {
                self.telephony
                    .play_audio(&self.request.call_control_id, url, true)
                    .await
            }
            None => Ok(()),
        }
    }

    async fn stop_music(&self) -> Result<(), TelephonyError> {
        if self.request.hold_music_url.is_none() {
            return Ok(());
        }
        self.telephony
            .stop_audio(&self.request.call_control_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CallEvents;
    use crate::sim::{SimulatedTelephony, TelephonyCommand};
    use crate::state::AnsweredCall;
    use ringflow_core::{CallControlId, ExtensionId};
    use std::time::Duration;
    use tokio_test::{assert_pending, task};

    fn request(music: Option<&str>) -> RingGroupRequest {
        let mut builder = RingGroupRequest::builder("caller", "session")
            .initial_hold_text("hello")
            .periodic_hold_text("still here")
            .periodic_hold_interval(Duration::from_secs(10));
        if let Some(url) = music {
            builder = builder.hold_music_url(url);
        }
        builder.build().expect("valid request")
    }

    fn summarize(commands: &[TelephonyCommand]) -> Vec<String> {
        commands
            .iter()
            .map(|command| match command {
                TelephonyCommand::Speak { text, .. } => format!("speak:{}", text),
                TelephonyCommand::PlayAudio { looped, .. } => format!("play:{}", looped),
                TelephonyCommand::StopAudio(_) => "stop".to_string(),
                other => format!("{:?}", other),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_with_music() {
        let telephony = SimulatedTelephony::new(CallEvents::new());
        let request = request(Some("https://example.com/hold.mp3"));
        let state = RingGroupState::new();
        let hold = HoldExperience::new(&request, &state, &telephony);

        let _ = timeout_after(Duration::from_secs(25), hold.run()).await;

        assert_eq!(
            summarize(&telephony.commands()),
            vec![
                "speak:hello",
                "play:true",
                "stop",
                "speak:still here",
                "play:true",
                "stop",
                "speak:still here",
                "play:true",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_speech_only() {
        let telephony = SimulatedTelephony::new(CallEvents::new());
        let request = request(None);
        let state = RingGroupState::new();
        let hold = HoldExperience::new(&request, &state, &telephony);

        let _ = timeout_after(Duration::from_secs(25), hold.run()).await;

        assert_eq!(
            summarize(&telephony.commands()),
            vec!["speak:hello", "speak:still here", "speak:still here"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_gone_ends_quietly() {
        let telephony = SimulatedTelephony::new(CallEvents::new());
        telephony.set_caller_gone(true);
        let request = request(Some("https://example.com/hold.mp3"));
        let state = RingGroupState::new();
        let hold = HoldExperience::new(&request, &state, &telephony);

        assert_eq!(hold.run().await, Ok(()));
        assert_eq!(telephony.commands().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_cancelled() {
        let telephony = SimulatedTelephony::new(CallEvents::new());
        let request = request(None);
        let state = RingGroupState::new();
        let hold = HoldExperience::new(&request, &state, &telephony);

        let mut running = task::spawn(hold.run());
        assert_pending!(running.poll());
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_pending!(running.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_while_bridging() {
        let telephony = SimulatedTelephony::new(CallEvents::new());
        let request = request(Some("https://example.com/hold.mp3"));
        let state = RingGroupState::new();
        state.set_bridging(true);
        let hold = HoldExperience::new(&request, &state, &telephony);

        let mut running = task::spawn(hold.run());
        assert_pending!(running.poll());
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_pending!(running.poll());
        assert_eq!(summarize(&telephony.commands()), vec!["speak:hello"]);

        // A refused bridge hands the caller back to hold feedback.
        state.set_bridging(false);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_pending!(running.poll());
        assert_eq!(
            summarize(&telephony.commands()),
            vec!["speak:hello", "stop", "speak:still here", "play:true"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_quiet_once_answered() {
        let telephony = SimulatedTelephony::new(CallEvents::new());
        let request = request(Some("https://example.com/hold.mp3"));
        let state = RingGroupState::new();
        state.record_answer(AnsweredCall {
            extension: ExtensionId::new("101"),
            call_control_id: CallControlId::new("leg-1"),
        });
        let hold = HoldExperience::new(&request, &state, &telephony);

        let _ = timeout_after(Duration::from_secs(25), hold.run()).await;

        assert_eq!(summarize(&telephony.commands()), vec!["speak:hello"]);
    }

    async fn timeout_after<F: std::future::Future>(duration: Duration, future: F) -> Option<F::Output> {
        tokio::time::timeout(duration, future).await.ok()
    }
}
