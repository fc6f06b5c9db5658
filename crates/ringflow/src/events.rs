//! Event hub fanning provider events out to waiting branches.

use ringflow_core::{CallControlId, CallEvent};
use tokio::sync::broadcast;
use tracing::warn;

const DEFAULT_CAPACITY: usize = 256;

/// Broadcast hub for [`CallEvent`]s.
///
/// The hosting engine publishes webhook events here; every subscriber sees
/// every event published after it subscribed. Subscribe before issuing the
/// command whose event you are going to wait for.
#[derive(Debug, Clone)]
pub struct CallEvents {
    sender: broadcast::Sender<CallEvent>,
}

impl Default for CallEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl CallEvents {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a hub buffering up to `capacity` events per slow subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event. Returns the number of subscribers that received it.
    pub fn publish(&self, event: CallEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> CallEventStream {
        CallEventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

/// A subscription to a [`CallEvents`] hub.
#[derive(Debug)]
pub struct CallEventStream {
    receiver: broadcast::Receiver<CallEvent>,
}

impl CallEventStream {
    /// Waits for the next event. Returns `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<CallEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Call event subscriber lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Waits until `call_control_id` answers.
    ///
    /// Returns `false` if the leg hangs up first or the hub closes.
    pub async fn wait_for_answer(&mut self, call_control_id: &CallControlId) -> bool {
        while let Some(event) = self.next().await {
            match event {
                CallEvent::Answered {
                    call_control_id: answered,
                } if &answered == call_control_id => return true,
                CallEvent::Hangup {
                    call_control_id: hung_up,
                    ..
                } if &hung_up == call_control_id => return false,
                _ => {}
            }
        }
        false
    }
}
