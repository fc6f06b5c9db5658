//! Ring group as a workflow activity.

use crate::episode::RingGroup;
use crate::request::RingGroupRequest;
use async_trait::async_trait;
use ringflow_core::{Activity, ActivityName, ActivityOutcome, Journal, RingGroupError};

/// A configured ring group call, ready for a hosting engine to execute.
///
/// The engine follows the `"Connected"` or `"NoResponse"` transition named by
/// the returned outcome.
#[derive(Debug, Clone)]
pub struct RingGroupActivity {
    ring_group: RingGroup,
    request: RingGroupRequest,
}

impl RingGroupActivity {
    pub fn new(ring_group: RingGroup, request: RingGroupRequest) -> Self {
        Self {
            ring_group,
            request,
        }
    }

    pub fn request(&self) -> &RingGroupRequest {
        &self.request
    }
}

#[async_trait]
impl Activity for RingGroupActivity {
    async fn execute(&self, journal: &mut Journal) -> Result<ActivityOutcome, RingGroupError> {
        self.ring_group
            .run_with_journal(&self.request, journal)
            .await
    }

    fn name(&self) -> ActivityName {
        ActivityName::new("CallRingGroup")
    }
}
