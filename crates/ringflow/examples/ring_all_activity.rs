//! Ring-all group executed as an activity, with a caller who gives up.

use ringflow::prelude::*;
use ringflow::sim::SimulatedTelephony;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let events = CallEvents::new();
    let telephony = Arc::new(SimulatedTelephony::new(events.clone()));
    let ring_group = RingGroup::new(telephony.clone(), events);

    let request = RingGroupRequest::builder("caller-leg", "session-2")
        .extensions(["201", "202", "203"])
        .strategy(RingGroupStrategy::RingAll)
        .ring_time(Duration::from_secs(3))
        .max_queue_wait_time(Duration::from_secs(30))
        .hold_music_url("https://example.com/hold.mp3")
        .build()?;
    let activity = RingGroupActivity::new(ring_group, request);

    let caller = telephony.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(4)).await;
        caller.hangup_caller(&CallControlId::new("caller-leg"), &CallSessionId::new("session-2"));
    });

    let mut journal = Journal::new();
    let outcome = activity.execute(&mut journal).await?;
    println!("{} finished with {}", activity.name(), outcome.outcome_name());
    println!("Journal keys: {:?}", journal.keys().collect::<Vec<_>>());

    Ok(())
}
