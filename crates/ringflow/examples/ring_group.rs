//! Prioritized hunt through a small ring group.

use ringflow::prelude::*;
use ringflow::sim::{DestinationBehavior, SimulatedTelephony};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let events = CallEvents::new();
    let telephony = Arc::new(
        SimulatedTelephony::new(events.clone())
            .with_behavior("101", DestinationBehavior::RejectAfter(Duration::from_secs(1)))
            .with_behavior("102", DestinationBehavior::AnswerAfter(Duration::from_secs(2))),
    );
    let ring_group = RingGroup::new(telephony.clone(), events);

    let request = RingGroupRequest::builder("caller-leg", "session-1")
        .extensions(["101", "102", "103"])
        .ring_time(Duration::from_secs(5))
        .caller_id("+15550100", Some("Front Desk".to_string()))
        .build()?;

    let state = RingGroupState::new();
    let mut journal = Journal::new();

    match ring_group.run_episode(&request, &state, &mut journal).await? {
        ActivityOutcome::Connected(bridge) => {
            println!(
                "Connected {} with {}",
                bridge.call_control_id_a, bridge.call_control_id_b
            );
        }
        ActivityOutcome::NoResponse => println!("Nobody answered"),
    }

    for attempt in state.outgoing_attempts() {
        println!("Dialed {} as {}", attempt.extension, attempt.call_control_id);
    }
    println!("Hung up {} calls", telephony.hung_up().len());

    Ok(())
}
