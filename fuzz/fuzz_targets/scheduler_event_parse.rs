#![no_main]

use libfuzzer_sys::fuzz_target;
use mesos_driver::mesos_proto::scheduler::Event;

fuzz_target!(|data: &[u8]| {
    let Ok(event) = serde_json::from_slice::<Event>(data) else {
        return;
    };
    assert!(!event.kind().trim().is_empty());

    // Known kinds survive a round trip; unknown kinds keep only their tag.
    let encoded = serde_json::to_vec(&event).expect("decoded events serialize");
    let reparsed: Event = serde_json::from_slice(&encoded).expect("serialized events parse");
    assert_eq!(reparsed.kind(), event.kind());
});
