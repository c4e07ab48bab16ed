//! The zero-gap handover scenario: 3 messages arrive and are routed before
//! a smooth reconnect starts, 5 more arrive while the stash is active, and
//! all 8 must be recoverable in arrival order once the stash drains.

use serde_json::json;
use streamgate::wsmgr::{BufferedMessage, CircularBuffer, ReconnectionStash};

#[test]
fn no_message_loss_across_a_smooth_handover() {
    let buffer = CircularBuffer::new(100);
    let stash = ReconnectionStash::new(30);

    // Three messages route normally before the handover begins.
    for i in 0..3 {
        buffer.push(BufferedMessage {
            timestamp_ms: i,
            message: json!({"seq": i}),
            sequence: Some(i as u64),
        });
    }

    // Handover begins: subsequent arrivals are captured by the stash
    // instead of being routed directly.
    stash.start();
    assert!(stash.is_active());

    for i in 3..8 {
        stash.enqueue(json!({"seq": i}));
    }

    // Handover completes: drain the stash and replay into the buffer in
    // arrival order, exactly as the manager's post-swap drain does.
    let drained = stash.stop();
    assert!(!stash.is_active());
    assert_eq!(drained.len(), 5);

    for (offset, message) in drained.into_iter().enumerate() {
        let seq = (3 + offset) as i64;
        buffer.push(BufferedMessage {
            timestamp_ms: seq,
            message,
            sequence: Some(seq as u64),
        });
    }

    let all = buffer.recent(8);
    assert_eq!(all.len(), 8);
    let seqs: Vec<u64> = all.iter().filter_map(|m| m.sequence).collect();
    assert_eq!(seqs, (0..8).collect::<Vec<u64>>());
}
