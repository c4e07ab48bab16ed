//! Fixed-capacity `CircularBuffer` of recently-arrived raw messages per
//! connection.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::Value;

/// One buffered arrival: timestamp, raw parsed payload, and optional venue
/// sequence number.
#[derive(Debug, Clone)]
pub struct BufferedMessage {
    pub timestamp_ms: i64,
    pub message: Value,
    pub sequence: Option<u64>,
}

/// Append-on-arrival ring buffer; oldest entries are overwritten on
/// overflow. Reads and mutations are mutually excluded.
pub struct CircularBuffer {
    inner: Mutex<VecDeque<BufferedMessage>>,
    capacity: usize,
}

impl CircularBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, message: BufferedMessage) {
        let mut buf = self.inner.lock();
        if buf.len() == self.capacity {
            buf.pop_front();
        }
        buf.push_back(message);
    }

    /// Most recent `n` entries (or fewer if the buffer holds less), oldest
    /// first within the returned slice.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<BufferedMessage> {
        let buf = self.inner.lock();
        let len = buf.len();
        let skip = len.saturating_sub(n);
        buf.iter().skip(skip).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(n: i64) -> BufferedMessage {
        BufferedMessage {
            timestamp_ms: n,
            message: Value::Null,
            sequence: Some(n as u64),
        }
    }

    #[test]
    fn overflow_retains_most_recent_k_in_arrival_order() {
        let buf = CircularBuffer::new(3);
        for i in 0..4 {
            buf.push(msg(i));
        }
        let recent = buf.recent(10);
        let seqs: Vec<u64> = recent.iter().filter_map(|m| m.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn recent_n_returns_at_most_n() {
        let buf = CircularBuffer::new(5);
        for i in 0..5 {
            buf.push(msg(i));
        }
        assert_eq!(buf.recent(2).len(), 2);
    }
}
