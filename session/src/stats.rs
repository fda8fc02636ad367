//! Traffic counters

use serde::Serialize;

/// Cumulative traffic and error counters.
///
/// Survives disconnects. Undecodable datagrams and failed sends count as `errors`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub errors: u64,
}

impl Statistics {
    pub(crate) fn record_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
        self.messages_sent += 1;
    }

    pub(crate) fn record_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
        self.messages_received += 1;
    }

    pub(crate) fn record_error(&mut self) {
        self.errors += 1;
    }
}
