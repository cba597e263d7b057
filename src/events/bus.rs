use super::ProgressMessage;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// Default number of messages a channel retains for slow subscribers
pub const DEFAULT_CAPACITY: usize = 256;

/// Per-job progress channels
///
/// Delivery is at-most-once and non-durable: a subscriber only sees
/// messages published after it subscribed, and a subscriber that falls more
/// than the capacity behind skips the oldest ones.
#[derive(Debug)]
pub struct EventBus {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<ProgressMessage>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Publishes to the job's channel, returning how many subscribers got it
    ///
    /// Never fails: with no channel or no subscriber the message is dropped.
    pub fn publish(&self, job_id: &str, message: ProgressMessage) -> usize {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        match channels.get(job_id) {
            Some(tx) => tx.send(message).unwrap_or(0),
            None => 0,
        }
    }

    /// Subscribes to a job's channel, creating it if needed
    pub fn subscribe(&self, job_id: &str) -> broadcast::Receiver<ProgressMessage> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(job_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Opens the job's channel without subscribing
    pub fn open(&self, job_id: &str) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(job_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
    }

    /// Drops the job's channel; subscribers drain what is left, then see it closed
    pub fn close(&self, job_id: &str) {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(job_id);
    }

    pub fn is_open(&self, job_id: &str) -> bool {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(job_id)
    }

    pub fn subscriber_count(&self, job_id: &str) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .map_or(0, |tx| tx.receiver_count())
    }
}
