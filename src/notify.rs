//! Change Notifier.
//!
//! A pulse says only "something changed, fetch again". Each subscriber holds
//! at most one owed refresh, so a burst of mutations collapses into a single
//! wakeup that observes state at least as new as the last of them.
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Notifier(Arc<watch::Sender<u64>>);

impl Default for Notifier {
    fn default() -> Self {
        Self(Arc::new(watch::Sender::new(0)))
    }
}

impl Notifier {
    /// Mark every subscriber as owing a refresh. Never blocks.
    pub fn pulse(&self) {
        self.0.send_modify(|n| *n = n.wrapping_add(1));
    }
    pub fn subscribe(&self) -> Pulses {
        Pulses(self.0.subscribe())
    }
    pub fn viewers(&self) -> usize {
        self.0.receiver_count()
    }
}

/// One subscriber's view of the pulse stream.
#[derive(Debug)]
pub struct Pulses(watch::Receiver<u64>);

impl Pulses {
    /// Wait for the next owed refresh. `false` once the notifier is gone.
    pub async fn next(&mut self) -> bool {
        match self.0.changed().await {
            Ok(()) => {
                self.0.borrow_and_update();
                true
            }
            Err(_) => false,
        }
    }
    /// Whether a refresh is owed right now.
    pub fn pending(&self) -> bool {
        self.0.has_changed().unwrap_or(false)
    }
}
