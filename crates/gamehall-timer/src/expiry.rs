//! Single-slot cancelable expiry timer.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// A one-shot timer with at most one pending expiry.
///
/// The callback receives the generation it was armed with. The callback
/// runs in its own task, so it must hand the generation back to the owner
/// (through a lock or a channel) and the owner calls
/// [`complete`](Self::complete) before acting on it.
#[derive(Debug, Default)]
pub struct ExpiryTimer {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl ExpiryTimer {
    /// Creates an unarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer to run `on_expire` after `after`, replacing any
    /// pending expiry. Returns the new generation.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm<F, Fut>(&mut self, after: Duration, on_expire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let deadline = Instant::now() + after;

        self.pending = Some(tokio::spawn(async move {
            time::sleep_until(deadline).await;
            on_expire(generation).await;
        }));

        tracing::trace!(generation, ?after, "expiry armed");
        generation
    }

    /// Cancels the pending expiry, if any. Returns `true` if one was pending.
    ///
    /// Bumps the generation, so a callback that already fired but has not
    /// yet called [`complete`](Self::complete) becomes stale.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                self.generation += 1;
                tracing::trace!(generation = self.generation, "expiry cancelled");
                true
            }
            None => false,
        }
    }

    /// Claims the expiry for `generation`.
    ///
    /// Returns `true` exactly once for the current generation and disarms
    /// the timer; returns `false` for stale or cancelled generations.
    pub fn complete(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.pending = None;
        true
    }

    /// Whether an expiry is pending.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether `generation` is the pending expiry.
    pub fn is_current(&self, generation: u64) -> bool {
        self.pending.is_some() && self.generation == generation
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
