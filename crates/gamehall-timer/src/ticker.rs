//! Fixed-interval ticker for periodic sweeps.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// Fires at a fixed interval. Missed ticks are skipped, never replayed.
pub struct Ticker {
    interval: Duration,
    next_tick: Option<Instant>,
    tick_count: u64,
}

impl Ticker {
    /// Creates a ticker whose first tick is one interval away. A zero
    /// interval disables it.
    pub fn every(interval: Duration) -> Self {
        let next_tick = if interval.is_zero() {
            debug!("ticker created disabled (zero interval)");
            None
        } else {
            debug!(interval_ms = interval.as_millis() as u64, "ticker created");
            Some(Instant::now() + interval)
        };

        Self {
            interval,
            next_tick,
            tick_count: 0,
        }
    }

    /// Waits until the next tick is due.
    ///
    /// For a disabled ticker this future never resolves.
    pub async fn wait_for_tick(&mut self) {
        let Some(next) = self.next_tick else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let skipped = (late_by.as_nanos() / self.interval.as_nanos()) as u64;
        if skipped > 0 {
            warn!(tick = self.tick_count, skipped, "ticker fell behind, skipping ahead");
            self.next_tick = Some(now + self.interval);
        } else {
            self.next_tick = Some(next + self.interval);
        }
    }

    /// Whether this ticker never fires.
    pub fn is_disabled(&self) -> bool {
        self.next_tick.is_none()
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
