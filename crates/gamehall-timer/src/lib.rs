//! Scheduled work for Gamehall.
//!
//! Two primitives, both owned by the object that created them:
//!
//! - [`ExpiryTimer`]: a single-slot, cancelable one-shot timer. Arming it
//!   cancels whatever was pending, so an owner never has more than one
//!   pending expiry. Every arm hands out a generation number; the owner
//!   checks [`ExpiryTimer::complete`] before acting, which makes
//!   cancellation take effect even for a timer task that already woke up
//!   and whose expiry the owner has not processed yet.
//! - [`Ticker`]: a fixed-interval tick source for periodic sweeps
//!   (heartbeat probes, room-list broadcasts). An interval of zero
//!   disables it: [`Ticker::wait_for_tick`] then pends forever, which is
//!   harmless inside `tokio::select!`.
//!
//! ```ignore
//! loop {
//!     ticker.wait_for_tick().await;
//!     supervisor.sweep().await;
//! }
//! ```

mod expiry;
mod ticker;

pub use expiry::ExpiryTimer;
pub use ticker::Ticker;
