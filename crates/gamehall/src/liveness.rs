//! Liveness supervisor: transport-level heartbeats and reaping.
//!
//! Each sweep walks every open connection. A connection whose liveness
//! flag is still set gets it cleared and is sent a probe; a pong (or any
//! data frame) sets it again before the next sweep. A connection whose
//! flag is already clear has been silent for a full probe cycle and is
//! reaped: its connection task is told to stop, which leaves its room
//! and closes the transport.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use gamehall_timer::Ticker;
use gamehall_transport::Connection;
use tokio::time;

use crate::client::ClientSet;

/// Upper bound on how long one probe may wait for the transport.
const PROBE_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub probed: usize,
    pub reaped: usize,
}

/// Periodically probes connections and reaps the silent ones.
pub struct LivenessSupervisor<C: Connection> {
    clients: Arc<ClientSet<C>>,
}

impl<C: Connection> LivenessSupervisor<C> {
    pub fn new(clients: Arc<ClientSet<C>>) -> Self {
        Self { clients }
    }

    /// Runs one probe-or-reap pass over every open connection.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let mut probes = Vec::new();

        for client in self.clients.snapshot() {
            if client.take_alive() {
                report.probed += 1;
                probes.push(async move {
                    match time::timeout(PROBE_SEND_TIMEOUT, client.probe()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::debug!(client_id = %client.id(), error = %e, "probe failed");
                        }
                        Err(_) => tracing::debug!(client_id = %client.id(), "probe timed out"),
                    }
                });
            } else {
                report.reaped += 1;
                tracing::info!(client_id = %client.id(), "no heartbeat reply, reaping");
                self.clients.remove(client.id());
                client.reap();
            }
        }

        join_all(probes).await;
        report
    }

    /// Sweeps every `interval` until the task is dropped. A zero interval
    /// never sweeps.
    pub async fn run(self, interval: Duration) {
        let mut ticker = Ticker::every(interval);
        loop {
            ticker.wait_for_tick().await;
            let report = self.sweep().await;
            tracing::debug!(
                sweep = ticker.tick_count(),
                probed = report.probed,
                reaped = report.reaped,
                "liveness sweep"
            );
        }
    }
}
