//! Background task that advances the round clock while this process holds
//! the host lease on behalf of the starting participant.

use crate::auth::Identity;
use crate::state::{AppState, TickOutcome};
use std::sync::Arc;
use std::time::Duration;

/// Spawn the 1 Hz authoritative ticker for a freshly started round. The task
/// re-verifies the lease on every tick and exits the moment it is superseded,
/// the round stops, or the clock runs out. There is no host failover: if the
/// ticking process dies mid-round, the round freezes.
pub fn spawn_round_ticker(state: Arc<AppState>, host: Identity) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;

            match state.tick_round(&host).await {
                Ok(TickOutcome::Advanced(clock)) => {
                    if !clock.phase.is_running() {
                        tracing::debug!("round ended, ticker for {} exiting", host.uid);
                        break;
                    }
                }
                Ok(TickOutcome::Abandoned) => {
                    tracing::debug!("host lease lost, ticker for {} exiting", host.uid);
                    break;
                }
                Err(e) => {
                    tracing::warn!("round tick failed: {}", e);
                    break;
                }
            }
        }
    });
}
