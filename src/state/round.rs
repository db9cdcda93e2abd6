//! The single authoritative match clock.
//!
//! One elected host advances the clock once per second. Every transition is
//! a full-value write under the store's path lock, never a partial update,
//! so a tick can't interleave with a concurrent stop or restart.

use super::{paths, AppState};
use crate::auth::Identity;
use crate::error::GameResult;
use crate::store::Actor;
use crate::types::RoundClock;
use serde_json::Value;

/// What a host's tick attempt observed
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The clock advanced; carries the new state
    Advanced(RoundClock),
    /// The caller no longer holds the host lease (superseded, stopped, or no
    /// round); nothing was written and ticking must cease
    Abandoned,
}

impl AppState {
    /// Start a round, claiming the host lease. The claim is a compare-and-
    /// write against the current host: it fails while another live host is
    /// mid-round, rather than silently overwriting them.
    pub async fn start_round(&self, identity: &Identity) -> GameResult<RoundClock> {
        let actor = Actor::player(identity.uid.clone());
        let me = identity.uid.clone();
        let written = self
            .store
            .transact(&actor, paths::ROUND, move |current| {
                if let Some(current) = current {
                    let clock: RoundClock = serde_json::from_value(current.clone())?;
                    if clock.phase.is_running() && clock.host_uid.as_ref() != Some(&me) {
                        return Err(crate::error::GameError::Precondition(
                            "a round is already in progress under another host".to_string(),
                        ));
                    }
                }
                Ok(Some(serde_json::to_value(RoundClock::started(me.clone()))?))
            })
            .await?;

        let clock: RoundClock =
            serde_json::from_value(written.expect("start always writes"))?;
        tracing::info!("round started, host {}", identity.uid);
        Ok(clock)
    }

    /// Stop the round from any state: zero the clock, clear the host
    pub async fn stop_round(&self, identity: &Identity) -> GameResult<()> {
        let actor = Actor::player(identity.uid.clone());
        self.store
            .set(&actor, paths::ROUND, RoundClock::stopped())
            .await?;
        tracing::info!("round stopped by {}", identity.uid);
        Ok(())
    }

    /// One host tick: verify the lease still names the caller, decrement by
    /// exactly one second, recompute the phase, write the whole state back.
    /// On any mismatch the caller abandons without writing.
    pub async fn tick_round(&self, identity: &Identity) -> GameResult<TickOutcome> {
        let actor = Actor::player(identity.uid.clone());
        let me = identity.uid.clone();
        let written = self
            .store
            .transact(&actor, paths::ROUND, move |current| {
                let Some(current) = current else {
                    return Ok(None);
                };
                let clock: RoundClock = serde_json::from_value(current.clone())?;
                if clock.host_uid.as_ref() != Some(&me) || !clock.phase.is_running() {
                    return Ok(None);
                }
                Ok(Some(serde_json::to_value(clock.tick())?))
            })
            .await?;

        match written {
            Some(value) => Ok(TickOutcome::Advanced(serde_json::from_value(value)?)),
            None => Ok(TickOutcome::Abandoned),
        }
    }

    /// Current clock; an absent path reads as the idle clock
    pub async fn round_clock(&self) -> GameResult<RoundClock> {
        Ok(self
            .store
            .get_as(&Actor::Server, paths::ROUND)
            .await?
            .unwrap_or_else(RoundClock::idle))
    }

    /// Snapshot-to-clock conversion for subscription consumers
    pub fn clock_from_snapshot(snapshot: &Value) -> RoundClock {
        if snapshot.is_null() {
            return RoundClock::idle();
        }
        serde_json::from_value(snapshot.clone()).unwrap_or_else(|_| RoundClock::idle())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::join_player;
    use super::*;
    use crate::types::{RoomId, RoundPhase, EXCHANGE_WINDOW_SECONDS, ROUND_SECONDS};

    #[tokio::test]
    async fn test_start_initializes_discussion() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;

        let clock = state.start_round(&alice).await.unwrap();
        assert_eq!(clock.time_left, ROUND_SECONDS);
        assert_eq!(clock.phase, RoundPhase::Discussion);
        assert_eq!(clock.host_uid, Some(alice.uid.clone()));
    }

    #[tokio::test]
    async fn test_full_round_reaches_ended_through_exchange_window() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        state.start_round(&alice).await.unwrap();

        let mut saw_window_at = None;
        loop {
            match state.tick_round(&alice).await.unwrap() {
                TickOutcome::Advanced(clock) => {
                    if clock.phase == RoundPhase::ExchangeWindow && saw_window_at.is_none() {
                        saw_window_at = Some(clock.time_left);
                    }
                    if clock.phase == RoundPhase::Ended {
                        assert_eq!(clock.time_left, 0);
                        assert!(clock.host_uid.is_none());
                        break;
                    }
                }
                TickOutcome::Abandoned => panic!("host should keep the lease"),
            }
        }
        // the window opened exactly when the threshold was crossed
        assert_eq!(saw_window_at, Some(EXCHANGE_WINDOW_SECONDS));

        // clock frozen at ended, further ticks abandon
        assert_eq!(
            state.tick_round(&alice).await.unwrap(),
            TickOutcome::Abandoned
        );
    }

    #[tokio::test]
    async fn test_non_host_tick_abandons_without_writing() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        let bob = join_player(&state, "Bob", RoomId::RoomA).await;
        state.start_round(&alice).await.unwrap();

        assert_eq!(state.tick_round(&bob).await.unwrap(), TickOutcome::Abandoned);
        assert_eq!(state.round_clock().await.unwrap().time_left, ROUND_SECONDS);
    }

    #[tokio::test]
    async fn test_start_rejected_while_round_running() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        let bob = join_player(&state, "Bob", RoomId::RoomA).await;
        state.start_round(&alice).await.unwrap();

        let err = state.start_round(&bob).await.unwrap_err();
        assert_eq!(err.code(), "PRECONDITION");
        assert_eq!(
            state.round_clock().await.unwrap().host_uid,
            Some(alice.uid.clone())
        );
    }

    #[tokio::test]
    async fn test_stop_reachable_from_any_state_and_restartable() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        let bob = join_player(&state, "Bob", RoomId::RoomA).await;

        state.start_round(&alice).await.unwrap();
        state.stop_round(&bob).await.unwrap();

        let clock = state.round_clock().await.unwrap();
        assert_eq!(clock.phase, RoundPhase::Stopped);
        assert_eq!(clock.time_left, 0);
        assert!(clock.host_uid.is_none());

        // old host's ticker abandons, a new host may claim
        assert_eq!(
            state.tick_round(&alice).await.unwrap(),
            TickOutcome::Abandoned
        );
        let clock = state.start_round(&bob).await.unwrap();
        assert_eq!(clock.host_uid, Some(bob.uid.clone()));
    }

    #[tokio::test]
    async fn test_idle_clock_when_no_round() {
        let state = AppState::new();
        let clock = state.round_clock().await.unwrap();
        assert_eq!(clock.phase, RoundPhase::Idle);
        assert_eq!(clock.time_left, ROUND_SECONDS);
    }
}
