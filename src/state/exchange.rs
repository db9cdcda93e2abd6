//! The hostage exchange: moving one marked player to the opposite room,
//! gated by leader identity and round phase.

use super::{paths, AppState};
use crate::auth::Identity;
use crate::error::{GameError, GameResult};
use crate::store::Actor;
use crate::types::{PlayerId, PlayerInfo, RoomId, RoundPhase};

impl AppState {
    /// Execute the exchange for `room`. The requester must be the room's
    /// current leader and the round must be inside the exchange window;
    /// either failure reports without mutating anything.
    ///
    /// Target resolution: the room's hostage-target if set, else an explicit
    /// target from current membership, else the requester themself.
    ///
    /// Returns the moved player and their destination room.
    pub async fn execute_exchange(
        &self,
        identity: &Identity,
        room: RoomId,
        explicit_target: Option<PlayerId>,
    ) -> GameResult<(PlayerId, RoomId)> {
        let leader = self
            .store
            .get_as::<PlayerId>(&Actor::Server, &paths::room_leader(room))
            .await?;
        if leader.as_ref() != Some(&identity.uid) {
            return Err(GameError::Unauthorized(
                "only the room leader can execute an exchange".to_string(),
            ));
        }

        let clock = self.round_clock().await?;
        if clock.phase != RoundPhase::ExchangeWindow {
            return Err(GameError::Precondition(
                "exchange attempted outside the exchange window".to_string(),
            ));
        }

        let hostage = self
            .store
            .get_as::<PlayerId>(&Actor::Server, &paths::room_hostage(room))
            .await?;
        let target = match (hostage, explicit_target) {
            (Some(marked), _) => marked,
            (None, Some(explicit)) => {
                if !self.is_member(room, &explicit).await? {
                    return Err(GameError::Precondition(format!(
                        "{} is not a member of {:?}",
                        explicit, room
                    )));
                }
                explicit
            }
            (None, None) => identity.uid.clone(),
        };

        let info = self
            .store
            .get_as::<PlayerInfo>(&Actor::Server, &paths::room_player(room, &target))
            .await?
            .ok_or_else(|| GameError::NotFound(format!("{} not found in {:?}", target, room)))?;

        // Copy, then delete. The store has no cross-path transaction, so a
        // reader may briefly see the target in both rooms; the reverse order
        // could lose the player entirely if the second write failed.
        let dest = room.opposite();
        self.store
            .set(&Actor::Server, &paths::room_player(dest, &target), info)
            .await?;
        self.store
            .remove(&Actor::Server, &paths::room_player(room, &target))
            .await?;
        self.store
            .remove(&Actor::Server, &paths::room_hostage(room))
            .await?;
        self.store
            .remove(&Actor::Server, &paths::room_leader(room))
            .await?;

        tracing::info!("exchange: moved {} from {:?} to {:?}", target, room, dest);
        Ok((target, dest))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::join_player;
    use super::*;

    /// Elect `leader` in `room` and open the exchange window
    async fn open_window(state: &AppState, leader: &Identity, room: RoomId) {
        state.cast_vote(leader, room, &leader.uid).await.unwrap();
        state.tally_votes().await.unwrap();

        state.start_round(leader).await.unwrap();
        loop {
            match state.tick_round(leader).await.unwrap() {
                crate::state::TickOutcome::Advanced(clock)
                    if clock.phase == RoundPhase::ExchangeWindow =>
                {
                    break
                }
                crate::state::TickOutcome::Advanced(_) => {}
                crate::state::TickOutcome::Abandoned => panic!("lost the lease"),
            }
        }
    }

    #[tokio::test]
    async fn test_exchange_moves_hostage_and_clears_room_fields() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        let bob = join_player(&state, "Bob", RoomId::RoomA).await;

        state
            .mark_hostage(&alice, RoomId::RoomA, &bob.uid)
            .await
            .unwrap();
        open_window(&state, &alice, RoomId::RoomA).await;

        let (moved, dest) = state
            .execute_exchange(&alice, RoomId::RoomA, None)
            .await
            .unwrap();
        assert_eq!(moved, bob.uid);
        assert_eq!(dest, RoomId::RoomB);

        assert!(!state.is_member(RoomId::RoomA, &bob.uid).await.unwrap());
        assert!(state.is_member(RoomId::RoomB, &bob.uid).await.unwrap());

        let view = state.room_view(RoomId::RoomA).await.unwrap();
        assert_eq!(view.leader, None);
        assert_eq!(view.hostage_target, None);

        // the moved record kept its public info
        let view_b = state.room_view(RoomId::RoomB).await.unwrap();
        assert_eq!(view_b.players.get(&bob.uid).unwrap().display_name, "Bob");
    }

    #[tokio::test]
    async fn test_exchange_requires_leader() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        let bob = join_player(&state, "Bob", RoomId::RoomA).await;
        open_window(&state, &alice, RoomId::RoomA).await;

        let err = state
            .execute_exchange(&bob, RoomId::RoomA, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        assert!(state.is_member(RoomId::RoomA, &bob.uid).await.unwrap());
    }

    #[tokio::test]
    async fn test_exchange_outside_window_mutates_nothing() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        let bob = join_player(&state, "Bob", RoomId::RoomA).await;

        state.cast_vote(&alice, RoomId::RoomA, &alice.uid).await.unwrap();
        state.tally_votes().await.unwrap();
        state
            .mark_hostage(&alice, RoomId::RoomA, &bob.uid)
            .await
            .unwrap();
        state.start_round(&alice).await.unwrap();
        // still in discussion

        let err = state
            .execute_exchange(&alice, RoomId::RoomA, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PRECONDITION");

        let view = state.room_view(RoomId::RoomA).await.unwrap();
        assert_eq!(view.players.len(), 2);
        assert_eq!(view.leader, Some(alice.uid.clone()));
        assert_eq!(view.hostage_target, Some(bob.uid.clone()));
    }

    #[tokio::test]
    async fn test_exchange_defaults_to_requester_without_target() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        open_window(&state, &alice, RoomId::RoomA).await;

        let (moved, dest) = state
            .execute_exchange(&alice, RoomId::RoomA, None)
            .await
            .unwrap();
        assert_eq!(moved, alice.uid);
        assert_eq!(dest, RoomId::RoomB);
        assert!(state.is_member(RoomId::RoomB, &alice.uid).await.unwrap());
    }

    #[tokio::test]
    async fn test_exchange_explicit_target_must_be_member() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        let eve = join_player(&state, "Eve", RoomId::RoomB).await;
        open_window(&state, &alice, RoomId::RoomA).await;

        let err = state
            .execute_exchange(&alice, RoomId::RoomA, Some(eve.uid.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PRECONDITION");
    }
}
