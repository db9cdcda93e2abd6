//! Room registry: membership, leader bookkeeping, hostage marking.

use super::{paths, AppState};
use crate::auth::Identity;
use crate::error::{GameError, GameResult};
use crate::store::Actor;
use crate::types::{PlayerId, PlayerInfo, PlayerMeta, RoomId, RoomView};

impl AppState {
    /// Add the player to `room` (idempotent upsert). A player belongs to
    /// exactly one room: a stale record in the opposite room is removed.
    pub async fn join(&self, identity: &Identity, room: RoomId) -> GameResult<()> {
        let actor = Actor::player(identity.uid.clone());

        self.store
            .set(
                &actor,
                &paths::player_meta(&identity.uid),
                PlayerMeta {
                    display_name: identity.display_name.clone(),
                    joined_at: chrono::Utc::now().to_rfc3339(),
                },
            )
            .await?;

        self.store
            .set(
                &actor,
                &paths::room_player(room, &identity.uid),
                PlayerInfo {
                    display_name: identity.display_name.clone(),
                },
            )
            .await?;

        // Write the new record first, then drop the stale one, so the player
        // never transiently vanishes from both rooms.
        let other = room.opposite();
        if self.is_member(other, &identity.uid).await? {
            self.store
                .remove(&actor, &paths::room_player(other, &identity.uid))
                .await?;
            self.clear_departed(other, &identity.uid).await?;
        }

        tracing::info!("{} joined {:?}", identity.uid, room);
        Ok(())
    }

    /// Remove the player's membership and metadata. Clears the room's leader
    /// and hostage-target fields if they named the departing player.
    pub async fn leave(&self, identity: &Identity) -> GameResult<()> {
        let actor = Actor::player(identity.uid.clone());
        let Some(room) = self.room_of(&identity.uid).await? else {
            return Err(GameError::Precondition(
                "not currently a member of any room".to_string(),
            ));
        };

        self.store
            .remove(&actor, &paths::room_player(room, &identity.uid))
            .await?;
        self.store
            .remove(&actor, &paths::player_meta(&identity.uid))
            .await?;
        self.clear_departed(room, &identity.uid).await?;

        tracing::info!("{} left {:?}", identity.uid, room);
        Ok(())
    }

    /// Toggle the room's hostage target: marking the current target unmarks
    /// it, any other member replaces it (one target per room, never a list).
    pub async fn mark_hostage(
        &self,
        identity: &Identity,
        room: RoomId,
        target: &PlayerId,
    ) -> GameResult<bool> {
        if !self.is_member(room, target).await? {
            return Err(GameError::Precondition(format!(
                "{} is not a member of {:?}",
                target, room
            )));
        }

        let actor = Actor::player(identity.uid.clone());
        let target = target.clone();
        let marked = self
            .store
            .transact(&actor, &paths::room_hostage(room), |current| {
                let current = current.and_then(|v| v.as_str());
                if current == Some(target.as_str()) {
                    Ok(Some(serde_json::Value::Null))
                } else {
                    Ok(Some(serde_json::Value::String(target.clone())))
                }
            })
            .await?;

        Ok(!matches!(marked, Some(serde_json::Value::Null)))
    }

    /// One logical snapshot of a room (membership + leader + hostage target)
    pub async fn room_view(&self, room: RoomId) -> GameResult<RoomView> {
        Ok(self
            .store
            .get_as::<RoomView>(&Actor::Server, &paths::room_root(room))
            .await?
            .unwrap_or_default())
    }

    /// Which room, if any, the player currently occupies
    pub async fn room_of(&self, uid: &PlayerId) -> GameResult<Option<RoomId>> {
        for room in RoomId::BOTH {
            if self.is_member(room, uid).await? {
                return Ok(Some(room));
            }
        }
        Ok(None)
    }

    pub async fn is_member(&self, room: RoomId, uid: &PlayerId) -> GameResult<bool> {
        Ok(self
            .store
            .get(&Actor::Server, &paths::room_player(room, uid))
            .await?
            .is_some())
    }

    /// Registry cleanup after a departure: a leader or hostage-target must be
    /// a current member, so dangling references are dropped server-side.
    async fn clear_departed(&self, room: RoomId, uid: &PlayerId) -> GameResult<()> {
        let leader = self
            .store
            .get_as::<PlayerId>(&Actor::Server, &paths::room_leader(room))
            .await?;
        if leader.as_ref() == Some(uid) {
            self.store
                .remove(&Actor::Server, &paths::room_leader(room))
                .await?;
        }

        let hostage = self
            .store
            .get_as::<PlayerId>(&Actor::Server, &paths::room_hostage(room))
            .await?;
        if hostage.as_ref() == Some(uid) {
            self.store
                .remove(&Actor::Server, &paths::room_hostage(room))
                .await?;
        }
        Ok(())
    }
}
