//! Hidden role seeding.

use super::{paths, AppState};
use crate::auth::Identity;
use crate::error::{GameError, GameResult};
use crate::store::Actor;
use crate::types::{PlayerId, RoleCard, RoomId};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

impl AppState {
    /// Deal hidden cards to every joined player: one President, one Bomber,
    /// the rest alternating Red/Blue. Runs server-side; each card lands at a
    /// path readable only by its owner.
    pub async fn seed_roles(&self) -> GameResult<usize> {
        let mut players: Vec<PlayerId> = Vec::new();
        for room in RoomId::BOTH {
            let members: BTreeMap<PlayerId, serde_json::Value> = self
                .store
                .get_as(&Actor::Server, &paths::room_players(room))
                .await?
                .unwrap_or_default();
            players.extend(members.into_keys());
        }

        if players.len() < 2 {
            return Err(GameError::Precondition(
                "seeding needs at least two joined players".to_string(),
            ));
        }

        players.shuffle(&mut rand::rng());
        for (i, uid) in players.iter().enumerate() {
            let card = match i {
                0 => RoleCard::President,
                1 => RoleCard::Bomber,
                n if n % 2 == 0 => RoleCard::Blue,
                _ => RoleCard::Red,
            };
            self.store
                .set(&Actor::Server, &paths::role(uid), card)
                .await?;
        }

        tracing::info!("seeded roles for {} players", players.len());
        Ok(players.len())
    }

    /// The caller's own hidden card, if roles have been seeded
    pub async fn my_role(&self, identity: &Identity) -> GameResult<Option<RoleCard>> {
        let actor = Actor::player(identity.uid.clone());
        self.store.get_as(&actor, &paths::role(&identity.uid)).await
    }
}
