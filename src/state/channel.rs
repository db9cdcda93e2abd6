//! Private channel layer: per-player inboxes and recipient-scoped reveals.
//!
//! Both room chat and private messages share the same delivery primitive: a
//! write into the recipient's inbox. There is no shared channel to read
//! from, so a room broadcast fans out one write per member resolved exactly
//! once, at send time.

use super::{paths, AppState};
use crate::auth::Identity;
use crate::error::{GameError, GameResult};
use crate::store::Actor;
use crate::types::{InboxMessage, PlayerId, PrivateReveal, RoleCard};
use std::collections::BTreeMap;

impl AppState {
    /// Broadcast to the sender's current room. Membership is a snapshot
    /// taken now: later joiners receive nothing, earlier leavers receive
    /// nothing.
    pub async fn send_room_message(&self, identity: &Identity, text: &str) -> GameResult<usize> {
        let Some(room) = self.room_of(&identity.uid).await? else {
            return Err(GameError::Precondition(
                "join a room before sending room chat".to_string(),
            ));
        };

        let members: BTreeMap<PlayerId, serde_json::Value> = self
            .store
            .get_as(&Actor::Server, &paths::room_players(room))
            .await?
            .unwrap_or_default();

        let actor = Actor::player(identity.uid.clone());
        let ts = chrono::Utc::now().to_rfc3339();
        for member in members.keys() {
            let message = InboxMessage {
                from_uid: identity.uid.clone(),
                from_name: identity.display_name.clone(),
                text: text.to_string(),
                ts: ts.clone(),
                room_message: true,
                room: Some(room),
            };
            self.store
                .set(
                    &actor,
                    &paths::inbox_message(member, &ulid::Ulid::new().to_string()),
                    message,
                )
                .await?;
        }
        Ok(members.len())
    }

    /// Deliver a private message to one target's inbox
    pub async fn send_private_message(
        &self,
        identity: &Identity,
        to: &PlayerId,
        text: &str,
    ) -> GameResult<()> {
        if self
            .store
            .get(&Actor::Server, &paths::player_meta(to))
            .await?
            .is_none()
        {
            return Err(GameError::NotFound(format!("no such player: {}", to)));
        }

        let actor = Actor::player(identity.uid.clone());
        let message = InboxMessage {
            from_uid: identity.uid.clone(),
            from_name: identity.display_name.clone(),
            text: text.to_string(),
            ts: chrono::Utc::now().to_rfc3339(),
            room_message: false,
            room: None,
        };
        self.store
            .set(
                &actor,
                &paths::inbox_message(to, &ulid::Ulid::new().to_string()),
                message,
            )
            .await
    }

    /// Disclose a role/color to one specific viewer. Idempotent overwrite:
    /// re-revealing replaces the previous disclosure from this source.
    pub async fn reveal(
        &self,
        identity: &Identity,
        to: &PlayerId,
        value: RoleCard,
    ) -> GameResult<()> {
        let actor = Actor::player(identity.uid.clone());
        self.store
            .set(
                &actor,
                &paths::reveal(to, &identity.uid),
                PrivateReveal {
                    value,
                    revealed_at: chrono::Utc::now().to_rfc3339(),
                },
            )
            .await
    }

    /// The viewer's reveal cache: everything disclosed to them, keyed by
    /// source. Callers replace their cache wholesale with this value.
    pub async fn reveals_for(
        &self,
        identity: &Identity,
    ) -> GameResult<BTreeMap<PlayerId, PrivateReveal>> {
        let actor = Actor::player(identity.uid.clone());
        Ok(self
            .store
            .get_as(&actor, &paths::reveals(&identity.uid))
            .await?
            .unwrap_or_default())
    }

    /// The player's inbox, ascending by sender timestamp
    pub async fn inbox(&self, identity: &Identity) -> GameResult<Vec<InboxMessage>> {
        let actor = Actor::player(identity.uid.clone());
        let messages: BTreeMap<String, InboxMessage> = self
            .store
            .get_as(&actor, &paths::inbox(&identity.uid))
            .await?
            .unwrap_or_default();
        Ok(sort_inbox(messages))
    }
}

/// Ascending sender-timestamp order, message id as the stable tiebreaker
pub(crate) fn sort_inbox(messages: BTreeMap<String, InboxMessage>) -> Vec<InboxMessage> {
    let mut list: Vec<(String, InboxMessage)> = messages.into_iter().collect();
    list.sort_by(|(ida, a), (idb, b)| a.ts.cmp(&b.ts).then_with(|| ida.cmp(idb)));
    list.into_iter().map(|(_, m)| m).collect()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::join_player;
    use super::*;
    use crate::types::RoomId;

    #[tokio::test]
    async fn test_room_broadcast_uses_send_time_membership() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        let bob = join_player(&state, "Bob", RoomId::RoomA).await;
        let eve = join_player(&state, "Eve", RoomId::RoomB).await;

        let delivered = state.send_room_message(&alice, "hello room").await.unwrap();
        assert_eq!(delivered, 2);

        // carol joins right after the send: no retroactive delivery
        let carol = join_player(&state, "Carol", RoomId::RoomA).await;

        assert_eq!(state.inbox(&alice).await.unwrap().len(), 1);
        assert_eq!(state.inbox(&bob).await.unwrap().len(), 1);
        assert!(state.inbox(&carol).await.unwrap().is_empty());
        assert!(state.inbox(&eve).await.unwrap().is_empty());

        let msg = &state.inbox(&bob).await.unwrap()[0];
        assert!(msg.room_message);
        assert_eq!(msg.room, Some(RoomId::RoomA));
        assert_eq!(msg.from_name, "Alice");
    }

    #[tokio::test]
    async fn test_private_message_reaches_only_target() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        let bob = join_player(&state, "Bob", RoomId::RoomA).await;
        let carol = join_player(&state, "Carol", RoomId::RoomA).await;

        state
            .send_private_message(&alice, &bob.uid, "psst")
            .await
            .unwrap();

        let inbox = state.inbox(&bob).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(!inbox[0].room_message);
        assert!(state.inbox(&carol).await.unwrap().is_empty());

        let err = state
            .send_private_message(&alice, &"ghost".to_string(), "hi")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_reveal_visible_only_to_target() {
        let state = AppState::new();
        let alice = join_player(&state, "Alice", RoomId::RoomA).await;
        let bob = join_player(&state, "Bob", RoomId::RoomA).await;
        let carol = join_player(&state, "Carol", RoomId::RoomA).await;

        state.reveal(&alice, &bob.uid, RoleCard::Red).await.unwrap();

        let bob_cache = state.reveals_for(&bob).await.unwrap();
        assert_eq!(bob_cache.get(&alice.uid).unwrap().value, RoleCard::Red);
        assert!(state.reveals_for(&carol).await.unwrap().is_empty());

        // re-reveal overwrites in place
        state
            .reveal(&alice, &bob.uid, RoleCard::Bomber)
            .await
            .unwrap();
        let bob_cache = state.reveals_for(&bob).await.unwrap();
        assert_eq!(bob_cache.len(), 1);
        assert_eq!(bob_cache.get(&alice.uid).unwrap().value, RoleCard::Bomber);
    }

    #[tokio::test]
    async fn test_inbox_sorted_by_timestamp() {
        let mut messages = BTreeMap::new();
        for (id, ts, text) in [
            ("m3", "2026-01-01T00:00:02Z", "third"),
            ("m1", "2026-01-01T00:00:00Z", "first"),
            ("m2", "2026-01-01T00:00:01Z", "second"),
        ] {
            messages.insert(
                id.to_string(),
                InboxMessage {
                    from_uid: "x".into(),
                    from_name: "X".into(),
                    text: text.into(),
                    ts: ts.into(),
                    room_message: false,
                    room: None,
                },
            );
        }

        let sorted = sort_inbox(messages);
        let texts: Vec<_> = sorted.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }
}
