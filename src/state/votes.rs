//! Leader votes and the tally.

use super::{paths, AppState};
use crate::auth::Identity;
use crate::error::{GameError, GameResult};
use crate::store::Actor;
use crate::types::{PlayerId, RoomId};
use std::collections::BTreeMap;

/// Resolve a room's vote set to a leader. One shared pure function, so the
/// authoritative path and any degraded fallback cannot diverge on tie-breaks.
///
/// Winner is the candidate with the maximum vote count; ties break to the
/// lowest candidate id. An empty vote set has no winner.
pub fn tally_winner(votes: &BTreeMap<PlayerId, PlayerId>) -> Option<PlayerId> {
    let mut counts: BTreeMap<&PlayerId, u32> = BTreeMap::new();
    for candidate in votes.values() {
        *counts.entry(candidate).or_insert(0) += 1;
    }

    let mut winner: Option<(&PlayerId, u32)> = None;
    for (candidate, count) in counts {
        // Strictly greater keeps the lowest id among equals (BTreeMap
        // iterates candidates in ascending order)
        if winner.map(|(_, best)| count > best).unwrap_or(true) {
            winner = Some((candidate, count));
        }
    }
    winner.map(|(candidate, _)| candidate.clone())
}

impl AppState {
    /// Record a leadership ballot, overwrite semantics: the voter's previous
    /// ballot in this room, if any, is replaced.
    pub async fn cast_vote(
        &self,
        identity: &Identity,
        room: RoomId,
        candidate: &PlayerId,
    ) -> GameResult<()> {
        if !self.is_member(room, candidate).await? {
            return Err(GameError::Precondition(format!(
                "{} is not a member of {:?}",
                candidate, room
            )));
        }

        let actor = Actor::player(identity.uid.clone());
        self.store
            .set(&actor, &paths::vote(room, &identity.uid), candidate)
            .await
    }

    /// Tally both rooms and write each room's leader. Stale ballots (voter or
    /// candidate since departed) are tolerated and simply counted; readers
    /// self-heal on the next membership change.
    pub async fn tally_votes(&self) -> GameResult<()> {
        for room in RoomId::BOTH {
            let votes: BTreeMap<PlayerId, PlayerId> = self
                .store
                .get_as(&Actor::Server, &paths::room_votes(room))
                .await?
                .unwrap_or_default();

            match tally_winner(&votes) {
                Some(winner) => {
                    self.store
                        .set(&Actor::Server, &paths::room_leader(room), &winner)
                        .await?;
                    tracing::info!("tally: {:?} leader is {}", room, winner);
                }
                None => {
                    self.store
                        .remove(&Actor::Server, &paths::room_leader(room))
                        .await?;
                }
            }
        }
        Ok(())
    }
}
