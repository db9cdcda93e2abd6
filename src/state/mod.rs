mod channel;
mod exchange;
mod roles;
mod rooms;
mod round;
mod votes;

pub use round::TickOutcome;
pub use votes::tally_winner;

pub(crate) use channel::sort_inbox;

use crate::auth::Sessions;
use crate::store::Store;
use std::sync::Arc;

/// Shared application state: the realtime store plus the session registry
pub struct AppState {
    pub store: Arc<Store>,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Store::new()),
            sessions: Sessions::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Store path namespace. Paths are logical and slash-separated; every
/// consumer goes through these builders.
pub(crate) mod paths {
    use crate::types::{PlayerId, RoomId};

    pub const ROUND: &str = "round";

    pub fn room_players(room: RoomId) -> String {
        format!("rooms/{}/players", room.key())
    }

    pub fn room_player(room: RoomId, uid: &str) -> String {
        format!("rooms/{}/players/{}", room.key(), uid)
    }

    pub fn room_leader(room: RoomId) -> String {
        format!("rooms/{}/leader", room.key())
    }

    pub fn room_hostage(room: RoomId) -> String {
        format!("rooms/{}/hostageTarget", room.key())
    }

    pub fn room_root(room: RoomId) -> String {
        format!("rooms/{}", room.key())
    }

    pub fn room_votes(room: RoomId) -> String {
        format!("votes/{}", room.key())
    }

    pub fn vote(room: RoomId, voter: &PlayerId) -> String {
        format!("votes/{}/{}", room.key(), voter)
    }

    pub fn inbox(uid: &str) -> String {
        format!("inboxes/{}/messages", uid)
    }

    pub fn inbox_message(uid: &str, message_id: &str) -> String {
        format!("inboxes/{}/messages/{}", uid, message_id)
    }

    pub fn reveals(viewer: &str) -> String {
        format!("privateReveals/{}", viewer)
    }

    pub fn reveal(viewer: &str, source: &str) -> String {
        format!("privateReveals/{}/{}", viewer, source)
    }

    pub fn role(uid: &str) -> String {
        format!("roles/{}", uid)
    }

    pub fn player_meta(uid: &str) -> String {
        format!("playersMeta/{}", uid)
    }
}
