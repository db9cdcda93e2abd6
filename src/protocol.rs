use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Intents a connected client may write
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        room: RoomId,
    },
    Leave,
    CastVote {
        room: RoomId,
        candidate: PlayerId,
    },
    MarkHostage {
        room: RoomId,
        target: PlayerId,
    },
    SendRoomMessage {
        text: String,
    },
    SendPrivateMessage {
        to: PlayerId,
        text: String,
    },
    Reveal {
        to: PlayerId,
        value: RoleCard,
    },
    StartRound,
    StopRound,
    /// Callable ops (run authoritatively in this process)
    SeedRoles,
    TallyVotes,
    RequestExchange {
        room: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<PlayerId>,
    },
    MyRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once on connect; `session_token` reattaches this identity later
    Welcome {
        uid: PlayerId,
        display_name: String,
        session_token: String,
        server_now: String,
    },
    /// One logical per-room snapshot: membership + leader + hostage target
    RoomUpdate {
        room: RoomId,
        view: RoomView,
    },
    RoundUpdate {
        clock: RoundClock,
    },
    /// The full inbox, ascending by sender timestamp
    Inbox {
        messages: Vec<InboxMessage>,
    },
    /// The viewer's full reveal cache, keyed by source; replaces any
    /// previous cache wholesale
    Reveals {
        reveals: BTreeMap<PlayerId, PrivateReveal>,
    },
    Role {
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<RoleCard>,
    },
    VoteAck {
        room: RoomId,
        candidate: PlayerId,
    },
    HostageMarked {
        room: RoomId,
        target: PlayerId,
        marked: bool,
    },
    ExchangeExecuted {
        moved: PlayerId,
        to: RoomId,
    },
    Ack,
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(err: &crate::error::GameError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_shape() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"cast_vote","room":"roomA","candidate":"p1"}"#).unwrap();
        match msg {
            ClientMessage::CastVote { room, candidate } => {
                assert_eq!(room, RoomId::RoomA);
                assert_eq!(candidate, "p1");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_role_value_is_rejected() {
        // closed enum: no silent no-op branch for unrecognized cards
        let res = serde_json::from_str::<ClientMessage>(
            r#"{"t":"reveal","to":"p1","value":"Gambler"}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_error_message_carries_code() {
        let err = crate::error::GameError::Precondition("outside window".into());
        let msg = ServerMessage::error(&err);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["t"], "error");
        assert_eq!(json["code"], "PRECONDITION");
    }
}
