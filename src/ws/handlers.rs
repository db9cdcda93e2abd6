//! Client intent dispatch.
//!
//! Every intent is applied through `AppState` under the caller's identity;
//! store access rules do the actual enforcement. Authorization and
//! precondition failures come back as inline `Error` notices, never as a
//! dropped connection.

use crate::auth::Identity;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::ticker;
use std::sync::Arc;

/// Handle one client message and return the direct response, if any.
/// State changes reach clients through their store subscriptions, so most
/// intents only need an acknowledgement here.
pub async fn handle_message(
    msg: ClientMessage,
    identity: &Identity,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Join { room } => match state.join(identity, room).await {
            Ok(()) => Some(ServerMessage::Ack),
            Err(e) => Some(ServerMessage::error(&e)),
        },

        ClientMessage::Leave => match state.leave(identity).await {
            Ok(()) => Some(ServerMessage::Ack),
            Err(e) => Some(ServerMessage::error(&e)),
        },

        ClientMessage::CastVote { room, candidate } => {
            match state.cast_vote(identity, room, &candidate).await {
                Ok(()) => Some(ServerMessage::VoteAck { room, candidate }),
                Err(e) => Some(ServerMessage::error(&e)),
            }
        }

        ClientMessage::MarkHostage { room, target } => {
            match state.mark_hostage(identity, room, &target).await {
                Ok(marked) => Some(ServerMessage::HostageMarked {
                    room,
                    target,
                    marked,
                }),
                Err(e) => Some(ServerMessage::error(&e)),
            }
        }

        ClientMessage::SendRoomMessage { text } => {
            match state.send_room_message(identity, &text).await {
                Ok(_) => Some(ServerMessage::Ack),
                Err(e) => Some(ServerMessage::error(&e)),
            }
        }

        ClientMessage::SendPrivateMessage { to, text } => {
            match state.send_private_message(identity, &to, &text).await {
                Ok(()) => Some(ServerMessage::Ack),
                Err(e) => Some(ServerMessage::error(&e)),
            }
        }

        ClientMessage::Reveal { to, value } => match state.reveal(identity, &to, value).await {
            Ok(()) => Some(ServerMessage::Ack),
            Err(e) => Some(ServerMessage::error(&e)),
        },

        ClientMessage::StartRound => match state.start_round(identity).await {
            Ok(_) => {
                // this process ticks on the starting host's behalf
                ticker::spawn_round_ticker(state.clone(), identity.clone());
                Some(ServerMessage::Ack)
            }
            Err(e) => Some(ServerMessage::error(&e)),
        },

        ClientMessage::StopRound => match state.stop_round(identity).await {
            Ok(()) => Some(ServerMessage::Ack),
            Err(e) => Some(ServerMessage::error(&e)),
        },

        ClientMessage::SeedRoles => match state.seed_roles().await {
            Ok(count) => {
                tracing::info!("{} seeded roles for {} players", identity.uid, count);
                Some(ServerMessage::Ack)
            }
            Err(e) => Some(ServerMessage::error(&e)),
        },

        ClientMessage::TallyVotes => match state.tally_votes().await {
            Ok(()) => Some(ServerMessage::Ack),
            Err(e) => Some(ServerMessage::error(&e)),
        },

        ClientMessage::RequestExchange { room, target } => {
            match state.execute_exchange(identity, room, target).await {
                Ok((moved, to)) => Some(ServerMessage::ExchangeExecuted { moved, to }),
                Err(e) => Some(ServerMessage::error(&e)),
            }
        }

        ClientMessage::MyRole => match state.my_role(identity).await {
            Ok(value) => Some(ServerMessage::Role { value }),
            Err(e) => Some(ServerMessage::error(&e)),
        },
    }
}
