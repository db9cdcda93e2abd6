use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type MessageId = String;

/// Seconds in a full round
pub const ROUND_SECONDS: u32 = 180;
/// The exchange window opens when this many seconds remain
pub const EXCHANGE_WINDOW_SECONDS: u32 = 20;

/// One of the two symmetric player containers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RoomId {
    RoomA,
    RoomB,
}

impl RoomId {
    pub const BOTH: [RoomId; 2] = [RoomId::RoomA, RoomId::RoomB];

    /// The room a hostage is exchanged into
    pub fn opposite(self) -> RoomId {
        match self {
            RoomId::RoomA => RoomId::RoomB,
            RoomId::RoomB => RoomId::RoomA,
        }
    }

    /// Path segment under `rooms/`
    pub fn key(self) -> &'static str {
        match self {
            RoomId::RoomA => "roomA",
            RoomId::RoomB => "roomB",
        }
    }
}

/// A hidden role/color card. Closed set: unrecognized values are a protocol
/// error, never a silent no-op.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoleCard {
    Red,
    Blue,
    President,
    Bomber,
}

/// Phase of the single authoritative match clock
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Idle,
    Discussion,
    ExchangeWindow,
    Ended,
    Stopped,
}

impl RoundPhase {
    /// Whether a host is actively ticking this phase
    pub fn is_running(self) -> bool {
        matches!(self, RoundPhase::Discussion | RoundPhase::ExchangeWindow)
    }
}

/// Public per-room membership record. Deliberately carries no role field:
/// role visibility flows only through private reveals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerInfo {
    pub display_name: String,
}

/// Global per-player metadata at `playersMeta/{uid}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerMeta {
    pub display_name: String,
    pub joined_at: String,
}

/// The single authoritative match clock at `round`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundClock {
    pub time_left: u32,
    pub phase: RoundPhase,
    pub host_uid: Option<PlayerId>,
    pub last_tick: String,
}

impl RoundClock {
    pub fn idle() -> Self {
        Self {
            time_left: ROUND_SECONDS,
            phase: RoundPhase::Idle,
            host_uid: None,
            last_tick: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// A freshly started round with `host` holding the tick lease
    pub fn started(host: PlayerId) -> Self {
        Self {
            time_left: ROUND_SECONDS,
            phase: RoundPhase::Discussion,
            host_uid: Some(host),
            last_tick: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn stopped() -> Self {
        Self {
            time_left: 0,
            phase: RoundPhase::Stopped,
            host_uid: None,
            last_tick: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Advance the clock by one second. Pure: both the authoritative ticker
    /// and any degraded fallback use this exact transition.
    pub fn tick(&self) -> RoundClock {
        let time_left = self.time_left.saturating_sub(1);
        let (phase, host_uid) = if time_left == 0 {
            (RoundPhase::Ended, None)
        } else if time_left <= EXCHANGE_WINDOW_SECONDS {
            (RoundPhase::ExchangeWindow, self.host_uid.clone())
        } else {
            (RoundPhase::Discussion, self.host_uid.clone())
        };

        RoundClock {
            time_left,
            phase,
            host_uid,
            last_tick: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A delivered chat or private message in a player's inbox
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboxMessage {
    pub from_uid: PlayerId,
    pub from_name: String,
    pub text: String,
    /// Sender-clock RFC3339 timestamp; display order is ascending by this
    pub ts: String,
    pub room_message: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomId>,
}

/// A one-way disclosure at `privateReveals/{viewer}/{source}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrivateReveal {
    pub value: RoleCard,
    pub revealed_at: String,
}

/// Composed per-room snapshot (membership + leader + hostage target) so
/// renderers redraw atomically from one logical value
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoomView {
    #[serde(default)]
    pub players: BTreeMap<PlayerId, PlayerInfo>,
    #[serde(default)]
    pub leader: Option<PlayerId>,
    #[serde(default, rename = "hostageTarget")]
    pub hostage_target: Option<PlayerId>,
}
