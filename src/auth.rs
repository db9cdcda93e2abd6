//! Identity provider: issues a stable unique player id and display name per
//! session token. Everything downstream treats identity as opaque.

use crate::types::PlayerId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Safe character set for short codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

fn generate_session_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// A connected participant's stable identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub uid: PlayerId,
    pub display_name: String,
}

/// Token -> identity registry
#[derive(Default)]
pub struct Sessions {
    by_token: RwLock<HashMap<String, Identity>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh session. An empty display name gets the `Player-xxxxxx`
    /// default derived from the uid.
    pub async fn register(&self, display_name: &str) -> (String, Identity) {
        let uid = ulid::Ulid::new().to_string();
        let display_name = if display_name.trim().is_empty() {
            format!("Player-{}", &uid[..6])
        } else {
            display_name.trim().to_string()
        };
        let identity = Identity {
            uid,
            display_name,
        };

        let token = loop {
            let code = generate_session_code();
            let mut sessions = self.by_token.write().await;
            if !sessions.contains_key(&code) {
                sessions.insert(code.clone(), identity.clone());
                break code;
            }
            // Collision, try again
        };

        (token, identity)
    }

    /// Reattach to an existing identity by token
    pub async fn lookup(&self, token: &str) -> Option<Identity> {
        self.by_token.read().await.get(token).cloned()
    }
}
