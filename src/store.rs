//! Path-addressed realtime store.
//!
//! A hierarchical JSON tree supporting atomic single-path writes, point
//! reads, and push-based subscriptions that fire on every change to a path
//! (or its descendants) with the full current value of the subscribed
//! subtree. There are no cross-path transactions: consumers must tolerate
//! transiently inconsistent combinations across paths and self-heal on the
//! next notification.
//!
//! Access rules are evaluated here, against the acting identity, so that
//! protocol invariants (single round host, recipient-scoped inboxes and
//! reveals) do not depend on client goodwill. `Actor::Server` bypasses the
//! rules, like a trusted server-side process.

use crate::error::{GameError, GameResult};
use crate::types::PlayerId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

/// Who is performing a store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Trusted server-side process; not subject to access rules
    Server,
    Player(PlayerId),
}

impl Actor {
    pub fn player(uid: impl Into<PlayerId>) -> Self {
        Actor::Player(uid.into())
    }

    fn uid(&self) -> Option<&str> {
        match self {
            Actor::Server => None,
            Actor::Player(uid) => Some(uid),
        }
    }
}

/// A live subscription delivering full subtree snapshots. The first snapshot
/// is delivered immediately on subscribe; `Value::Null` means the path is
/// currently absent.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Value>,
}

impl Subscription {
    pub async fn next(&mut self) -> Option<Value> {
        self.rx.recv().await
    }
}

struct SubEntry {
    path: Vec<String>,
    tx: mpsc::UnboundedSender<Value>,
}

struct Inner {
    tree: Value,
    subs: Vec<SubEntry>,
}

pub struct Store {
    inner: Mutex<Inner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                tree: Value::Object(serde_json::Map::new()),
                subs: Vec::new(),
            }),
        }
    }

    /// Point read. `None` means the path is absent.
    pub async fn get(&self, actor: &Actor, path: &str) -> GameResult<Option<Value>> {
        let segs = split(path);
        check_read(actor, &segs)?;
        let inner = self.inner.lock().await;
        Ok(value_at(&inner.tree, &segs).cloned())
    }

    /// Point read deserialized into `T`
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        actor: &Actor,
        path: &str,
    ) -> GameResult<Option<T>> {
        match self.get(actor, path).await? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    /// Atomic single-path overwrite. Writing `Value::Null` removes the path.
    pub async fn set(&self, actor: &Actor, path: &str, value: impl Serialize) -> GameResult<()> {
        let segs = split(path);
        let value = serde_json::to_value(value)?;
        let mut inner = self.inner.lock().await;
        let old = value_at(&inner.tree, &segs).cloned();
        check_write(actor, &segs, old.as_ref(), &value)?;
        apply(&mut inner, &segs, value);
        Ok(())
    }

    /// Delete the path (equivalent to writing null)
    pub async fn remove(&self, actor: &Actor, path: &str) -> GameResult<()> {
        self.set(actor, path, Value::Null).await
    }

    /// Read-check-write under the tree lock. `f` receives the current value
    /// at `path` and returns the replacement, `None` to leave the path
    /// untouched, or an error to abort. This is the compare-and-write
    /// primitive the round host claim and tick discipline are built on.
    pub async fn transact<F>(&self, actor: &Actor, path: &str, f: F) -> GameResult<Option<Value>>
    where
        F: FnOnce(Option<&Value>) -> GameResult<Option<Value>>,
    {
        let segs = split(path);
        let mut inner = self.inner.lock().await;
        let old = value_at(&inner.tree, &segs).cloned();
        let new = match f(old.as_ref())? {
            Some(new) => new,
            None => return Ok(None),
        };
        check_write(actor, &segs, old.as_ref(), &new)?;
        apply(&mut inner, &segs, new.clone());
        Ok(Some(new))
    }

    /// Subscribe to full-snapshot notifications for `path` and its subtree
    pub async fn subscribe(&self, actor: &Actor, path: &str) -> GameResult<Subscription> {
        let segs = split(path);
        check_read(actor, &segs)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().await;
        let snapshot = value_at(&inner.tree, &segs)
            .cloned()
            .unwrap_or(Value::Null);
        let _ = tx.send(snapshot);
        inner.subs.push(SubEntry { path: segs, tx });
        Ok(Subscription { rx })
    }
}

fn split(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn value_at<'v>(tree: &'v Value, segs: &[String]) -> Option<&'v Value> {
    let mut cur = tree;
    for seg in segs {
        cur = cur.as_object()?.get(seg)?;
    }
    Some(cur)
}

/// Write `value` at `segs`, creating intermediate objects, then notify every
/// subscription whose subtree overlaps the written path.
fn apply(inner: &mut Inner, segs: &[String], value: Value) {
    if segs.is_empty() {
        inner.tree = if value.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            value
        };
    } else if value.is_null() {
        remove_at(&mut inner.tree, segs);
    } else {
        let mut cur = &mut inner.tree;
        for seg in &segs[..segs.len() - 1] {
            if !cur.is_object() {
                *cur = Value::Object(serde_json::Map::new());
            }
            cur = cur
                .as_object_mut()
                .expect("just ensured object")
                .entry(seg.clone())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
        }
        if !cur.is_object() {
            *cur = Value::Object(serde_json::Map::new());
        }
        cur.as_object_mut()
            .expect("just ensured object")
            .insert(segs[segs.len() - 1].clone(), value);
    }

    let tree = inner.tree.clone();
    inner.subs.retain(|sub| {
        if !overlaps(&sub.path, segs) {
            return !sub.tx.is_closed();
        }
        let snapshot = value_at(&tree, &sub.path).cloned().unwrap_or(Value::Null);
        sub.tx.send(snapshot).is_ok()
    });
}

fn remove_at(tree: &mut Value, segs: &[String]) {
    if segs.is_empty() {
        *tree = Value::Object(serde_json::Map::new());
        return;
    }
    let mut cur = tree;
    for seg in &segs[..segs.len() - 1] {
        match cur.as_object_mut().and_then(|o| o.get_mut(seg)) {
            Some(next) => cur = next,
            None => return,
        }
    }
    if let Some(obj) = cur.as_object_mut() {
        obj.remove(&segs[segs.len() - 1]);
    }
}

/// A write at `written` is visible to a subscription at `sub` when either
/// path contains the other.
fn overlaps(sub: &[String], written: &[String]) -> bool {
    let n = sub.len().min(written.len());
    sub[..n] == written[..n]
}

/// Namespaces readable only by their owning player
fn check_read(actor: &Actor, segs: &[String]) -> GameResult<()> {
    let uid = match actor {
        Actor::Server => return Ok(()),
        Actor::Player(uid) => uid.as_str(),
    };
    match segs.first().map(String::as_str) {
        Some("inboxes") | Some("privateReveals") | Some("roles") => {
            if segs.get(1).map(String::as_str) == Some(uid) {
                Ok(())
            } else {
                Err(GameError::Unauthorized(format!(
                    "{} is private to its owner",
                    segs.join("/")
                )))
            }
        }
        _ => Ok(()),
    }
}

/// Per-path write policy. `old` is the current value at the path, `new` the
/// incoming one; both are needed for the round host-claim rule.
fn check_write(
    actor: &Actor,
    segs: &[String],
    old: Option<&Value>,
    new: &Value,
) -> GameResult<()> {
    let uid = match actor.uid() {
        None => return Ok(()),
        Some(uid) => uid,
    };
    let denied = |what: &str| {
        Err(GameError::Unauthorized(format!(
            "{} may not write {}",
            uid, what
        )))
    };

    let seg = |i: usize| segs.get(i).map(String::as_str);
    match seg(0) {
        // rooms/{r}/players/{p}: only p mutates its own membership record
        Some("rooms") if seg(2) == Some("players") => {
            if seg(3) == Some(uid) {
                Ok(())
            } else {
                denied("another player's membership record")
            }
        }
        // leader is assigned only by the tally path
        Some("rooms") if seg(2) == Some("leader") => denied("room leader"),
        // any participant may mark or unmark the hostage target
        Some("rooms") if seg(2) == Some("hostageTarget") => Ok(()),
        Some("rooms") => denied("room structure"),
        // one vote per voter, own slot only
        Some("votes") => {
            if seg(2) == Some(uid) {
                Ok(())
            } else {
                denied("another voter's ballot")
            }
        }
        // anyone may deliver into an inbox; reads are owner-scoped
        Some("inboxes") => Ok(()),
        // privateReveals/{viewer}/{source}: only the discloser writes
        Some("privateReveals") => {
            if seg(2) == Some(uid) {
                Ok(())
            } else {
                denied("a reveal on another player's behalf")
            }
        }
        // hidden cards are dealt server-side only
        Some("roles") => denied("role assignments"),
        Some("playersMeta") => {
            if seg(1) == Some(uid) {
                Ok(())
            } else {
                denied("another player's metadata")
            }
        }
        // round: the lease holder ticks; a claim is allowed only when no
        // live host holds the clock; anyone may write the stopped sentinel
        Some("round") => {
            let incoming_stop = new
                .get("phase")
                .and_then(Value::as_str)
                .map(|p| p == "stopped")
                .unwrap_or(false);
            if incoming_stop {
                return Ok(());
            }
            let current_host = old
                .and_then(|v| v.get("host_uid"))
                .and_then(Value::as_str);
            let running = old
                .and_then(|v| v.get("phase"))
                .and_then(Value::as_str)
                .map(|p| p == "discussion" || p == "exchange_window")
                .unwrap_or(false);
            match current_host {
                Some(host) if running && host != uid => denied("the round clock (host lease held)"),
                _ => Ok(()),
            }
        }
        _ => denied("outside the match namespace"),
    }
}
