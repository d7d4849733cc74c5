//! Session store: one accumulated slot set, action gate and short history per
//! conversation.
//!
//! The map itself sits behind a `std::sync::Mutex` that is only held for
//! lookups. Each session has its own `tokio::sync::Mutex`, held for the whole
//! turn, so turns for one session run one at a time in arrival order while
//! other sessions proceed independently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as SessionLock, OwnedMutexGuard};
use tracing::{debug, info};

use rentwise_core::{ActionGate, Clock, GateState, Message, SessionId, SlotSet, SystemClock};

/// Conversation state owned by the store.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub slots: SlotSet,
    pub gate: ActionGate,
    /// Alternating user/assistant messages, oldest first.
    pub history: Vec<Message>,
    /// Number of turns received so far.
    pub turn: u64,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            slots: SlotSet::new(),
            gate: ActionGate::new(),
            history: Vec::new(),
            turn: 0,
            created_at: now,
            last_active: now,
        }
    }

    /// Record one exchange, keeping at most `max_turns` of them.
    pub fn push_exchange(&mut self, user: &str, assistant: &str, max_turns: usize) {
        self.history.push(Message::user(user));
        self.history.push(Message::assistant(assistant));
        let keep = max_turns * 2;
        if self.history.len() > keep {
            let excess = self.history.len() - keep;
            self.history.drain(..excess);
        }
    }

    /// Forget slots, pending action and history.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.gate.clear();
        self.history.clear();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            slots: self.slots.clone(),
            action: self.gate.state().clone(),
            turns: self.turn,
            history_len: self.history.len(),
            created_at: self.created_at,
            last_active: self.last_active,
        }
    }
}

/// Read-only view of a session, as exposed by the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub slots: SlotSet,
    pub action: GateState,
    pub turns: u64,
    pub history_len: usize,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

type Handle = Arc<SessionLock<Session>>;

/// Process-wide registry of sessions.
pub struct SessionManager {
    sessions: Mutex<HashMap<SessionId, Handle>>,
    clock: Arc<dyn Clock>,
    max_history_turns: usize,
}

impl SessionManager {
    pub fn new(max_history_turns: usize) -> Self {
        Self::with_clock(max_history_turns, Arc::new(SystemClock))
    }

    pub fn with_clock(max_history_turns: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
            max_history_turns,
        }
    }

    pub fn max_history_turns(&self) -> usize {
        self.max_history_turns
    }

    fn map(&self) -> MutexGuard<'_, HashMap<SessionId, Handle>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn existing(&self, id: &SessionId) -> Option<Handle> {
        self.map().get(id).cloned()
    }

    fn get_or_create(&self, id: &SessionId) -> Handle {
        let now = self.clock.now();
        self.map()
            .entry(id.clone())
            .or_insert_with(|| {
                info!(session_id = %id, "Session created");
                Arc::new(SessionLock::new(Session::new(id.clone(), now)))
            })
            .clone()
    }

    /// Lock the session for a turn, creating it when needed.
    ///
    /// A missing or blank id gets a fresh one; the id actually used is
    /// returned so the caller can hand it back to the client.
    pub async fn open(&self, id: Option<&str>) -> (SessionId, OwnedMutexGuard<Session>) {
        let id = id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(SessionId::from)
            .unwrap_or_default();

        loop {
            let handle = self.get_or_create(&id);
            let mut session = handle.clone().lock_owned().await;
            // The session may have been removed or swept while we waited.
            let current = self.existing(&id).is_some_and(|h| Arc::ptr_eq(&h, &handle));
            if current {
                session.last_active = self.clock.now();
                return (id, session);
            }
            debug!(session_id = %id, "Session replaced while waiting, retrying");
        }
    }

    /// Accumulated slots, empty when the session is unknown.
    pub async fn get(&self, id: &SessionId) -> SlotSet {
        match self.existing(id) {
            Some(handle) => handle.lock().await.slots.clone(),
            None => SlotSet::new(),
        }
    }

    /// Merge `update` into the session, creating it if absent.
    pub async fn merge(&self, id: &SessionId, update: &SlotSet) -> SlotSet {
        let (_, mut session) = self.open(Some(id.as_str())).await;
        session.slots.merge_from(update);
        session.slots.clone()
    }

    /// Clear a session's state. Returns `false` when it does not exist.
    pub async fn reset(&self, id: &SessionId) -> bool {
        let Some(handle) = self.existing(id) else {
            return false;
        };
        handle.lock().await.reset();
        info!(session_id = %id, "Session reset");
        true
    }

    /// Drop a session entirely.
    pub fn remove(&self, id: &SessionId) -> bool {
        let removed = self.map().remove(id).is_some();
        if removed {
            info!(session_id = %id, "Session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    pub async fn snapshot(&self, id: &SessionId) -> Option<SessionSnapshot> {
        let handle = self.existing(id)?;
        let session = handle.lock().await;
        Some(session.snapshot())
    }

    /// Remove sessions idle for longer than `ttl`. Sessions in the middle of
    /// a turn are skipped.
    pub fn sweep_idle(&self, ttl: chrono::Duration) -> usize {
        let now = self.clock.now();
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, handle| match handle.try_lock() {
            Ok(session) => now - session.last_active <= ttl,
            Err(_) => true,
        });
        let swept = before - map.len();
        if swept > 0 {
            info!(swept, remaining = map.len(), "Idle sessions swept");
        }
        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentwise_core::{Dimension, ManualClock};
    use std::time::Duration;

    fn district(name: &str) -> SlotSet {
        SlotSet::new().with(Dimension::District, name).unwrap()
    }

    #[tokio::test]
    async fn open_without_id_mints_one() {
        let manager = SessionManager::new(10);
        let (id, session) = manager.open(None).await;
        assert!(!id.as_str().is_empty());
        assert_eq!(session.id, id);
        drop(session);

        let (blank, _) = manager.open(Some("   ")).await;
        assert_ne!(blank, id);
        assert_eq!(manager.len(), 2);
    }

    #[tokio::test]
    async fn unknown_session_reads_empty_without_creating() {
        let manager = SessionManager::new(10);
        assert!(manager.get(&SessionId::from("nope")).await.is_empty());
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn merge_accumulates() {
        let manager = SessionManager::new(10);
        let id = SessionId::from("s1");
        manager.merge(&id, &district("海淀")).await;
        let merged = manager
            .merge(&id, &SlotSet::new().with(Dimension::MaxPrice, "5000").unwrap())
            .await;
        assert_eq!(merged.integer(Dimension::MaxPrice), Some(5000));
        assert!(merged.contains(Dimension::District));
        assert_eq!(manager.get(&id).await, merged);
    }

    #[tokio::test]
    async fn reset_clears_slots_and_history() {
        let manager = SessionManager::new(10);
        let id = SessionId::from("s1");
        {
            let (_, mut session) = manager.open(Some("s1")).await;
            session.slots = district("海淀");
            session.push_exchange("海淀", "好的", 10);
        }
        assert!(manager.reset(&id).await);
        let snapshot = manager.snapshot(&id).await.unwrap();
        assert!(snapshot.slots.is_empty());
        assert_eq!(snapshot.history_len, 0);
        assert!(!manager.reset(&SessionId::from("other")).await);
    }

    #[test]
    fn history_is_trimmed_to_window() {
        let mut session = Session::new(SessionId::from("s"), Utc::now());
        for i in 0..5 {
            session.push_exchange(&format!("问{i}"), &format!("答{i}"), 2);
        }
        assert_eq!(session.history.len(), 4);
        assert_eq!(session.history[0].content, "问3");
    }

    #[tokio::test]
    async fn turns_on_one_session_are_serialized() {
        let manager = Arc::new(SessionManager::new(10));
        let (id, first) = manager.open(Some("s1")).await;

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move {
                let (_, mut session) = manager.open(Some("s1")).await;
                session.turn += 1;
                session.turn
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // Another session is not blocked.
        let (_, other) = manager.open(Some("s2")).await;
        drop(other);

        let mut first = first;
        first.turn = 10;
        drop(first);
        assert_eq!(waiter.await.unwrap(), 11);
        assert_eq!(manager.snapshot(&id).await.unwrap().turns, 11);
    }

    #[tokio::test]
    async fn sweep_removes_only_idle_sessions() {
        let clock = Arc::new(ManualClock::default());
        let manager = SessionManager::with_clock(10, clock.clone());
        manager.open(Some("old")).await;
        clock.advance(chrono::Duration::minutes(30));
        let (_, busy) = manager.open(Some("busy")).await;
        manager.open(Some("fresh")).await;
        clock.advance(chrono::Duration::minutes(20));

        // "busy" is idle too but locked.
        let swept = manager.sweep_idle(chrono::Duration::minutes(25));
        assert_eq!(swept, 1);
        assert!(manager.snapshot(&SessionId::from("old")).await.is_none());
        drop(busy);
        assert_eq!(manager.len(), 2);
    }

    #[tokio::test]
    async fn removed_session_is_recreated_on_next_open() {
        let manager = SessionManager::new(10);
        let id = SessionId::from("s1");
        manager.merge(&id, &district("海淀")).await;
        assert!(manager.remove(&id));
        let (_, session) = manager.open(Some("s1")).await;
        assert!(session.slots.is_empty());
    }
}
