//! In-process registry of not-yet-persisted turns.
//!
//! A registry-level lock guards only the map. Each session entry carries its
//! own mutex, so appends to one session are serialized without blocking any
//! other session. `drain` marks the removed entry closed; an append that raced
//! with it re-resolves the entry instead of writing into a detached list.

use super::turn::{SessionKey, Turn, TurnDraft};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct SessionEntry {
    turns: Vec<Turn>,
    last_activity: Instant,
    closed: bool,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            turns: Vec::new(),
            last_activity: Instant::now(),
            closed: false,
        }
    }
}

pub struct SessionMemory {
    /// Active sessions (session key → pending turns)
    sessions: RwLock<HashMap<SessionKey, Arc<Mutex<SessionEntry>>>>,

    /// Sessions idle longer than this are evicted by the sweeper
    idle_ttl: Duration,
}

impl SessionMemory {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Append a turn to the end of the session's list and return its number.
    pub async fn append(&self, key: &SessionKey, draft: TurnDraft) -> u32 {
        let mut entry = self.lock_open_entry(key).await;
        let turn_number = entry.turns.len() as u32 + 1;
        entry.turns.push(draft.into_turn(turn_number));
        entry.last_activity = Instant::now();
        debug!("Appended turn {} to session {}", turn_number, key);
        turn_number
    }

    /// Atomically take every pending turn for the session and forget it.
    pub async fn drain(&self, key: &SessionKey) -> Vec<Turn> {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(key)
        };

        match removed {
            Some(entry) => {
                let mut entry = entry.lock().await;
                entry.closed = true;
                std::mem::take(&mut entry.turns)
            }
            None => Vec::new(),
        }
    }

    /// Put drained turns back ahead of anything appended since the drain.
    ///
    /// Turns are renumbered from 1 so numbering stays gap-free.
    pub async fn restore(&self, key: &SessionKey, turns: Vec<Turn>) {
        if turns.is_empty() {
            return;
        }

        let mut entry = self.lock_open_entry(key).await;
        let appended_since = std::mem::take(&mut entry.turns);
        entry.turns = turns
            .into_iter()
            .chain(appended_since)
            .enumerate()
            .map(|(i, turn)| turn.renumbered(i as u32 + 1))
            .collect();
        entry.last_activity = Instant::now();
        info!(
            "Restored session {} with {} pending turns",
            key,
            entry.turns.len()
        );
    }

    /// Snapshot of the session's pending turns
    pub async fn pending(&self, key: &SessionKey) -> Vec<Turn> {
        let entry = {
            let sessions = self.sessions.read().await;
            sessions.get(key).cloned()
        };

        match entry {
            Some(entry) => entry.lock().await.turns.clone(),
            None => Vec::new(),
        }
    }

    /// Number of sessions currently held in memory
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Evict every session idle for at least the TTL as of `now`.
    ///
    /// Sessions whose lock is held are in use and are skipped.
    /// Returns the number of evicted sessions.
    pub async fn sweep_idle_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|key, entry| match entry.try_lock() {
            Ok(mut entry) if now.saturating_duration_since(entry.last_activity) >= self.idle_ttl => {
                warn!(
                    "Evicting idle session {} with {} unsaved turns",
                    key,
                    entry.turns.len()
                );
                entry.closed = true;
                entry.turns.clear();
                false
            }
            _ => true,
        });

        before - sessions.len()
    }

    pub async fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now()).await
    }

    /// Run the idle sweep on a fixed interval until the task is aborted
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Session sweeper started (interval {:?}, idle TTL {:?})",
                interval, self.idle_ttl
            );
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let evicted = self.sweep_idle().await;
                if evicted > 0 {
                    info!("Swept {} idle sessions", evicted);
                }
            }
        })
    }

    async fn lock_open_entry(&self, key: &SessionKey) -> OwnedMutexGuard<SessionEntry> {
        loop {
            let entry = self.entry(key).await;
            let guard = entry.lock_owned().await;
            if !guard.closed {
                return guard;
            }
        }
    }

    async fn entry(&self, key: &SessionKey) -> Arc<Mutex<SessionEntry>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(entry) = sessions.get(key) {
                return Arc::clone(entry);
            }
        }

        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(SessionEntry::new()))),
        )
    }
}
