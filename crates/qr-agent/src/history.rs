//! Per-user conversation history
//!
//! Each user gets a `ConversationState` behind its own async mutex, stored in
//! a `DashMap`. Requests for different users lock different states; requests
//! for one user queue on that user's lock in arrival order.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use qr_core::ConversationTurn;

/// Bounded, ordered turns of one user, oldest first
#[derive(Debug, Clone)]
pub struct ConversationState {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ConversationState {
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one exchange, evicting the oldest exchanges beyond capacity.
    /// Eviction drops whole USER/ASSISTANT pairs, so the history never
    /// starts with an orphan reply.
    pub fn push_exchange(&mut self, user: ConversationTurn, assistant: ConversationTurn) {
        self.turns.push_back(user);
        self.turns.push_back(assistant);
        while self.turns.len() > self.capacity && self.turns.len() > 2 {
            self.turns.pop_front();
            self.turns.pop_front();
        }
    }

    /// The last `n` turns, oldest first
    pub fn recent(&self, n: usize) -> Vec<ConversationTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// All users' conversations
pub struct ConversationStore {
    states: DashMap<String, Arc<Mutex<ConversationState>>>,
    capacity: usize,
}

impl ConversationStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            states: DashMap::new(),
            capacity,
        }
    }

    /// Handle to a user's state, created on first use
    pub fn session(&self, user_id: &str) -> Arc<Mutex<ConversationState>> {
        self.states
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationState::new(self.capacity))))
            .clone()
    }

    /// Stored turns, oldest first; empty for unknown users
    pub async fn history(&self, user_id: &str) -> Vec<ConversationTurn> {
        // clone the handle first so no map shard stays locked across the await
        let state = self.states.get(user_id).map(|entry| entry.value().clone());
        match state {
            Some(state) => state.lock().await.turns(),
            None => Vec::new(),
        }
    }

    /// Empty a user's history. Waits for any in-flight request of that user.
    ///
    /// The entry itself is dropped once nobody else holds its handle, so
    /// cleared users do not accumulate in the map.
    pub async fn clear(&self, user_id: &str) {
        let state = self.states.get(user_id).map(|entry| entry.value().clone());
        let Some(state) = state else {
            return;
        };
        state.lock().await.clear();
        drop(state);

        // the shard write lock taken by remove_if keeps session() from
        // handing out a new clone while the count is checked
        self.states.remove_if(user_id, |_, state| {
            Arc::strong_count(state) == 1
                && state.try_lock().map(|s| s.is_empty()).unwrap_or(false)
        });
    }

    /// Users with at least one stored turn
    pub async fn active_users(&self) -> usize {
        let states: Vec<_> = self.states.iter().map(|entry| entry.value().clone()).collect();
        let mut active = 0;
        for state in states {
            if !state.lock().await.is_empty() {
                active += 1;
            }
        }
        active
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
