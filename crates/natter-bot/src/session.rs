use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::completion::{Role, Turn};

/// The running conversation between the bot and one sender.
///
/// Turn zero is always the system preamble. Everything after it alternates
/// user/assistant, except while a completion is in flight, when the last turn
/// is the pending user turn.
#[derive(Debug, Clone)]
pub struct Session {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl Session {
    /// `max_turns` counts the non-system turns kept; 0 means unbounded.
    pub fn new(preamble: &str, max_turns: usize) -> Self {
        Self {
            turns: vec![Turn::system(preamble)],
            max_turns,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
        self.trim();
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::assistant(content));
        self.trim();
    }

    /// Drop a trailing user turn whose completion never arrived.
    pub fn discard_pending(&mut self) {
        if self.turns.len() > 1 && self.turns.last().is_some_and(|t| t.role == Role::User) {
            self.turns.pop();
        }
    }

    // Oldest turns go first, in pairs so the history still opens on a user turn.
    fn trim(&mut self) {
        if self.max_turns == 0 {
            return;
        }
        while self.turns.len() - 1 > self.max_turns {
            let excess = self.turns.len() - 1 - self.max_turns;
            let drop = excess.max(2).min(self.turns.len() - 1);
            self.turns.drain(1..1 + drop);
        }
    }
}

/// Sessions keyed by sender username.
///
/// Each session sits behind its own async lock, held for the duration of a
/// completion call. Requests from one sender are serialized; requests from
/// different senders never touch each other's turns.
pub struct SessionStore {
    preamble: String,
    max_turns: usize,
    sessions: Mutex<HashMap<String, Arc<AsyncMutex<Session>>>>,
}

impl SessionStore {
    pub fn new(preamble: impl Into<String>, max_turns: usize) -> Self {
        Self {
            preamble: preamble.into(),
            max_turns,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Get the session handle for `sender`, creating it on first use.
    pub fn get(&self, sender: &str) -> Arc<AsyncMutex<Session>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(sender.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Session::new(&self.preamble, self.max_turns))))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
