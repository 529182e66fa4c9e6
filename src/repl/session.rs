//! Session manager for REPL chat state
//!
//! Owns the chat history and the per-session settings. The history lives
//! only as long as the session; `/reset` starts a new one.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::rag::ChatSettings;
use crate::types::{ChatHistory, ChatTurn};

/// Session manager maintaining REPL state
pub struct SessionManager {
    session_id: Uuid,
    history: ChatHistory,
    settings: ChatSettings,
    started_at: DateTime<Utc>,
    /// Turns submitted to the pipeline, including refused ones
    turn_count: usize,
}

impl SessionManager {
    /// Create new session manager
    pub fn new(settings: ChatSettings) -> Self {
        SessionManager {
            session_id: Uuid::new_v4(),
            history: ChatHistory::new(),
            settings,
            started_at: Utc::now(),
            turn_count: 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ChatHistory {
        &mut self.history
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ChatSettings {
        &mut self.settings
    }

    /// Split borrow for running a turn
    pub fn turn_parts(&mut self) -> (&mut ChatHistory, &ChatSettings) {
        (&mut self.history, &self.settings)
    }

    /// Number the next turn, starting at 1
    pub fn begin_turn(&mut self) -> usize {
        self.turn_count += 1;
        self.turn_count
    }

    pub fn turn_count(&self) -> usize {
        self.turn_count
    }

    /// Get recent turns (oldest first)
    pub fn get_history(&self, limit: usize) -> &[ChatTurn] {
        self.history.recent(limit)
    }

    /// Start a fresh session; settings survive
    pub fn reset(&mut self) {
        self.session_id = Uuid::new_v4();
        self.history.clear();
        self.started_at = Utc::now();
        self.turn_count = 0;
    }

    /// Get session duration in seconds
    pub fn session_duration(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(ChatSettings::default())
    }
}
